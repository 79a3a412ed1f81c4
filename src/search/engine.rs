//! Search orchestration: route, embed, look up neighbors, resolve records.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::embedder::Embedder;
use super::index::VectorIndex;
use super::metadata::{MetadataStore, Ordinal, Record};
use crate::config::Config;
use crate::error::ServiceError;
use crate::router::{route, Dataset};

/// Smallest accepted result count.
pub const MIN_TOP_K: usize = 1;
/// Largest accepted result count.
pub const MAX_TOP_K: usize = 10;
/// Result count used when a caller does not ask for one.
pub const DEFAULT_TOP_K: usize = 5;

/// A vector index paired with the metadata its ordinals point into.
#[derive(Debug)]
pub struct LoadedDataset {
    index: VectorIndex,
    metadata: MetadataStore,
}

impl LoadedDataset {
    /// Pair an index with its metadata, warning about uncovered ordinals.
    pub fn new(dataset: Dataset, index: VectorIndex, metadata: MetadataStore) -> Self {
        let missing = index
            .ordinals()
            .iter()
            .filter(|ordinal| !metadata.contains(**ordinal))
            .count();

        if missing > 0 {
            warn!(
                dataset = %dataset,
                missing,
                "Index references ordinals with no metadata record; matching searches will fail"
            );
        }

        Self { index, metadata }
    }

    /// Load both artifacts from disk.
    pub fn load(
        dataset: Dataset,
        index_path: &std::path::Path,
        metadata_path: &std::path::Path,
    ) -> Result<Self, ServiceError> {
        let index = VectorIndex::load(index_path)?;
        let metadata = MetadataStore::load(metadata_path)?;
        Ok(Self::new(dataset, index, metadata))
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }
}

/// One resolved search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub ordinal: Ordinal,
    pub distance: f32,
    pub record: Record,
}

/// Result of a routed search.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Dataset the router picked
    pub dataset: Dataset,
    /// Hits ordered closest first
    pub hits: Vec<SearchHit>,
    /// Time taken in milliseconds
    pub took_ms: u64,
}

/// Immutable search engine shared by every request.
///
/// Holds the embedder and both datasets; built once at startup and passed
/// around as `Arc<SearchEngine>`.
pub struct SearchEngine {
    embedder: Arc<dyn Embedder>,
    meeting: LoadedDataset,
    domain: LoadedDataset,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("embedder", &self.embedder.name())
            .field("meeting", &self.meeting)
            .field("domain", &self.domain)
            .finish()
    }
}

impl SearchEngine {
    pub fn new(embedder: Arc<dyn Embedder>, meeting: LoadedDataset, domain: LoadedDataset) -> Self {
        for (dataset, loaded) in [(Dataset::Meeting, &meeting), (Dataset::Domain, &domain)] {
            if loaded.index.embedder() != embedder.name() {
                warn!(
                    dataset = %dataset,
                    index_embedder = loaded.index.embedder(),
                    query_embedder = embedder.name(),
                    "Index was built with a different embedder"
                );
            }
        }

        Self {
            embedder,
            meeting,
            domain,
        }
    }

    /// Load both datasets from the paths in `config`.
    ///
    /// Blocking; any failure here is fatal to the service.
    pub fn load(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self, ServiceError> {
        let load = |dataset: Dataset| {
            let (index_path, metadata_path) = config.artifact_paths(dataset);
            LoadedDataset::load(dataset, index_path, metadata_path)
        };
        let meeting = load(Dataset::Meeting)?;
        let domain = load(Dataset::Domain)?;

        info!(
            meeting_records = meeting.metadata.len(),
            domain_records = domain.metadata.len(),
            embedder = embedder.name(),
            "Search engine ready"
        );

        Ok(Self::new(embedder, meeting, domain))
    }

    pub fn dataset(&self, dataset: Dataset) -> &LoadedDataset {
        match dataset {
            Dataset::Meeting => &self.meeting,
            Dataset::Domain => &self.domain,
        }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    /// Top-`k` records from one dataset, closest first.
    ///
    /// # Errors
    /// - `InvalidRequest` if `k` is outside `1..=10`
    /// - `MetadataMissing` if a returned ordinal has no record
    pub fn search(
        &self,
        dataset: Dataset,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        validate_top_k(k)?;

        let loaded = self.dataset(dataset);
        let embedding = self.embedder.embed(query)?;
        let neighbors = loaded.index.search(&embedding, k)?;

        debug!(dataset = %dataset, neighbors = neighbors.len(), "Index search completed");

        neighbors
            .into_iter()
            .map(|neighbor| -> Result<SearchHit, ServiceError> {
                let record = loaded.metadata.get(neighbor.ordinal)?;
                Ok(SearchHit {
                    ordinal: neighbor.ordinal,
                    distance: neighbor.distance,
                    record: record.clone(),
                })
            })
            .collect()
    }

    /// Route the query to a dataset and search it.
    pub fn search_routed(&self, query: &str, k: usize) -> Result<SearchOutcome, ServiceError> {
        let start = Instant::now();

        if query.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("Query cannot be empty".into()));
        }

        let dataset = route(query);
        let hits = self.search(dataset, query, k)?;
        let took_ms = start.elapsed().as_millis() as u64;

        info!(
            dataset = %dataset,
            hits = hits.len(),
            took_ms,
            "Search completed"
        );

        Ok(SearchOutcome {
            dataset,
            hits,
            took_ms,
        })
    }
}

/// Reject result counts outside `1..=10`.
pub fn validate_top_k(k: usize) -> Result<usize, ServiceError> {
    if (MIN_TOP_K..=MAX_TOP_K).contains(&k) {
        Ok(k)
    } else {
        Err(ServiceError::InvalidRequest(format!(
            "k must be between {} and {}, got {}",
            MIN_TOP_K, MAX_TOP_K, k
        )))
    }
}
