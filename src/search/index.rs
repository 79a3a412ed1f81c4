//! Serialized nearest-neighbor index over record embeddings.
//!
//! Uses an instant-distance HNSW map whose values are metadata ordinals.
//! Distances are squared L2, so results rank the same way a flat L2 index
//! would rank them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use instant_distance::{Builder, HnswMap, Point, Search};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::embedder::Embedder;
use super::metadata::{MetadataStore, Ordinal};
use crate::error::ServiceError;

/// Fixed so rebuilding from the same metadata gives the same graph.
const INDEX_SEED: u64 = 0x5EED_0F_1DE5;
const EF_CONSTRUCTION: usize = 100;
/// Upper bound on candidates per query; must stay above the largest k.
const EF_SEARCH: usize = 100;

/// An embedding wrapped as an HNSW point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingPoint(Vec<f32>);

impl Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        squared_l2(&self.0, &other.0)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// One search result: which record, and how far it is from the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: Ordinal,
    pub distance: f32,
}

/// On-disk layout written by `build-index`.
#[derive(Serialize, Deserialize)]
struct IndexArtifact {
    embedder: String,
    dimension: usize,
    built_at: DateTime<Utc>,
    ordinals: Vec<Ordinal>,
    hnsw: HnswMap<EmbeddingPoint, Ordinal>,
}

/// Immutable vector index for one dataset.
pub struct VectorIndex {
    artifact: IndexArtifact,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("embedder", &self.artifact.embedder)
            .field("dimension", &self.artifact.dimension)
            .field("built_at", &self.artifact.built_at)
            .field("len", &self.artifact.ordinals.len())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// Embed every record's text and build an index keyed by ordinal.
    ///
    /// # Errors
    /// Returns error if the metadata is empty, embedding fails, or the
    /// embedder returns vectors of the wrong width.
    pub fn build(
        embedder: &dyn Embedder,
        metadata: &MetadataStore,
        batch_size: usize,
    ) -> Result<Self, ServiceError> {
        if metadata.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "cannot build an index from empty metadata".into(),
            ));
        }

        let dimension = embedder.dimension();
        let entries = metadata.iter_sorted();
        let mut points = Vec::with_capacity(entries.len());
        let mut ordinals = Vec::with_capacity(entries.len());

        for chunk in entries.chunks(batch_size.max(1)) {
            let texts: Vec<&str> = chunk.iter().map(|(_, r)| r.text.as_str()).collect();
            let vectors = embedder.embed_batch(&texts)?;

            for ((ordinal, _), vector) in chunk.iter().zip(vectors) {
                if vector.len() != dimension {
                    return Err(ServiceError::Embedding(format!(
                        "ordinal {} embedded to {} dimensions, expected {}",
                        ordinal,
                        vector.len(),
                        dimension
                    )));
                }
                points.push(EmbeddingPoint(vector));
                ordinals.push(*ordinal);
            }
        }

        info!(
            embedder = embedder.name(),
            dimension,
            points = points.len(),
            "Building HNSW index"
        );

        let hnsw = Builder::default()
            .ef_construction(EF_CONSTRUCTION)
            .ef_search(EF_SEARCH)
            .seed(INDEX_SEED)
            .build(points, ordinals.clone());

        Ok(Self {
            artifact: IndexArtifact {
                embedder: embedder.name().to_string(),
                dimension,
                built_at: Utc::now(),
                ordinals,
                hnsw,
            },
        })
    }

    /// Write the index to `path` with bincode.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ServiceError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServiceError::Internal(format!("{}: {}", parent.display(), e)))?;
        }

        let file = File::create(path)
            .map_err(|e| ServiceError::Internal(format!("{}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &self.artifact)
            .map_err(|e| ServiceError::Internal(format!("write index: {}", e)))?;
        writer
            .flush()
            .map_err(|e| ServiceError::Internal(format!("write index: {}", e)))?;

        info!(path = %path.display(), points = self.len(), "Index written");
        Ok(())
    }

    /// Load an index written by [`VectorIndex::save`].
    ///
    /// # Errors
    /// Returns error if:
    /// - File doesn't exist
    /// - File is not a valid index artifact
    /// - The artifact holds no vectors
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();

        info!(path = %path.display(), "Loading vector index");

        if !path.exists() {
            error!(path = %path.display(), "Index file not found");
            return Err(ServiceError::IndexNotFound(path.display().to_string()));
        }

        // Decoding from a slice bounds every length prefix by the file size
        let bytes = std::fs::read(path)
            .map_err(|e| ServiceError::IndexLoad(format!("{}: {}", path.display(), e)))?;
        let artifact: IndexArtifact = bincode::deserialize(&bytes)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "Failed to decode index");
                ServiceError::IndexLoad(format!("{}: {}", path.display(), e))
            })?;

        if artifact.ordinals.is_empty() || artifact.dimension == 0 {
            return Err(ServiceError::IndexLoad(format!(
                "{}: index is empty",
                path.display()
            )));
        }

        info!(
            path = %path.display(),
            embedder = %artifact.embedder,
            dimension = artifact.dimension,
            points = artifact.ordinals.len(),
            built_at = %artifact.built_at,
            "Vector index loaded"
        );

        Ok(Self { artifact })
    }

    /// Up to `k` nearest neighbors, closest first.
    ///
    /// The candidate list does not depend on `k`, so a smaller `k` always
    /// returns a prefix of a larger one. Ties keep whatever order the graph
    /// search produced.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, ServiceError> {
        if query.len() != self.artifact.dimension {
            return Err(ServiceError::Search(format!(
                "query has {} dimensions, index expects {}",
                query.len(),
                self.artifact.dimension
            )));
        }

        let point = EmbeddingPoint(query.to_vec());
        let mut search = Search::default();
        let neighbors = self
            .artifact
            .hnsw
            .search(&point, &mut search)
            .take(k)
            .map(|item| Neighbor {
                ordinal: *item.value,
                distance: item.distance,
            })
            .collect();

        Ok(neighbors)
    }

    /// Ordinals referenced by the index, in build order.
    pub fn ordinals(&self) -> &[Ordinal] {
        &self.artifact.ordinals
    }

    pub fn embedder(&self) -> &str {
        &self.artifact.embedder
    }

    pub fn dimension(&self) -> usize {
        self.artifact.dimension
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.artifact.built_at
    }

    pub fn len(&self) -> usize {
        self.artifact.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifact.ordinals.is_empty()
    }
}
