//! Semantic search over the meeting and domain datasets.
//!
//! This module provides an `Embedder` trait and implementations:
//! - `HashEmbedder` - Deterministic hashing embedder for testing
//! - `FastEmbedEmbedder` - all-MiniLM-L6-v2 via fastembed
//!
//! plus the HNSW `VectorIndex`, the `MetadataStore` and the `SearchEngine`
//! that ties them together.

mod embedder;
mod engine;
mod hash;
mod index;
mod metadata;
#[cfg(feature = "fastembed")]
mod minilm;

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::ServiceError;

pub use embedder::Embedder;
pub use engine::{
    validate_top_k, LoadedDataset, SearchEngine, SearchHit, SearchOutcome, DEFAULT_TOP_K,
    MAX_TOP_K, MIN_TOP_K,
};
pub use hash::HashEmbedder;
pub use index::{Neighbor, VectorIndex};
pub use metadata::{MetadataStore, Ordinal, Record};
#[cfg(feature = "fastembed")]
pub use minilm::{FastEmbedEmbedder, MINILM_DIMENSION};

/// Create the embedder selected by `MOCK_EMBEDDER`.
///
/// Blocking: the real model may be downloaded on first use.
pub fn embedder_from_config(config: &Config) -> Result<Arc<dyn Embedder>, ServiceError> {
    if config.mock_embedder {
        info!("MOCK_EMBEDDER=true: Using hash embedder for testing");
        return Ok(Arc::new(HashEmbedder::new()));
    }

    real_embedder(config)
}

#[cfg(feature = "fastembed")]
fn real_embedder(config: &Config) -> Result<Arc<dyn Embedder>, ServiceError> {
    Ok(Arc::new(FastEmbedEmbedder::new(&config.model_cache_dir)?))
}

#[cfg(not(feature = "fastembed"))]
fn real_embedder(_config: &Config) -> Result<Arc<dyn Embedder>, ServiceError> {
    Err(ServiceError::Embedding(
        "built without the `fastembed` feature; set MOCK_EMBEDDER=true".into(),
    ))
}
