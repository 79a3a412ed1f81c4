//! Real embedder backed by the all-MiniLM-L6-v2 ONNX model via fastembed.

use std::path::{Path, PathBuf};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{error, info};

use super::embedder::Embedder;
use crate::error::ServiceError;

/// Embedding width of all-MiniLM-L6-v2.
pub const MINILM_DIMENSION: usize = 384;

/// Sentence embedder using fastembed.
///
/// The model is downloaded into `cache_dir` on first use and then loaded
/// from disk. Construction is blocking; call it from `spawn_blocking` when
/// running inside the async runtime.
pub struct FastEmbedEmbedder {
    model: TextEmbedding,
    cache_dir: PathBuf,
}

impl std::fmt::Debug for FastEmbedEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedEmbedder")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl FastEmbedEmbedder {
    /// Load all-MiniLM-L6-v2, downloading it into `cache_dir` if needed.
    ///
    /// # Errors
    /// Returns error if the model cannot be downloaded or the ONNX session
    /// fails to initialize.
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let cache_dir = cache_dir.as_ref().to_path_buf();

        info!(
            cache_dir = %cache_dir.display(),
            "Loading all-MiniLM-L6-v2 embedding model"
        );

        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(cache_dir.clone())
            .with_show_download_progress(false);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            error!(error = %e, "Failed to initialize embedding model");
            ServiceError::Embedding(format!("model init: {}", e))
        })?;

        info!("Embedding model loaded");

        Ok(Self { model, cache_dir })
    }
}

impl Embedder for FastEmbedEmbedder {
    fn name(&self) -> &str {
        "all-MiniLM-L6-v2"
    }

    fn dimension(&self) -> usize {
        MINILM_DIMENSION
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| ServiceError::Embedding("model returned no embedding".into()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        let embeddings = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|e| ServiceError::Embedding(e.to_string()))?;

        if embeddings.len() != texts.len() {
            return Err(ServiceError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}
