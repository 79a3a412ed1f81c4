//! Embedder trait defining the interface for turning text into vectors.

use crate::error::ServiceError;

/// Maps text to a fixed-length embedding vector.
///
/// Implementations include:
/// - `HashEmbedder` - Deterministic feature hashing, no model download
/// - `FastEmbedEmbedder` - all-MiniLM-L6-v2 via fastembed (ONNX)
pub trait Embedder: Send + Sync {
    /// Short identifier stored alongside built indexes.
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    /// Embed several texts, preserving input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, ServiceError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}
