// Embeddings module
// Text-to-vector capability used by the document store

pub mod ollama;

pub use ollama::{OllamaClient, DEFAULT_EMBEDDING_DIMENSION};

use crate::Result;

/// Maps text to a fixed-length vector
///
/// Implementations must return vectors of exactly [`Embedder::dimension`]
/// elements and fail with [`crate::DocuSenseError::Embedding`] otherwise.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;
}
