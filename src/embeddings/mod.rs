// Embedding provider module
// Turns query text into unit-length vectors compatible with the stored index.

pub mod ollama;

pub use ollama::OllamaClient;

use crate::Result;

/// Seam between the retrieval engine and the embedding backend.
///
/// Implementations must be safe for concurrent inference calls; a backend
/// that is not must serialize internally.
pub trait EmbeddingProvider: Send + Sync {
    /// Identity of the loaded model. Must match the model name recorded
    /// against the stored item vectors for similarities to be meaningful.
    fn model_name(&self) -> &str;

    /// Embed already-normalized text into a unit-length vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
