//! Seams to the external model capabilities.
//!
//! The engine treats embedding, captioning, and cross-encoder scoring as
//! opaque calls behind these traits; model internals (runtimes, tokenizers,
//! downloads) live entirely on the other side. All calls are synchronous —
//! a slow model call delays only its own request.

use crate::error::CapabilityError;

/// Batch text embedding. Implementations return one vector per input text,
/// in input order. Vectors may come back unnormalized; the embedding service
/// normalizes before any index use.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError>;

    /// Fixed output dimension of this capability.
    fn dimension(&self) -> usize;
}

/// Direct image embedding. Optional: deployments without one fall back to
/// captioning.
pub trait ImageEmbedder: Send + Sync {
    fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>, CapabilityError>;

    fn dimension(&self) -> usize;
}

/// Image captioning, used to route image queries through the text pipeline.
pub trait Captioner: Send + Sync {
    fn caption(&self, bytes: &[u8]) -> Result<String, CapabilityError>;
}

/// Joint (query, candidate) relevance scoring for reranking. Returns one
/// score per candidate, in input order.
pub trait CrossEncoder: Send + Sync {
    fn score(&self, query: &str, candidates: &[String]) -> Result<Vec<f32>, CapabilityError>;
}
