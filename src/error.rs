use std::io;
use thiserror::Error;

/// Failure of an external model capability (embedding, captioning, scoring).
#[derive(Debug, Error, Clone)]
pub enum CapabilityError {
    /// The capability call itself failed (network, runtime, model crash).
    #[error("capability call failed: {0}")]
    Call(String),
    /// The capability returned a different number of outputs than inputs.
    #[error("capability returned {actual} outputs for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
    /// A returned vector has the wrong dimension for this capability.
    #[error("capability produced a {actual}-dim vector, expected {expected}")]
    BadDimension { expected: usize, actual: usize },
}

/// Errors surfaced by the search pipeline.
///
/// The recoverable/fatal split is encoded in the variant, not in how callers
/// wrap the call: `Input` and `Decode` are client-side rejections,
/// `Capability` on the primary embedding path and `DimensionMismatch` are
/// server-side, and `IndexLoad` aborts startup.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Missing or empty query text with no image payload.
    #[error("invalid input: {0}")]
    Input(String),
    /// Malformed image payload (bad base64 or undecodable image bytes).
    #[error("image decode failed: {0}")]
    Decode(String),
    /// An external capability failed in a non-recoverable position.
    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),
    /// Persisted index or metadata missing or mutually inconsistent.
    #[error("index load failed: {0}")]
    IndexLoad(String),
    /// A produced embedding disagrees with the loaded index dimension.
    /// Configuration fault: surfaced loudly, never truncated or padded.
    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Low-level IO while touching index artifacts.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl SearchError {
    /// Whether the error is the caller's fault (as opposed to a server-side
    /// or configuration failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::Input(_) | SearchError::Decode(_))
    }
}
