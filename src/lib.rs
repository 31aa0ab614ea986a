//! Vogue — semantic product search.
//!
//! A retrieval-and-rerank pipeline over a product catalog:
//!
//! - **Embedding**: query preprocessing, a bounded LRU cache for short
//!   texts, and adaptive batch sizing over a pluggable text-embedding
//!   capability ([`embedding::EmbeddingService`]).
//! - **Retrieval**: exact inner-product search over an in-memory flat
//!   vector index with a JSON metadata sidecar ([`index::VectorIndex`]).
//! - **Intent**: vocabulary-driven query analysis for gender, occasion,
//!   season, price range, brands, colors, and styles ([`intent::analyze`]).
//! - **Filtering**: strict gender exclusivity with availability padding
//!   ([`filter::filter_by_gender`]).
//! - **Reranking**: cross-encoder scoring plus deterministic business-rule
//!   boosts, drops, and per-result explanations ([`rerank::Reranker`]).
//! - **Orchestration**: [`engine::SearchEngine`] wires the stages together,
//!   including the image-query path (caption, or direct visual embedding,
//!   with a generic-query fallback).
//!
//! Model capabilities (embedders, captioner, cross-encoder) are trait
//! objects ([`capability`]); deterministic offline implementations live in
//! [`stub`]. The `server` feature adds an axum HTTP surface and the
//! `vogued` binary.

pub mod batch;
pub mod capability;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod filter;
pub mod index;
pub mod intent;
pub mod rerank;
pub mod stub;
pub mod types;

mod normalize;
mod preprocess;

#[cfg(feature = "server")]
pub mod server;

pub use config::EngineConfig;
pub use engine::{init_or_get, SearchEngine};
pub use error::{CapabilityError, SearchError};
pub use index::VectorIndex;
pub use types::{
    Gender, Product, QueryRequest, RankedResult, RetrievalResult, SearchHit, SearchResponse,
};

#[cfg(feature = "server")]
pub use config::ServerConfig;
