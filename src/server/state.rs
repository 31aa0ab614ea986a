use std::sync::Arc;

use crate::capability::{Captioner, CrossEncoder, TextEmbedder};
use crate::config::ServerConfig;
use crate::engine::{init_or_get, SearchEngine};
use crate::index::VectorIndex;
use crate::stub::{OverlapCrossEncoder, StubCaptioner, StubTextEmbedder};

/// Shared application state.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub engine: Arc<SearchEngine>,
}

impl AppState {
    /// Load the persisted index and assemble the process-wide engine.
    ///
    /// The deterministic stub capabilities stand in for real model
    /// backends; swapping them means swapping these constructors. A missing
    /// index or a dimension disagreement fails startup here rather than on
    /// the first request.
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let engine_config = config.engine.clone();
        let engine = init_or_get(move || {
            let index =
                VectorIndex::load(&engine_config.index_path, &engine_config.meta_path)?;
            let embedder: Arc<dyn TextEmbedder> =
                Arc::new(StubTextEmbedder::new(index.dimension()));
            let cross_encoder: Arc<dyn CrossEncoder> = Arc::new(OverlapCrossEncoder);
            let captioner: Arc<dyn Captioner> = Arc::new(StubCaptioner);
            SearchEngine::new(
                index,
                embedder,
                cross_encoder,
                Some(captioner),
                None,
                engine_config,
            )
        })?;

        tracing::info!(products = engine.index().len(), "engine ready");
        Ok(Self {
            config: Arc::new(config),
            engine,
        })
    }
}
