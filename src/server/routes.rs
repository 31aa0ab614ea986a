//! HTTP endpoint handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::types::QueryRequest;

/// Root endpoint: service name, version, and routes.
pub async fn api_info() -> impl IntoResponse {
    Json(json!({
        "name": "vogue",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/api/recommend", "/health"],
    }))
}

/// Liveness probe, including catalog size.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "vogue",
        "products": state.engine.index().len(),
    }))
}

/// Product search. The engine does blocking CPU work (embedding, exact
/// retrieval, rerank scoring), so the call runs on the blocking pool.
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<impl IntoResponse> {
    let engine = state.engine.clone();
    let response = tokio::task::spawn_blocking(move || engine.search(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("search task failed: {e}")))??;

    Ok(Json(response))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
