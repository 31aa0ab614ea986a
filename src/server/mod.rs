//! HTTP surface for the search engine.
//!
//! Router configuration, shared state, and error mapping for the axum
//! server. The engine itself is synchronous; handlers offload onto the
//! blocking pool so embedding and reranking never stall the runtime.

pub mod error;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use state::AppState;

pub use error::{ApiError, ApiResult};

fn build_router(state: Arc<AppState>) -> Router {
    let cors = if state.config.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(routes::api_info))
        .route("/health", get(routes::health))
        .route("/api/recommend", post(routes::recommend))
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_size()))
        .layer(TimeoutLayer::new(state.config.timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server. Loads the index, builds the engine, and serves
/// until SIGTERM or Ctrl+C. Index or dimension problems abort startup.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .with_target(false)
        .json()
        .init();

    let state = Arc::new(AppState::new(config.clone())?);
    let app = build_router(state);

    let addr: SocketAddr = config.socket_addr()?;
    tracing::info!(
        %addr,
        timeout_secs = config.timeout_secs,
        max_body_mb = config.max_body_size_mb,
        cors = config.enable_cors,
        "starting vogue server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Ctrl+C handler installation");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("signal handler installation")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
