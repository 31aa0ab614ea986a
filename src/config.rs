//! Engine and server configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine knobs. Everything has a sane default; binaries override from the
/// environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Persisted vector store.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Product metadata sidecar.
    #[serde(default = "default_meta_path")]
    pub meta_path: PathBuf,

    /// Results returned when the request does not say.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Retrieval over-fetch multiplier; the filter and reranker see
    /// `top_k * oversample` candidates.
    #[serde(default = "default_oversample")]
    pub oversample: usize,

    /// Embedding LRU capacity (entries).
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Texts at or above this many bytes bypass the embedding cache.
    #[serde(default = "default_cache_text_limit")]
    pub cache_text_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            meta_path: default_meta_path(),
            default_top_k: default_top_k(),
            oversample: default_oversample(),
            cache_capacity: default_cache_capacity(),
            cache_text_limit: default_cache_text_limit(),
        }
    }
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/vogue.index")
}

fn default_meta_path() -> PathBuf {
    PathBuf::from("data/meta.json")
}

fn default_top_k() -> usize {
    12
}

fn default_oversample() -> usize {
    3
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_cache_text_limit() -> usize {
    100
}

/// HTTP server configuration, loaded from `server.*` config files and
/// `VOGUE_SERVER__*` environment variables.
#[cfg(feature = "server")]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB. Image payloads arrive base64-inline,
    /// so this is the effective image size cap.
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub engine: EngineConfig,
}

#[cfg(feature = "server")]
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            engine: EngineConfig::default(),
        }
    }
}

#[cfg(feature = "server")]
impl ServerConfig {
    /// Load configuration from config files and environment variables.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("VOGUE_SERVER").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

#[cfg(feature = "server")]
fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

#[cfg(feature = "server")]
fn default_port() -> u16 {
    8080
}

#[cfg(feature = "server")]
fn default_timeout_secs() -> u64 {
    30
}

#[cfg(feature = "server")]
fn default_max_body_size_mb() -> usize {
    10
}

#[cfg(feature = "server")]
fn default_true() -> bool {
    true
}

#[cfg(feature = "server")]
fn default_log_level() -> String {
    "info".to_string()
}
