//! Configuration module for the search service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::{Path, PathBuf};

use crate::router::Dataset;
use crate::search::{DEFAULT_TOP_K, MAX_TOP_K, MIN_TOP_K};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Serialized index for the meeting dataset
    pub meeting_index_path: PathBuf,
    /// Ordinal -> record JSON for the meeting dataset
    pub meeting_metadata_path: PathBuf,
    /// Serialized index for the domain dataset
    pub domain_index_path: PathBuf,
    /// Ordinal -> record JSON for the domain dataset
    pub domain_metadata_path: PathBuf,
    /// Search API HTTP port
    pub http_port: u16,
    /// Prometheus metrics HTTP port
    pub metrics_port: u16,
    /// Bind address (supports IPv4, IPv6, or dual-stack)
    pub bind_address: String,
    /// Use the hash embedder instead of the ONNX model (opt-in via MOCK_EMBEDDER)
    pub mock_embedder: bool,
    /// Where fastembed keeps downloaded model files
    pub model_cache_dir: PathBuf,
    /// Result count when a request does not specify one
    pub default_top_k: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `DATA_DIR` - Directory holding the artifacts (default: data)
    /// - `MEETING_INDEX_PATH` / `MEETING_METADATA_PATH` - Override meeting artifacts
    /// - `DOMAIN_INDEX_PATH` / `DOMAIN_METADATA_PATH` - Override domain artifacts
    /// - `HTTP_PORT` - Search API port (default: 8501)
    /// - `METRICS_PORT` - Prometheus metrics port (default: 9090)
    /// - `BIND_ADDRESS` - Bind address (default: auto-detect [::] or 0.0.0.0)
    /// - `MOCK_EMBEDDER` - Use hash embedder for testing (default: false)
    /// - `MODEL_CACHE_DIR` - fastembed model cache (default: .fastembed_cache)
    /// - `DEFAULT_TOP_K` - Default result count, clamped to 1..=10 (default: 5)
    ///
    /// `RUST_LOG` is read by the tracing subscriber, not here.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        if data_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue("DATA_DIR"));
        }

        let mut config = Self::for_data_dir(&data_dir);

        if let Some(path) = path_var("MEETING_INDEX_PATH") {
            config.meeting_index_path = path;
        }
        if let Some(path) = path_var("MEETING_METADATA_PATH") {
            config.meeting_metadata_path = path;
        }
        if let Some(path) = path_var("DOMAIN_INDEX_PATH") {
            config.domain_index_path = path;
        }
        if let Some(path) = path_var("DOMAIN_METADATA_PATH") {
            config.domain_metadata_path = path;
        }

        config.mock_embedder = env::var("MOCK_EMBEDDER")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        config.http_port = env::var("HTTP_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.http_port);

        config.metrics_port = env::var("METRICS_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.metrics_port);

        config.default_top_k = env::var("DEFAULT_TOP_K")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|k| k.clamp(MIN_TOP_K, MAX_TOP_K))
            .unwrap_or(DEFAULT_TOP_K);

        if let Some(path) = path_var("MODEL_CACHE_DIR") {
            config.model_cache_dir = path;
        }

        // Try dual-stack (::) first, fall back to IPv4-only (0.0.0.0) if needed
        config.bind_address = env::var("BIND_ADDRESS").unwrap_or_else(|_| "auto".to_string());

        Ok(config)
    }

    /// Defaults with every artifact under `data_dir`, using the original file names.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();

        Config {
            meeting_index_path: data_dir.join("meeting.index"),
            meeting_metadata_path: data_dir.join("meeting_metadata.json"),
            domain_index_path: data_dir.join("domain.index"),
            domain_metadata_path: data_dir.join("domain_metadata.json"),
            http_port: 8501,
            metrics_port: 9090,
            bind_address: "auto".to_string(),
            mock_embedder: false,
            model_cache_dir: PathBuf::from(".fastembed_cache"),
            default_top_k: DEFAULT_TOP_K,
        }
    }

    /// Index and metadata paths for one dataset.
    pub fn artifact_paths(&self, dataset: Dataset) -> (&Path, &Path) {
        match dataset {
            Dataset::Meeting => (&self.meeting_index_path, &self.meeting_metadata_path),
            Dataset::Domain => (&self.domain_index_path, &self.domain_metadata_path),
        }
    }
}

fn path_var(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: must not be empty")]
    InvalidValue(&'static str),
}
