//! Environment-driven runtime configuration.

use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the lorevault server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores chunk vectors.
    pub qdrant_url: String,
    /// Name of the Qdrant collection holding document chunks.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Dimensionality of the produced embedding vectors.
    pub embedding_dimension: usize,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Directory where uploaded PDFs are staged before processing.
    pub upload_dir: String,
    /// Optional directory for persisting processing results as JSON.
    pub processed_dir: Option<String>,
    /// Seconds a terminal document status stays visible before eviction.
    pub status_ttl_secs: u64,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Default number of query results when the caller omits a limit.
    pub search_default_limit: usize,
    /// Upper bound applied to caller-provided result limits.
    pub search_max_limit: usize,
    /// Minimum similarity score accepted from Qdrant.
    pub search_score_threshold: f32,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", load_env("EMBEDDING_DIMENSION")?)?,
            chunk_size: parse_env_or("CHUNK_SIZE", 1000)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", 200)?,
            upload_dir: load_env_optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            processed_dir: load_env_optional("PROCESSED_DIR"),
            status_ttl_secs: parse_env_or("STATUS_TTL_SECS", 3600)?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            search_default_limit: parse_env_or("SEARCH_DEFAULT_LIMIT", 5)?,
            search_max_limit: parse_env_or("SEARCH_MAX_LIMIT", 50)?,
            search_score_threshold: load_env_optional("SEARCH_SCORE_THRESHOLD")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SEARCH_SCORE_THRESHOLD".into()))
                })
                .transpose()?
                .unwrap_or(0.25),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => parse_env(key, value),
        None => Ok(default),
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
