//! # Application Configuration
//!
//! Layered configuration: programmatic defaults, an optional `config.yml`
//! (with `${VAR}` environment substitution), then environment variables —
//! top-level names directly, nested fields via `RAGDOC_`-prefixed
//! double-underscore names (e.g. `RAGDOC_EMBEDDING_PROVIDER__API_URL`).

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    General(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// Endpoint, model, and credential triple shared by the embedding and chat
/// providers (teacher's `ProviderConfig` shape, specialized per role).
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_ingestion_worker_count")]
    pub ingestion_worker_count: usize,
    #[serde(default = "default_provider_request_timeout_secs")]
    pub provider_request_timeout_secs: u64,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_search_top_k")]
    pub search_top_k_default: usize,
    #[serde(default = "default_rag_top_k")]
    pub rag_top_k_default: usize,
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    pub embedding_provider: ProviderConfig,
    pub chat_provider: ProviderConfig,
}

fn default_server_port() -> u16 {
    8080
}
fn default_db_path() -> String {
    "db/ragdoc.db".to_string()
}
fn default_upload_dir() -> String {
    "./data/uploads".to_string()
}
fn default_ingestion_worker_count() -> usize {
    4
}
fn default_provider_request_timeout_secs() -> u64 {
    30
}
fn default_max_upload_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_search_top_k() -> usize {
    5
}
fn default_rag_top_k() -> usize {
    8
}
fn default_semantic_weight() -> f64 {
    0.7
}
fn default_keyword_weight() -> f64 {
    0.3
}

/// Reads `path`, substituting `${VAR}` references with environment
/// variables. Returns `Ok(None)` if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap();
    let expanded = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded.to_string()))
}

/// Loads the application configuration from an optional file plus the
/// environment. `config_path_override` lets tests and the binary entrypoint
/// point at a specific file instead of the default `config.yml`.
pub fn get_config(config_path_override: Option<&str>) -> Result<Config, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let config_path = config_path_override
        .map(|p| p.to_string())
        .unwrap_or_else(|| "config.yml".to_string());

    if let Some(content) = read_and_substitute(&config_path)? {
        info!("loading configuration from '{config_path}'");
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    } else {
        info!("'{config_path}' not found; relying on defaults and environment variables");
    }

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("RAGDOC")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: Config = settings.try_deserialize()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_fill_in_when_file_omits_them() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "embedding_provider:\n  api_url: http://localhost:9000/embeddings\n  model_name: test-embed\nchat_provider:\n  api_url: http://localhost:9000/chat/completions\n  model_name: test-chat\n"
        )
        .unwrap();

        let config = get_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.embedding_provider.model_name, "test-embed");
    }

    #[test]
    fn explicit_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(
            file,
            "server_port: 9999\nchunk_size: 500\nembedding_provider:\n  api_url: http://localhost:9000/embeddings\n  model_name: test-embed\nchat_provider:\n  api_url: http://localhost:9000/chat/completions\n  model_name: test-chat\n"
        )
        .unwrap();

        let config = get_config(Some(file.path().to_str().unwrap())).unwrap();
        assert_eq!(config.server_port, 9999);
        assert_eq!(config.chunk_size, 500);
    }
}
