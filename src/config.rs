use serde::Deserialize;
use std::env;
use std::path::PathBuf;
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

/// Runtime configuration for the ingestion pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Base URL of the embedding provider (required for remote providers).
    pub embedding_url: Option<String>,
    /// Bearer token for OpenAI-compatible embedding endpoints.
    pub openai_api_key: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Maximum number of attempts per embedding call.
    pub embedding_max_retries: usize,
    /// Chunk size in characters.
    pub chunk_size: usize,
    /// Trailing overlap carried into the next chunk, in characters.
    pub chunk_overlap: usize,
    /// Path to the SQLite registry database.
    pub registry_db_path: PathBuf,
}

/// Supported embedding backends for the processing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
    /// Deterministic local hashing, for offline runs and tests.
    Hash,
}

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 100;
const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_REGISTRY_DB_PATH: &str = "study-ingest.db";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let embedding_provider: EmbeddingProvider = load_env("EMBEDDING_PROVIDER")?
            .parse()
            .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?;
        let embedding_url = load_env_optional("EMBEDDING_URL");
        if matches!(
            embedding_provider,
            EmbeddingProvider::Ollama | EmbeddingProvider::OpenAI
        ) && embedding_url.is_none()
        {
            return Err(ConfigError::MissingVariable("EMBEDDING_URL".to_string()));
        }

        let config = Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider,
            embedding_url,
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_env("EMBEDDING_DIMENSION", None)?,
            embedding_max_retries: parse_env("EMBEDDING_MAX_RETRIES", Some(DEFAULT_MAX_RETRIES))?,
            chunk_size: parse_env("CHUNK_SIZE", Some(DEFAULT_CHUNK_SIZE))?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", Some(DEFAULT_CHUNK_OVERLAP))?,
            registry_db_path: Self::registry_db_path_from_env(),
        };

        if config.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()));
        }
        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".to_string()));
        }
        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".to_string()));
        }

        tracing::debug!(
            qdrant_url = %config.qdrant_url,
            collection = %config.qdrant_collection_name,
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            dimension = config.embedding_dimension,
            chunk_size = config.chunk_size,
            chunk_overlap = config.chunk_overlap,
            "Loaded configuration"
        );

        Ok(config)
    }

    /// Resolve the registry database path without loading the rest of the
    /// configuration.
    ///
    /// Database-only maintenance has no use for embedding or vector-store
    /// settings, so it should not fail when those are absent.
    pub fn registry_db_path_from_env() -> PathBuf {
        load_env_optional("REGISTRY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_DB_PATH))
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env(key: &str, default: Option<usize>) -> Result<usize, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => default.ok_or_else(|| ConfigError::MissingVariable(key.to_string())),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_path_defaults_without_env() {
        // No other test sets REGISTRY_DB_PATH, so the default applies.
        assert_eq!(
            Config::registry_db_path_from_env(),
            PathBuf::from(DEFAULT_REGISTRY_DB_PATH)
        );
    }

    #[test]
    fn provider_parses_known_names() {
        assert_eq!(
            "ollama".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::Ollama)
        );
        assert_eq!(
            "OpenAI".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::OpenAI)
        );
        assert_eq!(
            "hash".parse::<EmbeddingProvider>(),
            Ok(EmbeddingProvider::Hash)
        );
        assert!("gemini".parse::<EmbeddingProvider>().is_err());
    }
}
