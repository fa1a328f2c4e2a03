use crate::error::TvRecError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TvRec application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Vector store directory (embeddings.npy + meta.json)
    pub store_dir: PathBuf,

    /// JSONL corpus used by the build step
    pub corpus_path: PathBuf,

    /// Ollama API base URL
    pub ollama_base_url: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Texts per embedding request
    pub batch_size: usize,

    /// Embedding requests in flight during a build
    pub embed_concurrency: usize,

    /// Default number of results per query
    pub top_k: usize,

    /// Log directory (file logging is off when unset)
    pub log_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("embedding"),
            corpus_path: PathBuf::from("llm_titles.jsonl"),
            ollama_base_url: "http://localhost:11434".to_string(),
            embedding_model: "all-minilm".to_string(),
            batch_size: 64,
            embed_concurrency: 4,
            top_k: 5,
            log_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, TvRecError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();
        let config = Self {
            store_dir: Self::get_env_path("STORE_DIR").unwrap_or(defaults.store_dir),
            corpus_path: Self::get_env_path("CORPUS_PATH").unwrap_or(defaults.corpus_path),
            ollama_base_url: std::env::var("OLLAMA_BASE_URL")
                .unwrap_or(defaults.ollama_base_url),
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            batch_size: Self::get_env_usize("EMBED_BATCH_SIZE")?.unwrap_or(defaults.batch_size),
            embed_concurrency: Self::get_env_usize("EMBED_CONCURRENCY")?
                .unwrap_or(defaults.embed_concurrency),
            top_k: Self::get_env_usize("TOP_K")?.unwrap_or(defaults.top_k),
            log_dir: Self::get_env_path("LOG_DIR"),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        Ok(config)
    }

    /// Get PathBuf from environment variable
    fn get_env_path(key: &str) -> Option<PathBuf> {
        std::env::var(key).ok().map(PathBuf::from)
    }

    /// Get usize from environment variable, rejecting unparsable values
    fn get_env_usize(key: &str) -> Result<Option<usize>, TvRecError> {
        match std::env::var(key) {
            Ok(raw) => raw.trim().parse().map(Some).map_err(|_| {
                TvRecError::config(format!("{} must be a non-negative integer, got '{}'", key, raw))
            }),
            Err(_) => Ok(None),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TvRecError> {
        if self.embedding_model.trim().is_empty() {
            return Err(TvRecError::config("Embedding model name cannot be empty"));
        }

        // Validate Ollama URL
        if !self.ollama_base_url.starts_with("http://")
            && !self.ollama_base_url.starts_with("https://")
        {
            return Err(TvRecError::config(
                "Ollama base URL must start with http:// or https://",
            ));
        }

        if self.batch_size == 0 {
            return Err(TvRecError::config("Embedding batch size cannot be 0"));
        }
        if self.embed_concurrency == 0 {
            return Err(TvRecError::config("Embedding concurrency cannot be 0"));
        }
        if self.top_k == 0 {
            return Err(TvRecError::config("TOP_K cannot be 0"));
        }

        Ok(())
    }
}
