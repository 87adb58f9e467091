//! Typed snapshot of the runtime environment.
//!
//! Every variable the backend reads lives here, with its default. Call
//! [`Settings::from_env`] once after [`crate::load_and_apply`] and pass the
//! snapshot down; nothing else in the workspace reads `std::env` at runtime.

use serde::{Deserialize, Serialize};

/// Runtime settings for the Shopmind backend.
///
/// Numeric variables that fail to parse fall back to the default with a
/// warning rather than aborting startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// API key for the OpenAI-compatible endpoint (`OPENAI_API_KEY`).
    pub openai_api_key: Option<String>,
    /// Chat model name (`OPENAI_MODEL`, default `gpt-4o-mini`).
    pub openai_model: String,
    /// Embedding model name (`EMBEDDING_MODEL`, default `text-embedding-3-small`).
    pub embedding_model: String,
    /// Embedding vector dimension (`EMBEDDING_DIMENSION`, default 1536).
    pub embedding_dimension: usize,
    /// Redis connection URL for the remote cache backend (`REDIS_URL`).
    pub redis_url: Option<String>,
    /// Default cache TTL in seconds (`CACHE_TTL_SECONDS`, default 3600).
    pub cache_ttl_seconds: u64,
    /// Session history TTL in seconds (`SESSION_TTL_SECONDS`, default 1800).
    pub session_ttl_seconds: u64,
    /// Wall-clock bound for one chat turn (`AGENT_TIMEOUT_SECONDS`, default 30).
    pub agent_timeout_seconds: u64,
    /// Retry budget advertised to HTTP clients (`AGENT_MAX_RETRIES`, default 3).
    pub agent_max_retries: u32,
    /// Directory for the policy index snapshot (`VECTOR_STORE_PATH`,
    /// default `./vector_store`).
    pub vector_store_path: String,
    /// Listen host (`API_HOST`, default `127.0.0.1`).
    pub api_host: String,
    /// Listen port (`API_PORT`, default 8000).
    pub api_port: u16,
    /// Comma-separated allowed CORS origins (`CORS_ORIGINS`, default empty).
    pub cors_origins: Vec<String>,
    /// Log filter (`LOG_LEVEL`, default `info`).
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimension: 1536,
            redis_url: None,
            cache_ttl_seconds: 3600,
            session_ttl_seconds: 1800,
            agent_timeout_seconds: 30,
            agent_max_retries: 3,
            vector_store_path: "./vector_store".to_string(),
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
            cors_origins: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(env_var = key, value = %raw, "invalid value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

impl Settings {
    /// Reads the full snapshot from the process environment.
    pub fn from_env() -> Self {
        let d = Settings::default();
        Self {
            openai_api_key: env_string("OPENAI_API_KEY"),
            openai_model: env_string("OPENAI_MODEL").unwrap_or(d.openai_model),
            embedding_model: env_string("EMBEDDING_MODEL").unwrap_or(d.embedding_model),
            embedding_dimension: env_parsed("EMBEDDING_DIMENSION", d.embedding_dimension),
            redis_url: env_string("REDIS_URL"),
            cache_ttl_seconds: env_parsed("CACHE_TTL_SECONDS", d.cache_ttl_seconds),
            session_ttl_seconds: env_parsed("SESSION_TTL_SECONDS", d.session_ttl_seconds),
            agent_timeout_seconds: env_parsed("AGENT_TIMEOUT_SECONDS", d.agent_timeout_seconds),
            agent_max_retries: env_parsed("AGENT_MAX_RETRIES", d.agent_max_retries),
            vector_store_path: env_string("VECTOR_STORE_PATH").unwrap_or(d.vector_store_path),
            api_host: env_string("API_HOST").unwrap_or(d.api_host),
            api_port: env_parsed("API_PORT", d.api_port),
            cors_origins: env_string("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            log_level: env_string("LOG_LEVEL").unwrap_or(d.log_level),
        }
    }

    /// `host:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}
