use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::{AppError, AppResult};

pub const DEFAULT_DOCUMENT_PATH: &str = "data/Home_insurance_sample.pdf";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub document: DocumentConfig,
    pub llm: LLMConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub path: PathBuf,
}

#[derive(Clone)]
pub struct LLMConfig {
    pub provider: String,
    pub gemini_api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

// Keeps the API key out of startup logs.
impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub model: String,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub context_chars: usize,
    pub fallback_chars: usize,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
}

impl LLMConfig {
    /// The API key, if one is set and non-blank
    pub fn api_key(&self) -> Option<&str> {
        self.gemini_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let top_k: usize = parse(&lookup, "RAG_TOP_K", 3)?;
        if top_k == 0 {
            return Err(AppError::Config("RAG_TOP_K must be at least 1".to_string()));
        }

        Ok(Self {
            server: ServerConfig {
                port: parse(&lookup, "PORT", 3000)?,
                host: get("HOST", "0.0.0.0"),
                cors_allowed_origins: get("ALLOWED_ORIGINS", "http://localhost:3000")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            document: DocumentConfig {
                path: PathBuf::from(get("POLICY_DOCUMENT_PATH", DEFAULT_DOCUMENT_PATH)),
            },
            llm: LLMConfig {
                provider: get("LLM_PROVIDER", "google"),
                gemini_api_key: lookup("GEMINI_API_KEY"),
                model: get("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
                api_base: get("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE),
            },
            embedding: EmbeddingConfig {
                model: get("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
                cache_dir: lookup("EMBEDDING_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_cache_dir),
            },
            retrieval: RetrievalConfig {
                top_k,
                context_chars: parse(&lookup, "RAG_CONTEXT_CHARS", 3000)?,
                fallback_chars: parse(&lookup, "RAG_FALLBACK_CHARS", 2000)?,
            },
            logging: LoggingConfig {
                log_dir: lookup("LOG_DIR").map(PathBuf::from),
            },
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} has invalid value {:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("policy-rag")
        .join("models")
}
