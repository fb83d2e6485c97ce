//! Settings - environment-driven configuration
//!
//! Values are read from the process environment (after `dotenv::dotenv()` has
//! been called by the binary). Every field has a default so the library can be
//! used without any environment at all.

use crate::error::{AnalystError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_MAX_SAMPLE_SIZE: usize = 100;
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_MIN_QUESTION_LENGTH: usize = 3;
pub const DEFAULT_MAX_QUESTION_LENGTH: usize = 500;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 500;
pub const DEFAULT_MAX_COLUMNS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Upper bound on rows included in the intelligent sample
    pub max_sample_size: usize,

    /// Rows per chunk for chunked analysis
    pub chunk_size: usize,

    pub min_question_length: usize,
    pub max_question_length: usize,

    pub max_file_size_mb: u64,
    pub max_columns: usize,

    /// LLM API key (LLM_API_KEY or OPENAI_API_KEY)
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub request_timeout_seconds: u64,
    pub max_retries: u32,

    pub log_level: String,

    /// Optional lexicon file overriding the built-in one
    pub lexicon_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_sample_size: DEFAULT_MAX_SAMPLE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            min_question_length: DEFAULT_MIN_QUESTION_LENGTH,
            max_question_length: DEFAULT_MAX_QUESTION_LENGTH,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            max_columns: DEFAULT_MAX_COLUMNS,
            llm_api_key: None,
            llm_base_url: "https://api.openai.com/v1".to_string(),
            llm_model: "gpt-4o-mini".to_string(),
            request_timeout_seconds: 30,
            max_retries: 3,
            log_level: "info".to_string(),
            lexicon_path: None,
        }
    }
}

impl Settings {
    /// Load settings from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Settings::default();

        let llm_api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty());

        let settings = Self {
            max_sample_size: env_or("MAX_SAMPLE_SIZE", defaults.max_sample_size)?,
            chunk_size: env_or("CHUNK_SIZE", defaults.chunk_size)?,
            min_question_length: env_or("MIN_QUESTION_LENGTH", defaults.min_question_length)?,
            max_question_length: env_or("MAX_QUESTION_LENGTH", defaults.max_question_length)?,
            max_file_size_mb: env_or("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?,
            max_columns: env_or("MAX_COLUMNS", defaults.max_columns)?,
            llm_api_key,
            llm_base_url: std::env::var("LLM_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            request_timeout_seconds: env_or("REQUEST_TIMEOUT_SECONDS", defaults.request_timeout_seconds)?,
            max_retries: env_or("MAX_RETRIES", defaults.max_retries)?,
            log_level: std::env::var("LOG_LEVEL")
                .map(|l| l.to_lowercase())
                .unwrap_or(defaults.log_level),
            lexicon_path: std::env::var("CSV_ANALYST_LEXICON").ok().map(PathBuf::from),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_sample_size == 0 {
            return Err(AnalystError::Config("max_sample_size must be positive".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(AnalystError::Config("chunk_size must be positive".to_string()));
        }
        if self.max_file_size_mb == 0 {
            return Err(AnalystError::Config("max_file_size_mb must be positive".to_string()));
        }
        if self.min_question_length >= self.max_question_length {
            return Err(AnalystError::Config(
                "min_question_length must be less than max_question_length".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AnalystError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
