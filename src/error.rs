use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalystError {
    /// Dataset is empty, has no columns, or is otherwise unusable by the core.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported context profile: {0}")]
    UnsupportedProfile(String),

    #[error("Ingestion error: {0}")]
    Ingestion(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Lexicon error: {0}")]
    Lexicon(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for AnalystError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnalystError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalystError>;
