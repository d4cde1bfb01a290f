//! Error types for Pensum.

use thiserror::Error;

/// Library-level error type for Pensum operations.
#[derive(Error, Debug)]
pub enum PensumError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Course document error: {0}")]
    Document(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM request timed out: {0}")]
    LlmTimeout(String),

    #[error("Query timed out after {0} seconds")]
    Timeout(u64),

    #[error("Tool execution failed: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PensumError {
    /// Whether this error represents an exceeded deadline, either on the
    /// LLM transport or on the overall query.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PensumError::LlmTimeout(_) | PensumError::Timeout(_))
    }
}

/// Result type alias for Pensum operations.
pub type Result<T> = std::result::Result<T, PensumError>;
