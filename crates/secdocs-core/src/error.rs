//! Error types for secdocs

use thiserror::Error;

/// Result type alias using SecDocsError
pub type Result<T> = std::result::Result<T, SecDocsError>;

/// Error type alias for convenience
pub type Error = SecDocsError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
    pub const TIMEOUT: i32 = 4;
}

/// Main error type for secdocs
#[derive(Debug, Error)]
pub enum SecDocsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Knowledge base not found: {0}")]
    SourceNotFound(String),

    #[error("No parser registered under '{0}'")]
    ParserNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Answer synthesis failed: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Query timed out after {0} seconds")]
    Timeout(u64),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl SecDocsError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::SourceNotFound(_) | Self::ParserNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidInput(_) | Self::Config(_) => exit_codes::INVALID_INPUT,
            Self::Timeout(_) => exit_codes::TIMEOUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            SecDocsError::SourceNotFound("CWE".into()).exit_code(),
            exit_codes::NOT_FOUND
        );
        assert_eq!(
            SecDocsError::Config("bad".into()).exit_code(),
            exit_codes::INVALID_INPUT
        );
        assert_eq!(SecDocsError::Timeout(30).exit_code(), exit_codes::TIMEOUT);
        assert_eq!(
            SecDocsError::Synthesis("down".into()).exit_code(),
            exit_codes::GENERAL_ERROR
        );
    }
}
