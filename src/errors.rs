//! Error types for StoreScout

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreScoutError>;

#[derive(Error, Debug)]
pub enum StoreScoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Parse error ({format}): {message}")]
    Parse { format: String, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Augmenter error: {0}")]
    Augmenter(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Processing timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

impl StoreScoutError {
    /// Format-specific parse failure.
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        StoreScoutError::Parse {
            format: format.into(),
            message: message.into(),
        }
    }
}

impl From<tokio::time::error::Elapsed> for StoreScoutError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        StoreScoutError::Timeout
    }
}
