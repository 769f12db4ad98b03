use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AegisError {
    #[error("Consent error: {0}")]
    ConsentError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Plugin error: {0}")]
    PluginError(String),

    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    #[error("Scan failed: {0}")]
    ScanError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File error: {path:?} - {message}")]
    FileError {
        path: PathBuf,
        message: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<anyhow::Error> for AegisError {
    fn from(error: anyhow::Error) -> Self {
        AegisError::UnexpectedError(error.to_string())
    }
}

impl From<reqwest::Error> for AegisError {
    fn from(error: reqwest::Error) -> Self {
        AegisError::NetworkError(error.to_string())
    }
}

impl From<url::ParseError> for AegisError {
    fn from(error: url::ParseError) -> Self {
        AegisError::InvalidInput(error.to_string())
    }
}

impl From<serde_json::Error> for AegisError {
    fn from(error: serde_json::Error) -> Self {
        AegisError::SerializationError(error.to_string())
    }
}

pub type AegisResult<T> = std::result::Result<T, AegisError>;
