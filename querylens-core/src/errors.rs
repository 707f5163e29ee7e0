use std::io;

use thiserror::Error;

/// Result type used across the QueryLens core crate.
pub type Result<T> = std::result::Result<T, QueryLensError>;

/// Canonical error representation shared by all QueryLens crates.
#[derive(Debug, Error)]
pub enum QueryLensError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("deserialization error: {0}")]
    DeserializationError(String),

    #[error("local storage error: {0}")]
    StorageError(String),

    #[error("data source error: {0}")]
    SourceError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("general error: {0}")]
    GeneralError(String),
}

impl From<serde_json::Error> for QueryLensError {
    fn from(err: serde_json::Error) -> Self {
        QueryLensError::DeserializationError(err.to_string())
    }
}

impl From<anyhow::Error> for QueryLensError {
    fn from(err: anyhow::Error) -> Self {
        QueryLensError::GeneralError(err.to_string())
    }
}

/// Dedicated configuration error used by the configuration module.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {key}: {value}")]
    InvalidEnvVar { key: String, value: String },

    #[error("unable to determine a local storage directory")]
    NoStorageDir,
}

impl From<ConfigError> for QueryLensError {
    fn from(value: ConfigError) -> Self {
        QueryLensError::ConfigError(value.to_string())
    }
}
