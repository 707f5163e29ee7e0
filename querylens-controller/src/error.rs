use std::path::PathBuf;

use querylens_core::QueryLensError;
use thiserror::Error;

/// Failure reported by a [`DataSource`](crate::DataSource).
///
/// The display form is the bare message so that the controller's error list
/// reads exactly as the backend phrased it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{0}")]
    Backend(String),
    #[error("{0}")]
    Transport(String),
    #[error("operation not supported by this data source: {0}")]
    Unsupported(String),
}

impl SourceError {
    pub fn backend(message: impl Into<String>) -> Self {
        SourceError::Backend(message.into())
    }
}

impl From<SourceError> for QueryLensError {
    fn from(value: SourceError) -> Self {
        QueryLensError::SourceError(value.to_string())
    }
}

/// Errors raised by the persisted client-local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to access local storage at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode stored value for {key}: {message}")]
    Encode { key: String, message: String },
}

impl StorageError {
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into().display().to_string(),
            source,
        }
    }
}

impl From<StorageError> for QueryLensError {
    fn from(value: StorageError) -> Self {
        QueryLensError::StorageError(value.to_string())
    }
}
