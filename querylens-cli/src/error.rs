use querylens_client::ClientError;
use querylens_controller::StorageError;
use querylens_core::{ConfigError, QueryLensError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Core(#[from] QueryLensError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Validation(String),
    /// The controller already reported the failure in its error list.
    #[error("request failed")]
    Reported,
}
