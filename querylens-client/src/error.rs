use querylens_controller::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid API url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("API request failed: {0}")]
    Http(String),
    #[error("API returned unexpected status {status}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        /// Message from the backend's error body, when it sent one.
        message: Option<String>,
    },
    #[error("failed to decode API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Http(value.to_string())
        }
    }
}

impl From<ClientError> for SourceError {
    fn from(value: ClientError) -> Self {
        match value {
            ClientError::UnexpectedStatus {
                message: Some(message),
                ..
            } => SourceError::Backend(message),
            ClientError::Http(_) | ClientError::InvalidUrl { .. } => {
                SourceError::Transport(value.to_string())
            }
            other => SourceError::Backend(other.to_string()),
        }
    }
}
