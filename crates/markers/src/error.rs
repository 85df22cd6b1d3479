use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    #[error("Network error: {0}")]
    Network(String),

    /// Bad status, `success: false`, or an unexpected body
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for MarkerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MarkerError::Protocol(err.to_string())
        } else {
            MarkerError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, MarkerError>;
