use thiserror::Error;

/// Failures of a single exchange with the ledger backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Transport failure, including timeouts
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx status or a body that does not match the expected shape
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LedgerError::Network(format!("request timed out: {}", err))
        } else if err.is_decode() {
            LedgerError::Protocol(err.to_string())
        } else {
            LedgerError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
