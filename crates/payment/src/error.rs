use blockchain::LedgerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaymentError {
    /// Bad user input; shown to the user, not logged as a failure
    #[error("{0}")]
    Validation(String),

    /// Action attempted without its prerequisite
    #[error("{0}")]
    State(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Local storage or key handling
    #[error("{0}")]
    Local(#[from] shared::Error),
}

impl PaymentError {
    /// Errors the UI renders as status text
    pub fn is_user_facing(&self) -> bool {
        matches!(self, PaymentError::Validation(_) | PaymentError::State(_))
    }
}

pub type Result<T> = std::result::Result<T, PaymentError>;
