pub mod client;
pub mod error;
pub mod strkey;
pub mod types;

pub use client::{Ledger, LedgerClient};
pub use error::LedgerError;
pub use strkey::{generate_keypair, is_valid_account_id};
pub use types::*;
