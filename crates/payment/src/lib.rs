pub mod balance;
pub mod error;
pub mod lifecycle;
pub mod parser;
pub mod provisioning;
pub mod uri;
pub mod validation;

pub use balance::{BalanceMonitor, BalanceView};
pub use error::{PaymentError, Result};
pub use lifecycle::{
    ConfirmOutcome, LifecycleEvent, LifecycleSettings, PaymentForm, PaymentLifecycle,
    PaymentState, PaymentSummary,
};
pub use parser::PaymentRequestParser;
pub use provisioning::{ProvisionedWallet, WalletOrigin, WalletProvisioner};
pub use uri::{scan_payload, PaymentUri};
pub use validation::{PaymentLimits, BASE_FEE, MAX_MEMO_BYTES};
