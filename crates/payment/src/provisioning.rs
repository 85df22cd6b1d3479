use blockchain::{generate_keypair, Ledger};
use rust_decimal::Decimal;
use shared::{Network, WalletRecord};
use std::sync::Arc;
use storage::WalletStore;
use tracing::{info, warn};

use crate::error::Result;

/// Where the active wallet came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletOrigin {
    /// Loaded from local storage
    Stored,
    /// Created and funded by the ledger backend
    Created,
    /// Generated locally after account creation failed; not on the ledger
    Placeholder { reason: String },
}

impl WalletOrigin {
    pub fn is_degraded(&self) -> bool {
        matches!(self, WalletOrigin::Placeholder { .. })
    }
}

#[derive(Debug, Clone)]
pub struct ProvisionedWallet {
    pub record: WalletRecord,
    pub origin: WalletOrigin,
}

/// Ensures a wallet exists, creating one through the ledger when needed.
///
/// Placeholder substitution is opt-in and always reported through
/// [`WalletOrigin::Placeholder`].
pub struct WalletProvisioner {
    ledger: Arc<dyn Ledger>,
    wallet: Arc<WalletStore>,
    network: Network,
    allow_placeholder: bool,
}

impl WalletProvisioner {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet: Arc<WalletStore>,
        network: Network,
        allow_placeholder: bool,
    ) -> Self {
        Self {
            ledger,
            wallet,
            network,
            allow_placeholder,
        }
    }

    /// Return the stored wallet, or create one.
    ///
    /// A stored unfunded placeholder is replaced once the ledger can create
    /// an account; until then it is reported as a placeholder again.
    pub async fn provision(&self) -> Result<ProvisionedWallet> {
        let Some(record) = self.wallet.current().filter(|_| self.wallet.has_wallet()) else {
            return self.recreate().await;
        };

        if record.network != self.network {
            warn!(
                "Stored wallet belongs to {}, client is configured for {}",
                record.network, self.network
            );
        }

        if record.is_unfunded_placeholder() {
            return self.upgrade_placeholder(record).await;
        }

        Ok(ProvisionedWallet {
            record,
            origin: WalletOrigin::Stored,
        })
    }

    async fn upgrade_placeholder(&self, record: WalletRecord) -> Result<ProvisionedWallet> {
        // Someone may have funded the local key since it was generated
        let balance = self.ledger.get_balance(record.public_key()).await;
        if balance.and_then(|b| b.native()).unwrap_or(Decimal::ZERO) > Decimal::ZERO {
            info!("Placeholder wallet {} has been funded", record.public_key());
            if let Err(e) = self.wallet.mark_funded() {
                warn!("Failed to persist funding status: {}", e);
            }
            return Ok(ProvisionedWallet {
                record: self.wallet.current().unwrap_or(record),
                origin: WalletOrigin::Stored,
            });
        }

        match self.ledger.create_account().await {
            Ok(keypair) => {
                info!(
                    "Replacing placeholder wallet {} with a ledger account",
                    record.public_key()
                );
                let funded = self.network.has_faucet();
                self.store(
                    WalletRecord::new(keypair, funded, self.network),
                    WalletOrigin::Created,
                )
            }
            Err(e) => {
                warn!(
                    "Account creation still failing, keeping placeholder wallet {}: {}",
                    record.public_key(),
                    e
                );
                Ok(ProvisionedWallet {
                    record,
                    origin: WalletOrigin::Placeholder {
                        reason: e.to_string(),
                    },
                })
            }
        }
    }

    /// Create a new wallet, overwriting any stored one
    pub async fn recreate(&self) -> Result<ProvisionedWallet> {
        match self.ledger.create_account().await {
            Ok(keypair) => {
                let funded = self.network.has_faucet();
                self.store(
                    WalletRecord::new(keypair, funded, self.network),
                    WalletOrigin::Created,
                )
            }
            Err(e) if self.allow_placeholder => {
                warn!("Account creation failed, using a local placeholder wallet: {}", e);
                self.store(
                    WalletRecord::placeholder(generate_keypair()?, self.network),
                    WalletOrigin::Placeholder {
                        reason: e.to_string(),
                    },
                )
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, record: WalletRecord, origin: WalletOrigin) -> Result<ProvisionedWallet> {
        if let Err(e) = self.wallet.save(&record) {
            warn!("Failed to persist wallet {}: {}", record.public_key(), e);
        }
        info!("Active wallet {} ({:?})", record.public_key(), origin);

        Ok(ProvisionedWallet { record, origin })
    }

    /// Forget the wallet (logout)
    pub fn reset(&self) -> Result<()> {
        self.wallet.clear()?;
        Ok(())
    }
}
