use shared::{Keypair, Result, WalletRecord};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

use crate::backend::KeyValueStore;

/// Key the wallet blob is persisted under
pub const WALLET_KEY: &str = "stellar_wallet";

/// Holds the active wallet and keeps it in sync with durable storage.
///
/// Only one wallet is active per client instance; the last write wins.
pub struct WalletStore {
    backend: Arc<dyn KeyValueStore>,
    current: RwLock<Option<WalletRecord>>,
}

impl WalletStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            current: RwLock::new(None),
        }
    }

    /// Create the store and load any persisted wallet
    pub fn open(backend: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(backend);
        store.load();
        store
    }

    /// Read the persisted record. Missing or unreadable data yields `None`;
    /// a corrupt entry is deleted.
    pub fn load(&self) -> Option<WalletRecord> {
        let raw = match self.backend.get(WALLET_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No persisted wallet found");
                self.set_current(None);
                return None;
            }
            Err(e) => {
                warn!("Failed to read persisted wallet: {}", e);
                self.set_current(None);
                return None;
            }
        };

        match serde_json::from_str::<WalletRecord>(&raw) {
            Ok(record) => {
                info!(
                    "Loaded {} wallet {} (funded: {})",
                    record.network,
                    record.public_key(),
                    record.is_funded
                );
                self.set_current(Some(record.clone()));
                Some(record)
            }
            Err(e) => {
                warn!("Persisted wallet is corrupt, clearing it: {}", e);
                if let Err(e) = self.backend.remove(WALLET_KEY) {
                    warn!("Failed to clear corrupt wallet entry: {}", e);
                }
                self.set_current(None);
                None
            }
        }
    }

    /// Persist `record`, replacing any previous wallet, then read it back.
    ///
    /// The in-memory record is updated even when the write fails. A
    /// read-back mismatch is logged and not reported to the caller.
    pub fn save(&self, record: &WalletRecord) -> Result<()> {
        self.set_current(Some(record.clone()));

        let json = serde_json::to_string(record)?;
        self.backend.set(WALLET_KEY, &json)?;

        match self.backend.get(WALLET_KEY) {
            Ok(Some(stored)) if stored == json => {
                debug!("Wallet {} persisted", record.public_key());
            }
            Ok(_) => warn!(
                "Wallet {} read back differently than written",
                record.public_key()
            ),
            Err(e) => warn!("Failed to verify persisted wallet: {}", e),
        }

        Ok(())
    }

    /// Delete the persisted wallet and forget the in-memory one
    pub fn clear(&self) -> Result<()> {
        self.set_current(None);
        self.backend.remove(WALLET_KEY)?;
        info!("Wallet cleared");
        Ok(())
    }

    pub fn has_wallet(&self) -> bool {
        self.read_current(|record| {
            record
                .map(|r| !r.keypair.public_key.is_empty())
                .unwrap_or(false)
        })
    }

    pub fn current(&self) -> Option<WalletRecord> {
        self.read_current(|record| record.cloned())
    }

    /// Keypair of the active wallet, only if the secret is present
    pub fn keypair(&self) -> Option<Keypair> {
        self.read_current(|record| {
            record
                .filter(|r| r.keypair.is_complete())
                .map(|r| r.keypair.clone())
        })
    }

    pub fn public_key(&self) -> Option<String> {
        self.read_current(|record| record.map(|r| r.keypair.public_key.clone()))
    }

    /// Record that the account is now funded on the ledger
    pub fn mark_funded(&self) -> Result<()> {
        match self.current() {
            Some(mut record) if !record.is_funded => {
                record.is_funded = true;
                self.save(&record)
            }
            _ => Ok(()),
        }
    }

    fn read_current<T>(&self, f: impl FnOnce(Option<&WalletRecord>) -> T) -> T {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        f(guard.as_ref())
    }

    fn set_current(&self, record: Option<WalletRecord>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = record;
    }
}
