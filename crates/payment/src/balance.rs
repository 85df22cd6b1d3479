use blockchain::Ledger;
use rust_decimal::Decimal;
use shared::BalanceSnapshot;
use std::sync::Arc;
use std::time::Duration;
use storage::WalletStore;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Last known balance of the active wallet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BalanceView {
    /// Never fetched, no wallet, or the last fetch failed
    #[default]
    Unknown,
    Known(BalanceSnapshot),
}

impl BalanceView {
    pub fn snapshot(&self) -> Option<&BalanceSnapshot> {
        match self {
            BalanceView::Known(snapshot) => Some(snapshot),
            BalanceView::Unknown => None,
        }
    }

    /// Text for the balance label
    pub fn display(&self) -> String {
        match self.snapshot().and_then(BalanceSnapshot::native) {
            Some(native) => format!("{} XLM", native.normalize()),
            None if self.snapshot().is_some() => "0 XLM".to_string(),
            None => "Balance unavailable".to_string(),
        }
    }
}

/// Keeps the balance of the active wallet current.
///
/// Every refresh replaces the previous view wholesale. Refreshes are not
/// serialized against payment submission, so a stale balance can be shown
/// until the follow-up refresh lands.
pub struct BalanceMonitor {
    ledger: Arc<dyn Ledger>,
    wallet: Arc<WalletStore>,
    view: watch::Sender<BalanceView>,
}

impl BalanceMonitor {
    pub fn new(ledger: Arc<dyn Ledger>, wallet: Arc<WalletStore>) -> Self {
        let (view, _) = watch::channel(BalanceView::Unknown);
        Self {
            ledger,
            wallet,
            view,
        }
    }

    pub fn current(&self) -> BalanceView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BalanceView> {
        self.view.subscribe()
    }

    pub async fn refresh(&self) -> BalanceView {
        let Some(public_key) = self.wallet.public_key().filter(|k| !k.is_empty()) else {
            debug!("No wallet, balance unknown");
            self.view.send_replace(BalanceView::Unknown);
            return BalanceView::Unknown;
        };

        let view = match self.ledger.get_balance(&public_key).await {
            Some(snapshot) => {
                self.reconcile_funding(&snapshot);
                BalanceView::Known(snapshot)
            }
            None => {
                warn!("Balance for {} unavailable", public_key);
                BalanceView::Unknown
            }
        };

        self.view.send_replace(view.clone());
        view
    }

    /// An unfunded wallet with a positive native balance has been funded
    /// out of band
    fn reconcile_funding(&self, snapshot: &BalanceSnapshot) {
        let unfunded = self
            .wallet
            .current()
            .map(|record| !record.is_funded && record.public_key() == snapshot.account_id)
            .unwrap_or(false);

        if unfunded && snapshot.native().unwrap_or(Decimal::ZERO) > Decimal::ZERO {
            info!("Wallet {} is now funded", snapshot.account_id);
            if let Err(e) = self.wallet.mark_funded() {
                warn!("Failed to persist funding status: {}", e);
            }
        }
    }

    /// Refresh on a fixed interval until cancelled
    pub async fn run_polling(&self, interval: Duration, shutdown: CancellationToken) {
        info!("Balance polling every {:?}", interval);
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Balance polling stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.refresh().await;
                }
            }
        }
    }
}
