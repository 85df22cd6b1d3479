use anyhow::Result;
use app::{logging, Console};
use blockchain::{Ledger, LedgerClient};
use markers::{BoundingBox, MarkerClient, MarkerDiff, MarkerSource, MarkerSyncLoop};
use payment::{
    BalanceMonitor, LifecycleEvent, LifecycleSettings, PaymentLifecycle, WalletProvisioner,
};
use shared::config::Config;
use std::sync::Arc;
use std::time::Duration;
use storage::{FileStore, WalletStore};
use tokio::io::BufReader;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const MARKER_DIFF_BUFFER: usize = 32;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;
    logging::init(&config.logging);
    info!("Starting Stellar payment client on {}", config.ledger.network);

    let ledger: Arc<dyn Ledger> = Arc::new(LedgerClient::new(&config.ledger)?);
    info!("Ledger client initialized for {}", config.ledger.api_url);

    let wallet = Arc::new(WalletStore::open(Arc::new(FileStore::new(
        &config.wallet.store_dir,
    ))));
    info!("Wallet store opened at {}", config.wallet.store_dir.display());

    let provisioner = Arc::new(WalletProvisioner::new(
        ledger.clone(),
        wallet.clone(),
        config.ledger.network,
        config.wallet.allow_placeholder_wallet,
    ));
    let provisioned = provisioner.provision().await?;
    if let payment::WalletOrigin::Placeholder { reason } = &provisioned.origin {
        warn!(
            "Running with an unfunded local wallet {}: {}",
            provisioned.record.public_key(),
            reason
        );
    }

    let shutdown = CancellationToken::new();

    let balance = Arc::new(BalanceMonitor::new(ledger.clone(), wallet.clone()));
    {
        let balance = balance.clone();
        let shutdown = shutdown.clone();
        let interval = Duration::from_secs(config.payment.balance_poll_interval_secs);
        tokio::spawn(async move { balance.run_polling(interval, shutdown).await });
    }
    info!("Balance monitor started");

    let marker_source: Arc<dyn MarkerSource> = Arc::new(MarkerClient::new(&config.markers)?);
    let (viewport_tx, viewport_rx) = watch::channel(BoundingBox::world());
    let (diff_tx, diff_rx) = mpsc::channel(MARKER_DIFF_BUFFER);
    tokio::spawn(MarkerSyncLoop::new(marker_source).run(
        config.markers.poll_interval(),
        viewport_rx,
        diff_tx,
        shutdown.clone(),
    ));
    tokio::spawn(report_marker_diffs(diff_rx));
    info!("Marker sync started against {}", config.markers.api_url);

    let lifecycle = Arc::new(PaymentLifecycle::new(
        ledger.clone(),
        wallet.clone(),
        balance.clone(),
        LifecycleSettings {
            max_amount: config.payment.max_amount,
            network: config.ledger.network,
            submit_timeout: config.ledger.submit_timeout(),
            dismiss_after: Duration::from_secs(config.payment.success_dismiss_secs),
        },
    ));
    tokio::spawn(report_lifecycle_events(lifecycle.subscribe()));

    let console = Console::new(
        lifecycle,
        balance,
        wallet,
        provisioner,
        viewport_tx,
        config.ledger.network,
    );
    console.run(BufReader::new(tokio::io::stdin())).await?;

    shutdown.cancel();
    info!("Stellar payment client stopped");
    Ok(())
}

async fn report_marker_diffs(mut diffs: mpsc::Receiver<MarkerDiff>) {
    while let Some(diff) = diffs.recv().await {
        for marker in &diff.added {
            println!("+ marker {} {} ({:.4}, {:.4})", marker.id, marker.label, marker.latitude, marker.longitude);
        }
        for marker in &diff.updated {
            println!("~ marker {} {}", marker.id, marker.label);
        }
        for id in &diff.removed {
            println!("- marker {}", id);
        }
    }
}

async fn report_lifecycle_events(mut events: broadcast::Receiver<LifecycleEvent>) {
    loop {
        match events.recv().await {
            Ok(LifecycleEvent::BalanceUpdated(text)) => println!("Balance: {}", text),
            Ok(LifecycleEvent::StateChanged(state)) => info!("Payment state: {}", state.name()),
            Ok(LifecycleEvent::Status(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Dropped {} payment events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
