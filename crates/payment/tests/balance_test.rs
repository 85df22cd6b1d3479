mod common;

use blockchain::Ledger;
use common::*;
use payment::{BalanceMonitor, BalanceView};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use storage::WalletStore;
use tokio_util::sync::CancellationToken;

fn monitor(ledger: Arc<FakeLedger>, wallet: Arc<WalletStore>) -> BalanceMonitor {
    let ledger: Arc<dyn Ledger> = ledger;
    BalanceMonitor::new(ledger, wallet)
}

#[tokio::test]
async fn test_no_wallet_means_unknown_without_a_request() {
    let ledger = FakeLedger::new().with_native_balance(SENDER, Decimal::from(5));
    let monitor = monitor(ledger.clone(), empty_wallet());

    assert_eq!(monitor.refresh().await, BalanceView::Unknown);
    assert_eq!(ledger.balance_calls(), 0);
}

#[tokio::test]
async fn test_failed_fetch_shows_unavailable() {
    let monitor = monitor(FakeLedger::new(), wallet_with(SENDER, SENDER_SECRET, true));

    let view = monitor.refresh().await;

    assert_eq!(view.display(), "Balance unavailable");
}

#[tokio::test]
async fn test_refresh_replaces_previous_view() {
    let ledger = FakeLedger::new().with_native_balance(SENDER, Decimal::from(100));
    let monitor = monitor(ledger.clone(), wallet_with(SENDER, SENDER_SECRET, true));
    let mut updates = monitor.subscribe();

    assert_eq!(monitor.refresh().await.display(), "100 XLM");
    assert!(updates.has_changed().unwrap());
    assert_eq!(updates.borrow_and_update().display(), "100 XLM");

    *ledger.balance.lock().unwrap() = None;
    monitor.refresh().await;
    assert_eq!(monitor.current(), BalanceView::Unknown);
}

#[tokio::test]
async fn test_positive_balance_marks_wallet_funded() {
    let wallet = wallet_with(SENDER, SENDER_SECRET, false);
    let ledger = FakeLedger::new().with_native_balance(SENDER, Decimal::new(25, 1));
    let monitor = monitor(ledger, wallet.clone());

    monitor.refresh().await;

    assert!(wallet.current().unwrap().is_funded);
}

#[tokio::test]
async fn test_zero_balance_leaves_wallet_unfunded() {
    let wallet = wallet_with(SENDER, SENDER_SECRET, false);
    let monitor = monitor(FakeLedger::new().with_native_balance(SENDER, Decimal::ZERO), wallet.clone());

    monitor.refresh().await;

    assert!(!wallet.current().unwrap().is_funded);
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_on_cancel() {
    let ledger = FakeLedger::new().with_native_balance(SENDER, Decimal::from(1));
    let monitor = Arc::new(monitor(ledger.clone(), wallet_with(SENDER, SENDER_SECRET, true)));
    let shutdown = CancellationToken::new();

    let task = {
        let monitor = monitor.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { monitor.run_polling(Duration::from_secs(30), shutdown).await })
    };

    tokio::time::sleep(Duration::from_secs(65)).await;
    shutdown.cancel();
    task.await.unwrap();

    // Immediate first tick plus two intervals
    assert_eq!(ledger.balance_calls(), 3);
}
