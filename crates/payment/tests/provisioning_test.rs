mod common;

use blockchain::Ledger;
use common::*;
use payment::{PaymentError, WalletOrigin, WalletProvisioner};
use rust_decimal::Decimal;
use shared::Network;
use std::sync::Arc;
use storage::{MemoryStore, WalletStore};

fn provisioner(ledger: Arc<FakeLedger>, wallet: Arc<WalletStore>, allow: bool) -> WalletProvisioner {
    let ledger: Arc<dyn Ledger> = ledger;
    WalletProvisioner::new(ledger, wallet, Network::Testnet, allow)
}

#[tokio::test]
async fn test_stored_wallet_is_reused() {
    let wallet = wallet_with(SENDER, SENDER_SECRET, true);
    let provisioner = provisioner(FakeLedger::new().with_account(CREATED, CREATED_SECRET), wallet, false);

    let provisioned = provisioner.provision().await.unwrap();

    assert_eq!(provisioned.origin, WalletOrigin::Stored);
    assert_eq!(provisioned.record.public_key(), SENDER);
}

#[tokio::test]
async fn test_missing_wallet_is_created_and_persisted() {
    let wallet = empty_wallet();
    let provisioner = provisioner(
        FakeLedger::new().with_account(CREATED, CREATED_SECRET),
        wallet.clone(),
        false,
    );

    let provisioned = provisioner.provision().await.unwrap();

    assert_eq!(provisioned.origin, WalletOrigin::Created);
    assert!(provisioned.record.is_funded);
    assert_eq!(wallet.public_key().as_deref(), Some(CREATED));
    assert_eq!(wallet.keypair().unwrap().secret_key, CREATED_SECRET);
}

#[tokio::test]
async fn test_creation_failure_without_placeholder_is_an_error() {
    let wallet = empty_wallet();
    let provisioner = provisioner(FakeLedger::new(), wallet.clone(), false);

    let err = provisioner.provision().await.unwrap_err();

    assert!(matches!(err, PaymentError::Ledger(_)));
    assert!(!wallet.has_wallet());
}

#[tokio::test]
async fn test_creation_failure_with_placeholder_is_reported() {
    let wallet = empty_wallet();
    let provisioner = provisioner(FakeLedger::new(), wallet.clone(), true);

    let provisioned = provisioner.provision().await.unwrap();

    assert!(provisioned.origin.is_degraded());
    match &provisioned.origin {
        WalletOrigin::Placeholder { reason } => assert!(reason.contains("connection refused")),
        other => panic!("Unexpected origin {:?}", other),
    }
    assert!(!provisioned.record.is_funded);
    assert!(blockchain::is_valid_account_id(provisioned.record.public_key()));
    assert!(wallet.has_wallet());
    assert!(wallet.current().unwrap().placeholder);
}

#[tokio::test]
async fn test_placeholder_is_replaced_after_restart() {
    let backend = Arc::new(MemoryStore::new());

    let first = provisioner(FakeLedger::new(), Arc::new(WalletStore::open(backend.clone())), true);
    let placeholder = first.provision().await.unwrap();
    assert!(placeholder.origin.is_degraded());

    // Ledger still down on the next launch
    let second = provisioner(FakeLedger::new(), Arc::new(WalletStore::open(backend.clone())), true);
    let again = second.provision().await.unwrap();
    assert!(matches!(again.origin, WalletOrigin::Placeholder { .. }));
    assert_eq!(again.record.public_key(), placeholder.record.public_key());

    let wallet = Arc::new(WalletStore::open(backend.clone()));
    let third = provisioner(
        FakeLedger::new().with_account(CREATED, CREATED_SECRET),
        wallet.clone(),
        true,
    );
    let created = third.provision().await.unwrap();
    assert_eq!(created.origin, WalletOrigin::Created);
    assert_eq!(created.record.public_key(), CREATED);
    assert!(!created.record.placeholder);

    let reopened = WalletStore::open(backend);
    assert_eq!(reopened.public_key().as_deref(), Some(CREATED));
    assert!(!reopened.current().unwrap().placeholder);
}

#[tokio::test]
async fn test_funded_placeholder_is_kept() {
    let backend = Arc::new(MemoryStore::new());
    let first = provisioner(FakeLedger::new(), Arc::new(WalletStore::open(backend.clone())), true);
    let placeholder = first.provision().await.unwrap();
    let public_key = placeholder.record.public_key().to_string();

    let wallet = Arc::new(WalletStore::open(backend));
    let ledger = FakeLedger::new()
        .with_account(CREATED, CREATED_SECRET)
        .with_native_balance(&public_key, Decimal::from(25));
    let provisioned = provisioner(ledger, wallet.clone(), true).provision().await.unwrap();

    assert_eq!(provisioned.origin, WalletOrigin::Stored);
    assert_eq!(provisioned.record.public_key(), public_key);
    assert!(provisioned.record.is_funded);
    assert!(wallet.current().unwrap().is_funded);
}

#[tokio::test]
async fn test_recreate_replaces_and_reset_clears() {
    let wallet = wallet_with(SENDER, SENDER_SECRET, true);
    let provisioner = provisioner(
        FakeLedger::new().with_account(CREATED, CREATED_SECRET),
        wallet.clone(),
        false,
    );

    provisioner.recreate().await.unwrap();
    assert_eq!(wallet.public_key().as_deref(), Some(CREATED));

    provisioner.reset().unwrap();
    assert!(!wallet.has_wallet());
}
