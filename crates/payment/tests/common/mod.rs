#![allow(dead_code)]

use async_trait::async_trait;
use blockchain::{Ledger, LedgerError, PaymentSubmission};
use rust_decimal::Decimal;
use shared::{AssetBalance, BalanceSnapshot, Keypair, Network, TransactionResult, WalletRecord};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storage::{MemoryStore, WalletStore};
use tokio::sync::Notify;

pub const SENDER: &str = "GAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQDZ7H";
pub const SENDER_SECRET: &str = "SAAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQC5MY";
pub const RECIPIENT: &str = "GABAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEAQCAIBAEJXA";
pub const CREATED: &str = "GCV2XK5LVOV2XK5LVOV2XK5LVOV2XK5LVOV2XK5LVOV2XK5LVOV2WIHP";
pub const CREATED_SECRET: &str = "SCV2XK5LVOV2XK5LVOV2XK5LVOV2XK5LVOV2XK5LVOV2XK5LVOV2XMUQ";

/// Scriptable in-memory ledger
#[derive(Default)]
pub struct FakeLedger {
    pub account: Mutex<Option<Keypair>>,
    pub balance: Mutex<Option<BalanceSnapshot>>,
    pub submit_result: Mutex<Option<TransactionResult>>,
    /// When set, `submit_payment` waits for a notification before answering
    pub gate: Mutex<Option<Arc<Notify>>>,
    pub submit_calls: AtomicUsize,
    pub balance_calls: AtomicUsize,
    pub last_memo: Mutex<Option<String>>,
}

impl FakeLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_account(self: Arc<Self>, public_key: &str, secret: &str) -> Arc<Self> {
        *self.account.lock().unwrap() = Some(Keypair::new(public_key, secret));
        self
    }

    pub fn with_native_balance(self: Arc<Self>, account_id: &str, amount: Decimal) -> Arc<Self> {
        *self.balance.lock().unwrap() = Some(BalanceSnapshot {
            account_id: account_id.to_string(),
            balances: vec![AssetBalance {
                asset_code: "XLM".to_string(),
                asset_type: "native".to_string(),
                amount,
            }],
        });
        self
    }

    pub fn with_submit_result(self: Arc<Self>, result: TransactionResult) -> Arc<Self> {
        *self.submit_result.lock().unwrap() = Some(result);
        self
    }

    pub fn set_submit_result(&self, result: Option<TransactionResult>) {
        *self.submit_result.lock().unwrap() = result;
    }

    pub fn gated(self: Arc<Self>) -> (Arc<Self>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        (self, gate)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for FakeLedger {
    async fn create_account(&self) -> blockchain::error::Result<Keypair> {
        self.account
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| LedgerError::Network("connection refused".to_string()))
    }

    async fn get_balance(&self, _public_key: &str) -> Option<BalanceSnapshot> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.balance.lock().unwrap().clone()
    }

    async fn submit_payment(&self, payment: PaymentSubmission<'_>) -> Option<TransactionResult> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_memo.lock().unwrap() = Some(payment.memo.to_string());

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.submit_result.lock().unwrap().clone()
    }

    async fn issue_asset(
        &self,
        _issuer_secret: &str,
        _distributor_secret: &str,
        _asset_code: &str,
        _amount: Decimal,
    ) -> Option<TransactionResult> {
        None
    }

    async fn create_trustline(
        &self,
        _secret: &str,
        _asset_code: &str,
        _issuer: &str,
        _limit: Option<Decimal>,
    ) -> Option<TransactionResult> {
        None
    }

    async fn call_contract_method(
        &self,
        _secret: &str,
        _contract_id: &str,
        _method: &str,
        _args: &[serde_json::Value],
    ) -> Option<serde_json::Value> {
        None
    }
}

pub fn empty_wallet() -> Arc<WalletStore> {
    Arc::new(WalletStore::new(Arc::new(MemoryStore::new())))
}

pub fn wallet_with(public_key: &str, secret: &str, funded: bool) -> Arc<WalletStore> {
    let wallet = empty_wallet();
    wallet
        .save(&WalletRecord::new(
            Keypair::new(public_key, secret),
            funded,
            Network::Testnet,
        ))
        .unwrap();
    wallet
}

/// Yield to spawned tasks until `condition` holds
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}
