use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::config::LedgerConfig;
use shared::{BalanceSnapshot, Keypair, TransactionResult};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, Result};
use crate::types::*;

/// Remote ledger operations used by the payment flow.
///
/// Only account creation reports why it failed; every other call collapses
/// failures to `None` so callers can show a neutral "unknown" state.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create_account(&self) -> Result<Keypair>;

    async fn get_balance(&self, public_key: &str) -> Option<BalanceSnapshot>;

    async fn submit_payment(&self, payment: PaymentSubmission<'_>) -> Option<TransactionResult>;

    async fn issue_asset(
        &self,
        issuer_secret: &str,
        distributor_secret: &str,
        asset_code: &str,
        amount: Decimal,
    ) -> Option<TransactionResult>;

    async fn create_trustline(
        &self,
        secret: &str,
        asset_code: &str,
        issuer: &str,
        limit: Option<Decimal>,
    ) -> Option<TransactionResult>;

    async fn call_contract_method(
        &self,
        secret: &str,
        contract_id: &str,
        method: &str,
        args: &[serde_json::Value],
    ) -> Option<serde_json::Value>;
}

/// HTTP client for the ledger backend
pub struct LedgerClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    request_timeout: Duration,
    submit_timeout: Duration,
}

impl LedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self> {
        info!(
            "Initializing ledger client for {} ({})",
            config.api_url, config.network
        );

        let client = Client::builder()
            .timeout(config.submit_timeout().max(config.request_timeout()))
            .build()
            .map_err(|e| LedgerError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            request_timeout: config.request_timeout(),
            submit_timeout: config.submit_timeout(),
        })
    }

    /// One POST exchange. Distinguishes transport, status, empty-body and
    /// decode failures.
    async fn post_json<B, R>(&self, path: &str, body: &B, timeout: Duration) -> Result<R>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).json(body).timeout(timeout);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(LedgerError::Protocol(format!(
                "{} returned status {}: {}",
                path, status, text
            )));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(LedgerError::EmptyResponse(path.to_string()));
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| LedgerError::Protocol(format!("Failed to parse {} response: {}", path, e)))
    }

    async fn submit_transaction<B>(&self, path: &str, body: &B, timeout: Duration) -> Result<TransactionResult>
    where
        B: Serialize + Sync,
    {
        let response: TransactionResponse = self.post_json(path, body, timeout).await?;

        Ok(match (response.hash, response.error) {
            (Some(hash), _) if !hash.is_empty() => {
                debug!("{} accepted in ledger {:?}", path, response.ledger);
                TransactionResult::succeeded(hash)
            }
            (_, Some(error)) => TransactionResult::failed(error),
            _ => TransactionResult::succeeded(""),
        })
    }
}

/// Collapse a failed exchange to `None`, logging it
fn settle<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ledger {} failed: {}", operation, e);
            None
        }
    }
}

#[async_trait]
impl Ledger for LedgerClient {
    async fn create_account(&self) -> Result<Keypair> {
        let response: CreateAccountResponse = self
            .post_json("/create-account", &serde_json::json!({}), self.request_timeout)
            .await?;

        if response.public_key.is_empty() || response.secret.is_empty() {
            return Err(LedgerError::Protocol(
                "create-account response is missing the keypair".to_string(),
            ));
        }

        if let Some(message) = &response.message {
            debug!("create-account: {}", message);
        }
        info!("Created ledger account {}", response.public_key);

        Ok(Keypair::new(response.public_key, response.secret))
    }

    async fn get_balance(&self, public_key: &str) -> Option<BalanceSnapshot> {
        let result: Result<ShowBalanceResponse> = self
            .post_json(
                "/show-balance",
                &ShowBalanceRequest { public_key },
                self.request_timeout,
            )
            .await;

        settle("balance lookup", result).map(BalanceSnapshot::from)
    }

    async fn submit_payment(&self, payment: PaymentSubmission<'_>) -> Option<TransactionResult> {
        info!(
            "Submitting payment of {} {} to {}",
            payment.amount, payment.asset_code, payment.destination
        );

        let body = TransferAssetRequest {
            sender_secret: payment.sender_secret,
            recipient_public_key: payment.destination,
            asset_code: payment.asset_code,
            issuer_public_key: payment.issuer,
            amount: payment.amount.normalize().to_string(),
            memo: payment.memo,
        };

        let result = self
            .submit_transaction("/transfer-asset", &body, self.submit_timeout)
            .await;
        settle("payment submission", result)
    }

    async fn issue_asset(
        &self,
        issuer_secret: &str,
        distributor_secret: &str,
        asset_code: &str,
        amount: Decimal,
    ) -> Option<TransactionResult> {
        let body = IssueAssetRequest {
            issuer_secret,
            distributor_secret,
            asset_code,
            amount: amount.normalize().to_string(),
        };

        let result = self
            .submit_transaction("/issue-asset", &body, self.submit_timeout)
            .await;
        settle("asset issuance", result)
    }

    async fn create_trustline(
        &self,
        secret: &str,
        asset_code: &str,
        issuer: &str,
        limit: Option<Decimal>,
    ) -> Option<TransactionResult> {
        let body = CreateTrustlineRequest {
            secret,
            asset_code,
            issuer_public_key: issuer,
            limit: limit.map(|l| l.normalize().to_string()),
        };

        let result = self
            .submit_transaction("/create-trustline", &body, self.submit_timeout)
            .await;
        settle("trustline creation", result)
    }

    async fn call_contract_method(
        &self,
        secret: &str,
        contract_id: &str,
        method: &str,
        args: &[serde_json::Value],
    ) -> Option<serde_json::Value> {
        let body = CallContractRequest {
            secret,
            contract_id,
            method,
            args,
        };

        let result = self
            .post_json("/call-contract-method", &body, self.submit_timeout)
            .await;
        settle("contract call", result)
    }
}
