use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{AssetBalance, BalanceSnapshot, NATIVE_ASSET_CODE};

/// Payment to build, sign and submit
#[derive(Debug, Clone)]
pub struct PaymentSubmission<'a> {
    pub sender_secret: &'a str,
    pub destination: &'a str,
    pub asset_code: &'a str,
    pub issuer: &'a str,
    pub amount: Decimal,
    pub memo: &'a str,
}

// Wire types for the ledger backend

#[derive(Debug, Deserialize)]
pub struct CreateAccountResponse {
    #[serde(rename = "publicKey", default)]
    pub public_key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShowBalanceRequest<'a> {
    #[serde(rename = "publicKey")]
    pub public_key: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ShowBalanceResponse {
    pub account_id: String,
    #[serde(default)]
    pub balances: Vec<WireBalance>,
}

#[derive(Debug, Deserialize)]
pub struct WireBalance {
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
    pub balance: Decimal,
}

impl From<ShowBalanceResponse> for BalanceSnapshot {
    fn from(response: ShowBalanceResponse) -> Self {
        BalanceSnapshot {
            account_id: response.account_id,
            balances: response
                .balances
                .into_iter()
                .map(|b| AssetBalance {
                    // The native balance carries no asset code
                    asset_code: b
                        .asset_code
                        .unwrap_or_else(|| NATIVE_ASSET_CODE.to_string()),
                    asset_type: b.asset_type,
                    amount: b.balance,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAssetRequest<'a> {
    pub sender_secret: &'a str,
    pub recipient_public_key: &'a str,
    pub asset_code: &'a str,
    pub issuer_public_key: &'a str,
    pub amount: String,
    pub memo: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueAssetRequest<'a> {
    pub issuer_secret: &'a str,
    pub distributor_secret: &'a str,
    pub asset_code: &'a str,
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrustlineRequest<'a> {
    pub secret: &'a str,
    pub asset_code: &'a str,
    pub issuer_public_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallContractRequest<'a> {
    pub secret: &'a str,
    pub contract_id: &'a str,
    pub method: &'a str,
    pub args: &'a [serde_json::Value],
}

/// Response shared by every transaction-submitting endpoint
#[derive(Debug, Deserialize)]
pub struct TransactionResponse {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub ledger: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}
