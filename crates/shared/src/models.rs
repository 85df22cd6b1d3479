use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

use crate::error::Error;

/// Asset code of the ledger's native currency
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Issuer placeholder used for the native asset
pub const NATIVE_ISSUER: &str = "native";

/// Maximum number of fractional digits the ledger accepts for an amount
pub const MAX_FRACTION_DIGITS: u32 = 7;

// Network models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    /// Network passphrase embedded in payment URIs
    pub fn passphrase(&self) -> &'static str {
        match self {
            Network::Testnet => "Test SDF Network ; September 2015",
            Network::Mainnet => "Public Global Stellar Network ; September 2015",
        }
    }

    /// Only the test network has a faucet
    pub fn has_faucet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "testnet" | "test" => Ok(Network::Testnet),
            "mainnet" | "public" | "pubnet" => Ok(Network::Mainnet),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

// Wallet models

/// Public/secret key pair of a ledger account.
///
/// The secret is wiped from memory when the value is dropped and never
/// appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keypair {
    pub public_key: String,
    pub secret_key: String,
}

impl Keypair {
    pub fn new(public_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Both halves are present
    pub fn is_complete(&self) -> bool {
        !self.public_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

impl Drop for Keypair {
    fn drop(&mut self) {
        self.secret_key.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub keypair: Keypair,
    pub created_at: DateTime<Utc>,
    pub is_funded: bool,
    pub network: Network,
    /// Generated locally after account creation failed; unknown to the ledger
    #[serde(default)]
    pub placeholder: bool,
}

impl WalletRecord {
    pub fn new(keypair: Keypair, is_funded: bool, network: Network) -> Self {
        Self {
            keypair,
            created_at: Utc::now(),
            is_funded,
            network,
            placeholder: false,
        }
    }

    pub fn placeholder(keypair: Keypair, network: Network) -> Self {
        Self {
            placeholder: true,
            ..Self::new(keypair, false, network)
        }
    }

    /// A placeholder that has not been funded out of band
    pub fn is_unfunded_placeholder(&self) -> bool {
        self.placeholder && !self.is_funded
    }

    pub fn public_key(&self) -> &str {
        &self.keypair.public_key
    }
}

// Payment models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub recipient_address: String,
    pub asset_code: String,
    /// Issuer account, or `"native"` for the native asset
    pub issuer_public_key: String,
    pub amount: Decimal,
    pub memo: String,
    /// Account ID carried in the side channel of a `publicKey|uri` scan
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanned_key: Option<String>,
    /// Network passphrase named by the payment URI, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_passphrase: Option<String>,
}

impl PaymentRequest {
    /// Native-asset request with no amount or memo set
    pub fn to_address(recipient_address: impl Into<String>) -> Self {
        Self {
            recipient_address: recipient_address.into(),
            asset_code: NATIVE_ASSET_CODE.to_string(),
            issuer_public_key: NATIVE_ISSUER.to_string(),
            amount: Decimal::ZERO,
            memo: String::new(),
            scanned_key: None,
            network_passphrase: None,
        }
    }

    pub fn is_native(&self) -> bool {
        self.issuer_public_key == NATIVE_ISSUER
    }
}

// Balance models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset_code: String,
    pub asset_type: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub account_id: String,
    pub balances: Vec<AssetBalance>,
}

impl BalanceSnapshot {
    /// Balance held in the given asset, if the account holds it
    pub fn amount_of(&self, asset_code: &str) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|b| b.asset_code.eq_ignore_ascii_case(asset_code))
            .map(|b| b.amount)
    }

    pub fn native(&self) -> Option<Decimal> {
        self.balances
            .iter()
            .find(|b| b.asset_type == "native")
            .map(|b| b.amount)
    }
}

// Transaction models

/// Outcome of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    hash: String,
    success: bool,
    error_message: Option<String>,
}

impl TransactionResult {
    pub fn succeeded(hash: impl Into<String>) -> Self {
        let hash = hash.into();
        let success = !hash.is_empty();
        Self {
            error_message: (!success).then(|| "Ledger returned an empty hash".to_string()),
            hash,
            success,
        }
    }

    pub fn failed(error_message: impl Into<String>) -> Self {
        Self {
            hash: String::new(),
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Successful with a non-empty hash
    pub fn is_confirmed(&self) -> bool {
        self.success && !self.hash.is_empty()
    }
}

// Marker models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub blockchain: String,
    #[serde(default, rename = "publicKey")]
    pub public_key: String,
    #[serde(default, rename = "assetCode")]
    pub asset_code: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_str() {
        assert_eq!("testnet".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("PUBLIC".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("devnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_keypair_debug_redacts_secret() {
        let keypair = Keypair::new("GPUBLIC", "SSECRET");
        let debug = format!("{:?}", keypair);
        assert!(debug.contains("GPUBLIC"));
        assert!(!debug.contains("SSECRET"));
    }

    #[test]
    fn test_wallet_record_json_round_trip() {
        let record = WalletRecord::new(Keypair::new("GPUB", "SSEC"), true, Network::Testnet);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"network\":\"testnet\""));
        let back: WalletRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_placeholder_flag_defaults_off_for_older_records() {
        let json = r#"{"keypair":{"public_key":"GPUB","secret_key":"SSEC"},
            "created_at":"2024-01-01T00:00:00Z","is_funded":false,"network":"testnet"}"#;
        let record: WalletRecord = serde_json::from_str(json).unwrap();
        assert!(!record.placeholder);

        let placeholder = WalletRecord::placeholder(Keypair::new("GPUB", "SSEC"), Network::Testnet);
        assert!(placeholder.is_unfunded_placeholder());
        let back: WalletRecord =
            serde_json::from_str(&serde_json::to_string(&placeholder).unwrap()).unwrap();
        assert!(back.placeholder);
    }

    #[test]
    fn test_transaction_result_empty_hash_is_not_confirmed() {
        let result = TransactionResult::succeeded("");
        assert!(!result.is_confirmed());
        assert!(result.error_message().is_some());

        let result = TransactionResult::succeeded("abc123");
        assert!(result.is_confirmed());
        assert_eq!(result.hash(), "abc123");
    }

    #[test]
    fn test_balance_snapshot_lookup() {
        let snapshot = BalanceSnapshot {
            account_id: "GPUB".to_string(),
            balances: vec![
                AssetBalance {
                    asset_code: "XLM".to_string(),
                    asset_type: "native".to_string(),
                    amount: Decimal::new(1005, 1),
                },
                AssetBalance {
                    asset_code: "USDC".to_string(),
                    asset_type: "credit_alphanum4".to_string(),
                    amount: Decimal::new(25, 0),
                },
            ],
        };
        assert_eq!(snapshot.native(), Some(Decimal::new(1005, 1)));
        assert_eq!(snapshot.amount_of("usdc"), Some(Decimal::new(25, 0)));
        assert_eq!(snapshot.amount_of("EURT"), None);
    }

    #[test]
    fn test_marker_deserializes_backend_shape() {
        let json = r#"{"id":"m1","latitude":40.7,"longitude":-74.0,"label":"Cafe",
            "blockchain":"stellar","publicKey":"GPUB","assetCode":"XLM","amount":5}"#;
        let marker: Marker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.public_key, "GPUB");
        assert_eq!(marker.amount, Some(Decimal::new(5, 0)));
    }
}
