use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;
use crate::models::Network;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub markers: MarkerConfig,
    pub wallet: WalletConfig,
    pub payment: PaymentConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub network: Network,
    /// Timeout for account, balance and asset calls
    pub request_timeout_secs: u64,
    /// Timeout for payment submission
    pub submit_timeout_secs: u64,
}

impl LedgerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkerConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
}

impl MarkerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    pub store_dir: PathBuf,
    /// Substitute an unfunded local keypair when account creation fails
    pub allow_placeholder_wallet: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub max_amount: Decimal,
    pub success_dismiss_secs: u64,
    pub balance_poll_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of the pretty formatter
    pub json: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an explicit variable map
    pub fn from_map(vars: &HashMap<String, String>) -> anyhow::Result<Self> {
        Self::from_vars(|key| vars.get(key).cloned())
    }

    fn from_vars<F>(var: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        // Zero is not a valid interval or timeout
        let secs = |key: &str, default: &str| -> anyhow::Result<u64> {
            match or(key, default).parse::<u64>()? {
                0 => Err(Error::Config(format!("{} must be greater than zero", key)).into()),
                value => Ok(value),
            }
        };

        let network: Network = or("STELLAR_NETWORK", "testnet").parse()?;
        let api_token = var("LEDGER_API_TOKEN").filter(|t| !t.is_empty());
        let request_timeout_secs = secs("REQUEST_TIMEOUT_SECS", "10")?;

        Ok(Config {
            ledger: LedgerConfig {
                api_url: or("LEDGER_API_URL", "http://localhost:3000"),
                api_token: api_token.clone(),
                network,
                request_timeout_secs,
                submit_timeout_secs: secs("SUBMIT_TIMEOUT_SECS", "30")?,
            },
            markers: MarkerConfig {
                api_url: or("MARKER_API_URL", "http://localhost:5000"),
                // The marker service shares the ledger token unless given its own
                api_token: var("MARKER_API_TOKEN")
                    .filter(|t| !t.is_empty())
                    .or(api_token),
                request_timeout_secs,
                poll_interval_secs: secs("MARKER_POLL_INTERVAL_SECS", "15")?,
            },
            wallet: WalletConfig {
                store_dir: PathBuf::from(or("WALLET_STORE_DIR", "./wallet")),
                allow_placeholder_wallet: match var("ALLOW_PLACEHOLDER_WALLET") {
                    Some(value) => value.parse()?,
                    None => network.has_faucet(),
                },
            },
            payment: PaymentConfig {
                max_amount: or("MAX_PAYMENT_AMOUNT", "10000").parse()?,
                success_dismiss_secs: or("SUCCESS_DISMISS_SECS", "3").parse()?,
                balance_poll_interval_secs: secs("BALANCE_POLL_INTERVAL_SECS", "30")?,
            },
            logging: LoggingConfig {
                json: or("LOG_FORMAT", "pretty").eq_ignore_ascii_case("json"),
            },
        })
    }
}
