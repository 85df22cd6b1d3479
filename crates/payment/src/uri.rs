use rust_decimal::Decimal;
use shared::{Network, NATIVE_ASSET_CODE};
use std::fmt;

use crate::parser::{SIDE_CHANNEL_DELIMITER, URI_SCHEME};

/// Payment request URI handed out as a QR payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUri {
    pub destination: String,
    pub amount: Option<Decimal>,
    pub asset_code: String,
    pub asset_issuer: Option<String>,
    pub network: Option<Network>,
    pub msg: Option<String>,
}

impl PaymentUri {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            amount: None,
            asset_code: NATIVE_ASSET_CODE.to_string(),
            asset_issuer: None,
            network: None,
            msg: None,
        }
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn asset(mut self, code: impl Into<String>, issuer: impl Into<String>) -> Self {
        self.asset_code = code.into();
        self.asset_issuer = Some(issuer.into());
        self
    }

    pub fn network(mut self, network: Network) -> Self {
        self.network = Some(network);
        self
    }

    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }
}

impl fmt::Display for PaymentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}pay?destination={}",
            URI_SCHEME,
            urlencoding::encode(&self.destination)
        )?;
        if let Some(amount) = self.amount {
            write!(f, "&amount={}", amount.normalize())?;
        }
        write!(f, "&asset_code={}", urlencoding::encode(&self.asset_code))?;
        if let Some(issuer) = &self.asset_issuer {
            write!(f, "&asset_issuer={}", urlencoding::encode(issuer))?;
        }
        if let Some(network) = self.network {
            write!(f, "&network={}", urlencoding::encode(network.passphrase()))?;
        }
        if let Some(msg) = &self.msg {
            write!(f, "&msg={}", urlencoding::encode(msg))?;
        }
        Ok(())
    }
}

/// Combined QR payload: `<publicKey>|<uri>`
pub fn scan_payload(public_key: &str, uri: &PaymentUri) -> String {
    format!("{}{}{}", public_key, SIDE_CHANNEL_DELIMITER, uri)
}
