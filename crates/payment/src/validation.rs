use blockchain::strkey::is_valid_account_id;
use rust_decimal::Decimal;
use shared::{Network, PaymentRequest, MAX_FRACTION_DIGITS, NATIVE_ASSET_CODE, NATIVE_ISSUER};
use std::str::FromStr;

use crate::error::{PaymentError, Result};

/// Longest text memo the ledger accepts, in bytes
pub const MAX_MEMO_BYTES: usize = 28;

/// Base fee per operation: 100 stroops
pub const BASE_FEE: Decimal = Decimal::from_parts(100, 0, 0, false, 7);

/// Limits applied to user-entered payments
#[derive(Debug, Clone)]
pub struct PaymentLimits {
    pub max_amount: Decimal,
    pub network: Network,
}

impl PaymentLimits {
    /// Parse and check a user-entered amount
    pub fn parse_amount(&self, input: &str) -> Result<Decimal> {
        let input = input.trim();
        if input.is_empty() {
            return Err(invalid("Enter an amount"));
        }

        // Plain decimal notation only
        let well_formed = input
            .strip_prefix('-')
            .unwrap_or(input)
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.');
        if !well_formed || input.matches('.').count() > 1 {
            return Err(invalid(format!("'{}' is not a valid amount", input)));
        }

        let amount = Decimal::from_str(input)
            .map_err(|_| invalid(format!("'{}' is not a valid amount", input)))?;

        self.check_amount(amount)
    }

    pub fn check_amount(&self, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(invalid("Amount must be greater than zero"));
        }
        if amount > self.max_amount {
            return Err(invalid(format!(
                "Amount exceeds the maximum of {}",
                self.max_amount.normalize()
            )));
        }
        if amount.normalize().scale() > MAX_FRACTION_DIGITS {
            return Err(invalid(format!(
                "Amount can have at most {} decimal places",
                MAX_FRACTION_DIGITS
            )));
        }
        Ok(amount)
    }

    /// Everything except the amount: destination, asset, memo, network
    pub fn check_request(&self, request: &PaymentRequest) -> Result<()> {
        if request.recipient_address.is_empty() {
            return Err(invalid("Recipient address is missing"));
        }
        if !is_valid_account_id(&request.recipient_address) {
            return Err(invalid(format!(
                "'{}' is not a valid account address",
                request.recipient_address
            )));
        }

        let native_code = request.asset_code.eq_ignore_ascii_case(NATIVE_ASSET_CODE);
        if request.issuer_public_key == NATIVE_ISSUER && !native_code {
            return Err(invalid(format!(
                "Asset {} needs an issuer",
                request.asset_code
            )));
        }
        if request.issuer_public_key != NATIVE_ISSUER
            && !is_valid_account_id(&request.issuer_public_key)
        {
            return Err(invalid("Asset issuer is not a valid account address"));
        }

        if request.memo.len() > MAX_MEMO_BYTES {
            return Err(invalid(format!(
                "Memo can be at most {} bytes",
                MAX_MEMO_BYTES
            )));
        }

        if let Some(passphrase) = &request.network_passphrase {
            if passphrase != self.network.passphrase() {
                return Err(invalid(format!(
                    "Payment request is for a different network than {}",
                    self.network
                )));
            }
        }

        Ok(())
    }

    /// Full check of a request about to be confirmed
    pub fn validate(&self, request: &PaymentRequest) -> Result<()> {
        self.check_request(request)?;
        self.check_amount(request.amount)?;
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> PaymentError {
    PaymentError::Validation(message.into())
}
