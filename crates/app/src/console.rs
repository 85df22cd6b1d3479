// Line-oriented driver for the payment flow

use markers::BoundingBox;
use payment::{
    scan_payload, BalanceMonitor, ConfirmOutcome, PaymentLifecycle, PaymentUri, WalletProvisioner,
};
use rust_decimal::Decimal;
use shared::Network;
use std::str::FromStr;
use std::sync::Arc;
use storage::WalletStore;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::debug;

const DEFAULT_VIEW_SPAN: f64 = 10.0;

const HELP: &str = "\
Commands:
  scan <payload>           start a payment from scanned text or a payment URI
  amount <n> [memo...]     enter the amount and optional memo
  confirm                  submit the payment
  cancel                   abandon the current payment
  balance                  refresh and show the wallet balance
  wallet                   show the active wallet
  uri [amount] [msg...]    print a payment request for this wallet
  view <lat> <lon> [span]  move the map viewport
  reset                    replace the wallet with a new account
  help                     show this text
  quit                     exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Scan(String),
    Amount { amount: String, memo: String },
    Confirm,
    Cancel,
    Balance,
    Wallet,
    Uri { amount: Option<Decimal>, msg: Option<String> },
    View { latitude: f64, longitude: f64, span: f64 },
    Reset,
    Help,
    Quit,
}

impl Command {
    /// `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match name.to_ascii_lowercase().as_str() {
            "scan" if !rest.is_empty() => Command::Scan(rest.to_string()),
            "scan" => return Err("Usage: scan <payload>".to_string()),
            "amount" => {
                let (amount, memo) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                if amount.is_empty() {
                    return Err("Usage: amount <n> [memo...]".to_string());
                }
                Command::Amount {
                    amount: amount.to_string(),
                    memo: memo.trim().to_string(),
                }
            }
            "confirm" => Command::Confirm,
            "cancel" => Command::Cancel,
            "balance" => Command::Balance,
            "wallet" => Command::Wallet,
            "uri" => {
                let (first, msg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                let amount = match first {
                    "" => None,
                    text => Some(
                        Decimal::from_str(text).map_err(|_| format!("'{}' is not an amount", text))?,
                    ),
                };
                Command::Uri {
                    amount,
                    msg: Some(msg.trim().to_string()).filter(|m| !m.is_empty()),
                }
            }
            "view" => {
                let numbers = rest
                    .split_whitespace()
                    .map(f64::from_str)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| "Usage: view <lat> <lon> [span]".to_string())?;
                match numbers.as_slice() {
                    [latitude, longitude] => Command::View {
                        latitude: *latitude,
                        longitude: *longitude,
                        span: DEFAULT_VIEW_SPAN,
                    },
                    [latitude, longitude, span] if *span > 0.0 => Command::View {
                        latitude: *latitude,
                        longitude: *longitude,
                        span: *span,
                    },
                    _ => return Err("Usage: view <lat> <lon> [span]".to_string()),
                }
            }
            "reset" => Command::Reset,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{}'. Type help.", other)),
        };

        Ok(Some(command))
    }
}

pub struct Console {
    lifecycle: Arc<PaymentLifecycle>,
    balance: Arc<BalanceMonitor>,
    wallet: Arc<WalletStore>,
    provisioner: Arc<WalletProvisioner>,
    viewport: watch::Sender<BoundingBox>,
    network: Network,
}

impl Console {
    pub fn new(
        lifecycle: Arc<PaymentLifecycle>,
        balance: Arc<BalanceMonitor>,
        wallet: Arc<WalletStore>,
        provisioner: Arc<WalletProvisioner>,
        viewport: watch::Sender<BoundingBox>,
        network: Network,
    ) -> Self {
        Self {
            lifecycle,
            balance,
            wallet,
            provisioner,
            viewport,
            network,
        }
    }

    /// Read commands until `quit` or end of input
    pub async fn run<R>(&self, input: R) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        println!("{}", HELP);
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            let reply = match Command::parse(&line) {
                Ok(None) => continue,
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Err(usage) => usage,
            };
            println!("{}", reply);
        }

        Ok(())
    }

    /// Run one command and return the text to show
    pub async fn execute(&self, command: Command) -> String {
        debug!("Console command {:?}", command);

        match command {
            Command::Scan(payload) => match self.lifecycle.begin(&payload).await {
                Ok(form) => {
                    let mut reply = format!("Pay {} in {}", form.recipient, form.asset_code);
                    if let Some(amount) = form.suggested_amount {
                        reply.push_str(&format!("\nRequested amount: {}", amount.normalize()));
                    }
                    if let Some(memo) = form.suggested_memo {
                        reply.push_str(&format!("\nRequested memo: {}", memo));
                    }
                    reply
                }
                Err(e) => e.to_string(),
            },
            Command::Amount { amount, memo } => {
                match self.lifecycle.enter_amount(&amount, &memo).await {
                    Ok(summary) => format!(
                        "From:   {}\nTo:     {}\nAmount: {} {}\nMemo:   {}\nFee:    {} XLM\nType confirm to send",
                        summary.sender.as_deref().unwrap_or("(no wallet)"),
                        summary.recipient,
                        summary.amount.normalize(),
                        summary.asset_code,
                        if summary.memo.is_empty() { "-" } else { summary.memo.as_str() },
                        summary.fee_estimate.normalize(),
                    ),
                    Err(e) => e.to_string(),
                }
            }
            Command::Confirm => {
                if self.lifecycle.is_processing() {
                    return describe_outcome(Ok(ConfirmOutcome::AlreadyProcessing));
                }
                // Submission runs in the background so cancel stays available
                let lifecycle = self.lifecycle.clone();
                tokio::spawn(async move {
                    println!("{}", describe_outcome(lifecycle.confirm().await));
                });
                "Sending payment...".to_string()
            }
            Command::Cancel => {
                self.lifecycle.cancel().await;
                "Payment cancelled".to_string()
            }
            Command::Balance => self.balance.refresh().await.display(),
            Command::Wallet => match self.wallet.current() {
                Some(record) => format!(
                    "{} on {} ({})",
                    record.public_key(),
                    record.network,
                    if record.is_funded { "funded" } else { "not funded" }
                ),
                None => "No wallet".to_string(),
            },
            Command::Uri { amount, msg } => match self.wallet.public_key() {
                Some(public_key) => {
                    let mut uri = PaymentUri::new(public_key.clone()).network(self.network);
                    if let Some(amount) = amount {
                        uri = uri.amount(amount);
                    }
                    if let Some(msg) = msg {
                        uri = uri.msg(msg);
                    }
                    scan_payload(&public_key, &uri)
                }
                None => "No wallet".to_string(),
            },
            Command::View {
                latitude,
                longitude,
                span,
            } => {
                let bbox = BoundingBox::centered(latitude, longitude, span, span);
                self.viewport.send_replace(bbox);
                format!(
                    "Viewport {:.3},{:.3} to {:.3},{:.3}",
                    bbox.south, bbox.west, bbox.north, bbox.east
                )
            }
            Command::Reset => {
                self.lifecycle.cancel().await;
                match self.provisioner.recreate().await {
                    Ok(provisioned) if provisioned.origin.is_degraded() => format!(
                        "New local wallet {} (not on the ledger yet)",
                        provisioned.record.public_key()
                    ),
                    Ok(provisioned) => format!("New wallet {}", provisioned.record.public_key()),
                    Err(e) => format!("Could not create a wallet: {}", e),
                }
            }
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
        }
    }
}

fn describe_outcome(outcome: payment::Result<ConfirmOutcome>) -> String {
    match outcome {
        Ok(ConfirmOutcome::Succeeded { result, .. }) => {
            format!("Payment sent. Transaction {}", result.hash())
        }
        Ok(ConfirmOutcome::Failed { error }) => {
            format!("{}\nType confirm to retry or cancel", error)
        }
        Ok(ConfirmOutcome::AlreadyProcessing) => "Payment already in progress".to_string(),
        Ok(ConfirmOutcome::Discarded) => "Payment was cancelled".to_string(),
        Err(e) => e.to_string(),
    }
}
