// Payment request lifecycle
// Idle -> AwaitingInput -> Confirming -> Submitting -> {Succeeded, Failed} -> Idle

use blockchain::{Ledger, PaymentSubmission};
use rust_decimal::Decimal;
use shared::{Network, PaymentRequest, TransactionResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storage::WalletStore;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::balance::{BalanceMonitor, BalanceView};
use crate::error::{PaymentError, Result};
use crate::parser::PaymentRequestParser;
use crate::validation::{PaymentLimits, BASE_FEE};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    pub max_amount: Decimal,
    pub network: Network,
    pub submit_timeout: Duration,
    /// Delay before a successful payment is dismissed automatically
    pub dismiss_after: Duration,
}

impl LifecycleSettings {
    fn limits(&self) -> PaymentLimits {
        PaymentLimits {
            max_amount: self.max_amount,
            network: self.network,
        }
    }
}

/// What the confirmation screen shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSummary {
    pub sender: Option<String>,
    pub recipient: String,
    pub amount: Decimal,
    pub asset_code: String,
    pub memo: String,
    pub fee_estimate: Decimal,
}

/// Input form after a scan: recipient filled in, amount and memo empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentForm {
    pub recipient: String,
    pub asset_code: String,
    pub amount: String,
    pub memo: String,
    /// Amount named by the scanned request, offered as a hint
    pub suggested_amount: Option<Decimal>,
    pub suggested_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentState {
    Idle,
    AwaitingInput {
        request: PaymentRequest,
        error: Option<String>,
    },
    Confirming {
        request: PaymentRequest,
        summary: PaymentSummary,
    },
    Submitting {
        request: PaymentRequest,
        attempt: Uuid,
    },
    Succeeded {
        request: PaymentRequest,
        result: TransactionResult,
    },
    /// Confirm stays enabled: it retries with the same request
    Failed {
        request: PaymentRequest,
        error: String,
    },
}

impl PaymentState {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentState::Idle => "Idle",
            PaymentState::AwaitingInput { .. } => "AwaitingInput",
            PaymentState::Confirming { .. } => "Confirming",
            PaymentState::Submitting { .. } => "Submitting",
            PaymentState::Succeeded { .. } => "Succeeded",
            PaymentState::Failed { .. } => "Failed",
        }
    }

    fn request(&self) -> Option<&PaymentRequest> {
        match self {
            PaymentState::Idle => None,
            PaymentState::AwaitingInput { request, .. }
            | PaymentState::Confirming { request, .. }
            | PaymentState::Submitting { request, .. }
            | PaymentState::Succeeded { request, .. }
            | PaymentState::Failed { request, .. } => Some(request),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged(PaymentState),
    /// User-facing status line
    Status(String),
    BalanceUpdated(String),
}

/// Result of a confirm action
#[derive(Debug)]
pub enum ConfirmOutcome {
    Succeeded {
        result: TransactionResult,
        /// Follow-up balance refresh; await it or drop it
        balance_refresh: JoinHandle<BalanceView>,
        /// Automatic return to `Idle`
        auto_dismiss: JoinHandle<()>,
    },
    Failed {
        error: String,
    },
    /// A submission was already in flight; nothing happened
    AlreadyProcessing,
    /// The flow was cancelled while the request was in flight
    Discarded,
}

/// Clears the in-flight flag when the submission ends, however it ends
struct ProcessingGuard<'a>(&'a AtomicBool);

impl<'a> ProcessingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one payment at a time from scan to ledger submission
pub struct PaymentLifecycle {
    ledger: Arc<dyn Ledger>,
    wallet: Arc<WalletStore>,
    balance: Arc<BalanceMonitor>,
    settings: LifecycleSettings,
    state: Arc<RwLock<PaymentState>>,
    /// Bumped on cancel so late results and pending dismissals are dropped
    generation: Arc<AtomicU64>,
    is_processing: AtomicBool,
    events: broadcast::Sender<LifecycleEvent>,
}

impl PaymentLifecycle {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet: Arc<WalletStore>,
        balance: Arc<BalanceMonitor>,
        settings: LifecycleSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            ledger,
            wallet,
            balance,
            settings,
            state: Arc::new(RwLock::new(PaymentState::Idle)),
            generation: Arc::new(AtomicU64::new(0)),
            is_processing: AtomicBool::new(false),
            events,
        }
    }

    pub async fn state(&self) -> PaymentState {
        self.state.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing.load(Ordering::Acquire)
    }

    /// Start a payment from a scanned payload
    pub async fn begin(&self, raw_payload: &str) -> Result<PaymentForm> {
        if self.is_processing() {
            return Err(self.reject(PaymentError::State(
                "A payment is already being submitted".to_string(),
            )));
        }

        let request = PaymentRequestParser::parse(raw_payload).ok_or_else(|| {
            self.reject(PaymentError::Validation(
                "No payment address found in the scanned code".to_string(),
            ))
        })?;

        let form = PaymentForm {
            recipient: request.recipient_address.clone(),
            asset_code: request.asset_code.clone(),
            amount: String::new(),
            memo: String::new(),
            suggested_amount: (request.amount > Decimal::ZERO).then_some(request.amount),
            suggested_memo: Some(request.memo.clone()).filter(|m| !m.is_empty()),
        };

        info!("Payment to {} started", request.recipient_address);
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.transition(PaymentState::AwaitingInput {
            request,
            error: None,
        })
        .await;

        Ok(form)
    }

    /// Validate the entered amount and memo and move to confirmation
    pub async fn enter_amount(&self, amount: &str, memo: &str) -> Result<PaymentSummary> {
        let mut state = self.state.write().await;
        let mut request = match &*state {
            PaymentState::AwaitingInput { request, .. } | PaymentState::Failed { request, .. } => {
                request.clone()
            }
            other => {
                let err = PaymentError::State(format!(
                    "Cannot enter an amount while {}",
                    other.name()
                ));
                drop(state);
                return Err(self.reject(err));
            }
        };

        let limits = self.settings.limits();
        let checked = limits.parse_amount(amount).and_then(|amount| {
            request.amount = amount;
            request.memo = memo.trim().to_string();
            limits.check_request(&request).map(|_| amount)
        });

        let amount = match checked {
            Ok(amount) => amount,
            Err(e) => {
                *state = PaymentState::AwaitingInput {
                    request,
                    error: Some(e.to_string()),
                };
                let snapshot = state.clone();
                drop(state);
                self.emit(LifecycleEvent::StateChanged(snapshot));
                return Err(self.reject(e));
            }
        };

        let summary = PaymentSummary {
            sender: self.wallet.public_key(),
            recipient: request.recipient_address.clone(),
            amount,
            asset_code: request.asset_code.clone(),
            memo: request.memo.clone(),
            fee_estimate: BASE_FEE,
        };

        *state = PaymentState::Confirming {
            request,
            summary: summary.clone(),
        };
        let snapshot = state.clone();
        drop(state);
        self.emit(LifecycleEvent::StateChanged(snapshot));

        Ok(summary)
    }

    /// Submit the confirmed payment. A second confirm while one is in
    /// flight is a no-op.
    pub async fn confirm(&self) -> Result<ConfirmOutcome> {
        let Some(_guard) = ProcessingGuard::acquire(&self.is_processing) else {
            debug!("Confirm ignored, submission already in flight");
            return Ok(ConfirmOutcome::AlreadyProcessing);
        };

        let mut state = self.state.write().await;
        let request = match &*state {
            PaymentState::Confirming { request, .. } | PaymentState::Failed { request, .. } => {
                request.clone()
            }
            other => {
                let err = PaymentError::State(format!("Nothing to confirm while {}", other.name()));
                drop(state);
                return Err(self.reject(err));
            }
        };

        if let Err(e) = self.settings.limits().validate(&request) {
            *state = PaymentState::AwaitingInput {
                request,
                error: Some(e.to_string()),
            };
            let snapshot = state.clone();
            drop(state);
            self.emit(LifecycleEvent::StateChanged(snapshot));
            return Err(self.reject(e));
        }

        let keypair = match self.wallet.current() {
            Some(record) if !record.keypair.is_complete() => {
                Err("The active wallet has no secret key")
            }
            Some(record) if !record.is_funded => Err("The active wallet is not funded yet"),
            Some(record) => Ok(record.keypair.clone()),
            None => Err("Create a wallet before sending payments"),
        };
        let keypair = match keypair {
            Ok(keypair) => keypair,
            Err(message) => {
                *state = PaymentState::AwaitingInput {
                    request,
                    error: Some(message.to_string()),
                };
                let snapshot = state.clone();
                drop(state);
                self.emit(LifecycleEvent::StateChanged(snapshot));
                return Err(self.reject(PaymentError::State(message.to_string())));
            }
        };

        let attempt = Uuid::new_v4();
        let generation = self.generation.load(Ordering::Acquire);
        *state = PaymentState::Submitting {
            request: request.clone(),
            attempt,
        };
        let snapshot = state.clone();
        drop(state);
        self.emit(LifecycleEvent::StateChanged(snapshot));
        self.emit(LifecycleEvent::Status("Sending payment...".to_string()));

        info!(
            "Submitting attempt {}: {} {} to {}",
            attempt, request.amount, request.asset_code, request.recipient_address
        );

        let submission = PaymentSubmission {
            sender_secret: &keypair.secret_key,
            destination: &request.recipient_address,
            asset_code: &request.asset_code,
            issuer: &request.issuer_public_key,
            amount: request.amount,
            memo: &request.memo,
        };
        let outcome =
            tokio::time::timeout(self.settings.submit_timeout, self.ledger.submit_payment(submission))
                .await;

        let result = match outcome {
            Ok(Some(result)) if result.is_confirmed() => Ok(result),
            Ok(Some(result)) => Err(result
                .error_message()
                .unwrap_or("Payment was not accepted")
                .to_string()),
            Ok(None) => Err("Payment could not be submitted".to_string()),
            Err(_) => {
                warn!(
                    "Attempt {} timed out after {:?}; it may still settle",
                    attempt, self.settings.submit_timeout
                );
                Err("Payment timed out. Check your balance before retrying".to_string())
            }
        };

        let mut state = self.state.write().await;
        let still_current = self.generation.load(Ordering::Acquire) == generation
            && matches!(&*state, PaymentState::Submitting { attempt: a, .. } if *a == attempt);

        match result {
            Ok(result) => {
                let balance_refresh = self.spawn_balance_refresh();

                if !still_current {
                    info!("Attempt {} settled after cancel: {}", attempt, result.hash());
                    return Ok(ConfirmOutcome::Discarded);
                }

                info!("Payment confirmed: {}", result.hash());
                *state = PaymentState::Succeeded {
                    request,
                    result: result.clone(),
                };
                let snapshot = state.clone();
                drop(state);
                self.emit(LifecycleEvent::StateChanged(snapshot));
                self.emit(LifecycleEvent::Status(format!(
                    "Payment sent. Transaction {}",
                    result.hash()
                )));

                Ok(ConfirmOutcome::Succeeded {
                    result,
                    balance_refresh,
                    auto_dismiss: self.spawn_auto_dismiss(generation),
                })
            }
            Err(error) => {
                if !still_current {
                    debug!("Attempt {} failed after cancel: {}", attempt, error);
                    return Ok(ConfirmOutcome::Discarded);
                }

                warn!("Attempt {} failed: {}", attempt, error);
                *state = PaymentState::Failed {
                    request,
                    error: error.clone(),
                };
                let snapshot = state.clone();
                drop(state);
                self.emit(LifecycleEvent::StateChanged(snapshot));
                self.emit(LifecycleEvent::Status(error.clone()));

                Ok(ConfirmOutcome::Failed { error })
            }
        }
    }

    /// Return to `Idle` from any state. An in-flight submission is not
    /// aborted; its result is discarded.
    pub async fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let previous = self.state().await;
        if let Some(request) = previous.request() {
            info!(
                "Payment to {} cancelled while {}",
                request.recipient_address,
                previous.name()
            );
        }
        self.transition(PaymentState::Idle).await;
    }

    fn spawn_balance_refresh(&self) -> JoinHandle<BalanceView> {
        let balance = self.balance.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let view = balance.refresh().await;
            let _ = events.send(LifecycleEvent::BalanceUpdated(view.display()));
            view
        })
    }

    fn spawn_auto_dismiss(&self, generation: u64) -> JoinHandle<()> {
        let state = self.state.clone();
        let current_generation = self.generation.clone();
        let events = self.events.clone();
        let delay = self.settings.dismiss_after;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut state = state.write().await;
            let unchanged = current_generation.load(Ordering::Acquire) == generation
                && matches!(&*state, PaymentState::Succeeded { .. });
            if unchanged {
                debug!("Dismissing completed payment");
                *state = PaymentState::Idle;
                drop(state);
                let _ = events.send(LifecycleEvent::StateChanged(PaymentState::Idle));
            }
        })
    }

    async fn transition(&self, next: PaymentState) {
        let mut state = self.state.write().await;
        debug!("Payment state {} -> {}", state.name(), next.name());
        *state = next.clone();
        drop(state);
        self.emit(LifecycleEvent::StateChanged(next));
    }

    /// Surface a user-facing error as status text
    fn reject(&self, err: PaymentError) -> PaymentError {
        debug!("Payment action rejected: {}", err);
        self.emit(LifecycleEvent::Status(err.to_string()));
        err
    }

    fn emit(&self, event: LifecycleEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
