//! Allowance/purchase orchestration.
//!
//! [`Checkout`] drives one purchase cycle at a time through an explicit state
//! machine: `idle -> checking -> (approving ->) purchasing -> idle`. Every
//! external confirmation or failure moves the machine forward or resets it to
//! idle; progress is delivered to the caller as discrete [`CheckoutEvent`]
//! messages over a channel.
//!
//! Preconditions (connected session, expected chain, signature present, valid
//! request) are checked while still idle, so a rejected execute request never
//! consumes the single in-flight slot.

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::instrument;

use crate::config::CheckoutConfig;
use crate::network::Network;
use crate::payload::{RequestValidationError, total_price, validate_request};
use crate::session::WalletSession;
use crate::store::{
    GAS_LIMIT_APPROVE, GAS_LIMIT_PURCHASE, PurchaseArgsError, StoreClient, StoreError,
    decode_signature, to_purchase_args,
};
use crate::types::{EvmAddress, PurchasePayload, TransactionHash, TransactionStep};
use crate::util::format::format_token_amount;

/// Progress of a purchase cycle, delivered as discrete messages.
#[derive(Debug, Clone)]
pub enum CheckoutEvent {
    /// The state machine moved to a new step.
    Step(TransactionStep),
    /// Human-readable progress line, replacing any previous status.
    Status(String),
    /// The purchase transaction confirmed.
    Completed { transaction: TransactionHash },
    /// The cycle failed; the message replaces any in-progress status.
    Failed { message: String },
}

/// Represents all possible errors of a purchase cycle.
///
/// Every variant resets the orchestrator to idle; none are fatal, and the
/// user may resubmit.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// No wallet session is active.
    #[error("Please connect your wallet first")]
    NotConnected,
    /// The session is connected to a different chain than expected.
    #[error("Wrong network: please switch to {0}")]
    WrongChain(Network),
    /// The payload carries no signature.
    #[error("Signature is missing in payload")]
    MissingSignature,
    /// Another purchase cycle is already in flight.
    #[error("operation already in progress")]
    AlreadyInProgress,
    /// The request failed a business rule.
    #[error(transparent)]
    InvalidRequest(#[from] RequestValidationError),
    /// The request could not be converted to contract arguments.
    #[error(transparent)]
    InvalidArgs(#[from] PurchaseArgsError),
    /// The user/wallet refused to sign or submit a transaction.
    #[error("Transaction rejected by user")]
    Rejected,
    /// The allowance read failed.
    #[error("Allowance check failed: {0}")]
    AllowanceCheck(StoreError),
    /// The approval transaction failed on submit or in its receipt.
    #[error("Approve transaction failed: {0}")]
    ApproveFailed(StoreError),
    /// The purchase transaction failed on submit or in its receipt.
    #[error("Purchase transaction failed: {0}")]
    PurchaseFailed(StoreError),
}

/// Maps a store-surface error to its checkout-level report, keeping wallet
/// refusals distinct.
fn map_store_error(
    error: StoreError,
    wrap: impl FnOnce(StoreError) -> CheckoutError,
) -> CheckoutError {
    match error {
        StoreError::Rejected => CheckoutError::Rejected,
        other => wrap(other),
    }
}

/// Orchestrates allowance checks, approvals, and purchases against a
/// [`StoreClient`].
///
/// Holds exactly one [`TransactionStep`] per session; a second `execute`
/// while non-idle is rejected. Shareable across tasks (`&self` methods), but
/// only one cycle ever runs at a time.
pub struct Checkout<S> {
    store: S,
    config: CheckoutConfig,
    step: Mutex<TransactionStep>,
    events: mpsc::UnboundedSender<CheckoutEvent>,
}

impl<S> Checkout<S>
where
    S: StoreClient,
{
    /// Creates an orchestrator and the receiving end of its event channel.
    pub fn new(store: S, config: CheckoutConfig) -> (Self, mpsc::UnboundedReceiver<CheckoutEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let checkout = Checkout {
            store,
            config,
            step: Mutex::new(TransactionStep::Idle),
            events,
        };
        (checkout, receiver)
    }

    /// Current step of the state machine.
    pub fn step(&self) -> TransactionStep {
        *self.step.lock().expect("step lock poisoned")
    }

    /// Forces the machine back to idle, discarding any status. Only
    /// meaningful between cycles; an in-flight cycle resets itself.
    pub fn reset(&self) {
        self.set_step(TransactionStep::Idle);
    }

    /// Runs one full purchase cycle for the given payload.
    ///
    /// Checks allowance for (owner = session address, spender = store
    /// contract), submits an approval for exactly the order total when the
    /// allowance falls short, then submits the purchase. Resolves with the
    /// purchase transaction hash, or an error after resetting to idle.
    #[instrument(skip_all, err, fields(order_id = %payload.request.order_id))]
    pub async fn execute<W: WalletSession>(
        &self,
        session: &W,
        payload: &PurchasePayload,
    ) -> Result<TransactionHash, CheckoutError> {
        let owner = match self.begin(session, payload) {
            Ok(owner) => owner,
            Err(error) => {
                // An in-flight cycle owns the status line; don't clobber it.
                if !matches!(error, CheckoutError::AlreadyInProgress) {
                    self.emit(CheckoutEvent::Failed {
                        message: error.to_string(),
                    });
                }
                return Err(error);
            }
        };

        let result = self.run_cycle(owner, payload).await;
        self.set_step(TransactionStep::Idle);
        match &result {
            Ok(transaction) => self.emit(CheckoutEvent::Completed {
                transaction: transaction.clone(),
            }),
            Err(error) => self.emit(CheckoutEvent::Failed {
                message: error.to_string(),
            }),
        }
        result
    }

    /// Verifies preconditions and atomically claims the single in-flight
    /// slot (`idle -> checking`). On any error the machine stays idle.
    fn begin<W: WalletSession>(
        &self,
        session: &W,
        payload: &PurchasePayload,
    ) -> Result<EvmAddress, CheckoutError> {
        let mut step = self.step.lock().expect("step lock poisoned");
        if *step != TransactionStep::Idle {
            return Err(CheckoutError::AlreadyInProgress);
        }
        let owner = session.address().ok_or(CheckoutError::NotConnected)?;
        if session.is_wrong_chain() {
            return Err(CheckoutError::WrongChain(session.expected_network()));
        }
        if payload.signature.trim().is_empty() {
            return Err(CheckoutError::MissingSignature);
        }
        validate_request(&payload.request)?;
        *step = TransactionStep::Checking;
        self.emit(CheckoutEvent::Step(TransactionStep::Checking));
        self.emit(CheckoutEvent::Status("Checking allowance...".to_string()));
        Ok(owner)
    }

    async fn run_cycle(
        &self,
        owner: EvmAddress,
        payload: &PurchasePayload,
    ) -> Result<TransactionHash, CheckoutError> {
        let request = &payload.request;
        let total = total_price(Some(request));
        let args = to_purchase_args(request)?;
        let signature = decode_signature(&payload.signature)?;
        let spender = self.config.store_address;

        let allowance = self
            .store
            .allowance(owner, spender)
            .await
            .map_err(|e| map_store_error(e, CheckoutError::AllowanceCheck))?;

        let decimals = self.config.token_decimals;
        if allowance >= total {
            self.emit(CheckoutEvent::Status(format!(
                "Allowance sufficient ({}). Executing purchase...",
                format_token_amount(allowance, decimals)
            )));
        } else {
            self.emit(CheckoutEvent::Status(format!(
                "Current allowance: {}. Need: {}. Approving tokens...",
                format_token_amount(allowance, decimals),
                format_token_amount(total, decimals)
            )));
            self.set_step(TransactionStep::Approving);
            let gas_limit = self.config.skip_simulation.then_some(GAS_LIMIT_APPROVE);
            self.store
                .approve(spender, total, gas_limit)
                .await
                .map_err(|e| map_store_error(e, CheckoutError::ApproveFailed))?;
            self.emit(CheckoutEvent::Status(
                "Tokens approved! Executing purchase...".to_string(),
            ));
        }

        self.set_step(TransactionStep::Purchasing);
        let gas_limit = self.config.skip_simulation.then_some(GAS_LIMIT_PURCHASE);
        let transaction = self
            .store
            .execute_purchase(args, signature, gas_limit)
            .await
            .map_err(|e| map_store_error(e, CheckoutError::PurchaseFailed))?;

        self.refresh_allowance(owner, spender).await;
        self.emit(CheckoutEvent::Status(
            "Purchase completed successfully!".to_string(),
        ));
        Ok(transaction)
    }

    /// Re-reads the allowance after a completed purchase. A failure here
    /// never fails the already-confirmed purchase.
    async fn refresh_allowance(&self, owner: EvmAddress, spender: EvmAddress) {
        match self.store.allowance(owner, spender).await {
            Ok(allowance) => {
                tracing::debug!(allowance = %allowance, "allowance refreshed after purchase");
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to refresh allowance after purchase");
            }
        }
    }

    fn set_step(&self, next: TransactionStep) {
        *self.step.lock().expect("step lock poisoned") = next;
        self.emit(CheckoutEvent::Step(next));
    }

    fn emit(&self, event: CheckoutEvent) {
        // Nobody listening is fine; events are advisory.
        let _ = self.events.send(event);
    }
}
