//! Checkout Wizard
//!
//! Drives one checkout session from project details to a payment outcome.
//!
//! ```text
//! Details ──▶ Contact ──▶ Review ──▶ Paying ──┬──▶ Succeeded
//!    ▲           ▲  │        ▲          │     ├──▶ AwaitingConfirmation (UPI)
//!    └── back ───┘  │        └─ back / cancel ┘   └──▶ SupportRequired
//!                   └──▶ PaymentUnavailable (no gateway offered)
//! ```
//!
//! The wizard holds at most one [`PaymentIntent`], bound to the gateway and
//! total it was created for. Anything that changes either one (quote edit,
//! gateway switch, back, cancel) drops it, and every entry into `Paying`
//! dispatches a new one.
//!
//! Each attempt has one idempotency key. A dispatch that fails is retried
//! under the same key, so a create the backend finished before the response
//! was lost is replayed instead of repeated. The key is retired when the
//! attempt ends or anything it was built from changes.
//!
//! Async operations take `&mut self`, so one wizard can never have two
//! dispatches in flight. Hosts that share it behind a lock can poll
//! [`BusySignal`] without taking the lock.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use validator::Validate;

use checkout_core::{
    Availability, CheckoutError, Customer, GatewayCapabilities, GatewayId, IdempotencyKey,
    PaymentIntent, PriceQuote, PriceTable, QuoteRequest, Recovery, Result, SessionId,
};

use crate::adapters::{AdapterOutcome, AdapterRegistry, UpiPayment};
use crate::dispatcher::IntentDispatcher;

/// Where the session currently is
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum WizardStep {
    Details,
    Contact,
    Review,
    Paying,
    Succeeded { gateway: GatewayId, reference: String },
    AwaitingConfirmation(UpiPayment),
    SupportRequired { payment_id: String },
    /// No gateway can take payment; show contact details instead
    PaymentUnavailable,
}

impl WizardStep {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Contact => "contact",
            Self::Review => "review",
            Self::Paying => "paying",
            Self::Succeeded { .. } => "succeeded",
            Self::AwaitingConfirmation(_) => "awaiting_confirmation",
            Self::SupportRequired { .. } => "support_required",
            Self::PaymentUnavailable => "payment_unavailable",
        }
    }

    /// No further payment can start from here without a reset
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::SupportRequired { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible message, dismissed by id
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
    pub recovery: Option<Recovery>,
}

/// Lock-free view of whether the wizard is waiting on the network
#[derive(Clone, Debug, Default)]
pub struct BusySignal(Arc<AtomicBool>);

impl BusySignal {
    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn enter(&self) -> BusyGuard {
        self.0.store(true, Ordering::Release);
        BusyGuard(Arc::clone(&self.0))
    }
}

struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CheckoutWizard {
    session: SessionId,
    step: WizardStep,

    price_table: PriceTable,
    quote_request: QuoteRequest,
    quote: PriceQuote,

    customer: Option<Customer>,
    availability: Option<Availability>,
    capabilities: Option<GatewayCapabilities>,
    selected_gateway: Option<GatewayId>,

    intent: Option<PaymentIntent>,
    intent_generation: u32,
    /// Key of the current attempt, kept across failed dispatches
    attempt_key: Option<IdempotencyKey>,

    notices: Vec<Notice>,
    next_notice_id: u64,

    dispatcher: IntentDispatcher,
    adapters: AdapterRegistry,
    busy: BusySignal,
}

impl CheckoutWizard {
    pub fn new(dispatcher: IntentDispatcher, adapters: AdapterRegistry, request: QuoteRequest) -> Self {
        Self::with_price_table(dispatcher, adapters, PriceTable::default(), request)
    }

    pub fn with_price_table(
        dispatcher: IntentDispatcher,
        adapters: AdapterRegistry,
        price_table: PriceTable,
        request: QuoteRequest,
    ) -> Self {
        let quote = price_table.quote(&request);
        let session = SessionId::new();
        tracing::debug!(session = %session, total = %quote.total_amount, "Checkout session started");

        Self {
            session,
            step: WizardStep::Details,
            price_table,
            quote_request: request,
            quote,
            customer: None,
            availability: None,
            capabilities: None,
            selected_gateway: None,
            intent: None,
            intent_generation: 0,
            attempt_key: None,
            notices: Vec::new(),
            next_notice_id: 1,
            dispatcher,
            adapters,
            busy: BusySignal::default(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub const fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub const fn step(&self) -> &WizardStep {
        &self.step
    }

    pub const fn quote_request(&self) -> &QuoteRequest {
        &self.quote_request
    }

    pub const fn quote(&self) -> &PriceQuote {
        &self.quote
    }

    pub const fn customer(&self) -> Option<&Customer> {
        self.customer.as_ref()
    }

    pub const fn selected_gateway(&self) -> Option<GatewayId> {
        self.selected_gateway
    }

    pub const fn intent(&self) -> Option<&PaymentIntent> {
        self.intent.as_ref()
    }

    pub const fn intent_generation(&self) -> u32 {
        self.intent_generation
    }

    /// Gateways the user may pick from, once capabilities are loaded
    pub fn available_gateways(&self) -> BTreeSet<GatewayId> {
        match &self.availability {
            Some(Availability::Offer(gateways)) => gateways
                .iter()
                .copied()
                .filter(|g| self.adapters.contains(*g))
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    /// Clone of the busy flag, readable while the wizard is borrowed elsewhere
    pub fn busy_signal(&self) -> BusySignal {
        self.busy.clone()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Fetch gateway capabilities, at most once per session.
    ///
    /// A failed fetch is not cached.
    pub async fn load_capabilities(&mut self) -> Result<&Availability> {
        if self.availability.is_none() {
            let caps = {
                let _busy = self.busy.enter();
                self.dispatcher.api().payment_status().await
            };
            let caps = match caps {
                Ok(caps) => caps,
                Err(e) => {
                    tracing::warn!(session = %self.session, error = %e, "Could not load payment options");
                    self.push_error(&e);
                    return Err(e);
                }
            };

            let availability = Availability::from_capabilities(&caps);
            tracing::info!(
                session = %self.session,
                availability = ?availability,
                "Payment options loaded"
            );
            self.capabilities = Some(caps);
            self.availability = Some(availability);
        }

        self.availability
            .as_ref()
            .ok_or_else(|| CheckoutError::Config("payment options not loaded".into()))
    }

    /// Replace the quote request and reprice. Drops any live intent.
    pub fn update_quote(&mut self, request: QuoteRequest) -> Result<&PriceQuote> {
        self.require(
            matches!(self.step, WizardStep::Details | WizardStep::Contact | WizardStep::Review),
            "update_quote",
        )?;
        if let Err(e) = request.validate() {
            let e = CheckoutError::from(e);
            self.push_error(&e);
            return Err(e);
        }

        self.quote = self.price_table.quote(&request);
        self.quote_request = request;
        self.discard_intent("quote changed");
        Ok(&self.quote)
    }

    /// Details → Contact
    pub fn submit_details(&mut self) -> Result<()> {
        self.require(self.step == WizardStep::Details, "submit_details")?;
        if let Err(e) = self.price_table.quote_checked(&self.quote_request) {
            self.push_error(&e);
            return Err(e);
        }
        self.step = WizardStep::Contact;
        Ok(())
    }

    /// Contact → Review, or → PaymentUnavailable when nothing can take payment
    pub async fn submit_contact(&mut self, customer: Customer) -> Result<()> {
        self.require(self.step == WizardStep::Contact, "submit_contact")?;
        if let Err(e) = customer.validate() {
            let e = CheckoutError::from(e);
            self.push_error(&e);
            return Err(e);
        }
        self.customer = Some(customer);

        self.load_capabilities().await?;
        let offered = self.available_gateways();

        if offered.is_empty() {
            tracing::warn!(session = %self.session, "No payment gateway available");
            self.step = WizardStep::PaymentUnavailable;
            return Ok(());
        }

        if self.selected_gateway.is_some_and(|g| !offered.contains(&g)) {
            self.selected_gateway = None;
        }
        if offered.len() == 1 {
            self.selected_gateway = offered.first().copied();
        }
        self.step = WizardStep::Review;
        Ok(())
    }

    /// Pick the gateway to pay with. Switching drops any live intent.
    pub fn select_gateway(&mut self, gateway: GatewayId) -> Result<()> {
        self.require(self.step == WizardStep::Review, "select_gateway")?;
        if !self.available_gateways().contains(&gateway) {
            let e = CheckoutError::Validation(format!(
                "{} is not available right now",
                gateway.display_name()
            ));
            self.push_error(&e);
            return Err(e);
        }

        if self.selected_gateway != Some(gateway) {
            self.discard_intent("gateway changed");
            self.selected_gateway = Some(gateway);
        }
        Ok(())
    }

    /// Review → Paying. Always creates a new intent; a retry after a failed
    /// dispatch reuses the attempt's idempotency key.
    pub async fn begin_payment(&mut self) -> Result<()> {
        self.require(self.step == WizardStep::Review, "begin_payment")?;
        let gateway = self
            .selected_gateway
            .ok_or_else(|| CheckoutError::Validation("choose a payment method".into()))?;
        let customer = self
            .customer
            .clone()
            .ok_or_else(|| CheckoutError::Validation("contact details are required".into()))?;

        if self.intent.is_some() {
            self.discard_intent("new attempt");
        }
        let key = match &self.attempt_key {
            Some(key) => key.clone(),
            None => {
                self.intent_generation += 1;
                let key = IdempotencyKey::for_attempt(&self.session, gateway, self.intent_generation);
                self.attempt_key = Some(key.clone());
                key
            }
        };
        let description = format!(
            "{} ({})",
            self.dispatcher.config().payment_note,
            self.quote_request.project_type.as_str()
        );

        let result = {
            let _busy = self.busy.enter();
            self.dispatcher
                .create_intent(
                    gateway,
                    &self.quote,
                    &customer,
                    &description,
                    &key,
                    self.capabilities.as_ref(),
                )
                .await
        };

        match result {
            Ok(intent) => {
                tracing::info!(
                    session = %self.session,
                    gateway = %gateway,
                    generation = self.intent_generation,
                    "Entering payment step"
                );
                self.intent = Some(intent);
                self.step = WizardStep::Paying;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    session = %self.session,
                    gateway = %gateway,
                    idempotency_key = %key,
                    error = %e,
                    "Intent dispatch failed"
                );
                self.push_error(&e);
                Err(e)
            }
        }
    }

    /// Run the selected gateway's flow against the live intent
    pub async fn complete_payment(&mut self) -> Result<&WizardStep> {
        self.require(self.step == WizardStep::Paying, "complete_payment")?;
        let gateway = self
            .selected_gateway
            .ok_or_else(|| CheckoutError::Validation("choose a payment method".into()))?;
        let intent = self.intent.clone().ok_or_else(|| CheckoutError::InvalidTransition {
            from: self.step.name().to_string(),
            action: "complete_payment",
        })?;
        let customer = self
            .customer
            .clone()
            .ok_or_else(|| CheckoutError::Validation("contact details are required".into()))?;

        if let Err(e) = intent.ensure_matches(gateway, self.quote.total_amount) {
            tracing::error!(session = %self.session, error = %e, "Stale payment intent");
            self.discard_intent("stale");
            self.step = WizardStep::Review;
            self.push_error(&e);
            return Err(e);
        }

        let adapter = self
            .adapters
            .get(gateway)
            .ok_or_else(|| CheckoutError::UnknownGateway(gateway.to_string()))?;

        let outcome = {
            let _busy = self.busy.enter();
            adapter.collect(&intent, &customer).await
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(session = %self.session, gateway = %gateway, error = %e, "Payment flow could not run");
                self.push_error(&e);
                return Err(e);
            }
        };

        match outcome {
            AdapterOutcome::Succeeded { reference } => {
                tracing::info!(session = %self.session, gateway = %gateway, reference = %reference, "Payment succeeded");
                self.discard_intent("paid");
                self.step = WizardStep::Succeeded { gateway, reference };
            }
            AdapterOutcome::Cancelled => {
                self.discard_intent("cancelled in gateway");
                self.step = WizardStep::Review;
                self.push(NoticeLevel::Info, "Payment cancelled. You can choose another method.", None);
            }
            AdapterOutcome::Failed { message } => {
                self.discard_intent("gateway failure");
                self.step = WizardStep::Review;
                self.push(
                    NoticeLevel::Error,
                    format!("Payment failed: {message}"),
                    Some(Recovery::RetryLater),
                );
            }
            AdapterOutcome::VerificationFailed { payment_id } => {
                tracing::error!(session = %self.session, payment_id = %payment_id, "Payment could not be verified");
                let e = CheckoutError::Verification {
                    payment_id: payment_id.clone(),
                };
                self.push_error(&e);
                self.discard_intent("unverified");
                self.step = WizardStep::SupportRequired { payment_id };
            }
            AdapterOutcome::PendingManualVerification(payment) => {
                self.push(
                    NoticeLevel::Warning,
                    format!(
                        "Payment not yet confirmed. We will verify reference {} manually.",
                        payment.reference_id
                    ),
                    None,
                );
                self.step = WizardStep::AwaitingConfirmation(payment);
            }
        }
        Ok(&self.step)
    }

    /// Step back one screen. Leaving `Paying` drops the intent, and any step
    /// back retires the attempt key since details may change.
    pub fn back(&mut self) -> Result<()> {
        let previous = match self.step {
            WizardStep::Contact => WizardStep::Details,
            WizardStep::Review | WizardStep::PaymentUnavailable => WizardStep::Contact,
            WizardStep::Paying | WizardStep::AwaitingConfirmation(_) => {
                self.discard_intent("back");
                WizardStep::Review
            }
            _ => {
                return Err(CheckoutError::InvalidTransition {
                    from: self.step.name().to_string(),
                    action: "back",
                });
            }
        };
        self.attempt_key = None;
        self.step = previous;
        Ok(())
    }

    /// Abandon the payment attempt and return to gateway selection
    pub fn cancel(&mut self) -> Result<()> {
        self.require(
            matches!(
                self.step,
                WizardStep::Review | WizardStep::Paying | WizardStep::AwaitingConfirmation(_)
            ),
            "cancel",
        )?;
        self.discard_intent("cancelled");
        self.step = WizardStep::Review;
        Ok(())
    }

    /// Start over with a new session. Keeps the current quote request.
    pub fn reset(&mut self) {
        tracing::debug!(session = %self.session, "Checkout session reset");
        self.session = SessionId::new();
        self.step = WizardStep::Details;
        self.customer = None;
        self.availability = None;
        self.capabilities = None;
        self.selected_gateway = None;
        self.intent = None;
        self.intent_generation = 0;
        self.attempt_key = None;
        self.notices.clear();
    }

    /// Remove a notice; false if it was already gone
    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require(&self, allowed: bool, action: &'static str) -> Result<()> {
        if allowed {
            Ok(())
        } else {
            Err(CheckoutError::InvalidTransition {
                from: self.step.name().to_string(),
                action,
            })
        }
    }

    /// Drop the live intent and retire its attempt key
    fn discard_intent(&mut self, reason: &str) {
        self.attempt_key = None;
        if let Some(intent) = self.intent.take() {
            tracing::debug!(
                session = %self.session,
                reference = %intent.handle.reference(),
                reason,
                "Discarded payment intent"
            );
        }
    }

    fn push(&mut self, level: NoticeLevel, message: impl Into<String>, recovery: Option<Recovery>) -> u64 {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(Notice {
            id,
            level,
            message: message.into(),
            recovery,
        });
        id
    }

    fn push_error(&mut self, error: &CheckoutError) -> u64 {
        self.push(NoticeLevel::Error, error.user_message(), Some(error.recovery()))
    }
}
