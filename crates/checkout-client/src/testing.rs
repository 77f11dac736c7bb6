//! In-memory fakes shared by the unit tests

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use checkout_core::wire::{
    OrderResponse, PayPalOrderRequest, RazorpayOrderRequest, StripeIntentRequest,
    StripeIntentResponse, UpiInfoResponse, UpiRecordRequest, VerifyPaymentRequest,
    VerifyPaymentResponse,
};
use checkout_core::{
    CheckoutError, Customer, GatewayCapabilities, GatewayId, GatewayStatus, IdempotencyKey,
    PaymentIntent, Result,
};

use crate::adapters::{
    AdapterOutcome, CheckoutAdapter, RazorpayCheckout, RazorpayEvent, RazorpayOptions,
    RazorpayPayment,
};
use crate::api::PaymentApi;
use crate::loader::ScriptHost;

type ErrorFactory = fn() -> CheckoutError;

/// Scriptable [`PaymentApi`] that counts what it was asked to do
pub struct FakeApi {
    capabilities: GatewayCapabilities,
    verified: AtomicBool,
    status_failure: Mutex<Option<ErrorFactory>>,
    create_failure: Mutex<Option<ErrorFactory>>,
    next_create_failure: Mutex<Option<ErrorFactory>>,
    verify_failure: Mutex<Option<ErrorFactory>>,
    record_failure: Mutex<Option<ErrorFactory>>,
    status_calls: AtomicUsize,
    create_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    keys: Mutex<Vec<IdempotencyKey>>,
    recorded: Mutex<Vec<UpiRecordRequest>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::with_capabilities(
            GatewayCapabilities::new()
                .with(GatewayId::Stripe, GatewayStatus::with_key("pk_test_123"))
                .with(GatewayId::PayPal, GatewayStatus::available())
                .with(GatewayId::Razorpay, GatewayStatus::with_key("rzp_test_key"))
                .with(GatewayId::Upi, GatewayStatus::available()),
        )
    }
}

impl FakeApi {
    pub fn with_capabilities(capabilities: GatewayCapabilities) -> Self {
        Self {
            capabilities,
            verified: AtomicBool::new(true),
            status_failure: Mutex::new(None),
            create_failure: Mutex::new(None),
            next_create_failure: Mutex::new(None),
            verify_failure: Mutex::new(None),
            record_failure: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
            keys: Mutex::new(Vec::new()),
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn set_verified(&self, verified: bool) {
        self.verified.store(verified, Ordering::SeqCst);
    }

    pub fn fail_status_with(&self, error: ErrorFactory) {
        *self.status_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_creates_with(&self, error: ErrorFactory) {
        *self.create_failure.lock().unwrap() = Some(error);
    }

    /// Fail only the next create, as if the response was lost
    pub fn fail_next_create_with(&self, error: ErrorFactory) {
        *self.next_create_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_verify_with(&self, error: ErrorFactory) {
        *self.verify_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_records_with(&self, error: ErrorFactory) {
        *self.record_failure.lock().unwrap() = Some(error);
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    /// Keys of every create request that reached the API, failed or not
    pub fn idempotency_keys(&self) -> Vec<IdempotencyKey> {
        self.keys.lock().unwrap().clone()
    }

    pub fn recorded_upi(&self) -> Vec<UpiRecordRequest> {
        self.recorded.lock().unwrap().clone()
    }

    /// Count the call and hand out the next sequence number
    fn create(&self, key: &IdempotencyKey) -> Result<usize> {
        self.keys.lock().unwrap().push(key.clone());
        if let Some(error) = self.next_create_failure.lock().unwrap().take() {
            return Err(error());
        }
        if let Some(error) = *self.create_failure.lock().unwrap() {
            return Err(error());
        }
        Ok(self.create_calls.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl PaymentApi for FakeApi {
    async fn payment_status(&self) -> Result<GatewayCapabilities> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = *self.status_failure.lock().unwrap() {
            return Err(error());
        }
        Ok(self.capabilities.clone())
    }

    async fn create_stripe_intent(
        &self,
        _request: &StripeIntentRequest,
        key: &IdempotencyKey,
    ) -> Result<StripeIntentResponse> {
        let n = self.create(key)?;
        Ok(StripeIntentResponse {
            client_secret: format!("pi_{n}_secret_test"),
        })
    }

    async fn create_paypal_order(
        &self,
        _request: &PayPalOrderRequest,
        key: &IdempotencyKey,
    ) -> Result<OrderResponse> {
        let n = self.create(key)?;
        Ok(OrderResponse {
            id: format!("PAYPAL{n}"),
        })
    }

    async fn create_razorpay_order(
        &self,
        _request: &RazorpayOrderRequest,
        key: &IdempotencyKey,
    ) -> Result<OrderResponse> {
        let n = self.create(key)?;
        Ok(OrderResponse {
            id: format!("order_{n}"),
        })
    }

    async fn verify_razorpay_payment(
        &self,
        _request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = *self.verify_failure.lock().unwrap() {
            return Err(error());
        }
        Ok(VerifyPaymentResponse {
            verified: self.verified.load(Ordering::SeqCst),
        })
    }

    async fn upi_info(&self) -> Result<UpiInfoResponse> {
        Ok(UpiInfoResponse {
            upi_id: "studio@okaxis".into(),
            payee_name: Some("Studio".into()),
        })
    }

    async fn record_upi_attempt(&self, request: &UpiRecordRequest) -> Result<()> {
        if let Some(error) = *self.record_failure.lock().unwrap() {
            return Err(error());
        }
        self.recorded.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Page that defines every global once any script has been injected
#[derive(Default)]
pub struct FakeHost {
    defined: AtomicBool,
}

#[async_trait]
impl ScriptHost for FakeHost {
    fn has_global(&self, _name: &str) -> bool {
        self.defined.load(Ordering::SeqCst)
    }

    async fn inject_script(&self, _src: &str) -> Result<()> {
        self.defined.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Adapter that returns a fixed outcome
pub struct ScriptedAdapter {
    gateway: GatewayId,
    outcome: AdapterOutcome,
    fail_next: AtomicBool,
}

impl ScriptedAdapter {
    pub fn new(gateway: GatewayId, outcome: AdapterOutcome) -> Self {
        Self {
            gateway,
            outcome,
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn succeeding(gateway: GatewayId) -> Self {
        Self::new(
            gateway,
            AdapterOutcome::Succeeded {
                reference: format!("{gateway}_ref"),
            },
        )
    }

    /// Make the next `collect` fail as if the SDK could not load
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CheckoutAdapter for ScriptedAdapter {
    fn gateway(&self) -> GatewayId {
        self.gateway
    }

    async fn collect(&self, intent: &PaymentIntent, _customer: &Customer) -> Result<AdapterOutcome> {
        assert_eq!(intent.gateway(), self.gateway);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CheckoutError::Network("script blocked".into()));
        }
        Ok(self.outcome.clone())
    }
}

/// Razorpay modal that reports a fixed event and keeps the options it was opened with
pub struct ScriptedCheckout {
    event: RazorpayEvent,
    pub seen: Mutex<Option<RazorpayOptions>>,
}

impl ScriptedCheckout {
    pub fn new(event: RazorpayEvent) -> Arc<Self> {
        Arc::new(Self {
            event,
            seen: Mutex::new(None),
        })
    }

    /// Customer paid `order_id` in the modal as `payment_id`
    pub fn completing(order_id: &str, payment_id: &str) -> Arc<Self> {
        Self::new(RazorpayEvent::Completed(RazorpayPayment {
            razorpay_payment_id: payment_id.into(),
            razorpay_order_id: order_id.into(),
            razorpay_signature: "sig".into(),
        }))
    }
}

#[async_trait]
impl RazorpayCheckout for ScriptedCheckout {
    async fn open(&self, options: &RazorpayOptions) -> Result<RazorpayEvent> {
        *self.seen.lock().unwrap() = Some(options.clone());
        Ok(self.event.clone())
    }
}
