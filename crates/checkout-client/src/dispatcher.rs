//! Payment Intent Dispatcher
//!
//! The only place that knows how each gateway wants its create request
//! shaped. One builder per gateway produces a [`GatewayPayload`]; the
//! payload variant then selects the backend call, and every response is
//! normalised into a [`PaymentIntent`].
//!
//! ```text
//! PriceQuote + Customer ──▶ PAYLOAD_BUILDERS[gateway] ──▶ GatewayPayload
//!                                                              │
//!        PaymentIntent ◀── normalise ◀── PaymentApi::create_* ◀┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use validator::Validate;

use checkout_core::money::{to_major_string, to_minor_units};
use checkout_core::wire::{PayPalOrderRequest, RazorpayOrderRequest, StripeIntentRequest};
use checkout_core::{
    CheckoutError, Customer, GatewayCapabilities, GatewayId, IdempotencyKey, PaymentIntent,
    PaymentIntentHandle, PriceQuote, Result,
};

use crate::api::PaymentApi;
use crate::config::ClientConfig;

/// Everything a payload builder may read
#[derive(Clone, Copy, Debug)]
pub struct PayloadContext<'a> {
    pub quote: &'a PriceQuote,
    pub customer: &'a Customer,
    pub currency: &'a str,
    pub description: &'a str,
    pub key: &'a IdempotencyKey,
}

/// UPI needs no server-side order; the reference is generated locally
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpiIntentRequest {
    pub amount: Decimal,
    pub reference_id: String,
}

/// Create request for one gateway, already in that gateway's units
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayPayload {
    Stripe(StripeIntentRequest),
    PayPal(PayPalOrderRequest),
    Razorpay(RazorpayOrderRequest),
    Upi(UpiIntentRequest),
}

impl GatewayPayload {
    pub const fn gateway(&self) -> GatewayId {
        match self {
            Self::Stripe(_) => GatewayId::Stripe,
            Self::PayPal(_) => GatewayId::PayPal,
            Self::Razorpay(_) => GatewayId::Razorpay,
            Self::Upi(_) => GatewayId::Upi,
        }
    }
}

pub type PayloadBuilder = fn(&PayloadContext<'_>) -> Result<GatewayPayload>;

/// Gateway → payload builder
pub const PAYLOAD_BUILDERS: [(GatewayId, PayloadBuilder); 4] = [
    (GatewayId::Stripe, build_stripe),
    (GatewayId::PayPal, build_paypal),
    (GatewayId::Razorpay, build_razorpay),
    (GatewayId::Upi, build_upi),
];

pub fn payload_builder(gateway: GatewayId) -> Result<PayloadBuilder> {
    PAYLOAD_BUILDERS
        .iter()
        .find(|(id, _)| *id == gateway)
        .map(|(_, builder)| *builder)
        .ok_or_else(|| CheckoutError::UnknownGateway(gateway.to_string()))
}

fn metadata(ctx: &PayloadContext<'_>) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("customer_name".to_string(), ctx.customer.name.clone()),
        ("customer_email".to_string(), ctx.customer.email.clone()),
        ("checkout_key".to_string(), ctx.key.to_string()),
    ])
}

fn build_stripe(ctx: &PayloadContext<'_>) -> Result<GatewayPayload> {
    Ok(GatewayPayload::Stripe(StripeIntentRequest {
        amount: to_minor_units(ctx.quote.total_amount)?,
        currency: ctx.currency.to_lowercase(),
        description: ctx.description.to_string(),
        customer_name: ctx.customer.name.clone(),
        customer_email: ctx.customer.email.clone(),
        metadata: metadata(ctx),
    }))
}

fn build_paypal(ctx: &PayloadContext<'_>) -> Result<GatewayPayload> {
    Ok(GatewayPayload::PayPal(PayPalOrderRequest {
        amount: to_major_string(ctx.quote.total_amount),
        currency: ctx.currency.to_uppercase(),
        description: ctx.description.to_string(),
        reference_id: Some(ctx.key.to_string()),
    }))
}

fn build_razorpay(ctx: &PayloadContext<'_>) -> Result<GatewayPayload> {
    // Razorpay caps receipts at 40 characters
    let receipt: String = ctx.key.as_str().chars().take(40).collect();
    Ok(GatewayPayload::Razorpay(RazorpayOrderRequest {
        amount: to_minor_units(ctx.quote.total_amount)?,
        currency: ctx.currency.to_uppercase(),
        receipt,
        notes: metadata(ctx),
    }))
}

fn build_upi(ctx: &PayloadContext<'_>) -> Result<GatewayPayload> {
    let reference_id = format!(
        "UPI{}",
        uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()
    );
    Ok(GatewayPayload::Upi(UpiIntentRequest {
        amount: ctx.quote.total_amount,
        reference_id,
    }))
}

/// Creates payment intents through the backend
#[derive(Clone)]
pub struct IntentDispatcher {
    api: Arc<dyn PaymentApi>,
    config: ClientConfig,
}

impl IntentDispatcher {
    pub fn new(api: Arc<dyn PaymentApi>, config: ClientConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &Arc<dyn PaymentApi> {
        &self.api
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the payload `gateway` expects, without sending it
    pub fn build_payload(
        &self,
        gateway: GatewayId,
        quote: &PriceQuote,
        customer: &Customer,
        description: &str,
        key: &IdempotencyKey,
    ) -> Result<GatewayPayload> {
        if quote.total_amount <= Decimal::ZERO {
            return Err(CheckoutError::Validation("amount must be greater than zero".into()));
        }
        customer.validate()?;

        let ctx = PayloadContext {
            quote,
            customer,
            currency: &self.config.currency,
            description,
            key,
        };
        payload_builder(gateway)?(&ctx)
    }

    /// Create an intent for `gateway` covering `quote.total_amount`.
    ///
    /// Callers must await this before issuing another create for the same
    /// checkout session; the idempotency key makes a retried attempt safe.
    pub async fn create_intent(
        &self,
        gateway: GatewayId,
        quote: &PriceQuote,
        customer: &Customer,
        description: &str,
        key: &IdempotencyKey,
        capabilities: Option<&GatewayCapabilities>,
    ) -> Result<PaymentIntent> {
        let payload = self.build_payload(gateway, quote, customer, description, key)?;
        let key_id = capabilities.and_then(|c| c.key_id(gateway)).map(String::from);

        tracing::info!(
            gateway = %gateway,
            amount = %quote.total_amount,
            currency = %self.config.currency,
            idempotency_key = %key,
            "Creating payment intent"
        );

        let handle = match payload {
            GatewayPayload::Stripe(request) => {
                let response = self.api.create_stripe_intent(&request, key).await?;
                PaymentIntentHandle::Stripe {
                    client_secret: response.client_secret,
                    publishable_key: key_id,
                }
            }
            GatewayPayload::PayPal(request) => {
                let response = self.api.create_paypal_order(&request, key).await?;
                PaymentIntentHandle::PayPal {
                    order_id: response.id,
                }
            }
            GatewayPayload::Razorpay(request) => {
                let response = self.api.create_razorpay_order(&request, key).await?;
                PaymentIntentHandle::Razorpay {
                    order_id: response.id,
                    key_id,
                }
            }
            GatewayPayload::Upi(request) => {
                let info = self.api.upi_info().await?;
                PaymentIntentHandle::Upi {
                    upi_id: info.upi_id,
                    reference_id: request.reference_id,
                    payee_name: info.payee_name,
                }
            }
        };

        if handle.reference().is_empty() {
            return Err(CheckoutError::gateway(gateway, "backend returned an empty payment reference"));
        }

        tracing::info!(gateway = %gateway, reference = %handle.reference(), "Payment intent created");

        Ok(PaymentIntent::new(
            handle,
            quote.total_amount,
            self.config.currency.clone(),
            key.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;
    use checkout_core::{ProjectType, QuoteRequest, compute_quote};
    use rust_decimal_macros::dec;

    fn quote() -> PriceQuote {
        compute_quote(
            &QuoteRequest::new(ProjectType::Landing)
                .pages(3)
                .feature("seo")
                .complexity(checkout_core::Complexity::Moderate)
                .timeline(checkout_core::Timeline::Priority),
        )
    }

    fn customer() -> Customer {
        Customer::new("Asha Rao", "asha@example.com")
    }

    fn dispatcher(api: Arc<FakeApi>) -> IntentDispatcher {
        IntentDispatcher::new(api, ClientConfig::default())
    }

    fn key() -> IdempotencyKey {
        IdempotencyKey::from_string("chk_s1_stripe_1")
    }

    #[test]
    fn test_payloads_use_gateway_units() {
        let d = dispatcher(Arc::new(FakeApi::default()));
        let q = quote();

        match d.build_payload(GatewayId::Stripe, &q, &customer(), "Landing", &key()).unwrap() {
            GatewayPayload::Stripe(req) => {
                assert_eq!(req.amount, 2_925_000);
                assert_eq!(req.currency, "inr");
            }
            other => panic!("unexpected payload {other:?}"),
        }
        match d.build_payload(GatewayId::PayPal, &q, &customer(), "Landing", &key()).unwrap() {
            GatewayPayload::PayPal(req) => assert_eq!(req.amount, "29250.00"),
            other => panic!("unexpected payload {other:?}"),
        }
        match d.build_payload(GatewayId::Razorpay, &q, &customer(), "Landing", &key()).unwrap() {
            GatewayPayload::Razorpay(req) => {
                assert_eq!(req.amount, 2_925_000);
                assert!(req.receipt.len() <= 40);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        match d.build_payload(GatewayId::Upi, &q, &customer(), "Landing", &key()).unwrap() {
            GatewayPayload::Upi(req) => assert_eq!(req.amount, dec!(29250)),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_every_gateway_has_a_builder() {
        for gateway in GatewayId::ALL {
            assert!(payload_builder(gateway).is_ok());
        }
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_network() {
        let api = Arc::new(FakeApi::default());
        let d = dispatcher(api.clone());
        let mut q = quote();
        q.total_amount = Decimal::ZERO;

        let err = d
            .create_intent(GatewayId::Stripe, &q, &customer(), "Landing", &key(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(api.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_customer_rejected_before_network() {
        let api = Arc::new(FakeApi::default());
        let err = dispatcher(api.clone())
            .create_intent(
                GatewayId::PayPal,
                &quote(),
                &Customer::new("Asha", "nope"),
                "Landing",
                &key(),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(_)));
        assert_eq!(api.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_razorpay_handle_carries_key_from_capabilities() {
        let api = Arc::new(FakeApi::default());
        let caps = GatewayCapabilities::new().with(
            GatewayId::Razorpay,
            checkout_core::GatewayStatus::with_key("rzp_test_abc"),
        );

        let intent = dispatcher(api)
            .create_intent(GatewayId::Razorpay, &quote(), &customer(), "Landing", &key(), Some(&caps))
            .await
            .unwrap();

        assert!(intent.matches(GatewayId::Razorpay, dec!(29250)));
        assert_eq!(
            intent.handle,
            PaymentIntentHandle::Razorpay {
                order_id: "order_1".into(),
                key_id: Some("rzp_test_abc".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_upi_intent_uses_backend_payee() {
        let api = Arc::new(FakeApi::default());
        let intent = dispatcher(api)
            .create_intent(GatewayId::Upi, &quote(), &customer(), "Landing", &key(), None)
            .await
            .unwrap();

        match intent.handle {
            PaymentIntentHandle::Upi { upi_id, reference_id, .. } => {
                assert_eq!(upi_id, "studio@okaxis");
                assert!(reference_id.starts_with("UPI"));
            }
            other => panic!("unexpected handle {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gateway_failure_propagates() {
        let api = Arc::new(FakeApi::default());
        api.fail_creates_with(|| CheckoutError::gateway(GatewayId::Stripe, "stripe is down"));

        let err = dispatcher(api)
            .create_intent(GatewayId::Stripe, &quote(), &customer(), "Landing", &key(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Gateway { .. }));
    }
}
