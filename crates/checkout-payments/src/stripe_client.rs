//! Stripe Payment Intents
//!
//! Embedded checkout (Stripe Elements): the server creates a PaymentIntent
//! and hands its client secret to the page, which confirms it in place.
//!
//! ```text
//! ┌──────────────┐  create-intent   ┌──────────┐  PaymentIntent::create
//! │ Checkout page│─────────────────▶│  Server  │──────────────────────▶ Stripe
//! │  (Elements)  │◀─────────────────│          │◀──────────────────────
//! └──────┬───────┘  client_secret   └──────────┘
//!        │ confirmPayment
//!        ▼
//!      Stripe ─── payment_intent.succeeded ──▶ /webhook/stripe
//! ```

use std::collections::HashMap;

use stripe::{
    Client, CreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods, Currency,
    PaymentIntent, RequestStrategy,
};

use checkout_core::GatewayId;
use checkout_core::wire::{StripeIntentRequest, StripeIntentResponse};

use crate::error::{PaymentError, Result};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    publishable_key: Option<String>,
    webhook_secret: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            publishable_key: None,
            webhook_secret: None,
        }
    }

    #[must_use]
    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    /// Create from `STRIPE_SECRET_KEY`, plus the optional
    /// `STRIPE_PUBLISHABLE_KEY` and `STRIPE_WEBHOOK_SECRET`
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;

        let mut client = Self::new(&secret_key);
        if let Ok(key) = std::env::var("STRIPE_PUBLISHABLE_KEY") {
            client = client.with_publishable_key(key);
        }
        if let Ok(secret) = std::env::var("STRIPE_WEBHOOK_SECRET") {
            client = client.with_webhook_secret(secret);
        }
        Ok(client)
    }

    /// Advertised to the page in `/api/payment/status`
    pub fn publishable_key(&self) -> Option<&str> {
        self.publishable_key.as_deref()
    }

    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref()
    }

    /// Create a PaymentIntent. `idempotency_key` is forwarded to Stripe, so a
    /// retried create returns the original intent.
    pub async fn create_payment_intent(
        &self,
        request: &StripeIntentRequest,
        idempotency_key: Option<&str>,
    ) -> Result<StripeIntentResponse> {
        validate(request)?;
        let currency = parse_currency(&request.currency)?;

        let mut params = CreatePaymentIntent::new(request.amount, currency);
        params.description = Some(&request.description);
        params.receipt_email = Some(&request.customer_email);
        params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
            enabled: true,
            ..Default::default()
        });

        let mut metadata: HashMap<String, String> = request
            .metadata
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        metadata
            .entry("customer_name".into())
            .or_insert_with(|| request.customer_name.clone());
        params.metadata = Some(metadata);

        let client = match idempotency_key {
            Some(key) => self
                .client
                .clone()
                .with_strategy(RequestStrategy::Idempotent(key.to_string())),
            None => self.client.clone(),
        };

        let intent = PaymentIntent::create(&client, params)
            .await
            .map_err(|e| PaymentError::upstream(GatewayId::Stripe, e.to_string()))?;

        tracing::info!(
            payment_intent = %intent.id,
            amount = request.amount,
            currency = %currency,
            "Created Stripe PaymentIntent"
        );

        let client_secret = intent
            .client_secret
            .ok_or_else(|| PaymentError::upstream(GatewayId::Stripe, "no client secret returned"))?;

        Ok(StripeIntentResponse { client_secret })
    }
}

/// Stripe currencies are lowercase ISO codes
fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.trim().to_lowercase()))
        .map_err(|_| PaymentError::InvalidRequest(format!("unsupported currency '{code}'")))
}

fn validate(request: &StripeIntentRequest) -> Result<()> {
    if request.amount <= 0 {
        return Err(PaymentError::InvalidRequest("amount must be greater than zero".into()));
    }
    if request.customer_email.trim().is_empty() {
        return Err(PaymentError::InvalidRequest("customer email is required".into()));
    }
    Ok(())
}
