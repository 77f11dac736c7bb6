//! Payment Intents
//!
//! A gateway-side record of an amount to collect, as seen by the checkout.
//! The backend creates it; the checkout keeps the normalised handle only
//! while the payment step is open.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{CheckoutError, Result};
use crate::gateway::GatewayId;

/// Who is paying
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Customer {
    #[validate(length(min = 1, max = 120, message = "is required"))]
    pub name: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 7, max = 20, message = "must be 7 to 20 characters"))]
    pub phone: Option<String>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            email: email.into().trim().to_string(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Checkout session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key the backend deduplicates intent creation on.
///
/// Stable for retries of the same attempt; a new attempt (new generation)
/// gets a new key and therefore a new intent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn for_attempt(session: &SessionId, gateway: GatewayId, generation: u32) -> Self {
        Self(format!("chk_{session}_{gateway}_{generation}"))
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gateway-specific correlation data, normalised
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gateway", rename_all = "lowercase")]
pub enum PaymentIntentHandle {
    Stripe {
        client_secret: String,
        #[serde(default)]
        publishable_key: Option<String>,
    },
    #[serde(rename = "paypal")]
    PayPal { order_id: String },
    Razorpay {
        order_id: String,
        #[serde(default)]
        key_id: Option<String>,
    },
    Upi {
        upi_id: String,
        reference_id: String,
        #[serde(default)]
        payee_name: Option<String>,
    },
}

impl PaymentIntentHandle {
    pub const fn gateway(&self) -> GatewayId {
        match self {
            Self::Stripe { .. } => GatewayId::Stripe,
            Self::PayPal { .. } => GatewayId::PayPal,
            Self::Razorpay { .. } => GatewayId::Razorpay,
            Self::Upi { .. } => GatewayId::Upi,
        }
    }

    /// Identifier safe to show the user or log (never the Stripe secret)
    pub fn reference(&self) -> &str {
        match self {
            Self::Stripe { client_secret, .. } => client_secret
                .split_once("_secret_")
                .map_or("stripe-intent", |(id, _)| id),
            Self::PayPal { order_id } | Self::Razorpay { order_id, .. } => order_id,
            Self::Upi { reference_id, .. } => reference_id,
        }
    }
}

/// An intent bound to exactly one (gateway, amount) pair
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub handle: PaymentIntentHandle,

    /// Major currency units, as quoted
    pub amount: Decimal,

    pub currency: String,

    pub idempotency_key: IdempotencyKey,

    pub created_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn new(
        handle: PaymentIntentHandle,
        amount: Decimal,
        currency: impl Into<String>,
        idempotency_key: IdempotencyKey,
    ) -> Self {
        Self {
            handle,
            amount,
            currency: currency.into(),
            idempotency_key,
            created_at: Utc::now(),
        }
    }

    pub const fn gateway(&self) -> GatewayId {
        self.handle.gateway()
    }

    /// Whether this intent may still be used to collect `amount` via `gateway`
    pub fn matches(&self, gateway: GatewayId, amount: Decimal) -> bool {
        self.gateway() == gateway && self.amount == amount
    }

    /// Fail unless the intent still matches what is about to be charged
    pub fn ensure_matches(&self, gateway: GatewayId, amount: Decimal) -> Result<()> {
        if self.matches(gateway, amount) {
            Ok(())
        } else {
            Err(CheckoutError::Validation(format!(
                "payment intent {} was created for {} {} via {}, not {} {} via {}",
                self.handle.reference(),
                self.amount,
                self.currency,
                self.gateway(),
                amount,
                self.currency,
                gateway
            )))
        }
    }
}
