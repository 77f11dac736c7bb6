//! Razorpay Orders and Payment Signatures
//!
//! Orders are created with basic auth against `/v1/orders` (amount in
//! paise). When the checkout modal completes, the page posts back
//! `{order_id, payment_id, signature}`; the payment only counts once
//!
//! ```text
//! signature == hex(HMAC_SHA256(key_secret, order_id + "|" + payment_id))
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use checkout_core::GatewayId;
use checkout_core::wire::{OrderResponse, RazorpayOrderRequest, VerifyPaymentRequest};

use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_API_URL: &str = "https://api.razorpay.com";

/// Razorpay rejects receipts longer than this
const MAX_RECEIPT_LEN: usize = 40;

#[derive(Debug, Serialize)]
struct CreateOrder<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CreatedOrder {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

pub struct RazorpayClient {
    http: Client,
    api_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(api_url: impl Into<String>, key_id: impl Into<String>, key_secret: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }

    /// Create from `RAZORPAY_KEY_ID`, `RAZORPAY_KEY_SECRET` and optional `RAZORPAY_API_URL`
    pub fn from_env() -> Result<Self> {
        let key_id = std::env::var("RAZORPAY_KEY_ID")
            .map_err(|_| PaymentError::Config("RAZORPAY_KEY_ID not set".into()))?;
        let key_secret = std::env::var("RAZORPAY_KEY_SECRET")
            .map_err(|_| PaymentError::Config("RAZORPAY_KEY_SECRET not set".into()))?;
        let api_url = std::env::var("RAZORPAY_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        Self::new(api_url, key_id, key_secret)
    }

    /// Public key id, handed to the checkout modal
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub async fn create_order(&self, request: &RazorpayOrderRequest) -> Result<OrderResponse> {
        if request.amount <= 0 {
            return Err(PaymentError::InvalidRequest("amount must be greater than zero".into()));
        }
        let receipt: String = request.receipt.chars().take(MAX_RECEIPT_LEN).collect();
        let currency = request.currency.to_uppercase();

        let resp = self
            .http
            .post(format!("{}/v1/orders", self.api_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrder {
                amount: request.amount,
                currency: &currency,
                receipt: &receipt,
                notes: &request.notes,
            })
            .send()
            .await
            .map_err(|e| PaymentError::upstream(GatewayId::Razorpay, format!("order request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, detail = %detail, "Razorpay order creation failed");
            return Err(if status.is_client_error() && status.as_u16() != 401 {
                PaymentError::InvalidRequest(format!("Razorpay rejected the order ({status})"))
            } else {
                PaymentError::upstream(GatewayId::Razorpay, format!("order creation returned {status}"))
            });
        }

        let order: CreatedOrder = resp
            .json()
            .await
            .map_err(|_| PaymentError::upstream(GatewayId::Razorpay, "invalid order response"))?;

        tracing::info!(
            order_id = %order.id,
            status = ?order.status,
            amount = request.amount,
            receipt = %receipt,
            "Created Razorpay order"
        );
        Ok(OrderResponse { id: order.id })
    }

    /// Check a checkout completion against the key secret
    pub fn verify_payment(&self, request: &VerifyPaymentRequest) -> bool {
        let verified = verify_signature(
            &self.key_secret,
            &request.order_id,
            &request.payment_id,
            &request.signature,
        );
        if verified {
            tracing::info!(payment_id = %request.payment_id, order_id = %request.order_id, "Razorpay signature verified");
        } else {
            tracing::warn!(payment_id = %request.payment_id, order_id = %request.order_id, "Razorpay signature mismatch");
        }
        verified
    }
}

/// Constant-time check of a Razorpay payment signature
pub fn verify_signature(key_secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(key_secret.as_bytes()) else {
        return false;
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
