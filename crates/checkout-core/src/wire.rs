//! REST Wire Types
//!
//! Request and response bodies of the `/api/payment/*` endpoints, shared by
//! the client and the server so both sides agree on field names.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Header carrying the per-attempt idempotency key
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

pub const STATUS_PATH: &str = "/api/payment/status";
pub const STRIPE_CREATE_INTENT_PATH: &str = "/api/payment/stripe/create-intent";
pub const PAYPAL_CREATE_ORDER_PATH: &str = "/api/payment/paypal/create-order";
pub const RAZORPAY_CREATE_ORDER_PATH: &str = "/api/payment/razorpay/create-order";
pub const RAZORPAY_VERIFY_PATH: &str = "/api/payment/razorpay/verify-payment";
pub const UPI_INFO_PATH: &str = "/api/payment/upi/info";
pub const UPI_RECORD_PATH: &str = "/api/payment/upi/record";

/// `POST /api/payment/stripe/create-intent`. Amount in minor units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeIntentRequest {
    pub amount: i64,
    pub currency: String,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeIntentResponse {
    pub client_secret: String,
}

/// `POST /api/payment/paypal/create-order`. Amount as a major-unit string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayPalOrderRequest {
    pub amount: String,
    pub currency: String,
    pub description: String,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// `POST /api/payment/razorpay/create-order`. Amount in paise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RazorpayOrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    #[serde(default)]
    pub notes: BTreeMap<String, String>,
}

/// Order id returned by the PayPal and Razorpay create endpoints
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
}

/// `POST /api/payment/razorpay/verify-payment`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub verified: bool,
}

/// `GET /api/payment/upi/info`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpiInfoResponse {
    pub upi_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payee_name: Option<String>,
}

/// `POST /api/payment/upi/record`, logged for manual reconciliation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpiRecordRequest {
    pub upi_id: String,
    pub amount: Decimal,
    pub reference_id: String,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Error body returned by every endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}
