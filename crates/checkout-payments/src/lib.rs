//! # checkout-payments
//!
//! Server-side payment plumbing behind the `/api/payment/*` endpoints.
//!
//! ```text
//!                   ┌────────────────────┐
//!   create-intent ─▶│   StripeClient     │──▶ Stripe PaymentIntents (async-stripe)
//!   create-order  ─▶│   PayPalClient     │──▶ PayPal Orders v2 (OAuth + reqwest)
//!   create-order  ─▶│   RazorpayClient   │──▶ Razorpay Orders (basic auth + reqwest)
//!   verify-payment ▶│   verify_signature │    HMAC-SHA256, constant time
//!                   └────────────────────┘
//!   Idempotency-Key ──▶ IdempotencyStore   (replay stored responses)
//!   upi/record, webhooks ──▶ RecordStore   (manual reconciliation)
//! ```
//!
//! Every gateway is optional: a client that cannot be built from the
//! environment simply marks that gateway unavailable.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{RazorpayClient, fingerprint, Begin, IdempotencyStore};
//!
//! let razorpay = RazorpayClient::from_env()?;
//! let order = razorpay.create_order(&request).await?;
//! let verified = razorpay.verify_payment(&verify_request);
//! ```

mod error;
mod idempotency;
mod paypal;
mod razorpay;
mod records;
mod stripe_client;
mod webhook;

pub use error::{PaymentError, Result};
pub use idempotency::{
    Begin, DEFAULT_PENDING_TIMEOUT, DEFAULT_RETENTION, IdempotencyStore, MemoryIdempotencyStore,
    Reservation, fingerprint,
};
pub use paypal::PayPalClient;
pub use razorpay::{RazorpayClient, verify_signature};
pub use records::{MemoryRecordStore, PaymentRecord, PaymentStatus, RecordStore, UpiAttempt};
pub use stripe_client::StripeClient;
pub use webhook::{WebhookEvent, WebhookHandler};

