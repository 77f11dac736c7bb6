//! Application State

use std::sync::Arc;

use checkout_payments::{
    MemoryIdempotencyStore, MemoryRecordStore, PayPalClient, RazorpayClient, StripeClient,
};

use crate::config::UpiConfig;

/// Shared application state
#[derive(Clone, Default)]
pub struct AppState {
    /// Gateway clients (None if not configured)
    pub stripe: Option<Arc<StripeClient>>,
    pub paypal: Option<Arc<PayPalClient>>,
    pub razorpay: Option<Arc<RazorpayClient>>,
    pub upi: Option<UpiConfig>,

    /// Stored responses by idempotency key
    pub idempotency: Arc<MemoryIdempotencyStore>,

    /// UPI attempts and webhook outcomes awaiting reconciliation
    pub records: Arc<MemoryRecordStore>,
}
