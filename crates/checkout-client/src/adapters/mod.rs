//! Gateway Checkout Adapters
//!
//! Each adapter takes a normalised [`PaymentIntent`] and drives one
//! gateway's client-side flow to an [`AdapterOutcome`]. Adapters never see
//! per-gateway create payloads; that is the dispatcher's job.
//!
//! The third-party SDKs themselves (Stripe Elements, PayPal Buttons,
//! Razorpay Checkout) sit behind small traits that the host page
//! implements.
//!
//! `Err` from [`CheckoutAdapter::collect`] means the flow could not run at
//! all (network down, script blocked). The wizard shows a notice and the
//! user may retry or cancel.

mod paypal;
mod razorpay;
mod stripe;
mod upi;

pub use paypal::{PayPalAdapter, PayPalApproval, PayPalButtons};
pub use razorpay::{
    RazorpayAdapter, RazorpayCheckout, RazorpayEvent, RazorpayOptions, RazorpayPayment,
    RazorpayPrefill, RazorpayTheme,
};
pub use stripe::{StripeAdapter, StripeConfirmation, StripeElements};
pub use upi::UpiAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use checkout_core::{Customer, GatewayId, PaymentIntent, Result, UpiLink};

/// A UPI request handed to the user, awaiting manual reconciliation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpiPayment {
    /// Payee, amount and note the customer is asked to pay
    pub link: UpiLink,
    /// `upi://pay?...` link for mobile redirect
    pub uri: String,
    /// Same link as an SVG QR code for desktop-to-phone scanning
    pub qr_svg: String,
    pub reference_id: String,
}

/// How one payment attempt ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AdapterOutcome {
    /// Gateway-confirmed payment
    Succeeded { reference: String },

    /// User backed out of the gateway flow
    Cancelled,

    /// Gateway declined or errored; the user may try again
    Failed { message: String },

    /// Client reported success but the server could not verify it
    VerificationFailed { payment_id: String },

    /// Initiated but unconfirmed; someone has to reconcile it by hand
    PendingManualVerification(UpiPayment),
}

impl AdapterOutcome {
    pub const fn is_confirmed_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Client-side collection flow for one gateway
#[async_trait]
pub trait CheckoutAdapter: Send + Sync {
    fn gateway(&self) -> GatewayId;

    /// Run the gateway flow for `intent`
    async fn collect(&self, intent: &PaymentIntent, customer: &Customer) -> Result<AdapterOutcome>;
}

/// Registry of adapters by gateway
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<GatewayId, Arc<dyn CheckoutAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter, replacing any previous one for its gateway
    pub fn register<A: CheckoutAdapter + 'static>(&mut self, adapter: A) {
        let gateway = adapter.gateway();
        tracing::debug!(gateway = %gateway, "Registered checkout adapter");
        self.adapters.insert(gateway, Arc::new(adapter));
    }

    pub fn with<A: CheckoutAdapter + 'static>(mut self, adapter: A) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, gateway: GatewayId) -> Option<Arc<dyn CheckoutAdapter>> {
        self.adapters.get(&gateway).cloned()
    }

    pub fn contains(&self, gateway: GatewayId) -> bool {
        self.adapters.contains_key(&gateway)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// Reject an intent that was handed to the wrong adapter
pub(crate) fn wrong_handle(expected: GatewayId, intent: &PaymentIntent) -> checkout_core::CheckoutError {
    checkout_core::CheckoutError::Validation(format!(
        "{expected} adapter received a {} payment intent",
        intent.gateway()
    ))
}
