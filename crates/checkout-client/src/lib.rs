//! # checkout-client
//!
//! The consumer side of the agency checkout: talks to the payment backend,
//! creates intents, drives each gateway's client flow and sequences it all
//! as a wizard.
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use checkout_client::{
//!     AdapterRegistry, CheckoutWizard, ClientConfig, HttpPaymentApi, IntentDispatcher,
//!     PayPalAdapter, UpiAdapter,
//! };
//! use checkout_core::{Customer, GatewayId, ProjectType, QuoteRequest};
//!
//! let config = ClientConfig::from_env();
//! let api = Arc::new(HttpPaymentApi::new(&config)?);
//! let adapters = AdapterRegistry::new()
//!     .with(PayPalAdapter::new(paypal_buttons))
//!     .with(UpiAdapter::new(api.clone(), config.clone()));
//!
//! let mut wizard = CheckoutWizard::new(
//!     IntentDispatcher::new(api, config),
//!     adapters,
//!     QuoteRequest::new(ProjectType::Business).pages(5).feature("cms"),
//! );
//! wizard.submit_details()?;
//! wizard.submit_contact(Customer::new("Asha Rao", "asha@example.com")).await?;
//! wizard.select_gateway(GatewayId::PayPal)?;
//! wizard.begin_payment().await?;
//! wizard.complete_payment().await?;
//! ```

pub mod adapters;
pub mod api;
pub mod config;
pub mod dispatcher;
pub mod loader;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;

pub use adapters::{
    AdapterOutcome, AdapterRegistry, CheckoutAdapter, PayPalAdapter, RazorpayAdapter,
    StripeAdapter, UpiAdapter, UpiPayment,
};
pub use api::{HttpPaymentApi, PaymentApi};
pub use config::ClientConfig;
pub use dispatcher::{GatewayPayload, IntentDispatcher};
pub use loader::{ScriptHost, SdkLoader};
pub use wizard::{BusySignal, CheckoutWizard, Notice, NoticeLevel, WizardStep};
