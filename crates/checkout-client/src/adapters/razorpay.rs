//! Razorpay Checkout adapter
//!
//! ```text
//! ensure checkout.js ──▶ open modal ──▶ handler(payment) ──▶ verify-payment
//!                             │                                  │
//!                        ondismiss / failed           verified? Succeeded
//!                                                     else VerificationFailed
//! ```
//!
//! A completion reported by the modal is only a claim. Nothing here returns
//! `Succeeded` until the backend has checked the signature. Once the modal
//! has completed the customer may have been charged, so every path after it
//! keeps the payment id, including a verify call that never got an answer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use checkout_core::money::to_minor_units;
use checkout_core::wire::VerifyPaymentRequest;
use checkout_core::{CheckoutError, Customer, GatewayId, PaymentIntent, PaymentIntentHandle, Result};

use super::{AdapterOutcome, CheckoutAdapter, wrong_handle};
use crate::api::PaymentApi;
use crate::config::ClientConfig;
use crate::loader::{ScriptHost, SdkLoader};

const THEME_COLOR: &str = "#4f46e5";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RazorpayPrefill {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RazorpayTheme {
    pub color: String,
}

/// Options object passed to `new Razorpay(...)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RazorpayOptions {
    pub key: String,
    /// Paise
    pub amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub order_id: String,
    pub prefill: RazorpayPrefill,
    pub theme: RazorpayTheme,
}

/// Payload of the Razorpay `handler` callback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RazorpayPayment {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RazorpayEvent {
    Completed(RazorpayPayment),
    /// `modal.ondismiss`
    Dismissed,
    /// `payment.failed`
    Failed {
        description: String,
        payment_id: Option<String>,
    },
}

/// The `Razorpay` constructor exposed by checkout.js
#[async_trait]
pub trait RazorpayCheckout: Send + Sync {
    /// Open the modal and wait for the first terminal event
    async fn open(&self, options: &RazorpayOptions) -> Result<RazorpayEvent>;
}

pub struct RazorpayAdapter {
    api: Arc<dyn PaymentApi>,
    checkout: Arc<dyn RazorpayCheckout>,
    host: Arc<dyn ScriptHost>,
    loader: Arc<SdkLoader>,
    config: ClientConfig,
}

impl RazorpayAdapter {
    /// Adapter using the process-wide checkout.js loader
    pub fn new(
        api: Arc<dyn PaymentApi>,
        checkout: Arc<dyn RazorpayCheckout>,
        host: Arc<dyn ScriptHost>,
        config: ClientConfig,
    ) -> Self {
        Self {
            api,
            checkout,
            host,
            loader: SdkLoader::razorpay(),
            config,
        }
    }

    #[must_use]
    pub fn with_loader(mut self, loader: Arc<SdkLoader>) -> Self {
        self.loader = loader;
        self
    }

    fn options(
        &self,
        intent: &PaymentIntent,
        order_id: &str,
        key_id: &str,
        customer: &Customer,
    ) -> Result<RazorpayOptions> {
        Ok(RazorpayOptions {
            key: key_id.to_string(),
            amount: to_minor_units(intent.amount)?,
            currency: intent.currency.to_uppercase(),
            name: self.config.merchant_name.clone(),
            description: self.config.payment_note.clone(),
            order_id: order_id.to_string(),
            prefill: RazorpayPrefill {
                name: customer.name.clone(),
                email: customer.email.clone(),
                contact: customer.phone.clone(),
            },
            theme: RazorpayTheme {
                color: THEME_COLOR.into(),
            },
        })
    }

    async fn verify(&self, order_id: &str, payment: RazorpayPayment) -> Result<AdapterOutcome> {
        if payment.razorpay_order_id != order_id {
            tracing::warn!(
                expected = %order_id,
                got = %payment.razorpay_order_id,
                "Razorpay completion for a different order"
            );
            return Ok(AdapterOutcome::VerificationFailed {
                payment_id: payment.razorpay_payment_id,
            });
        }

        let response = match self
            .api
            .verify_razorpay_payment(&VerifyPaymentRequest {
                order_id: payment.razorpay_order_id,
                payment_id: payment.razorpay_payment_id.clone(),
                signature: payment.razorpay_signature,
            })
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    payment_id = %payment.razorpay_payment_id,
                    order_id = %order_id,
                    error = %e,
                    "Razorpay payment could not be verified"
                );
                return Ok(AdapterOutcome::VerificationFailed {
                    payment_id: payment.razorpay_payment_id,
                });
            }
        };

        if response.verified {
            tracing::info!(payment_id = %payment.razorpay_payment_id, "Razorpay payment verified");
            Ok(AdapterOutcome::Succeeded {
                reference: payment.razorpay_payment_id,
            })
        } else {
            tracing::error!(
                payment_id = %payment.razorpay_payment_id,
                order_id = %order_id,
                "Razorpay signature verification failed"
            );
            Ok(AdapterOutcome::VerificationFailed {
                payment_id: payment.razorpay_payment_id,
            })
        }
    }
}

#[async_trait]
impl CheckoutAdapter for RazorpayAdapter {
    fn gateway(&self) -> GatewayId {
        GatewayId::Razorpay
    }

    async fn collect(&self, intent: &PaymentIntent, customer: &Customer) -> Result<AdapterOutcome> {
        let PaymentIntentHandle::Razorpay { order_id, key_id } = &intent.handle else {
            return Err(wrong_handle(GatewayId::Razorpay, intent));
        };
        let key_id = key_id
            .as_deref()
            .ok_or_else(|| CheckoutError::Config("Razorpay key id not advertised by backend".into()))?;

        self.loader.ensure_loaded(self.host.as_ref()).await?;

        let options = self.options(intent, order_id, key_id, customer)?;
        match self.checkout.open(&options).await? {
            RazorpayEvent::Completed(payment) => self.verify(order_id, payment).await,
            RazorpayEvent::Dismissed => {
                tracing::info!(order_id = %order_id, "Razorpay modal dismissed");
                Ok(AdapterOutcome::Cancelled)
            }
            RazorpayEvent::Failed {
                description,
                payment_id,
            } => {
                tracing::warn!(
                    order_id = %order_id,
                    payment_id = ?payment_id,
                    error = %description,
                    "Razorpay payment failed"
                );
                Ok(AdapterOutcome::Failed { message: description })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeApi, FakeHost, ScriptedCheckout};
    use checkout_core::IdempotencyKey;
    use rust_decimal_macros::dec;

    fn intent() -> PaymentIntent {
        PaymentIntent::new(
            PaymentIntentHandle::Razorpay {
                order_id: "order_1".into(),
                key_id: Some("rzp_test_abc".into()),
            },
            dec!(29250),
            "INR",
            IdempotencyKey::from_string("k"),
        )
    }

    fn completed() -> Arc<ScriptedCheckout> {
        ScriptedCheckout::completing("order_1", "pay_1")
    }

    fn adapter(api: Arc<FakeApi>, checkout: Arc<ScriptedCheckout>) -> RazorpayAdapter {
        RazorpayAdapter::new(api, checkout, Arc::new(FakeHost::default()), ClientConfig::default())
            .with_loader(Arc::new(SdkLoader::new("https://cdn.test/checkout.js", "Razorpay")))
    }

    #[tokio::test]
    async fn test_verified_completion_succeeds() {
        let api = Arc::new(FakeApi::default());
        let checkout = completed();
        let outcome = adapter(api.clone(), checkout.clone())
            .collect(&intent(), &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap();

        assert_eq!(outcome, AdapterOutcome::Succeeded { reference: "pay_1".into() });
        assert_eq!(api.verify_calls(), 1);

        let options = checkout.seen.lock().unwrap().clone().unwrap();
        assert_eq!(options.amount, 2_925_000);
        assert_eq!(options.key, "rzp_test_abc");
        assert_eq!(options.order_id, "order_1");
    }

    #[tokio::test]
    async fn test_unverified_completion_never_succeeds() {
        let api = Arc::new(FakeApi::default());
        api.set_verified(false);

        let outcome = adapter(api, completed())
            .collect(&intent(), &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AdapterOutcome::VerificationFailed {
                payment_id: "pay_1".into()
            }
        );
    }

    #[tokio::test]
    async fn test_lost_verify_response_keeps_payment_id() {
        let api = Arc::new(FakeApi::default());
        api.fail_verify_with(|| CheckoutError::Network("connection reset".into()));

        let outcome = adapter(api.clone(), ScriptedCheckout::completing("order_1", "pay_moved"))
            .collect(&intent(), &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AdapterOutcome::VerificationFailed {
                payment_id: "pay_moved".into()
            }
        );
        assert_eq!(api.verify_calls(), 1);
    }

    #[tokio::test]
    async fn test_verify_gateway_error_keeps_payment_id() {
        let api = Arc::new(FakeApi::default());
        api.fail_verify_with(|| CheckoutError::gateway(GatewayId::Razorpay, "502 from backend"));

        let outcome = adapter(api, completed())
            .collect(&intent(), &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap();

        assert!(matches!(outcome, AdapterOutcome::VerificationFailed { payment_id } if payment_id == "pay_1"));
    }

    #[tokio::test]
    async fn test_completion_for_other_order_is_not_verified() {
        let api = Arc::new(FakeApi::default());
        let outcome = adapter(api.clone(), ScriptedCheckout::completing("order_9", "pay_9"))
            .collect(&intent(), &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap();

        assert!(matches!(outcome, AdapterOutcome::VerificationFailed { .. }));
        assert_eq!(api.verify_calls(), 0);
    }

    #[tokio::test]
    async fn test_dismissal_cancels() {
        let outcome = adapter(Arc::new(FakeApi::default()), ScriptedCheckout::new(RazorpayEvent::Dismissed))
            .collect(&intent(), &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome, AdapterOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_key_is_config_error() {
        let mut intent = intent();
        intent.handle = PaymentIntentHandle::Razorpay {
            order_id: "order_1".into(),
            key_id: None,
        };
        let err = adapter(Arc::new(FakeApi::default()), completed())
            .collect(&intent, &Customer::new("Asha", "asha@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Config(_)));
    }
}
