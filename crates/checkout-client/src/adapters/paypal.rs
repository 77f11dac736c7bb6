//! PayPal Buttons adapter

use std::sync::Arc;

use async_trait::async_trait;

use checkout_core::{Customer, GatewayId, PaymentIntent, PaymentIntentHandle, Result};

use super::{AdapterOutcome, CheckoutAdapter, wrong_handle};

/// How the PayPal button flow ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayPalApproval {
    /// `onApprove` fired and the button flow captured the order
    Captured { capture_id: String },
    /// `onCancel`
    Cancelled,
    /// `onError`
    Error { message: String },
}

/// PayPal JS SDK buttons
#[async_trait]
pub trait PayPalButtons: Send + Sync {
    /// Render the buttons bound to `order_id` and wait for the flow to end
    async fn render(&self, order_id: &str) -> Result<PayPalApproval>;
}

pub struct PayPalAdapter {
    buttons: Arc<dyn PayPalButtons>,
}

impl PayPalAdapter {
    pub fn new(buttons: Arc<dyn PayPalButtons>) -> Self {
        Self { buttons }
    }
}

#[async_trait]
impl CheckoutAdapter for PayPalAdapter {
    fn gateway(&self) -> GatewayId {
        GatewayId::PayPal
    }

    async fn collect(&self, intent: &PaymentIntent, _customer: &Customer) -> Result<AdapterOutcome> {
        let PaymentIntentHandle::PayPal { order_id } = &intent.handle else {
            return Err(wrong_handle(GatewayId::PayPal, intent));
        };

        Ok(match self.buttons.render(order_id).await? {
            PayPalApproval::Captured { capture_id } => {
                tracing::info!(order_id = %order_id, capture_id = %capture_id, "PayPal order captured");
                AdapterOutcome::Succeeded { reference: capture_id }
            }
            PayPalApproval::Cancelled => {
                tracing::info!(order_id = %order_id, "PayPal flow cancelled");
                AdapterOutcome::Cancelled
            }
            PayPalApproval::Error { message } => {
                tracing::warn!(order_id = %order_id, error = %message, "PayPal flow failed");
                AdapterOutcome::Failed { message }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::IdempotencyKey;
    use rust_decimal_macros::dec;

    struct ScriptedButtons(PayPalApproval);

    #[async_trait]
    impl PayPalButtons for ScriptedButtons {
        async fn render(&self, _order_id: &str) -> Result<PayPalApproval> {
            Ok(self.0.clone())
        }
    }

    fn intent() -> PaymentIntent {
        PaymentIntent::new(
            PaymentIntentHandle::PayPal {
                order_id: "5O190127TN364715T".into(),
            },
            dec!(10000),
            "USD",
            IdempotencyKey::from_string("k"),
        )
    }

    #[tokio::test]
    async fn test_callbacks_map_one_to_one() {
        let customer = Customer::new("Asha", "asha@example.com");

        let captured = PayPalAdapter::new(Arc::new(ScriptedButtons(PayPalApproval::Captured {
            capture_id: "3C679366HH908993F".into(),
        })));
        assert_eq!(
            captured.collect(&intent(), &customer).await.unwrap(),
            AdapterOutcome::Succeeded {
                reference: "3C679366HH908993F".into()
            }
        );

        let cancelled = PayPalAdapter::new(Arc::new(ScriptedButtons(PayPalApproval::Cancelled)));
        assert_eq!(
            cancelled.collect(&intent(), &customer).await.unwrap(),
            AdapterOutcome::Cancelled
        );
    }

    #[tokio::test]
    async fn test_rejects_foreign_handle() {
        let adapter = PayPalAdapter::new(Arc::new(ScriptedButtons(PayPalApproval::Cancelled)));
        let stripe_intent = PaymentIntent::new(
            PaymentIntentHandle::Stripe {
                client_secret: "pi_secret".into(),
                publishable_key: None,
            },
            dec!(1),
            "INR",
            IdempotencyKey::from_string("k"),
        );
        assert!(
            adapter
                .collect(&stripe_intent, &Customer::new("Asha", "asha@example.com"))
                .await
                .is_err()
        );
    }
}
