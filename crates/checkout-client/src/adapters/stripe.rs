//! Stripe Payment Element adapter

use std::sync::Arc;

use async_trait::async_trait;

use checkout_core::{Customer, GatewayId, PaymentIntent, PaymentIntentHandle, Result};

use super::{AdapterOutcome, CheckoutAdapter, wrong_handle};

/// Result of `stripe.confirmPayment`
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StripeConfirmation {
    Succeeded { payment_intent_id: String },
    /// SDK-reported error (card declined, authentication failed, ...)
    Failed { code: Option<String>, message: String },
    /// User closed the payment element without submitting
    Abandoned,
}

/// Stripe.js with a mounted Payment Element
#[async_trait]
pub trait StripeElements: Send + Sync {
    /// Mount the element for `client_secret`, wait for submit, confirm
    async fn confirm_payment(
        &self,
        publishable_key: Option<&str>,
        client_secret: &str,
        billing: &Customer,
    ) -> Result<StripeConfirmation>;
}

pub struct StripeAdapter {
    elements: Arc<dyn StripeElements>,
}

impl StripeAdapter {
    pub fn new(elements: Arc<dyn StripeElements>) -> Self {
        Self { elements }
    }
}

#[async_trait]
impl CheckoutAdapter for StripeAdapter {
    fn gateway(&self) -> GatewayId {
        GatewayId::Stripe
    }

    async fn collect(&self, intent: &PaymentIntent, customer: &Customer) -> Result<AdapterOutcome> {
        let PaymentIntentHandle::Stripe {
            client_secret,
            publishable_key,
        } = &intent.handle
        else {
            return Err(wrong_handle(GatewayId::Stripe, intent));
        };

        let confirmation = self
            .elements
            .confirm_payment(publishable_key.as_deref(), client_secret, customer)
            .await?;

        Ok(match confirmation {
            StripeConfirmation::Succeeded { payment_intent_id } => {
                tracing::info!(payment_intent = %payment_intent_id, "Stripe payment confirmed");
                AdapterOutcome::Succeeded {
                    reference: payment_intent_id,
                }
            }
            StripeConfirmation::Failed { code, message } => {
                tracing::warn!(code = ?code, error = %message, "Stripe confirmation failed");
                AdapterOutcome::Failed { message }
            }
            StripeConfirmation::Abandoned => AdapterOutcome::Cancelled,
        })
    }
}
