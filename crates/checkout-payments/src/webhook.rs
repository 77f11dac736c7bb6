//! Stripe Webhook Handling
//!
//! Records PaymentIntent outcomes reported by Stripe. The checkout page
//! learns about success from Elements directly; the webhook is what the
//! studio reconciles against.

use std::sync::Arc;

use stripe::{Event, EventObject, EventType, Webhook};

use checkout_core::GatewayId;

use crate::error::{PaymentError, Result};
use crate::records::{PaymentRecord, PaymentStatus, RecordStore};

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentSucceeded {
        payment_intent_id: String,
        amount: i64,
        currency: String,
    },

    PaymentFailed {
        payment_intent_id: String,
        message: Option<String>,
    },

    /// Unhandled event type
    Other { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler<S: RecordStore> {
    records: Arc<S>,
}

impl<S: RecordStore> WebhookHandler<S> {
    pub fn new(records: Arc<S>) -> Self {
        Self { records }
    }

    /// Verify webhook signature and parse event
    pub fn parse_event(&self, payload: &str, signature: &str, secret: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, secret)
            .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
    }

    /// Process a verified event
    pub fn handle(&self, event: &Event) -> Result<WebhookEvent> {
        tracing::info!(event_type = ?event.type_, "Processing Stripe webhook");
        let parsed = parse_webhook_event(event)?;
        self.apply(&parsed)?;
        Ok(parsed)
    }

    /// Write the outcome of a parsed event to the record store
    pub fn apply(&self, event: &WebhookEvent) -> Result<()> {
        match event {
            WebhookEvent::PaymentSucceeded {
                payment_intent_id,
                amount,
                currency,
            } => {
                self.records.save_payment(
                    &PaymentRecord::new(GatewayId::Stripe, payment_intent_id, PaymentStatus::Succeeded)
                        .amount(*amount, currency),
                )?;
                tracing::info!(
                    payment_intent = %payment_intent_id,
                    amount,
                    currency = %currency,
                    "Recorded Stripe payment"
                );
            }

            WebhookEvent::PaymentFailed {
                payment_intent_id,
                message,
            } => {
                let mut record =
                    PaymentRecord::new(GatewayId::Stripe, payment_intent_id, PaymentStatus::Failed);
                if let Some(message) = message {
                    record = record.message(message);
                }
                self.records.save_payment(&record)?;
                tracing::warn!(
                    payment_intent = %payment_intent_id,
                    error = ?message,
                    "Stripe payment failed"
                );
            }

            WebhookEvent::Other { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
            }
        }
        Ok(())
    }
}

fn parse_webhook_event(event: &Event) -> Result<WebhookEvent> {
    match event.type_ {
        EventType::PaymentIntentSucceeded => {
            if let EventObject::PaymentIntent(intent) = &event.data.object {
                Ok(WebhookEvent::PaymentSucceeded {
                    payment_intent_id: intent.id.to_string(),
                    amount: intent.amount,
                    currency: intent.currency.to_string(),
                })
            } else {
                Err(PaymentError::WebhookParse("Invalid payment intent data".into()))
            }
        }

        EventType::PaymentIntentPaymentFailed => {
            if let EventObject::PaymentIntent(intent) = &event.data.object {
                Ok(WebhookEvent::PaymentFailed {
                    payment_intent_id: intent.id.to_string(),
                    message: intent
                        .last_payment_error
                        .as_ref()
                        .and_then(|e| e.message.clone()),
                })
            } else {
                Err(PaymentError::WebhookParse("Invalid payment intent data".into()))
            }
        }

        _ => Ok(WebhookEvent::Other {
            event_type: format!("{:?}", event.type_),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;

    #[test]
    fn test_rejects_bad_signature() {
        let handler = WebhookHandler::new(Arc::new(MemoryRecordStore::new()));
        let err = handler
            .parse_event("{}", "t=1,v1=deadbeef", "whsec_test")
            .unwrap_err();
        assert!(matches!(err, PaymentError::WebhookSignature(_)));
    }

    #[test]
    fn test_apply_records_outcomes() {
        let store = Arc::new(MemoryRecordStore::new());
        let handler = WebhookHandler::new(store.clone());

        handler
            .apply(&WebhookEvent::PaymentFailed {
                payment_intent_id: "pi_1".into(),
                message: Some("Your card was declined.".into()),
            })
            .unwrap();
        let record = store.payment(GatewayId::Stripe, "pi_1").unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Failed);

        handler
            .apply(&WebhookEvent::PaymentSucceeded {
                payment_intent_id: "pi_1".into(),
                amount: 2_925_000,
                currency: "inr".into(),
            })
            .unwrap();
        let record = store.payment(GatewayId::Stripe, "pi_1").unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Succeeded);
        assert_eq!(record.currency.as_deref(), Some("inr"));
    }

    #[test]
    fn test_other_events_are_ignored() {
        let store = Arc::new(MemoryRecordStore::new());
        WebhookHandler::new(store.clone())
            .apply(&WebhookEvent::Other {
                event_type: "CustomerCreated".into(),
            })
            .unwrap();
        assert!(store.payment(GatewayId::Stripe, "anything").unwrap().is_none());
    }
}
