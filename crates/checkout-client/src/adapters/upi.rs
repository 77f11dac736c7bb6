//! UPI adapter
//!
//! UPI has no confirmation callback. The adapter builds the deep link and
//! its QR code, records the attempt with the backend for reconciliation,
//! and reports the payment as pending manual verification.

use std::sync::Arc;

use async_trait::async_trait;

use checkout_core::wire::UpiRecordRequest;
use checkout_core::{Customer, GatewayId, PaymentIntent, PaymentIntentHandle, Result, UpiLink};

use super::{AdapterOutcome, CheckoutAdapter, UpiPayment, wrong_handle};
use crate::api::PaymentApi;
use crate::config::ClientConfig;

pub struct UpiAdapter {
    api: Arc<dyn PaymentApi>,
    config: ClientConfig,
}

impl UpiAdapter {
    pub fn new(api: Arc<dyn PaymentApi>, config: ClientConfig) -> Self {
        Self { api, config }
    }

    fn note(&self, reference_id: &str) -> String {
        format!("{} {reference_id}", self.config.payment_note)
    }
}

#[async_trait]
impl CheckoutAdapter for UpiAdapter {
    fn gateway(&self) -> GatewayId {
        GatewayId::Upi
    }

    async fn collect(&self, intent: &PaymentIntent, customer: &Customer) -> Result<AdapterOutcome> {
        let PaymentIntentHandle::Upi {
            upi_id,
            reference_id,
            payee_name,
        } = &intent.handle
        else {
            return Err(wrong_handle(GatewayId::Upi, intent));
        };

        let payee_name = payee_name
            .clone()
            .unwrap_or_else(|| self.config.merchant_name.clone());
        let note = self.note(reference_id);

        let link = UpiLink::new(upi_id.clone())
            .amount(intent.amount)
            .payee_name(payee_name)
            .note(note.clone());
        let payment = UpiPayment {
            uri: link.to_uri()?,
            qr_svg: link.to_qr_svg()?,
            reference_id: reference_id.clone(),
            link,
        };

        // Recording is best effort; the user already has the link
        let api = Arc::clone(&self.api);
        let record = UpiRecordRequest {
            upi_id: upi_id.clone(),
            amount: intent.amount,
            reference_id: reference_id.clone(),
            customer_name: customer.name.clone(),
            customer_email: customer.email.clone(),
            note: Some(note),
        };
        tokio::spawn(async move {
            if let Err(e) = api.record_upi_attempt(&record).await {
                tracing::warn!(
                    reference_id = %record.reference_id,
                    error = %e,
                    "Failed to record UPI attempt"
                );
            }
        });

        tracing::info!(reference_id = %reference_id, amount = %intent.amount, "UPI payment link issued");
        Ok(AdapterOutcome::PendingManualVerification(payment))
    }
}
