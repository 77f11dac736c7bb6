//! Reconciliation Records
//!
//! UPI attempts have no gateway confirmation, and Stripe/Razorpay confirm
//! out of band. Both are written here so someone can match payments to
//! projects afterwards.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use checkout_core::GatewayId;
use checkout_core::wire::UpiRecordRequest;

use crate::error::{PaymentError, Result};

/// A UPI payment the customer was asked to make
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpiAttempt {
    pub reference_id: String,
    pub upi_id: String,
    pub amount: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl UpiAttempt {
    pub fn from_request(request: UpiRecordRequest) -> Result<Self> {
        if request.reference_id.trim().is_empty() {
            return Err(PaymentError::InvalidRequest("reference_id is required".into()));
        }
        if request.amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidRequest("amount must be greater than zero".into()));
        }
        Ok(Self {
            reference_id: request.reference_id,
            upi_id: request.upi_id,
            amount: request.amount,
            customer_name: request.customer_name,
            customer_email: request.customer_email,
            note: request.note,
            recorded_at: Utc::now(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

/// A gateway-confirmed payment outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub gateway: GatewayId,
    /// PaymentIntent id, Razorpay payment id, ...
    pub reference: String,
    pub status: PaymentStatus,
    /// Minor units, when the gateway reported one
    pub amount_minor: Option<i64>,
    pub currency: Option<String>,
    pub message: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn new(gateway: GatewayId, reference: impl Into<String>, status: PaymentStatus) -> Self {
        Self {
            gateway,
            reference: reference.into(),
            status,
            amount_minor: None,
            currency: None,
            message: None,
            recorded_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn amount(mut self, amount_minor: i64, currency: impl Into<String>) -> Self {
        self.amount_minor = Some(amount_minor);
        self.currency = Some(currency.into());
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Storage for records awaiting reconciliation
pub trait RecordStore: Send + Sync {
    /// Save a UPI attempt. Re-recording a reference replaces it.
    fn save_upi_attempt(&self, attempt: &UpiAttempt) -> Result<()>;

    fn upi_attempt(&self, reference_id: &str) -> Result<Option<UpiAttempt>>;

    fn upi_attempts(&self) -> Result<Vec<UpiAttempt>>;

    /// Save a payment outcome. Later outcomes for the same reference win.
    fn save_payment(&self, record: &PaymentRecord) -> Result<()>;

    fn payment(&self, gateway: GatewayId, reference: &str) -> Result<Option<PaymentRecord>>;
}

/// In-memory record store (for development)
#[derive(Default)]
pub struct MemoryRecordStore {
    upi: RwLock<HashMap<String, UpiAttempt>>,
    payments: RwLock<HashMap<(GatewayId, String), PaymentRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn save_upi_attempt(&self, attempt: &UpiAttempt) -> Result<()> {
        self.upi
            .write()?
            .insert(attempt.reference_id.clone(), attempt.clone());
        Ok(())
    }

    fn upi_attempt(&self, reference_id: &str) -> Result<Option<UpiAttempt>> {
        Ok(self.upi.read()?.get(reference_id).cloned())
    }

    fn upi_attempts(&self) -> Result<Vec<UpiAttempt>> {
        let mut attempts: Vec<_> = self.upi.read()?.values().cloned().collect();
        attempts.sort_by_key(|a| a.recorded_at);
        Ok(attempts)
    }

    fn save_payment(&self, record: &PaymentRecord) -> Result<()> {
        self.payments
            .write()?
            .insert((record.gateway, record.reference.clone()), record.clone());
        Ok(())
    }

    fn payment(&self, gateway: GatewayId, reference: &str) -> Result<Option<PaymentRecord>> {
        Ok(self
            .payments
            .read()?
            .get(&(gateway, reference.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn upi_request(reference: &str, amount: Decimal) -> UpiRecordRequest {
        UpiRecordRequest {
            upi_id: "studio@okaxis".into(),
            amount,
            reference_id: reference.into(),
            customer_name: "Asha".into(),
            customer_email: "asha@example.com".into(),
            note: Some("Website project".into()),
        }
    }

    #[test]
    fn test_upi_attempt_roundtrip() {
        let store = MemoryRecordStore::new();
        let attempt = UpiAttempt::from_request(upi_request("UPI123", dec!(29250))).unwrap();
        store.save_upi_attempt(&attempt).unwrap();

        assert_eq!(store.upi_attempt("UPI123").unwrap(), Some(attempt));
        assert_eq!(store.upi_attempts().unwrap().len(), 1);
        assert!(store.upi_attempt("UPI999").unwrap().is_none());
    }

    #[test]
    fn test_upi_attempt_validation() {
        assert!(UpiAttempt::from_request(upi_request("", dec!(1))).is_err());
        assert!(UpiAttempt::from_request(upi_request("UPI1", dec!(0))).is_err());
    }

    #[test]
    fn test_later_outcome_wins() {
        let store = MemoryRecordStore::new();
        store
            .save_payment(&PaymentRecord::new(GatewayId::Stripe, "pi_1", PaymentStatus::Failed).message("declined"))
            .unwrap();
        store
            .save_payment(&PaymentRecord::new(GatewayId::Stripe, "pi_1", PaymentStatus::Succeeded).amount(2_925_000, "inr"))
            .unwrap();

        let record = store.payment(GatewayId::Stripe, "pi_1").unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Succeeded);
        assert_eq!(record.amount_minor, Some(2_925_000));
        assert!(store.payment(GatewayId::Razorpay, "pi_1").unwrap().is_none());
    }
}
