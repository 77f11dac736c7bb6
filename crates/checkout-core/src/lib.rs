//! # checkout-core
//!
//! Domain types for the agency site's quote-and-pay flow.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────────────┐   ┌──────────────────────┐
//! │ QuoteRequest │──▶│  PriceTable::quote  │──▶│      PriceQuote      │
//! └──────────────┘   └─────────────────────┘   └──────────┬───────────┘
//!                                                          │
//! ┌─────────────────────┐   resolve_available              ▼
//! │ GatewayCapabilities │──────────────────────▶  PaymentIntent (gateway, amount)
//! └─────────────────────┘                                  │
//!                                                          ▼
//!                                         Stripe │ PayPal │ Razorpay │ UPI link
//! ```
//!
//! Everything here is synchronous and free of I/O. The HTTP side lives in
//! `checkout-client` (consumer) and `checkout-server` (backend).

pub mod error;
pub mod gateway;
pub mod intent;
pub mod pricing;
pub mod upi;
pub mod wire;

pub use error::{CheckoutError, Recovery, Result};
pub use gateway::{Availability, GatewayCapabilities, GatewayId, GatewayStatus, resolve_available};
pub use intent::{Customer, IdempotencyKey, PaymentIntent, PaymentIntentHandle, SessionId};
pub use pricing::{
    Complexity, FeatureId, PriceQuote, PriceTable, ProjectType, QuoteRequest, Timeline,
    compute_quote,
};
pub use upi::UpiLink;

/// Currency unit helpers shared by the client payload builders and the server
pub mod money {
    use rust_decimal::{Decimal, RoundingStrategy};

    use crate::error::{CheckoutError, Result};

    /// Major units to minor units (rupees to paise, dollars to cents)
    pub fn to_minor_units(amount: Decimal) -> Result<i64> {
        let minor = (amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        i64::try_from(minor)
            .map_err(|_| CheckoutError::Validation(format!("amount {amount} is out of range")))
    }

    /// Minor units back to major units
    pub fn from_minor_units(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }

    /// Fixed two-decimal string, the format PayPal expects
    pub fn to_major_string(amount: Decimal) -> String {
        format!(
            "{:.2}",
            amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use rust_decimal_macros::dec;

        #[test]
        fn test_unit_conversion() {
            assert_eq!(to_minor_units(dec!(29250)).unwrap(), 2_925_000);
            assert_eq!(to_minor_units(dec!(10.005)).unwrap(), 1001);
            assert_eq!(from_minor_units(2_925_000), dec!(29250));
            assert_eq!(to_major_string(dec!(29250)), "29250.00");
            assert_eq!(to_major_string(dec!(292.5)), "292.50");
        }
    }
}
