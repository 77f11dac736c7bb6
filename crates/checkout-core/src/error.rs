//! Error Types
//!
//! One taxonomy for the whole checkout flow. Every variant maps onto a
//! [`Recovery`] policy so the wizard knows whether to keep the user on the
//! current step, ask them to retry, or send them to support.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::GatewayId;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Checkout error types
#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Bad user input, caught before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport or connectivity failure
    #[error("Network error: {0}")]
    Network(String),

    /// The gateway (or the backend on its behalf) reported a failure
    #[error("Gateway error ({gateway}): {message}")]
    Gateway { gateway: GatewayId, message: String },

    /// Payment claimed successful by the client but the server-side check failed
    #[error("Payment verification failed for payment {payment_id}")]
    Verification { payment_id: String },

    /// Gateway id not known to this build
    #[error("Unknown gateway: {0}")]
    UnknownGateway(String),

    /// Wizard operation not allowed from the current step
    #[error("Invalid transition: cannot {action} from {from}")]
    InvalidTransition { from: String, action: &'static str },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What the UI should do after an error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    /// Re-render the form with field-level messages
    CorrectInput,
    /// Show a dismissible notice and stay on the current step
    RetryLater,
    /// Money may have moved; hand the user a reference and point them at support
    ContactSupport,
    /// Programming or configuration mistake; reload the checkout
    Restart,
}

impl CheckoutError {
    /// Shorthand for a gateway failure
    pub fn gateway(gateway: GatewayId, message: impl Into<String>) -> Self {
        Self::Gateway {
            gateway,
            message: message.into(),
        }
    }

    /// Check if the failed action may be retried as-is
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Gateway { .. })
    }

    /// Recovery policy for this error
    pub const fn recovery(&self) -> Recovery {
        match self {
            Self::Validation(_) => Recovery::CorrectInput,
            Self::Network(_) | Self::Gateway { .. } => Recovery::RetryLater,
            Self::Verification { .. } => Recovery::ContactSupport,
            Self::UnknownGateway(_)
            | Self::InvalidTransition { .. }
            | Self::Config(_)
            | Self::Json(_) => Recovery::Restart,
        }
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("Please check your details: {msg}"),
            Self::Network(_) => {
                "We couldn't reach the payment service. Check your connection and try again.".into()
            }
            Self::Gateway { gateway, .. } => format!(
                "{} is not responding right now. Please try again or pick another payment method.",
                gateway.display_name()
            ),
            Self::Verification { payment_id } => format!(
                "We couldn't confirm your payment. Please contact support with payment reference {payment_id}."
            ),
            Self::UnknownGateway(_) => "That payment method is not supported.".into(),
            _ => "Something went wrong. Please reload the page and try again.".into(),
        }
    }
}

impl From<validator::ValidationErrors> for CheckoutError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(ToString::to_string))
                    .unwrap_or_else(|| "is invalid".into());
                format!("{field} {detail}")
            })
            .collect();
        fields.sort();
        Self::Validation(fields.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_policy() {
        assert_eq!(
            CheckoutError::Validation("amount".into()).recovery(),
            Recovery::CorrectInput
        );
        assert_eq!(
            CheckoutError::Network("timeout".into()).recovery(),
            Recovery::RetryLater
        );
        assert_eq!(
            CheckoutError::gateway(GatewayId::Stripe, "down").recovery(),
            Recovery::RetryLater
        );
        assert_eq!(
            CheckoutError::Verification {
                payment_id: "pay_1".into()
            }
            .recovery(),
            Recovery::ContactSupport
        );
    }

    #[test]
    fn test_verification_message_carries_reference() {
        let err = CheckoutError::Verification {
            payment_id: "pay_29QQoUBi66xm2f".into(),
        };
        assert!(err.user_message().contains("pay_29QQoUBi66xm2f"));
        assert!(!err.is_retryable());
    }
}
