//! Payment Error Types

use thiserror::Error;

use checkout_core::GatewayId;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Server-side payment errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Request rejected before reaching a gateway
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Gateway credentials are not configured on this server
    #[error("{0} is not configured")]
    NotConfigured(GatewayId),

    /// Gateway API call failed
    #[error("{gateway} error: {message}")]
    Upstream { gateway: GatewayId, message: String },

    /// Same idempotency key reused with a different request body
    #[error("Idempotency key {0} was already used for a different request")]
    IdempotencyConflict(String),

    /// First request with this idempotency key is still running
    #[error("Request with idempotency key {0} is still in progress")]
    InFlight(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PaymentError {
    pub fn upstream(gateway: GatewayId, message: impl Into<String>) -> Self {
        Self::Upstream {
            gateway,
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::InFlight(_) | Self::Storage(_))
    }

    /// Stable machine-readable code for the `{error, code}` body
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "VALIDATION_ERROR",
            Self::NotConfigured(_) => "GATEWAY_UNAVAILABLE",
            Self::Upstream { .. } => "GATEWAY_ERROR",
            Self::IdempotencyConflict(_) => "IDEMPOTENCY_CONFLICT",
            Self::InFlight(_) => "REQUEST_IN_PROGRESS",
            Self::WebhookSignature(_) => "INVALID_SIGNATURE",
            Self::WebhookParse(_) => "WEBHOOK_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidRequest(msg) => msg.clone(),
            Self::NotConfigured(gateway) => {
                format!("{} is not available right now.", gateway.display_name())
            }
            Self::Upstream { gateway, .. } => format!(
                "{} could not process the request. Please try again.",
                gateway.display_name()
            ),
            Self::IdempotencyConflict(_) => "This payment attempt was already submitted with different details.".into(),
            Self::InFlight(_) => "This payment attempt is already being processed.".into(),
            _ => "An error occurred processing your request.".into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PaymentError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_retry() {
        let err = PaymentError::upstream(GatewayId::Razorpay, "timeout");
        assert!(err.is_retryable());
        assert_eq!(err.code(), "GATEWAY_ERROR");
        assert!(err.user_message().contains("Razorpay"));

        let err = PaymentError::InvalidRequest("amount must be positive".into());
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "amount must be positive");
    }
}
