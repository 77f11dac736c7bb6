//! Client Configuration

use std::time::Duration;

use checkout_core::upi::DEFAULT_CURRENCY;

/// Settings for talking to the payment backend
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend origin, e.g. `https://studio.example.com`
    pub api_base_url: String,

    /// ISO currency code quotes are priced in
    pub currency: String,

    /// Shown on gateway overlays and as the UPI payee name fallback
    pub merchant_name: String,

    /// Prefix of the payment description / UPI note
    pub payment_note: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".into(),
            currency: DEFAULT_CURRENCY.into(),
            merchant_name: "Studio".into(),
            payment_note: "Website project".into(),
            timeout_secs: 20,
        }
    }
}

impl ClientConfig {
    /// Read `CHECKOUT_*` variables, falling back to defaults.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            api_base_url: std::env::var("CHECKOUT_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            currency: std::env::var("CHECKOUT_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.currency),
            merchant_name: std::env::var("CHECKOUT_MERCHANT_NAME").unwrap_or(defaults.merchant_name),
            payment_note: std::env::var("CHECKOUT_PAYMENT_NOTE").unwrap_or(defaults.payment_note),
            timeout_secs: std::env::var("CHECKOUT_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
