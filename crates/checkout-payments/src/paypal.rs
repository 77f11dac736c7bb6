//! PayPal Orders v2
//!
//! Client-credentials OAuth, then `POST /v2/checkout/orders` with intent
//! `CAPTURE`. The page's PayPal Buttons approve and capture the order.
//! Access tokens are cached until shortly before they expire.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;

use checkout_core::GatewayId;
use checkout_core::wire::{OrderResponse, PayPalOrderRequest};

use crate::error::{PaymentError, Result};

pub const SANDBOX_API_URL: &str = "https://api-m.sandbox.paypal.com";

/// Header PayPal uses for idempotent order creation
const REQUEST_ID_HEADER: &str = "PayPal-Request-Id";

/// Refresh this long before PayPal says the token expires
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct CreatedOrder {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

pub struct PayPalClient {
    http: Client,
    api_url: String,
    client_id: String,
    secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl PayPalClient {
    pub fn new(api_url: impl Into<String>, client_id: impl Into<String>, secret: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            secret: secret.into(),
            token: Mutex::new(None),
        })
    }

    /// Create from `PAYPAL_CLIENT_ID`, `PAYPAL_SECRET` and optional `PAYPAL_API_URL`
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("PAYPAL_CLIENT_ID")
            .map_err(|_| PaymentError::Config("PAYPAL_CLIENT_ID not set".into()))?;
        let secret = std::env::var("PAYPAL_SECRET")
            .map_err(|_| PaymentError::Config("PAYPAL_SECRET not set".into()))?;
        let api_url = std::env::var("PAYPAL_API_URL").unwrap_or_else(|_| SANDBOX_API_URL.into());

        Self::new(api_url, client_id, secret)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Utc::now()) {
            return Ok(token.value.clone());
        }

        let resp = self
            .http
            .post(format!("{}/v1/oauth2/token", self.api_url))
            .basic_auth(&self.client_id, Some(&self.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| PaymentError::upstream(GatewayId::PayPal, format!("auth request failed: {e}")))?;

        if !resp.status().is_success() {
            tracing::error!(status = %resp.status(), "PayPal authentication failed");
            return Err(PaymentError::upstream(GatewayId::PayPal, "authentication failed"));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|_| PaymentError::upstream(GatewayId::PayPal, "invalid token response"))?;

        let lifetime = (token.expires_in - TOKEN_EXPIRY_MARGIN_SECS).max(0);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime),
        });
        Ok(token.access_token)
    }

    /// Create a CAPTURE order for `request.amount` (major units, two decimals)
    pub async fn create_order(
        &self,
        request: &PayPalOrderRequest,
        idempotency_key: Option<&str>,
    ) -> Result<OrderResponse> {
        let amount: Decimal = request
            .amount
            .parse()
            .map_err(|_| PaymentError::InvalidRequest(format!("'{}' is not an amount", request.amount)))?;
        if amount <= Decimal::ZERO {
            return Err(PaymentError::InvalidRequest("amount must be greater than zero".into()));
        }

        let token = self.access_token().await?;

        let mut unit = json!({
            "description": request.description,
            "amount": {
                "currency_code": request.currency.to_uppercase(),
                "value": request.amount,
            },
        });
        if let Some(reference) = &request.reference_id {
            // PayPal limits reference_id to 256 characters
            unit["reference_id"] = json!(reference.chars().take(256).collect::<String>());
        }
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [unit],
        });

        let mut req = self
            .http
            .post(format!("{}/v2/checkout/orders", self.api_url))
            .bearer_auth(token)
            .json(&body);
        if let Some(key) = idempotency_key {
            req = req.header(REQUEST_ID_HEADER, key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PaymentError::upstream(GatewayId::PayPal, format!("order request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::error!(status = %status, detail = %detail, "PayPal order creation failed");
            return Err(PaymentError::upstream(
                GatewayId::PayPal,
                format!("order creation returned {status}"),
            ));
        }

        let order: CreatedOrder = resp
            .json()
            .await
            .map_err(|_| PaymentError::upstream(GatewayId::PayPal, "invalid order response"))?;

        tracing::info!(
            order_id = %order.id,
            status = ?order.status,
            amount = %request.amount,
            currency = %request.currency,
            "Created PayPal order"
        );
        Ok(OrderResponse { id: order.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(amount: &str) -> PayPalOrderRequest {
        PayPalOrderRequest {
            amount: amount.into(),
            currency: "usd".into(),
            description: "Website project (landing)".into(),
            reference_id: Some("chk_s1_paypal_1".into()),
        }
    }

    async fn mount_token(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ACCESS_TOKEN_XYZ",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_create_order() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .and(header("authorization", "Bearer ACCESS_TOKEN_XYZ"))
            .and(header("PayPal-Request-Id", "chk_s1_paypal_1"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "ORDER_123",
                "status": "CREATED"
            })))
            .mount(&server)
            .await;

        let client = PayPalClient::new(server.uri(), "client", "secret").unwrap();
        let order = client
            .create_order(&request("29250.00"), Some("chk_s1_paypal_1"))
            .await
            .unwrap();
        assert_eq!(order.id, "ORDER_123");
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = MockServer::start().await;
        mount_token(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/v2/checkout/orders"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "ORDER_1" })))
            .expect(2)
            .mount(&server)
            .await;

        let client = PayPalClient::new(server.uri(), "client", "secret").unwrap();
        client.create_order(&request("10.00"), None).await.unwrap();
        client.create_order(&request("10.00"), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_auth_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/oauth2/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = PayPalClient::new(server.uri(), "client", "wrong").unwrap();
        let err = client.create_order(&request("10.00"), None).await.unwrap_err();
        assert!(matches!(err, PaymentError::Upstream { gateway: GatewayId::PayPal, .. }));
    }

    #[tokio::test]
    async fn test_invalid_amount_skips_network() {
        let server = MockServer::start().await;
        mount_token(&server, 0).await;

        let client = PayPalClient::new(server.uri(), "client", "secret").unwrap();
        for amount in ["abc", "0.00", "-5"] {
            let err = client.create_order(&request(amount), None).await.unwrap_err();
            assert!(matches!(err, PaymentError::InvalidRequest(_)));
        }
    }
}
