//! Payment Backend API
//!
//! [`PaymentApi`] is the seam between the checkout and the backend's
//! `/api/payment/*` endpoints. [`HttpPaymentApi`] is the reqwest
//! implementation; tests swap in fakes.
//!
//! Status mapping:
//!
//! | outcome                         | error                     |
//! |---------------------------------|---------------------------|
//! | transport failure / timeout     | `CheckoutError::Network`  |
//! | 400, 422                        | `CheckoutError::Validation` |
//! | any other non-2xx, bad body     | `CheckoutError::Gateway`  |

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use checkout_core::wire::{
    self, ErrorResponse, IDEMPOTENCY_HEADER, OrderResponse, PayPalOrderRequest,
    RazorpayOrderRequest, StripeIntentRequest, StripeIntentResponse, UpiInfoResponse,
    UpiRecordRequest, VerifyPaymentRequest, VerifyPaymentResponse,
};
use checkout_core::{CheckoutError, GatewayCapabilities, GatewayId, IdempotencyKey, Result};

use crate::config::ClientConfig;

/// Backend operations the checkout needs
#[async_trait]
pub trait PaymentApi: Send + Sync {
    /// Which gateways can take a payment right now
    async fn payment_status(&self) -> Result<GatewayCapabilities>;

    async fn create_stripe_intent(
        &self,
        request: &StripeIntentRequest,
        key: &IdempotencyKey,
    ) -> Result<StripeIntentResponse>;

    async fn create_paypal_order(
        &self,
        request: &PayPalOrderRequest,
        key: &IdempotencyKey,
    ) -> Result<OrderResponse>;

    async fn create_razorpay_order(
        &self,
        request: &RazorpayOrderRequest,
        key: &IdempotencyKey,
    ) -> Result<OrderResponse>;

    /// Server-side signature check of a Razorpay completion
    async fn verify_razorpay_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse>;

    async fn upi_info(&self) -> Result<UpiInfoResponse>;

    /// Log a UPI attempt for manual reconciliation
    async fn record_upi_attempt(&self, request: &UpiRecordRequest) -> Result<()>;
}

/// reqwest-backed [`PaymentApi`]
pub struct HttpPaymentApi {
    client: Client,
    base_url: String,
}

impl HttpPaymentApi {
    /// Create a client for the given configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CheckoutError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(&ClientConfig::from_env())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<R: DeserializeOwned>(&self, path: &str, gateway: Option<GatewayId>) -> Result<R> {
        let request = self.client.get(self.url(path));
        let response = send(request, path).await?;
        decode(response, path, gateway).await
    }

    async fn post<B, R>(
        &self,
        path: &str,
        body: &B,
        gateway: Option<GatewayId>,
        key: Option<&IdempotencyKey>,
    ) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(key) = key {
            request = request.header(IDEMPOTENCY_HEADER, key.as_str());
        }
        let response = send(request, path).await?;
        decode(response, path, gateway).await
    }
}

async fn send(request: RequestBuilder, path: &str) -> Result<Response> {
    request.send().await.map_err(|e| {
        tracing::warn!(path, error = %e, "Payment API request failed");
        CheckoutError::Network(e.to_string())
    })
}

async fn decode<R: DeserializeOwned>(
    response: Response,
    path: &str,
    gateway: Option<GatewayId>,
) -> Result<R> {
    let status = response.status();

    if status.is_success() {
        let body = response.bytes().await.map_err(|e| CheckoutError::Network(e.to_string()))?;
        return serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(path, error = %e, "Malformed payment API response");
            backend_failure(gateway, format!("unexpected response from {path}: {e}"))
        });
    }

    let message = response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());

    tracing::warn!(path, status = %status, error = %message, "Payment API returned an error");

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(CheckoutError::Validation(message))
        }
        _ => Err(backend_failure(gateway, message)),
    }
}

/// Non-gateway endpoints (status) failing is a connectivity problem from the
/// checkout's point of view.
fn backend_failure(gateway: Option<GatewayId>, message: String) -> CheckoutError {
    match gateway {
        Some(gateway) => CheckoutError::gateway(gateway, message),
        None => CheckoutError::Network(message),
    }
}

#[async_trait]
impl PaymentApi for HttpPaymentApi {
    async fn payment_status(&self) -> Result<GatewayCapabilities> {
        self.get(wire::STATUS_PATH, None).await
    }

    async fn create_stripe_intent(
        &self,
        request: &StripeIntentRequest,
        key: &IdempotencyKey,
    ) -> Result<StripeIntentResponse> {
        self.post(
            wire::STRIPE_CREATE_INTENT_PATH,
            request,
            Some(GatewayId::Stripe),
            Some(key),
        )
        .await
    }

    async fn create_paypal_order(
        &self,
        request: &PayPalOrderRequest,
        key: &IdempotencyKey,
    ) -> Result<OrderResponse> {
        self.post(
            wire::PAYPAL_CREATE_ORDER_PATH,
            request,
            Some(GatewayId::PayPal),
            Some(key),
        )
        .await
    }

    async fn create_razorpay_order(
        &self,
        request: &RazorpayOrderRequest,
        key: &IdempotencyKey,
    ) -> Result<OrderResponse> {
        self.post(
            wire::RAZORPAY_CREATE_ORDER_PATH,
            request,
            Some(GatewayId::Razorpay),
            Some(key),
        )
        .await
    }

    async fn verify_razorpay_payment(
        &self,
        request: &VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse> {
        self.post(wire::RAZORPAY_VERIFY_PATH, request, Some(GatewayId::Razorpay), None)
            .await
    }

    async fn upi_info(&self) -> Result<UpiInfoResponse> {
        self.get(wire::UPI_INFO_PATH, Some(GatewayId::Upi)).await
    }

    async fn record_upi_attempt(&self, request: &UpiRecordRequest) -> Result<()> {
        let response = send(
            self.client.post(self.url(wire::UPI_RECORD_PATH)).json(request),
            wire::UPI_RECORD_PATH,
        )
        .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CheckoutError::gateway(
                GatewayId::Upi,
                format!("recording UPI attempt failed with {}", response.status()),
            ))
        }
    }
}
