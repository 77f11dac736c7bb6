//! HTTP Handlers

use std::future::Future;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use checkout_core::wire::{
    ErrorResponse, IDEMPOTENCY_HEADER, OrderResponse, PayPalOrderRequest, RazorpayOrderRequest,
    StripeIntentRequest, StripeIntentResponse, UpiInfoResponse, UpiRecordRequest,
    VerifyPaymentRequest, VerifyPaymentResponse,
};
use checkout_core::{GatewayCapabilities, GatewayId, GatewayStatus};
use checkout_payments::{
    Begin, IdempotencyStore, PaymentError, PaymentRecord, PaymentStatus, RecordStore, Reservation,
    UpiAttempt, WebhookHandler, fingerprint,
};

use crate::state::AppState;

type ApiError = (StatusCode, Json<ErrorResponse>);

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateways: Vec<GatewayId>,
}

// ============================================================================
// Helpers
// ============================================================================

fn api_error(e: &PaymentError) -> ApiError {
    let status = match e {
        PaymentError::InvalidRequest(_)
        | PaymentError::WebhookSignature(_)
        | PaymentError::WebhookParse(_) => StatusCode::BAD_REQUEST,
        PaymentError::IdempotencyConflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PaymentError::InFlight(_) => StatusCode::CONFLICT,
        PaymentError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        PaymentError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        PaymentError::Config(_) | PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "Payment request failed");
    } else {
        tracing::warn!(error = %e, "Payment request rejected");
    }
    (
        status,
        Json(ErrorResponse {
            error: e.user_message(),
            code: e.code().into(),
        }),
    )
}

fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Run `op` at most once per idempotency key; later calls replay its response.
/// The key is released if `op` fails or the request is dropped mid-call.
async fn idempotent<Req, Resp, F, Fut>(
    state: &AppState,
    key: Option<&str>,
    route: &str,
    request: &Req,
    op: F,
) -> Result<Resp, PaymentError>
where
    Req: Serialize,
    Resp: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Resp, PaymentError>>,
{
    let Some(key) = key else {
        return op().await;
    };

    let fp = fingerprint(&(route, request))?;
    if let Begin::Replay(body) = state.idempotency.begin(key, &fp)? {
        tracing::info!(idempotency_key = %key, route, "Replaying idempotent response");
        return serde_json::from_value(body).map_err(|e| PaymentError::Storage(e.to_string()));
    }

    let reservation = Reservation::new(state.idempotency.as_ref(), key);
    let response = op().await?;
    let body = serde_json::to_value(&response).map_err(|e| PaymentError::Storage(e.to_string()))?;
    reservation.complete(body)?;
    Ok(response)
}

fn configured_gateways(state: &AppState) -> GatewayCapabilities {
    let stripe = state
        .stripe
        .as_ref()
        .and_then(|s| s.publishable_key())
        .map_or_else(GatewayStatus::unavailable, |key| GatewayStatus::with_key(key));
    let paypal = state
        .paypal
        .as_ref()
        .map_or_else(GatewayStatus::unavailable, |p| GatewayStatus::with_key(p.client_id()));
    let razorpay = state
        .razorpay
        .as_ref()
        .map_or_else(GatewayStatus::unavailable, |r| GatewayStatus::with_key(r.key_id()));
    let upi = if state.upi.is_some() {
        GatewayStatus::available()
    } else {
        GatewayStatus::unavailable()
    };

    GatewayCapabilities::new()
        .with(GatewayId::Stripe, stripe)
        .with(GatewayId::PayPal, paypal)
        .with(GatewayId::Razorpay, razorpay)
        .with(GatewayId::Upi, upi)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let gateways = configured_gateways(&state);
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        gateways: GatewayId::ALL
            .into_iter()
            .filter(|g| gateways.is_available(*g))
            .collect(),
    })
}

/// Which gateways can take a payment, with their public keys
pub async fn payment_status(State(state): State<AppState>) -> Json<GatewayCapabilities> {
    Json(configured_gateways(&state))
}

pub async fn create_stripe_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StripeIntentRequest>,
) -> Result<Json<StripeIntentResponse>, ApiError> {
    let stripe = state
        .stripe
        .clone()
        .ok_or_else(|| api_error(&PaymentError::NotConfigured(GatewayId::Stripe)))?;
    let key = idempotency_key(&headers);
    let key = key.as_deref();
    let request = &request;

    idempotent(&state, key, "stripe", request, || async move {
        stripe.create_payment_intent(request, key).await
    })
    .await
    .map(Json)
    .map_err(|e| api_error(&e))
}

pub async fn create_paypal_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PayPalOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let paypal = state
        .paypal
        .clone()
        .ok_or_else(|| api_error(&PaymentError::NotConfigured(GatewayId::PayPal)))?;
    let key = idempotency_key(&headers);
    let key = key.as_deref();
    let request = &request;

    idempotent(&state, key, "paypal", request, || async move {
        paypal.create_order(request, key).await
    })
    .await
    .map(Json)
    .map_err(|e| api_error(&e))
}

pub async fn create_razorpay_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RazorpayOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let razorpay = state
        .razorpay
        .clone()
        .ok_or_else(|| api_error(&PaymentError::NotConfigured(GatewayId::Razorpay)))?;
    let key = idempotency_key(&headers);
    let key = key.as_deref();
    let request = &request;

    idempotent(&state, key, "razorpay", request, || async move {
        razorpay.create_order(request).await
    })
    .await
    .map(Json)
    .map_err(|e| api_error(&e))
}

/// Check the signature of a completed Razorpay checkout
pub async fn verify_razorpay_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    let razorpay = state
        .razorpay
        .as_ref()
        .ok_or_else(|| api_error(&PaymentError::NotConfigured(GatewayId::Razorpay)))?;

    let verified = razorpay.verify_payment(&request);
    if verified {
        let record = PaymentRecord::new(GatewayId::Razorpay, &request.payment_id, PaymentStatus::Succeeded)
            .message(format!("order {}", request.order_id));
        state.records.save_payment(&record).map_err(|e| api_error(&e))?;
    }

    Ok(Json(VerifyPaymentResponse { verified }))
}

pub async fn upi_info(State(state): State<AppState>) -> Result<Json<UpiInfoResponse>, ApiError> {
    let upi = state
        .upi
        .as_ref()
        .ok_or_else(|| api_error(&PaymentError::NotConfigured(GatewayId::Upi)))?;

    Ok(Json(UpiInfoResponse {
        upi_id: upi.upi_id.clone(),
        payee_name: upi.payee_name.clone(),
    }))
}

/// Log a UPI attempt for manual reconciliation
pub async fn record_upi_attempt(
    State(state): State<AppState>,
    Json(request): Json<UpiRecordRequest>,
) -> Result<StatusCode, ApiError> {
    let attempt = UpiAttempt::from_request(request).map_err(|e| api_error(&e))?;
    state
        .records
        .save_upi_attempt(&attempt)
        .map_err(|e| api_error(&e))?;

    tracing::info!(
        reference_id = %attempt.reference_id,
        amount = %attempt.amount,
        email = %attempt.customer_email,
        "Recorded UPI attempt"
    );
    Ok(StatusCode::ACCEPTED)
}

/// Stripe webhook endpoint
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let secret = state
        .stripe
        .as_ref()
        .and_then(|s| s.webhook_secret())
        .ok_or_else(|| api_error(&PaymentError::NotConfigured(GatewayId::Stripe)))?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Missing Stripe signature".into(),
                    code: "MISSING_SIGNATURE".into(),
                }),
            )
        })?;

    let handler = WebhookHandler::new(state.records.clone());
    let event = handler
        .parse_event(&body, signature, secret)
        .map_err(|e| api_error(&e))?;
    handler.handle(&event).map_err(|e| api_error(&e))?;

    Ok(StatusCode::OK)
}
