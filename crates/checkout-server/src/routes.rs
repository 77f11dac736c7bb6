//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use checkout_core::wire;

use crate::handlers::{
    create_paypal_order, create_razorpay_order, create_stripe_intent, health_check,
    payment_status, record_upi_attempt, stripe_webhook, upi_info, verify_razorpay_payment,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(wire::STATUS_PATH, get(payment_status))
        .route(wire::STRIPE_CREATE_INTENT_PATH, post(create_stripe_intent))
        .route(wire::PAYPAL_CREATE_ORDER_PATH, post(create_paypal_order))
        .route(wire::RAZORPAY_CREATE_ORDER_PATH, post(create_razorpay_order))
        .route(wire::RAZORPAY_VERIFY_PATH, post(verify_razorpay_payment))
        .route(wire::UPI_INFO_PATH, get(upi_info))
        .route(wire::UPI_RECORD_PATH, post(record_upi_attempt))
        .route("/webhook/stripe", post(stripe_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
