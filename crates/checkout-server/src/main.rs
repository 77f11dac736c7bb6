//! checkout-server
//!
//! Axum server behind the checkout wizard: gateway availability, order and
//! intent creation, Razorpay verification and UPI reconciliation.

mod config;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_payments::{
    MemoryIdempotencyStore, MemoryRecordStore, PayPalClient, RazorpayClient, StripeClient,
};

use crate::config::ServerConfig;
use crate::state::AppState;

const PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

fn configured<T, E: std::fmt::Display>(name: &str, client: Result<T, E>) -> Option<Arc<T>> {
    match client {
        Ok(client) => {
            tracing::info!("✓ {name} configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("⚠ {name} not configured: {e}");
            None
        }
    }
}

/// Drop replayable responses past retention, and reservations whose request never finished
fn spawn_idempotency_purge(store: Arc<MemoryIdempotencyStore>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, remaining = store.len(), "Purged idempotency records"),
                Err(e) => tracing::warn!(error = %e, "Idempotency purge failed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    let stripe = configured("Stripe", StripeClient::from_env());
    if stripe.as_ref().is_some_and(|s| s.publishable_key().is_none()) {
        tracing::warn!("  STRIPE_PUBLISHABLE_KEY missing - Stripe will not be offered");
    }
    let paypal = configured("PayPal", PayPalClient::from_env());
    let razorpay = configured("Razorpay", RazorpayClient::from_env());
    match &config.upi {
        Some(upi) => tracing::info!("✓ UPI configured ({})", upi.upi_id),
        None => tracing::warn!("⚠ UPI not configured - set UPI_ID in .env"),
    }

    let idempotency = Arc::new(MemoryIdempotencyStore::new());
    spawn_idempotency_purge(Arc::clone(&idempotency));

    let state = AppState {
        stripe,
        paypal,
        razorpay,
        upi: config.upi.clone(),
        idempotency,
        records: Arc::new(MemoryRecordStore::new()),
    };

    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;

    tracing::info!("checkout-server listening on http://{}", config.bind_addr);
    tracing::info!("  GET  /api/payment/status");
    tracing::info!("  POST /api/payment/{{stripe,paypal,razorpay}}/...");
    tracing::info!("  POST /webhook/stripe");

    axum::serve(listener, app).await?;

    Ok(())
}
