//! Third-party SDK Loading
//!
//! Gateway SDKs that ship as a script tag must be injected once per page
//! lifetime. [`SdkLoader`] is a single-init guard around that injection:
//! the first caller loads, concurrent callers await the same load, later
//! callers return immediately. A failed load is not remembered, so the next
//! attempt tries again.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use checkout_core::{CheckoutError, Result};

pub const RAZORPAY_SCRIPT_URL: &str = "https://checkout.razorpay.com/v1/checkout.js";
pub const RAZORPAY_GLOBAL: &str = "Razorpay";

static RAZORPAY_SDK: LazyLock<Arc<SdkLoader>> =
    LazyLock::new(|| Arc::new(SdkLoader::new(RAZORPAY_SCRIPT_URL, RAZORPAY_GLOBAL)));

/// The page the scripts are injected into
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// Whether `name` is already defined on the global object
    fn has_global(&self, name: &str) -> bool;

    /// Append a script tag for `src` and resolve once it has loaded
    async fn inject_script(&self, src: &str) -> Result<()>;
}

/// Idempotent loader for one SDK script
#[derive(Debug)]
pub struct SdkLoader {
    src: String,
    global: String,
    loaded: OnceCell<()>,
}

impl SdkLoader {
    pub fn new(src: impl Into<String>, global: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            global: global.into(),
            loaded: OnceCell::new(),
        }
    }

    /// Process-wide loader for Razorpay's `checkout.js`
    pub fn razorpay() -> Arc<Self> {
        Arc::clone(&RAZORPAY_SDK)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    /// Load the SDK if nothing has yet
    pub async fn ensure_loaded(&self, host: &dyn ScriptHost) -> Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                if host.has_global(&self.global) {
                    tracing::debug!(global = %self.global, "SDK already present on page");
                    return Ok::<(), CheckoutError>(());
                }

                tracing::info!(src = %self.src, "Injecting SDK script");
                host.inject_script(&self.src).await.map_err(|e| {
                    tracing::warn!(src = %self.src, error = %e, "SDK script failed to load");
                    e
                })?;

                if host.has_global(&self.global) {
                    Ok(())
                } else {
                    Err(CheckoutError::Network(format!(
                        "{} loaded but did not define {}",
                        self.src, self.global
                    )))
                }
            })
            .await
            .map(|_| ())
    }
}
