//! Payment Gateways
//!
//! Gateway identifiers and the capability map the backend reports from
//! `GET /api/payment/status`.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Supported payment gateways
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayId {
    Stripe,
    #[serde(rename = "paypal")]
    PayPal,
    Razorpay,
    Upi,
}

impl GatewayId {
    pub const ALL: [Self; 4] = [Self::Stripe, Self::PayPal, Self::Razorpay, Self::Upi];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::PayPal => "paypal",
            Self::Razorpay => "razorpay",
            Self::Upi => "upi",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Stripe => "Card payment (Stripe)",
            Self::PayPal => "PayPal",
            Self::Razorpay => "Razorpay",
            Self::Upi => "UPI",
        }
    }

    /// Whether a successful checkout is confirmed automatically.
    ///
    /// UPI deep links are reconciled by hand, so their "success" is only ever
    /// pending.
    pub const fn confirms_automatically(self) -> bool {
        !matches!(self, Self::Upi)
    }
}

impl std::fmt::Display for GatewayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GatewayId {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" => Ok(Self::Stripe),
            "paypal" => Ok(Self::PayPal),
            "razorpay" => Ok(Self::Razorpay),
            "upi" => Ok(Self::Upi),
            other => Err(CheckoutError::UnknownGateway(other.to_string())),
        }
    }
}

/// One gateway's entry in the status response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub available: bool,

    /// Public key the client SDK is initialised with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    /// Anything else the backend attaches; opaque to the checkout
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl GatewayStatus {
    pub fn available() -> Self {
        Self {
            available: true,
            ..Default::default()
        }
    }

    pub fn with_key(key_id: impl Into<String>) -> Self {
        Self {
            available: true,
            key_id: Some(key_id.into()),
            ..Default::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

/// Capability map fetched once per checkout session.
///
/// Entries for gateway ids this build does not know are dropped on decode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, GatewayStatus>", into = "BTreeMap<String, GatewayStatus>")]
pub struct GatewayCapabilities {
    gateways: BTreeMap<GatewayId, GatewayStatus>,
}

impl From<BTreeMap<String, GatewayStatus>> for GatewayCapabilities {
    fn from(raw: BTreeMap<String, GatewayStatus>) -> Self {
        let gateways = raw
            .into_iter()
            .filter_map(|(id, status)| match id.parse::<GatewayId>() {
                Ok(gateway) => Some((gateway, status)),
                Err(_) => {
                    tracing::debug!(gateway = %id, "Ignoring unknown gateway in status response");
                    None
                }
            })
            .collect();
        Self { gateways }
    }
}

impl From<GatewayCapabilities> for BTreeMap<String, GatewayStatus> {
    fn from(caps: GatewayCapabilities) -> Self {
        caps.gateways
            .into_iter()
            .map(|(id, status)| (id.as_str().to_string(), status))
            .collect()
    }
}

impl GatewayCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, gateway: GatewayId, status: GatewayStatus) -> Self {
        self.gateways.insert(gateway, status);
        self
    }

    pub fn get(&self, gateway: GatewayId) -> Option<&GatewayStatus> {
        self.gateways.get(&gateway)
    }

    pub fn is_available(&self, gateway: GatewayId) -> bool {
        self.get(gateway).is_some_and(|s| s.available)
    }

    /// Public key for a gateway's client SDK, if reported
    pub fn key_id(&self, gateway: GatewayId) -> Option<&str> {
        self.get(gateway).and_then(|s| s.key_id.as_deref())
    }
}

/// Gateways whose `available` flag is set; missing entries count as unavailable
pub fn resolve_available(caps: &GatewayCapabilities) -> BTreeSet<GatewayId> {
    caps.gateways
        .iter()
        .filter(|(_, status)| status.available)
        .map(|(id, _)| *id)
        .collect()
}

/// What the payment step should show
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Availability {
    /// Render a selector with these methods
    Offer(BTreeSet<GatewayId>),
    /// Nothing can take a payment: show the "contact us" state instead
    Unavailable,
}

impl Availability {
    pub fn from_capabilities(caps: &GatewayCapabilities) -> Self {
        let available = resolve_available(caps);
        if available.is_empty() {
            Self::Unavailable
        } else {
            Self::Offer(available)
        }
    }

    pub fn offers(&self, gateway: GatewayId) -> bool {
        match self {
            Self::Offer(set) => set.contains(&gateway),
            Self::Unavailable => false,
        }
    }
}
