//! Server Configuration
//!
//! Gateway credentials are read by each client's own `from_env`; this only
//! covers what belongs to the server itself.

use std::net::SocketAddr;

use anyhow::Context;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Payee for UPI deep links
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpiConfig {
    pub upi_id: String,
    pub payee_name: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `None` disables UPI
    pub upi: Option<UpiConfig>,
}

impl ServerConfig {
    /// Read `BIND_ADDR`, `UPI_ID` and `UPI_PAYEE_NAME`
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR '{bind_addr}' is not a socket address"))?;

        let upi = std::env::var("UPI_ID")
            .ok()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .map(|upi_id| UpiConfig {
                upi_id,
                payee_name: std::env::var("UPI_PAYEE_NAME")
                    .ok()
                    .filter(|n| !n.trim().is_empty()),
            });

        Ok(Self { bind_addr, upi })
    }
}
