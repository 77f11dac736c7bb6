//! UPI Deep Links
//!
//! Builds `upi://pay` links understood by UPI apps, plus a QR code of the
//! same link for desktop visitors to scan with a phone.
//!
//! Parameter order is fixed (`pa`, `am`, `pn`, `tn`, `cu`). Optional
//! parameters are left out entirely when unset; some UPI apps reject a link
//! with an empty `pn=` or `tn=`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use qrcode::QrCode;
use qrcode::render::svg;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// Characters `encodeURIComponent` leaves alone
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DEFAULT_CURRENCY: &str = "INR";

/// A UPI payment request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpiLink {
    /// Virtual payment address, e.g. `studio@okbank`
    pub payee_id: String,
    pub amount: Option<Decimal>,
    pub payee_name: Option<String>,
    pub note: Option<String>,
    pub currency: String,
}

impl UpiLink {
    pub fn new(payee_id: impl Into<String>) -> Self {
        Self {
            payee_id: payee_id.into(),
            amount: None,
            payee_name: None,
            note: None,
            currency: DEFAULT_CURRENCY.into(),
        }
    }

    pub const fn amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn payee_name(mut self, name: impl Into<String>) -> Self {
        self.payee_name = Some(name.into());
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check the link can be handed to a UPI app
    pub fn validate(&self) -> Result<()> {
        let payee = self.payee_id.trim();
        if payee.is_empty() || !payee.contains('@') || payee.contains(char::is_whitespace) {
            return Err(CheckoutError::Validation(format!(
                "'{}' is not a valid UPI id",
                self.payee_id
            )));
        }
        if let Some(amount) = self.amount {
            if amount <= Decimal::ZERO {
                return Err(CheckoutError::Validation("UPI amount must be positive".into()));
            }
        }
        if self.currency.trim().is_empty() {
            return Err(CheckoutError::Validation("UPI currency is required".into()));
        }
        Ok(())
    }

    /// Render the `upi://pay?...` link
    pub fn to_uri(&self) -> Result<String> {
        self.validate()?;

        let mut uri = format!("upi://pay?pa={}", self.payee_id.trim());
        if let Some(amount) = self.amount {
            uri.push_str("&am=");
            uri.push_str(&amount.normalize().to_string());
        }
        if let Some(name) = non_empty(self.payee_name.as_deref()) {
            uri.push_str("&pn=");
            uri.push_str(&encode_component(name));
        }
        if let Some(note) = non_empty(self.note.as_deref()) {
            uri.push_str("&tn=");
            uri.push_str(&encode_component(note));
        }
        uri.push_str("&cu=");
        uri.push_str(self.currency.trim());
        Ok(uri)
    }

    /// QR code of [`UpiLink::to_uri`] as an SVG document
    pub fn to_qr_svg(&self) -> Result<String> {
        let uri = self.to_uri()?;
        let code = QrCode::new(uri.as_bytes())
            .map_err(|e| CheckoutError::Validation(format!("UPI link too long for a QR code: {e}")))?;
        Ok(code
            .render::<svg::Color>()
            .min_dimensions(240, 240)
            .quiet_zone(true)
            .build())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_exact_link_format() {
        let link = UpiLink::new("x@bank")
            .amount(dec!(500))
            .payee_name("A B")
            .note("t");
        assert_eq!(
            link.to_uri().unwrap(),
            "upi://pay?pa=x@bank&am=500&pn=A%20B&tn=t&cu=INR"
        );
    }

    #[test]
    fn test_optional_params_are_omitted() {
        let link = UpiLink::new("studio@okaxis").payee_name("   ");
        assert_eq!(link.to_uri().unwrap(), "upi://pay?pa=studio@okaxis&cu=INR");
    }

    #[test]
    fn test_amount_drops_trailing_zeros() {
        let link = UpiLink::new("studio@okaxis").amount(dec!(29250.00));
        assert_eq!(link.to_uri().unwrap(), "upi://pay?pa=studio@okaxis&am=29250&cu=INR");

        let link = UpiLink::new("studio@okaxis").amount(dec!(292.50));
        assert_eq!(link.to_uri().unwrap(), "upi://pay?pa=studio@okaxis&am=292.5&cu=INR");
    }

    #[test]
    fn test_note_is_uri_component_encoded() {
        let link = UpiLink::new("studio@okaxis").note("Quote #42 & co (landing)");
        assert_eq!(
            link.to_uri().unwrap(),
            "upi://pay?pa=studio@okaxis&tn=Quote%20%2342%20%26%20co%20(landing)&cu=INR"
        );
    }

    #[test]
    fn test_invalid_payee_rejected() {
        assert!(UpiLink::new("nobank").to_uri().is_err());
        assert!(UpiLink::new("x@bank").amount(dec!(0)).to_uri().is_err());
    }

    #[test]
    fn test_qr_encodes_link() {
        let svg = UpiLink::new("x@bank").amount(dec!(500)).to_qr_svg().unwrap();
        assert!(svg.contains("<svg"));
    }
}
