//! Input validation and sanitization
//!
//! Everything typed by an operator passes through here before it reaches
//! the cart, the store, or the wire.

use std::net::Ipv4Addr;

use crate::{ClientError, ClientResult};

/// Maximum stored note length, in characters
pub const MAX_NOTE_LEN: usize = 200;

/// Validate a server address as a dotted-quad IPv4 address.
pub fn validate_ip(address: &str) -> ClientResult<Ipv4Addr> {
    address
        .trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| ClientError::Validation("Enter a valid server IP address.".into()))
}

/// Parse an operator-typed quantity. Accepts fractional values (weight
/// items), rejects anything non-finite or not strictly positive.
pub fn validate_quantity(text: &str) -> ClientResult<f64> {
    let qty = text
        .trim()
        .parse::<f64>()
        .map_err(|_| ClientError::Validation("Enter a valid quantity.".into()))?;
    if !qty.is_finite() || qty <= 0.0 {
        return Err(ClientError::Validation("Enter a valid quantity.".into()));
    }
    Ok(qty)
}

/// Sanitize a free-text note: strip both quote kinds, trim whitespace, and
/// truncate to [`MAX_NOTE_LEN`] characters. Never fails; a hostile note
/// just comes out shorter.
pub fn sanitize_note(raw: &str) -> String {
    raw.replace(['"', '\''], "")
        .trim()
        .chars()
        .take(MAX_NOTE_LEN)
        .collect()
}

/// Require a non-empty user name.
pub fn validate_username(name: &str) -> ClientResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ClientError::Validation("Enter a user name.".into()));
    }
    Ok(name)
}
