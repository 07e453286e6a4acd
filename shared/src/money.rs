//! Money helpers using rust_decimal for precision
//!
//! Monetary values are modeled as `f64` in the wire types and converted to
//! `Decimal` for any arithmetic, then back for storage/serialization.

use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Rounding for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    #[error("value is not a number: {0}")]
    NotNumeric(String),
    #[error("value is missing")]
    Missing,
    #[error("value is not finite")]
    NotFinite,
}

/// Convert f64 to Decimal for calculation. Non-finite input becomes zero.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64, rounded to 2 decimal places half-up.
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Parse a raw JSON value into a monetary amount.
///
/// Accepts JSON numbers and numeric strings. The caller decides the
/// fallback policy for `Err` (typically zero), keeping silent coercion
/// out of the data path.
pub fn parse_money(raw: &serde_json::Value) -> Result<Decimal, MoneyError> {
    match raw {
        serde_json::Value::Number(n) => {
            let f = n.as_f64().ok_or(MoneyError::NotFinite)?;
            Decimal::from_f64(f).ok_or(MoneyError::NotFinite)
        }
        serde_json::Value::String(s) => s
            .trim()
            .parse::<Decimal>()
            .map_err(|_| MoneyError::NotNumeric(s.clone())),
        serde_json::Value::Null => Err(MoneyError::Missing),
        other => Err(MoneyError::NotNumeric(other.to_string())),
    }
}

/// Serde helper: deserialize a price that may be a number, a numeric
/// string, or malformed. Malformed input becomes `None` rather than a
/// deserialization failure; the consumer applies its own fallback.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(parse_money(&raw).ok().and_then(|d| d.to_f64()))
}
