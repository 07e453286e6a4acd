//! Product model

use serde::{Deserialize, Serialize};

use crate::money;

/// Menu product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Unit price. Servers have been observed sending numbers, numeric
    /// strings, or nothing at all; anything unparseable arrives as `None`
    /// and the caller decides the fallback (see [`crate::money::parse_money`]).
    #[serde(default, deserialize_with = "money::deserialize_lenient")]
    pub price: Option<f64>,
    /// Optional asset reference, resolved by the presentation layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
