//! Cart and pending order models

use serde::{Deserialize, Serialize};

/// One line of an in-progress order.
///
/// Merge identity is `(id, note)`: re-adding the same product with the same
/// note bumps the quantity, a different note creates a distinct line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product id
    pub id: i64,
    pub name: String,
    pub price: f64,
    /// Quantity, fractional for weight items. Always `> 0`; a line that
    /// would drop below 1 is removed instead.
    pub qty: f64,
    /// Sanitized free-text note (quotes stripped, ≤ 200 chars).
    #[serde(default)]
    pub note: String,
}

impl CartItem {
    pub fn merges_with(&self, product_id: i64, note: &str) -> bool {
        self.id == product_id && self.note == note
    }
}

/// An order captured while the server was unreachable, persisted until a
/// resubmission is acknowledged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub table_id: i64,
    pub seat_number: u32,
    pub items: Vec<CartItem>,
    pub user_name: String,
    /// Capture time, UTC milliseconds.
    pub timestamp: i64,
}

impl PendingOrder {
    /// Offline-queue key. Millisecond timestamps are fixed-width, so the
    /// store's sorted key list stays in chronological order.
    pub fn queue_key(&self) -> String {
        format!("order_{}_{}", self.timestamp, self.seat_number)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_keys_sort_chronologically() {
        let mk = |ts: i64, seat: u32| PendingOrder {
            table_id: 1,
            seat_number: seat,
            items: vec![],
            user_name: "ana".into(),
            timestamp: ts,
        };
        let a = mk(1_700_000_000_000, 2).queue_key();
        let b = mk(1_700_000_000_001, 1).queue_key();
        let c = mk(1_700_000_050_000, 0).queue_key();
        let mut keys = vec![c.clone(), a.clone(), b.clone()];
        keys.sort();
        assert_eq!(keys, vec![a, b, c]);
    }

    #[test]
    fn merge_identity_is_id_and_note() {
        let line = CartItem {
            id: 7,
            name: "Pizza".into(),
            price: 12.0,
            qty: 1.0,
            note: "no olives".into(),
        };
        assert!(line.merges_with(7, "no olives"));
        assert!(!line.merges_with(7, ""));
        assert!(!line.merges_with(8, "no olives"));
    }
}
