//! Cart aggregation
//!
//! Merges added products into lines keyed by `(product id, note)` and keeps
//! running totals. All money arithmetic goes through [`shared::money`] so
//! totals never accumulate float drift.

use rust_decimal::Decimal;
use shared::money;
use shared::{CartItem, Product};

use crate::{validation, ClientResult};

/// Result of a quantity decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QtyChange {
    Updated,
    /// The line was at one unit or below and was removed.
    Removed,
}

/// Aggregated totals over the whole cart.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CartTotals {
    /// Sum of quantities, fractional for weight items. Never negative.
    pub item_count: f64,
    /// Amount due, rounded to 2 decimal places. Never negative.
    pub amount_due: f64,
}

/// In-progress order lines for one table/seat.
#[derive(Debug, Default)]
pub struct CartAggregator {
    items: Vec<CartItem>,
}

impl CartAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Add a product with an operator-typed quantity and note. The note is
    /// sanitized first; a line with the same `(id, note)` identity absorbs
    /// the quantity, otherwise a new line is appended.
    pub fn add_item(&mut self, product: &Product, qty_text: &str, note_raw: &str) -> ClientResult<()> {
        let qty = validation::validate_quantity(qty_text)?;
        let note = validation::sanitize_note(note_raw);

        if let Some(line) = self
            .items
            .iter_mut()
            .find(|line| line.merges_with(product.id, &note))
        {
            line.qty += qty;
            return Ok(());
        }

        // Unpriced products go in at zero; the catalog is the source of
        // truth and a missing price must not block order taking.
        self.items.push(CartItem {
            id: product.id,
            name: product.name.clone(),
            price: product.price.unwrap_or(0.0),
            qty,
            note,
        });
        Ok(())
    }

    /// Bump a line by one unit. Out-of-range indices are ignored.
    pub fn increment(&mut self, index: usize) {
        if let Some(line) = self.items.get_mut(index) {
            line.qty += 1.0;
        }
    }

    /// Drop a line by one unit. A line at one unit or less is removed
    /// entirely; above one the quantity shrinks, so a fractional weight
    /// line of 1.5 becomes 0.5 rather than vanishing.
    pub fn decrement(&mut self, index: usize) -> Option<QtyChange> {
        let line = self.items.get_mut(index)?;
        if line.qty > 1.0 {
            line.qty -= 1.0;
            Some(QtyChange::Updated)
        } else {
            self.items.remove(index);
            Some(QtyChange::Removed)
        }
    }

    /// Replace a line's note. Deliberately does not re-merge with a line
    /// that now shares the same identity; the operator edited this line,
    /// collapsing it into another would be surprising.
    pub fn edit_note(&mut self, index: usize, note_raw: &str) {
        if let Some(line) = self.items.get_mut(index) {
            line.note = validation::sanitize_note(note_raw);
        }
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.items.len() {
            self.items.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace the cart with lines fetched from the server.
    pub fn load(&mut self, items: Vec<CartItem>) {
        self.items = items;
    }

    /// Move the lines out, leaving the cart empty.
    pub fn take(&mut self) -> Vec<CartItem> {
        std::mem::take(&mut self.items)
    }

    /// Totals in Decimal space, clamped non-negative. Stored values may
    /// have come back from a server or an old cache file, so non-finite
    /// numbers coerce to zero instead of poisoning the sum.
    pub fn totals(&self) -> CartTotals {
        let mut count = Decimal::ZERO;
        let mut amount = Decimal::ZERO;
        for line in &self.items {
            let qty = money::to_decimal(line.qty);
            count += qty;
            amount += money::to_decimal(line.price) * qty;
        }
        CartTotals {
            item_count: money::to_f64(count.max(Decimal::ZERO)),
            amount_due: money::to_f64(amount.max(Decimal::ZERO)),
        }
    }
}
