//! Offline order queue
//!
//! Orders that fail to reach the server are persisted and replayed later,
//! oldest first. An entry is deleted only after the server acknowledges the
//! resubmission; any failure stops the pass so ordering is preserved.

use shared::{money, PendingOrder, Table};

use crate::http::Api;
use crate::store::{PersistentStore, KEY_TABLES};
use crate::ClientResult;

/// Outcome of an order submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The server acknowledged the order.
    Sent,
    /// The server was unreachable; the order is persisted under this key.
    Queued(String),
}

/// Result of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    pub synced: usize,
    pub remaining: usize,
}

/// One queued order, enriched for display.
#[derive(Debug, Clone)]
pub struct PendingSummary {
    pub key: String,
    pub table_name: String,
    pub order: PendingOrder,
    pub total: f64,
}

/// Manages the persisted queue of unsent orders.
pub struct OfflineQueueManager<S: PersistentStore> {
    store: S,
}

impl<S: PersistentStore> OfflineQueueManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Submit an order, falling back to the queue on any transport or
    /// server failure. The order is never dropped: either the server has
    /// it, or the store does.
    pub async fn submit(&mut self, api: &dyn Api, order: PendingOrder) -> ClientResult<SubmitOutcome> {
        match api.submit_order(&order).await {
            Ok(_) => Ok(SubmitOutcome::Sent),
            Err(err) => {
                tracing::warn!(error = %err, "order submission failed, queueing locally");
                let key = order.queue_key();
                self.store.put(&key, serde_json::to_value(&order)?)?;
                Ok(SubmitOutcome::Queued(key))
            }
        }
    }

    /// Replay queued orders strictly oldest-first. Each entry is deleted
    /// only after the server acknowledges it; the first failure ends the
    /// pass and everything behind it stays queued for the next attempt.
    pub async fn drain(&mut self, api: &dyn Api) -> ClientResult<DrainReport> {
        let mut synced = 0;

        loop {
            let Some(key) = self.store.keys().into_iter().next() else {
                break;
            };
            let Some(value) = self.store.get(&key) else {
                break;
            };
            let order: PendingOrder = match serde_json::from_value(value) {
                Ok(order) => order,
                Err(err) => {
                    // A malformed entry would wedge the queue forever if we
                    // stopped here. Log it loudly and keep it out of the
                    // drain path by stopping the pass.
                    tracing::error!(key, error = %err, "unreadable queued order, drain halted");
                    break;
                }
            };

            match api.submit_order(&order).await {
                Ok(_) => {
                    self.store.delete(&key)?;
                    synced += 1;
                    tracing::info!(key, "queued order synchronized");
                }
                Err(err) => {
                    tracing::warn!(key, error = %err, "synchronization failed, will retry later");
                    break;
                }
            }
        }

        Ok(DrainReport {
            synced,
            remaining: self.store.len(),
        })
    }

    /// Queued orders in chronological order, with table names resolved
    /// best-effort against the cached tables snapshot.
    pub fn list(&self, cache: &dyn PersistentStore) -> Vec<PendingSummary> {
        let tables: Vec<Table> = cache
            .get(KEY_TABLES)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        self.store
            .keys()
            .into_iter()
            .filter_map(|key| {
                let value = self.store.get(&key)?;
                let order: PendingOrder = serde_json::from_value(value).ok()?;
                let table_name = tables
                    .iter()
                    .find(|t| t.id == order.table_id)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| "unknown table".to_string());
                let total = order_total(&order);
                Some(PendingSummary {
                    key,
                    table_name,
                    order,
                    total,
                })
            })
            .collect()
    }
}

fn order_total(order: &PendingOrder) -> f64 {
    let total = order
        .items
        .iter()
        .map(|line| money::to_decimal(line.price) * money::to_decimal(line.qty))
        .sum();
    money::to_f64(total)
}

/// Raw queued entries, for inspection in tests.
#[cfg(test)]
pub(crate) fn raw_entries<S: PersistentStore>(
    queue: &OfflineQueueManager<S>,
) -> Vec<(String, serde_json::Value)> {
    queue
        .store
        .keys()
        .into_iter()
        .filter_map(|k| queue.store.get(&k).map(|v| (k, v)))
        .collect()
}
