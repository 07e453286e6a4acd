//! Table and catalog synchronization
//!
//! Owns the in-memory tables snapshot and the cache store behind it.
//! Refreshes are diff-and-patch: the fresh list is compared against the
//! snapshot and only the changed ids are reported, so the presentation
//! layer can update widgets in place instead of rebuilding the floor plan.
//!
//! When the server is unreachable the engine falls back to the cached
//! snapshot and reports that it did, leaving the offline decision to the
//! session.

use std::collections::HashMap;
use std::time::Duration;

use shared::{Notice, Product, SeatMap, Table};

use crate::http::Api;
use crate::store::{seats_key, PersistentStore, KEY_PRODUCTS, KEY_TABLES};
use crate::ClientResult;

/// What initiated a refresh. Only manual refreshes surface notices; the
/// periodic timer and push events stay silent on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Manual,
    Periodic,
    Push,
}

/// Changed table ids from one refresh, each list sorted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefreshDiff {
    pub removed: Vec<i64>,
    pub inserted: Vec<i64>,
    pub updated: Vec<i64>,
}

impl RefreshDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.inserted.is_empty() && self.updated.is_empty()
    }
}

/// Outcome of a refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fresh data applied.
    Applied(RefreshDiff),
    /// Server unreachable; snapshot rebuilt from the cache store.
    CachedFallback(RefreshDiff),
    /// Server unreachable and no usable cache.
    Failed,
    /// Another refresh was already in flight; this trigger was absorbed.
    Coalesced,
}

/// Outcome of a single-resource fetch with cache fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fresh(T),
    Cached(T),
    Unavailable,
}

/// Client-side synchronization engine.
pub struct SyncEngine<S: PersistentStore> {
    cache: S,
    snapshot: HashMap<i64, Table>,
    in_flight: bool,
    pending_push: bool,
}

impl<S: PersistentStore> SyncEngine<S> {
    pub fn new(cache: S) -> Self {
        Self {
            cache,
            snapshot: HashMap::new(),
            in_flight: false,
            pending_push: false,
        }
    }

    /// Cache store, for best-effort lookups by other components.
    pub fn cache(&self) -> &S {
        &self.cache
    }

    /// Current snapshot sorted by table name.
    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.snapshot.values().cloned().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    pub fn table(&self, id: i64) -> Option<&Table> {
        self.snapshot.get(&id)
    }

    pub fn refresh_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Single-flight guard. Returns `false` when a refresh is already in
    /// flight; a push trigger arriving then is remembered so exactly one
    /// follow-up refresh runs afterwards.
    pub fn try_begin_refresh(&mut self, trigger: RefreshTrigger) -> bool {
        if self.in_flight {
            if trigger == RefreshTrigger::Push {
                self.pending_push = true;
            }
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Take the coalesced push trigger, if one was absorbed mid-flight.
    pub fn take_pending_push(&mut self) -> bool {
        std::mem::take(&mut self.pending_push)
    }

    /// Apply the result of a tables fetch, ending the in-flight window.
    pub fn complete_refresh(
        &mut self,
        trigger: RefreshTrigger,
        result: ClientResult<Vec<Table>>,
    ) -> (RefreshOutcome, Vec<Notice>) {
        self.in_flight = false;

        match result {
            Ok(tables) => {
                if let Err(err) = self.cache_tables(&tables) {
                    // A cache write failure degrades offline resilience but
                    // must not fail the refresh itself.
                    tracing::warn!(error = %err, "failed to cache tables snapshot");
                }
                let diff = self.apply(tables);
                tracing::debug!(
                    removed = diff.removed.len(),
                    inserted = diff.inserted.len(),
                    updated = diff.updated.len(),
                    "tables refreshed"
                );
                (RefreshOutcome::Applied(diff), Vec::new())
            }
            Err(err) => {
                tracing::warn!(error = %err, ?trigger, "tables fetch failed");
                match self.load_cached_tables() {
                    Some(tables) => {
                        let diff = self.apply(tables);
                        let notices = if trigger == RefreshTrigger::Manual {
                            vec![Notice::warning(
                                "Offline mode: displaying locally saved data.",
                            )]
                        } else {
                            Vec::new()
                        };
                        (RefreshOutcome::CachedFallback(diff), notices)
                    }
                    None => {
                        let notices = if trigger == RefreshTrigger::Manual {
                            vec![err.to_notice()]
                        } else {
                            Vec::new()
                        };
                        (RefreshOutcome::Failed, notices)
                    }
                }
            }
        }
    }

    /// Fetch tables and apply the result. The single-flight guard makes a
    /// nested call return [`RefreshOutcome::Coalesced`] instead of issuing
    /// a second request.
    pub async fn refresh(
        &mut self,
        api: &dyn Api,
        trigger: RefreshTrigger,
    ) -> (RefreshOutcome, Vec<Notice>) {
        if !self.try_begin_refresh(trigger) {
            return (RefreshOutcome::Coalesced, Vec::new());
        }
        let result = api.fetch_tables().await;
        self.complete_refresh(trigger, result)
    }

    /// Seat map for one table, with cache fallback. Fresh data is cached
    /// for the next outage.
    pub async fn seat_map(
        &mut self,
        api: &dyn Api,
        table_id: i64,
        timeout: Duration,
    ) -> FetchOutcome<SeatMap> {
        match api.fetch_table_seats(table_id, timeout).await {
            Ok(map) => {
                if let Ok(value) = serde_json::to_value(&map) {
                    if let Err(err) = self.cache.put(&seats_key(table_id), value) {
                        tracing::warn!(table_id, error = %err, "failed to cache seat map");
                    }
                }
                FetchOutcome::Fresh(map)
            }
            Err(err) => {
                tracing::warn!(table_id, error = %err, "seat map fetch failed");
                match self
                    .cache
                    .get(&seats_key(table_id))
                    .and_then(|v| serde_json::from_value(v).ok())
                {
                    Some(map) => FetchOutcome::Cached(map),
                    None => FetchOutcome::Unavailable,
                }
            }
        }
    }

    /// Product catalog, with cache fallback.
    pub async fn products(&mut self, api: &dyn Api) -> FetchOutcome<Vec<Product>> {
        match api.fetch_products().await {
            Ok(products) => {
                if let Ok(value) = serde_json::to_value(&products) {
                    if let Err(err) = self.cache.put(KEY_PRODUCTS, value) {
                        tracing::warn!(error = %err, "failed to cache product catalog");
                    }
                }
                FetchOutcome::Fresh(products)
            }
            Err(err) => {
                tracing::warn!(error = %err, "product fetch failed");
                match self
                    .cache
                    .get(KEY_PRODUCTS)
                    .and_then(|v| serde_json::from_value(v).ok())
                {
                    Some(products) => FetchOutcome::Cached(products),
                    None => FetchOutcome::Unavailable,
                }
            }
        }
    }

    /// Last cached seat map for a table, if any. Used instead of
    /// [`Self::seat_map`] when the session is already known to be offline,
    /// so no request is issued at all.
    pub fn cached_seat_map(&self, table_id: i64) -> Option<SeatMap> {
        self.cache
            .get(&seats_key(table_id))
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Last cached product catalog, if any.
    pub fn cached_products(&self) -> Option<Vec<Product>> {
        self.cache
            .get(KEY_PRODUCTS)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Opportunistically refresh cached seat maps for occupied tables
    /// after a successful sync. Failures are ignored; this only improves
    /// what a later outage can show.
    pub async fn cache_seat_maps(&mut self, api: &dyn Api, timeout: Duration) {
        let occupied: Vec<i64> = self
            .snapshot
            .values()
            .filter(|t| t.has_occupied_seats())
            .map(|t| t.id)
            .collect();

        for table_id in occupied {
            match api.fetch_table_seats(table_id, timeout).await {
                Ok(map) => {
                    if let Ok(value) = serde_json::to_value(&map) {
                        let _ = self.cache.put(&seats_key(table_id), value);
                    }
                }
                Err(err) => {
                    tracing::debug!(table_id, error = %err, "seat map pre-cache skipped");
                }
            }
        }
    }

    fn cache_tables(&mut self, tables: &[Table]) -> ClientResult<()> {
        self.cache.put(KEY_TABLES, serde_json::to_value(tables)?)?;
        Ok(())
    }

    fn load_cached_tables(&self) -> Option<Vec<Table>> {
        self.cache
            .get(KEY_TABLES)
            .and_then(|v| serde_json::from_value(v).ok())
    }

    /// Diff the fresh list against the snapshot and replace it.
    fn apply(&mut self, tables: Vec<Table>) -> RefreshDiff {
        let fresh: HashMap<i64, Table> = tables.into_iter().map(|t| (t.id, t)).collect();

        let mut diff = RefreshDiff::default();
        for id in self.snapshot.keys() {
            if !fresh.contains_key(id) {
                diff.removed.push(*id);
            }
        }
        for (id, table) in &fresh {
            match self.snapshot.get(id) {
                None => diff.inserted.push(*id),
                Some(old) if old != table => diff.updated.push(*id),
                Some(_) => {}
            }
        }
        diff.removed.sort_unstable();
        diff.inserted.sort_unstable();
        diff.updated.sort_unstable();

        self.snapshot = fresh;
        diff
    }
}
