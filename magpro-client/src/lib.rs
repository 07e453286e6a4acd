//! MagPro client core
//!
//! State synchronization and offline resilience for the MagPro POS
//! terminal: floor-plan refresh with diff-and-patch, a persisted offline
//! order queue, cart aggregation, table/seat transfers, and the server
//! push channel. The presentation layer drives the [`ClientWorker`] over
//! channels and renders the [`UiEvent`]s it emits.

pub mod cart;
pub mod config;
pub mod error;
pub mod http;
pub mod push;
pub mod queue;
pub mod session;
pub mod store;
pub mod sync;
pub mod transfer;
pub mod validation;
pub mod worker;

#[cfg(test)]
pub(crate) mod testutil;

pub use cart::{CartAggregator, CartTotals, QtyChange};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, StateError, TransportError};
pub use http::{Api, HttpClient, StatusResponse};
pub use push::{PushChannel, PushSignal};
pub use queue::{DrainReport, OfflineQueueManager, PendingSummary, SubmitOutcome};
pub use session::SessionContext;
pub use store::{JsonFileStore, MemoryStore, PersistentStore, StoreError};
pub use sync::{FetchOutcome, RefreshDiff, RefreshOutcome, RefreshTrigger, SyncEngine};
pub use transfer::{
    DestinationMode, TransferIntent, TransferOutcome, TransferState, TransferStateMachine,
};
pub use worker::{ClientWorker, Command, TransferPrompt, UiEvent, View};

// Re-export shared types for convenience
pub use shared::{
    CartItem, Notice, NoticeLevel, PendingOrder, Product, PushEvent, SeatMap, SeatStatus, Table,
    TableStatus,
};
