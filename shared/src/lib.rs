//! Shared types for the MagPro client
//!
//! Common types used by the client core and any presentation layer:
//! data models, push/notice message types, money helpers.

pub mod message;
pub mod models;
pub mod money;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{Notice, NoticeLevel, PushEvent};
pub use models::{
    CartItem, PendingOrder, Product, SeatMap, SeatStatus, Table, TableStatus, GROUP_SEAT,
};
