//! Data models
//!
//! Shared between the client core and the presentation layer.
//! All IDs are `i64` (server-assigned).

pub mod order;
pub mod product;
pub mod table;

// Re-exports
pub use order::*;
pub use product::*;
pub use table::*;
