//! # tablewatch-types
//!
//! Core types for per-table storage statistics. These are the records that
//! tablewatch produces once per table per polling interval and hands to its
//! configured output.
//!
//! ## Features
//!
//! - `serde`: JSON serialization via serde, using the event wire names
//!   (`@timestamp`, `type`, `table_name`, ...)
//!
//! ## Example
//!
//! ```rust
//! use tablewatch_types::{EventKind, StatsEvent, TableStats};
//!
//! let stats = TableStats {
//!     pending_flushes: 3,
//!     number_of_keys: 10_000,
//!     read_latency: 1.5,
//!     ..TableStats::default()
//! };
//!
//! let event = StatsEvent::new("users", stats, 1703160000000);
//! assert_eq!(event.kind, EventKind::Stats);
//! assert_eq!(event.count, 1);
//! ```

mod event;
mod stats;

pub use event::*;
pub use stats::*;
