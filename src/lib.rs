//! # tablewatch
//!
//! Periodically samples per-table storage statistics through an external
//! probe command and emits one structured event per table per interval.
//!
//! ## Architecture
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────────┐
//!  │ Poller (one task, one tick per interval)                     │
//!  │                                                              │
//!  │   for each table, in order:                                  │
//!  │   ┌─────────┐  raw text  ┌─────────┐  TableStats  ┌─────────┐ │
//!  │   │  probe  │───────────▶│ report  │─────────────▶│ emitter │─┼─▶ Sink
//!  │   └─────────┘            └─────────┘              └─────────┘ │
//!  └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`probe`]**: runs `<probe> <table>` and captures its report
//! - **[`report`]**: parses the fixed eight-line report, mapping sentinel and
//!   garbled values to zero
//! - **[`emitter`]**: stamps the stats with table name and time and pushes a
//!   [`StatsEvent`] to the output
//! - **[`output`]**: where events go (stdout, file, TCP, channel)
//! - **[`poller`]**: the fixed-interval loop with a stop handle
//! - **[`config`]**: settings from a TOML file and `TABLEWATCH_*` variables
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Poll the tables listed in tablewatch.toml
//! tablewatch --config tablewatch.toml
//!
//! # Poll two tables every 30 seconds with a specific probe
//! tablewatch --probe ./awkscript.sh --period 30s --table ks.users --table ks.orders
//! ```
//!
//! ### As a library with a channel output
//!
//! ```
//! use std::time::Duration;
//! use tablewatch::{Emitter, Output, Poller};
//!
//! # tokio_test::block_on(async {
//! let (output, mut rx) = Output::channel(16);
//! let emitter = Emitter::new(output.connect().await.unwrap());
//!
//! let poller = Poller::builder()
//!     .interval(Duration::from_secs(10))
//!     .tables(["keyspace1.users"])
//!     .build(emitter);
//!
//! let stop = poller.handle();
//! stop.stop();
//! let summary = poller.run().await;
//! assert_eq!(summary.cycles, 0);
//! # });
//! ```

pub mod config;
pub mod emitter;
pub mod error;
pub mod output;
pub mod poller;
pub mod probe;
pub mod report;

// Re-export main types for convenience
pub use config::{OutputSettings, Settings};
pub use emitter::Emitter;
pub use error::{CollectError, ConfigError};
pub use output::{Output, Sink};
pub use poller::{PollSummary, Poller, PollerBuilder, StopHandle};
pub use probe::{CommandProbe, Probe};
pub use report::parse_report;
pub use tablewatch_types::{EventKind, StatsEvent, TableStats};
