//! The polling loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::emitter::Emitter;
use crate::error::CollectError;
use crate::probe::{CommandProbe, Probe};
use crate::report::parse_report;

/// Drives periodic collection for a fixed list of tables.
///
/// On every tick the poller walks its tables in order and, for each one, runs
/// the probe, parses the report and emits the result. A failure for one table
/// is logged and the cycle moves on; the next tick is the only retry.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tablewatch::{CommandProbe, Emitter, Output, Poller};
///
/// #[tokio::main]
/// async fn main() -> std::io::Result<()> {
///     let emitter = Emitter::new(Output::Stdout.connect().await?);
///
///     let poller = Poller::builder()
///         .interval(Duration::from_secs(10))
///         .tables(["keyspace1.users", "keyspace1.orders"])
///         .probe(CommandProbe::new("./awkscript.sh"))
///         .build(emitter);
///
///     let stop = poller.handle();
///     tokio::spawn(async move {
///         let _ = tokio::signal::ctrl_c().await;
///         stop.stop();
///     });
///
///     let summary = poller.run().await;
///     println!("{} cycles", summary.cycles);
///     Ok(())
/// }
/// ```
pub struct Poller {
    tables: Vec<String>,
    interval: Duration,
    failure_backoff: Duration,
    probe: Box<dyn Probe>,
    emitter: Emitter,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl Poller {
    /// Create a builder for configuring the poller.
    pub fn builder() -> PollerBuilder {
        PollerBuilder::new()
    }

    /// Create a poller from loaded settings, using the configured command probe.
    pub fn from_settings(settings: &Settings, emitter: Emitter) -> Self {
        Self::builder()
            .interval(settings.period)
            .tables(settings.tables.iter().cloned())
            .failure_backoff(settings.failure_backoff)
            .probe(settings.command_probe())
            .build(emitter)
    }

    /// Get a handle that can stop the poller from another task.
    pub fn handle(&self) -> StopHandle {
        StopHandle {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// The tables polled each cycle, in order.
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Run until stopped.
    ///
    /// The first cycle starts one interval after this is called. Stop always
    /// wins over a tick that is ready at the same time. Once the loop exits
    /// the output is closed.
    pub async fn run(mut self) -> PollSummary {
        info!(
            tables = self.tables.len(),
            interval = ?self.interval,
            probe = %self.probe.description(),
            "tablewatch is running"
        );

        let mut summary = PollSummary::default();
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = wait_for_stop(&mut self.stop_rx) => break,
                _ = ticker.tick() => {}
            }

            let cycle = self.run_cycle().await;
            summary.add(&cycle);
        }

        info!(
            cycles = summary.cycles,
            emitted = summary.emitted,
            failed = summary.failed,
            "Stopping"
        );

        self.close().await;
        summary
    }

    /// Close the output without running. Used after driving cycles by hand
    /// with [`Poller::run_cycle`].
    pub async fn close(self) {
        if let Err(e) = self.emitter.close().await {
            warn!(error = %e, "Failed to close output");
        }
    }

    /// Run a single pass over all tables.
    ///
    /// Checks for a stop request before each table; a table already in
    /// progress is finished.
    pub async fn run_cycle(&mut self) -> PollSummary {
        let mut cycle = PollSummary {
            cycles: 1,
            ..Default::default()
        };

        for table in &self.tables {
            if *self.stop_rx.borrow() {
                debug!("Stop requested, ending cycle early");
                break;
            }

            info!(table = %table, "Getting stats for table");
            let result = self.collect(table).await;
            match result {
                Ok(true) => cycle.emitted += 1,
                Ok(false) => cycle.dropped += 1,
                Err(e) => {
                    cycle.failed += 1;
                    warn!(table = %table, error = %e, "Collection failed");
                    if e.is_probe_failure() {
                        pause(self.failure_backoff, &mut self.stop_rx).await;
                    }
                }
            }
        }

        cycle
    }

    /// Probe, parse and emit one table.
    ///
    /// Returns whether the output accepted the event.
    pub async fn collect(&self, table: &str) -> Result<bool, CollectError> {
        let raw = self.probe.run(table).await?;
        let stats = parse_report(&raw)?;
        Ok(self.emitter.emit(table, stats).await)
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("tables", &self.tables)
            .field("interval", &self.interval)
            .field("probe", &self.probe.description())
            .finish()
    }
}

/// Resolves once a stop has been requested.
async fn wait_for_stop(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stopped| *stopped).await;
}

/// Sleep for `duration`, returning early on stop.
async fn pause(duration: Duration, stop_rx: &mut watch::Receiver<bool>) {
    tokio::select! {
        biased;
        _ = wait_for_stop(stop_rx) => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

/// Counts of what a run (or a single cycle) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Cycles started.
    pub cycles: u64,
    /// Events the output accepted.
    pub emitted: u64,
    /// Events produced but refused by the output.
    pub dropped: u64,
    /// Tables whose probe or report failed.
    pub failed: u64,
}

impl PollSummary {
    fn add(&mut self, other: &PollSummary) {
        self.cycles += other.cycles;
        self.emitted += other.emitted;
        self.dropped += other.dropped;
        self.failed += other.failed;
    }
}

/// Handle for stopping a running [`Poller`].
///
/// Stopping is final; a stopped poller cannot be resumed.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop_tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Request the poller to stop. Safe to call more than once.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

/// Builder for configuring a Poller.
#[derive(Default)]
pub struct PollerBuilder {
    tables: Vec<String>,
    interval: Option<Duration>,
    failure_backoff: Option<Duration>,
    probe: Option<Box<dyn Probe>>,
}

impl PollerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the polling interval.
    ///
    /// Defaults to 10 seconds if not specified.
    ///
    /// # Panics
    ///
    /// [`Poller::run`] panics if the interval is zero; settings loaded through
    /// [`Settings::load`] are already validated against this.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Add tables to poll. Order is preserved.
    pub fn tables<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables.extend(tables.into_iter().map(Into::into));
        self
    }

    /// Set the pause after a failed probe (default: 500ms).
    pub fn failure_backoff(mut self, backoff: Duration) -> Self {
        self.failure_backoff = Some(backoff);
        self
    }

    /// Set the probe (default: [`CommandProbe::default`]).
    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Build the poller around an opened emitter.
    pub fn build(self, emitter: Emitter) -> Poller {
        let (stop_tx, stop_rx) = watch::channel(false);

        Poller {
            tables: self.tables,
            interval: self.interval.unwrap_or(Duration::from_secs(10)),
            failure_backoff: self.failure_backoff.unwrap_or(Duration::from_millis(500)),
            probe: self
                .probe
                .unwrap_or_else(|| Box::new(CommandProbe::default())),
            emitter,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }
}
