//! Probe invocation.
//!
//! A probe is an external command that queries the data store for one table
//! and prints a fixed-layout report (see [`crate::report`]). The [`Probe`]
//! trait is the seam between the poller and the process it runs, so tests can
//! substitute canned output.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::CollectError;

/// Probe command used when none is configured.
pub const DEFAULT_PROBE: &str = "awkscript.sh";

/// Something that can produce a raw statistics report for a table.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Run the probe for `table` and return its raw text output.
    async fn run(&self, table: &str) -> Result<String, CollectError>;

    /// Returns a human-readable description of the probe, used in logs.
    fn description(&self) -> String;
}

/// A probe that runs an external command as `<program> <table>`.
///
/// One process is spawned per invocation; nothing is kept between runs.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tablewatch::probe::{CommandProbe, Probe};
///
/// # tokio_test::block_on(async {
/// let probe = CommandProbe::new("./awkscript.sh").timeout(Duration::from_secs(30));
/// let report = probe.run("keyspace1.standard1").await?;
/// println!("{report}");
/// # Ok::<_, tablewatch::CollectError>(())
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl CommandProbe {
    /// Create a probe for the given command path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Kill the probe if it runs longer than `timeout`.
    ///
    /// Without a timeout a hanging probe stalls the whole polling loop.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the command path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }
}

impl Default for CommandProbe {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE)
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn run(&self, table: &str) -> Result<String, CollectError> {
        debug!(program = %self.program.display(), table, "Running probe");

        let child = Command::new(&self.program)
            .arg(table)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollectError::ProbeLaunch {
                program: self.program_name(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| CollectError::ProbeTimeout {
                    program: self.program_name(),
                    timeout,
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|source| CollectError::ProbeLaunch {
            program: self.program_name(),
            source,
        })?;

        if !output.status.success() {
            return Err(CollectError::ProbeExit {
                program: self.program_name(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }

    fn description(&self) -> String {
        format!("command: {}", self.program.display())
    }
}
