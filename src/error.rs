//! Error types for collecting and configuring.

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while collecting statistics for one table.
///
/// None of these stop the poller; the table is skipped until the next cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The probe command could not be started.
    #[error("Failed to launch probe {program}: {source}")]
    ProbeLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe ran but exited unsuccessfully.
    #[error("Probe {program} exited with {status}: {stderr}")]
    ProbeExit {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The probe did not finish in time and was killed.
    #[error("Probe {program} timed out after {timeout:?}")]
    ProbeTimeout { program: String, timeout: Duration },

    /// The probe's standard output could not be captured as text.
    #[error("Probe output is not valid UTF-8: {0}")]
    ProbeOutput(#[from] std::string::FromUtf8Error),

    /// The report had fewer values than the fixed layout requires.
    #[error("Not enough values returned from probe: got {found}, need {required}")]
    InsufficientFields { found: usize, required: usize },
}

impl CollectError {
    /// Whether the failure came from running the probe, as opposed to
    /// interpreting its report.
    pub fn is_probe_failure(&self) -> bool {
        !matches!(self, CollectError::InsufficientFields { .. })
    }
}

/// Errors that can occur when loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration sources could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A duration string was not understood.
    #[error("Invalid duration '{0}'")]
    Duration(String),

    /// A setting has a value that cannot be used.
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}
