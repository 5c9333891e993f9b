//! Parsing of the probe's fixed-layout text report.
//!
//! The probe writes one value per line, in this order:
//!
//! ```text
//! pending_flushes
//! sstable_count
//! space_used_live
//! space_used_total
//! space_used_snapshot_total
//! number_of_keys
//! read_latency
//! write_latency
//! ```
//!
//! A value the probe could not determine is written as a sentinel token,
//! `NAN` for the integer fields and `NaN` for the latencies. Sentinels and
//! values that fail to parse both become zero, so a structurally complete
//! report always yields a fully populated [`TableStats`].

use tablewatch_types::TableStats;
use tracing::warn;

use crate::error::CollectError;

/// Minimum number of values a report must carry.
pub const REQUIRED_FIELDS: usize = 8;

/// Sentinel token for an unavailable integer value.
pub const INT_SENTINEL: &str = "NAN";

/// Sentinel token for an unavailable floating-point value.
pub const FLOAT_SENTINEL: &str = "NaN";

/// How a single report value was interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<T> {
    /// The value parsed as a number.
    Parsed(T),
    /// The probe reported the value as unavailable.
    Sentinel,
    /// The value was neither a number nor the sentinel.
    Unparseable,
}

impl<T: Default> FieldValue<T> {
    /// Apply the fallback policy: anything but a parsed number becomes zero.
    pub fn or_zero(self) -> T {
        match self {
            FieldValue::Parsed(v) => v,
            FieldValue::Sentinel | FieldValue::Unparseable => T::default(),
        }
    }
}

/// Interpret an integer field. The sentinel check is case-sensitive.
pub fn classify_int(raw: &str) -> FieldValue<i64> {
    if raw == INT_SENTINEL {
        return FieldValue::Sentinel;
    }
    raw.parse()
        .map(FieldValue::Parsed)
        .unwrap_or(FieldValue::Unparseable)
}

/// Interpret a floating-point field. The sentinel check is case-sensitive.
///
/// Non-finite results (`nan`, `inf`) count as unparseable.
pub fn classify_float(raw: &str) -> FieldValue<f64> {
    if raw == FLOAT_SENTINEL {
        return FieldValue::Sentinel;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => FieldValue::Parsed(v),
        _ => FieldValue::Unparseable,
    }
}

/// Parse a raw probe report into table statistics.
///
/// Returns [`CollectError::InsufficientFields`] if the report has fewer than
/// [`REQUIRED_FIELDS`] lines. Extra lines are ignored.
pub fn parse_report(raw: &str) -> Result<TableStats, CollectError> {
    let fields: Vec<&str> = raw.split('\n').map(str::trim).collect();

    if fields.len() < REQUIRED_FIELDS {
        return Err(CollectError::InsufficientFields {
            found: fields.len(),
            required: REQUIRED_FIELDS,
        });
    }

    let names = TableStats::FIELD_NAMES;
    let int = |i: usize| resolve(names[i], fields[i], classify_int(fields[i]));
    let float = |i: usize| resolve(names[i], fields[i], classify_float(fields[i]));

    Ok(TableStats {
        pending_flushes: int(0),
        sstable_count: int(1),
        space_used_live: int(2),
        space_used_total: int(3),
        space_used_snapshot_total: int(4),
        number_of_keys: int(5),
        read_latency: float(6),
        write_latency: float(7),
    })
}

fn resolve<T: Default>(name: &str, raw: &str, value: FieldValue<T>) -> T {
    if let FieldValue::Unparseable = value {
        warn!(field = name, value = raw, "Unparseable report value, using zero");
    }
    value.or_zero()
}
