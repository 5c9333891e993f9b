//! StatsEvent - the record pushed to an output for one table in one cycle.

use crate::TableStats;

/// Discriminator identifying what kind of sample an event carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EventKind {
    /// A periodic table statistics sample.
    #[default]
    Stats,
}

/// A timestamped statistics sample for one table.
///
/// Serializes to a flat object:
///
/// ```json
/// {
///   "@timestamp": 1703160000000,
///   "type": "stats",
///   "count": 1,
///   "table_name": "users",
///   "pending_flushes": 3,
///   "...": "...",
///   "write_latency": 2.5
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsEvent {
    /// Unix timestamp in milliseconds when the sample was captured.
    ///
    /// Serialized as an integer, not an RFC 3339 string.
    #[cfg_attr(feature = "serde", serde(rename = "@timestamp"))]
    pub timestamp_ms: u64,

    /// Event discriminator, always [`EventKind::Stats`].
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: EventKind,

    /// Samples represented by this event. One event is one sample.
    pub count: u32,

    /// The table the sample was taken from.
    pub table_name: String,

    #[cfg_attr(feature = "serde", serde(flatten))]
    pub stats: TableStats,
}

impl StatsEvent {
    /// Create an event with a specific capture timestamp.
    pub fn new(table_name: impl Into<String>, stats: TableStats, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            kind: EventKind::Stats,
            count: 1,
            table_name: table_name.into(),
            stats,
        }
    }

    /// Create an event stamped with the current wall-clock time.
    pub fn now(table_name: impl Into<String>, stats: TableStats) -> Self {
        Self::new(table_name, stats, current_timestamp_ms())
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_stats() -> TableStats {
        TableStats {
            pending_flushes: 3,
            sstable_count: 0,
            space_used_live: 1024,
            space_used_total: 2048,
            space_used_snapshot_total: 512,
            number_of_keys: 10000,
            read_latency: 1.5,
            write_latency: 2.5,
        }
    }

    #[test]
    fn test_new_sets_kind_and_count() {
        let event = StatsEvent::new("users", sample_stats(), 1703160000000);
        assert_eq!(event.kind, EventKind::Stats);
        assert_eq!(event.count, 1);
        assert_eq!(event.table_name, "users");
        assert_eq!(event.timestamp_ms, 1703160000000);
    }

    #[test]
    fn now_uses_wall_clock() {
        let before = current_timestamp_ms();
        let event = StatsEvent::now("users", TableStats::default());
        let after = current_timestamp_ms();

        assert!(event.timestamp_ms >= before);
        assert!(event.timestamp_ms <= after);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialized_field_names() {
        let event = StatsEvent::new("users", sample_stats(), 1703160000000);
        let value = serde_json::to_value(&event).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object["@timestamp"], 1703160000000u64);
        assert_eq!(object["type"], "stats");
        assert_eq!(object["count"], 1);
        assert_eq!(object["table_name"], "users");
        for name in TableStats::FIELD_NAMES {
            assert!(object.contains_key(name), "missing {name}");
        }
        assert_eq!(object["space_used_live"], 1024);
        assert_eq!(object["write_latency"], 2.5);
        assert_eq!(object.len(), 12);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let event = StatsEvent::new("users", sample_stats(), 1703160000000);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: StatsEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, parsed);
    }
}
