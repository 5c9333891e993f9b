//! Parsed storage statistics for a single table.

/// Storage-engine statistics for one table, as reported by the probe.
///
/// Every field is always populated. Values the probe could not provide are
/// carried as zero rather than as an absent value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableStats {
    /// Memtable flushes waiting to run.
    pub pending_flushes: i64,

    /// Number of SSTables on disk.
    pub sstable_count: i64,

    /// Bytes used by live SSTables.
    pub space_used_live: i64,

    /// Bytes used by all SSTables, including those awaiting compaction.
    pub space_used_total: i64,

    /// Bytes held by snapshots.
    pub space_used_snapshot_total: i64,

    /// Estimated number of partition keys.
    pub number_of_keys: i64,

    /// Local read latency score.
    pub read_latency: f64,

    /// Local write latency score.
    pub write_latency: f64,
}

impl TableStats {
    /// Wire names of the fields, in the order the probe reports them.
    pub const FIELD_NAMES: [&'static str; 8] = [
        "pending_flushes",
        "sstable_count",
        "space_used_live",
        "space_used_total",
        "space_used_snapshot_total",
        "number_of_keys",
        "read_latency",
        "write_latency",
    ];

    /// Check whether every field is zero.
    ///
    /// A table the probe knows nothing about reports all sentinels, which
    /// parses to this state.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
