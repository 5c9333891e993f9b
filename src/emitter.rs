//! Stamping parsed statistics and handing them to the output.

use tablewatch_types::{StatsEvent, TableStats};
use tracing::debug;

use crate::output::Sink;

/// Turns parsed [`TableStats`] into [`StatsEvent`]s and publishes them.
///
/// The emitter owns the opened output for the lifetime of the poller. It does
/// not buffer or retry; whatever the sink does with a failed push is final.
#[derive(Debug)]
pub struct Emitter {
    sink: Sink,
}

impl Emitter {
    pub fn new(sink: Sink) -> Self {
        Self { sink }
    }

    /// Stamp `stats` with the current time and `table`, then publish it.
    ///
    /// Returns `true` if the output accepted the event.
    pub async fn emit(&self, table: &str, stats: TableStats) -> bool {
        let event = StatsEvent::now(table, stats);
        let accepted = self.sink.publish(&event).await;
        if accepted {
            debug!(table, timestamp_ms = event.timestamp_ms, "Event sent");
        }
        accepted
    }

    /// Close the underlying output. Consumes the emitter so nothing can be
    /// published afterwards.
    pub async fn close(self) -> std::io::Result<()> {
        self.sink.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use tablewatch_types::EventKind;

    #[tokio::test]
    async fn test_emit_stamps_event() {
        let (output, mut rx) = Output::channel(4);
        let emitter = Emitter::new(output.connect().await.unwrap());

        let stats = TableStats {
            pending_flushes: 3,
            read_latency: 1.5,
            ..Default::default()
        };
        assert!(emitter.emit("keyspace1.users", stats).await);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.table_name, "keyspace1.users");
        assert_eq!(event.kind, EventKind::Stats);
        assert_eq!(event.count, 1);
        assert_eq!(event.stats, stats);
        assert!(event.timestamp_ms > 0);
    }

    #[tokio::test]
    async fn same_stats_differ_only_in_timestamp() {
        let (output, mut rx) = Output::channel(4);
        let emitter = Emitter::new(output.connect().await.unwrap());

        let stats = TableStats {
            number_of_keys: 10,
            ..Default::default()
        };
        emitter.emit("users", stats).await;
        emitter.emit("users", stats).await;

        let mut first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        first.timestamp_ms = second.timestamp_ms;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn close_drops_channel() {
        let (output, mut rx) = Output::channel(4);
        let emitter = Emitter::new(output.connect().await.unwrap());

        emitter.close().await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
