//! Output backends for emitting stats events.

use std::path::PathBuf;

use tablewatch_types::StatsEvent;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter, Stdout};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Output destination for stats events.
///
/// An `Output` only describes where events go. Call [`Output::connect`] once
/// at start-up to open it as a [`Sink`].
#[derive(Debug)]
pub enum Output {
    /// Write events to standard output as newline-delimited JSON.
    Stdout,

    /// Append events to a file as newline-delimited JSON.
    File(PathBuf),

    /// Send events to a TCP server.
    ///
    /// Each event is sent as a newline-delimited JSON message over a single
    /// connection opened at start-up.
    Tcp(String),

    /// Send events through a channel.
    ///
    /// Use `Output::channel()` to create this variant and get the receiver.
    Channel(mpsc::Sender<StatsEvent>),
}

impl Output {
    /// Create a file output.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tablewatch::Output;
    ///
    /// let output = Output::file("tablestats.ndjson");
    /// ```
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Output::File(path.into())
    }

    /// Create a TCP output.
    pub fn tcp(addr: impl Into<String>) -> Self {
        Output::Tcp(addr.into())
    }

    /// Create a channel output and return both the output and receiver.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tablewatch::Output;
    ///
    /// let (output, mut rx) = Output::channel(16);
    ///
    /// // Later, receive events
    /// // while let Some(event) = rx.recv().await {
    /// //     println!("{}: {} keys", event.table_name, event.stats.number_of_keys);
    /// // }
    /// ```
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<StatsEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Output::Channel(tx), rx)
    }

    /// Open the output.
    ///
    /// Files are created if missing and appended to. TCP outputs connect
    /// here; failing to connect is the only fatal output error.
    pub async fn connect(self) -> std::io::Result<Sink> {
        let target = match self {
            Output::Stdout => Target::Stdout(BufWriter::new(tokio::io::stdout())),
            Output::File(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .await?;
                Target::File(BufWriter::new(file))
            }
            Output::Tcp(addr) => {
                let stream = TcpStream::connect(&addr).await?;
                debug!(addr = %addr, "Connected TCP output");
                Target::Tcp(BufWriter::new(stream))
            }
            Output::Channel(tx) => Target::Channel(tx),
        };
        Ok(Sink {
            target: Mutex::new(target),
        })
    }
}

/// An opened output, accepting one event at a time.
///
/// Delivery is best effort: failures are logged and never retried.
#[derive(Debug)]
pub struct Sink {
    target: Mutex<Target>,
}

#[derive(Debug)]
enum Target {
    Stdout(BufWriter<Stdout>),
    File(BufWriter<File>),
    Tcp(BufWriter<TcpStream>),
    Channel(mpsc::Sender<StatsEvent>),
}

impl Sink {
    /// Push one event to the output.
    ///
    /// Returns `false` if the event could not be handed over.
    pub async fn publish(&self, event: &StatsEvent) -> bool {
        let mut target = self.target.lock().await;
        let result = match &mut *target {
            Target::Stdout(w) => write_line(w, event).await,
            Target::File(w) => write_line(w, event).await,
            Target::Tcp(w) => write_line(w, event).await,
            Target::Channel(tx) => {
                // Best effort send (don't block if channel is full)
                tx.try_send(event.clone())
                    .map_err(|e| std::io::Error::other(e.to_string()))
            }
        };

        if let Err(e) = result {
            warn!(table = %event.table_name, error = %e, "Failed to publish event");
            return false;
        }
        true
    }

    /// Flush and close the output.
    pub async fn close(self) -> std::io::Result<()> {
        match self.target.into_inner() {
            Target::Stdout(mut w) => w.flush().await,
            Target::File(mut w) => w.flush().await,
            Target::Tcp(mut w) => w.shutdown().await,
            Target::Channel(_) => Ok(()),
        }
    }
}

async fn write_line<W>(writer: &mut W, event: &StatsEvent) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}
