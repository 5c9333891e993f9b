use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tablewatch::{Emitter, Poller, Settings};

#[derive(Parser, Debug)]
#[command(name = "tablewatch")]
#[command(about = "Poll per-table storage statistics and emit one event per table per interval")]
struct Args {
    /// Path to a TOML config file (default: ./tablewatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Table to poll; repeat for several. Replaces the configured list.
    #[arg(short, long = "table")]
    tables: Vec<String>,

    /// Polling interval (e.g., "10s", "500ms")
    #[arg(short, long)]
    period: Option<String>,

    /// Probe command, invoked as `<probe> <table>`
    #[arg(long)]
    probe: Option<PathBuf>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tablewatch=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = settings_from_args(&args)?;

    let sink = settings
        .output()
        .connect()
        .await
        .context("Failed to open output")?;
    let mut poller = Poller::from_settings(&settings, Emitter::new(sink));

    if poller.tables().is_empty() {
        warn!("No tables configured, cycles will do nothing");
    }

    if args.once {
        let cycle = poller.run_cycle().await;
        info!(emitted = cycle.emitted, failed = cycle.failed, "Cycle complete");
        poller.close().await;
        return Ok(());
    }

    let stop = poller.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down gracefully");
                stop.stop();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    poller.run().await;
    Ok(())
}

/// Load settings and apply command-line overrides.
fn settings_from_args(args: &Args) -> Result<Settings> {
    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load configuration")?;

    settings.apply_overrides(
        &args.tables,
        args.period.as_deref(),
        args.probe.as_deref(),
    )?;
    Ok(settings)
}
