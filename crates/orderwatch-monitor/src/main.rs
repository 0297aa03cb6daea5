//! orderwatch monitor binary.
//!
//! Reads `orderwatch.toml` (or the path given with `--config`), opens the
//! purchase store, and runs the sync loop until interrupted.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use orderwatch_core::path::expand_tilde;
use orderwatch_feeds::{rates::CbrRateFeed, sheets::SheetsSource};
use orderwatch_monitor::{MonitorConfig, SyncLoop, SystemClock, shutdown_signal};
use orderwatch_notify::TelegramNotifier;
use orderwatch_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "orderwatch purchase sync and overdue monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "orderwatch.toml")]
  config: PathBuf,

  /// Run a single sync cycle and exit.
  #[arg(long)]
  once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = MonitorConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let timeout = cfg.http_timeout();
  let rates = CbrRateFeed::new(cfg.rates.url.clone(), timeout)
    .context("failed to build rate feed client")?;
  let credentials = cfg
    .sheet
    .credentials(timeout)
    .context("failed to load spreadsheet credentials")?;
  let source = SheetsSource::new(
    cfg.sheet.api_base.clone(),
    cfg.sheet.range.clone(),
    credentials,
    timeout,
  )
  .context("failed to build spreadsheet client")?;

  let notifier = cfg
    .telegram
    .as_ref()
    .map(|t| TelegramNotifier::new(t.api_base.clone(), expand_tilde(&t.state_path), timeout))
    .transpose()
    .context("failed to build notifier")?;
  if notifier.is_none() {
    tracing::warn!("no [telegram] section configured, overdue detection is disabled");
  }

  let sync = SyncLoop::new(
    cfg.sync_settings(),
    rates,
    source,
    Arc::new(store),
    notifier,
    SystemClock,
  );

  if cli.once {
    let report = sync.run_cycle().await?;
    tracing::info!(
      rows = report.rows,
      total = report.reconcile.total_after,
      removed = report.reconcile.removed,
      added = report.reconcile.added,
      "sync cycle complete"
    );
    return Ok(());
  }

  // The listener task starts now, so a signal during the first cycle is
  // still seen once that cycle ends.
  let shutdown = shutdown_signal();
  sync.run(shutdown).await;

  Ok(())
}
