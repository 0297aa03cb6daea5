//! orderwatch-notify: processes bot commands.
//!
//! Runs one pass over pending `/subscribe` and `/unsubscribe` messages and
//! exits, or keeps polling with `--poll-secs`.
//!
//! ```
//! orderwatch-notify --state telegram_notifier.toml
//! orderwatch-notify --state telegram_notifier.toml --poll-secs 5
//! ```

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use orderwatch_notify::{TelegramNotifier, telegram::TELEGRAM_API_BASE};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "orderwatch bot command processor")]
struct Cli {
  /// Path to the notifier state file (token, subscribers, cursor).
  #[arg(short, long, default_value = "telegram_notifier.toml")]
  state: PathBuf,

  /// Bot API base URL.
  #[arg(long, default_value = TELEGRAM_API_BASE)]
  api_base: String,

  /// Keep polling, sleeping this many seconds between passes.
  #[arg(long)]
  poll_secs: Option<u64>,

  /// Per-request timeout in seconds.
  #[arg(long, default_value_t = 30)]
  timeout_secs: u64,
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

  let notifier = TelegramNotifier::new(
    cli.api_base,
    cli.state,
    Duration::from_secs(cli.timeout_secs),
  )
  .context("failed to build notifier")?;

  let Some(poll_secs) = cli.poll_secs else {
    let summary = notifier.refresh().await.context("command pass failed")?;
    tracing::info!(updates = summary.updates, commands = summary.commands, "processed updates");
    return Ok(());
  };

  let period = Duration::from_secs(poll_secs);
  loop {
    match notifier.refresh().await {
      Ok(summary) if summary.updates > 0 => {
        tracing::info!(updates = summary.updates, commands = summary.commands, "processed updates");
      }
      Ok(_) => {}
      Err(e) => tracing::error!(error = %e, "command pass failed"),
    }

    tokio::select! {
      _ = tokio::signal::ctrl_c() => {
        tracing::info!("shutting down");
        return Ok(());
      }
      _ = tokio::time::sleep(period) => {}
    }
  }
}
