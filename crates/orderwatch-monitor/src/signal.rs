//! Process shutdown signals.

use std::future::Future;

use tokio::sync::oneshot;
use tracing::{error, info};

/// Start listening for ctrl-c (and SIGTERM on unix) immediately.
///
/// The listener runs on its own task, so a signal that arrives while the
/// caller is still busy is not lost. The returned future completes once a
/// signal has been received.
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
  let (tx, rx) = oneshot::channel();
  tokio::spawn(async move {
    wait_for_signal().await;
    let _ = tx.send(());
  });
  async move {
    let _ = rx.await;
  }
}

async fn wait_for_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(error = %e, "failed to listen for ctrl-c");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        error!(error = %e, "failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };
  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("received ctrl-c"),
    _ = terminate => info!("received SIGTERM"),
  }
}
