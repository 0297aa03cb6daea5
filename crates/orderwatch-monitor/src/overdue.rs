//! Overdue detection: announce each late purchase exactly once.

use std::sync::Arc;

use chrono::NaiveDate;
use orderwatch_core::{
  notify::{Delivery, NotificationSink},
  purchase::PurchaseId,
  store::PurchaseStore,
};
use thiserror::Error;
use tracing::{debug, info};

use crate::BoxError;

#[derive(Debug, Error)]
pub enum DetectError {
  #[error("store error: {0}")]
  Store(#[source] BoxError),

  /// The message was not sent; no markers were written.
  #[error("notification error: {0}")]
  Notify(#[source] BoxError),
}

/// What a detection pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverdueOutcome {
  /// Ids included in the notification, empty when nothing was overdue.
  pub notified:        Vec<PurchaseId>,
  pub deliveries:      Vec<Delivery>,
  pub markers_written: usize,
}

/// The broadcast text for a batch of overdue ids.
pub fn overdue_message(ids: &[PurchaseId]) -> String {
  let ids: Vec<&str> = ids.iter().map(PurchaseId::as_str).collect();
  format!("Overdue order IDs: {}", ids.join(", "))
}

/// Finds purchases past their delivery date that have not been announced,
/// announces them in one message, then marks them.
pub struct OverdueDetector<S, N> {
  store: Arc<S>,
  sink:  N,
}

impl<S, N> OverdueDetector<S, N>
where
  S: PurchaseStore,
  N: NotificationSink,
{
  pub fn new(store: Arc<S>, sink: N) -> Self { Self { store, sink } }

  /// Idempotent per purchase id: a marked id is never announced again.
  ///
  /// Markers are written only after the sink accepted the message, so a
  /// failed send is retried by the next pass instead of being suppressed.
  pub async fn detect_and_notify(
    &self,
    today: NaiveDate,
  ) -> Result<OverdueOutcome, DetectError> {
    let ids = self
      .store
      .pending_overdue(today)
      .await
      .map_err(|e| DetectError::Store(Box::new(e)))?;

    if ids.is_empty() {
      debug!(%today, "no newly overdue purchases");
      return Ok(OverdueOutcome::default());
    }

    let deliveries = self
      .sink
      .notify_all(&overdue_message(&ids))
      .await
      .map_err(|e| DetectError::Notify(Box::new(e)))?;

    let markers_written = self
      .store
      .mark_overdue(ids.clone())
      .await
      .map_err(|e| DetectError::Store(Box::new(e)))?;

    info!(
      overdue = ids.len(),
      delivered = deliveries.iter().filter(|d| d.is_delivered()).count(),
      markers_written,
      "announced overdue purchases"
    );
    Ok(OverdueOutcome { notified: ids, deliveries, markers_written })
  }
}
