//! The periodic sync cycle as an explicit state machine.
//!
//! ```text
//! FETCH_RATE → FETCH_PURCHASES → CONVERT → RECONCILE → DETECT_OVERDUE → SLEEP
//!      ↑                                                                  │
//!      └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failure in any step ends the cycle early. It is logged with the step
//! that failed, nothing after that step runs, and the loop goes straight to
//! SLEEP. The next cycle starts from scratch.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use orderwatch_core::{
  feed::{PurchaseSource, RateFeed},
  notify::NotificationSink,
  purchase::convert,
  reconcile::ReconcileReport,
  store::PurchaseStore,
};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  BoxError,
  clock::Clock,
  overdue::{OverdueDetector, OverdueOutcome},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
  FetchRate,
  FetchPurchases,
  Convert,
  Reconcile,
  DetectOverdue,
  Sleep,
}

impl SyncStep {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::FetchRate => "FETCH_RATE",
      Self::FetchPurchases => "FETCH_PURCHASES",
      Self::Convert => "CONVERT",
      Self::Reconcile => "RECONCILE",
      Self::DetectOverdue => "DETECT_OVERDUE",
      Self::Sleep => "SLEEP",
    }
  }
}

impl fmt::Display for SyncStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// A cycle that stopped at `step`.
#[derive(Debug, Error)]
#[error("sync cycle failed at {step}: {source}")]
pub struct CycleError {
  pub step:        SyncStep,
  #[source]
  pub source:      BoxError,
  /// Steps entered before the failure, the failing one last.
  pub transitions: Vec<SyncStep>,
  /// Size of the fetched snapshot, once FETCH_PURCHASES succeeded.
  pub rows:        Option<usize>,
}

/// Everything a completed cycle did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
  pub generation:  DateTime<Utc>,
  pub rate:        f64,
  /// Rows read from the purchase source.
  pub rows:        usize,
  pub reconcile:   ReconcileReport,
  /// `None` when no notifier is configured.
  pub overdue:     Option<OverdueOutcome>,
  pub transitions: Vec<SyncStep>,
}

/// Inputs that stay fixed for the lifetime of a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
  /// Currency code looked up in the rate feed.
  pub currency:  String,
  /// Identifier of the purchase document.
  pub source_id: String,
  /// Time between the starts of consecutive cycles.
  pub interval:  Duration,
}

/// Step bookkeeping for a single cycle.
struct Cycle {
  transitions: Vec<SyncStep>,
  rows:        Option<usize>,
}

impl Cycle {
  fn new() -> Self { Self { transitions: Vec::with_capacity(5), rows: None } }

  fn enter(&mut self, step: SyncStep) {
    debug!(%step, "entering step");
    self.transitions.push(step);
  }

  fn fail<E>(&self, err: E) -> CycleError
  where
    E: Into<BoxError>,
  {
    CycleError {
      step:        self.transitions.last().copied().unwrap_or(SyncStep::FetchRate),
      source:      err.into(),
      transitions: self.transitions.clone(),
      rows:        self.rows,
    }
  }
}

pub struct SyncLoop<R, P, S, N, C> {
  settings: SyncSettings,
  rates:    R,
  source:   P,
  store:    Arc<S>,
  detector: Option<OverdueDetector<S, N>>,
  clock:    C,
}

impl<R, P, S, N, C> SyncLoop<R, P, S, N, C>
where
  R: RateFeed,
  P: PurchaseSource,
  S: PurchaseStore,
  N: NotificationSink,
  C: Clock,
{
  /// Without a notifier the DETECT_OVERDUE step is skipped and no markers
  /// are written, so nothing is lost once one is configured.
  pub fn new(
    settings: SyncSettings,
    rates: R,
    source: P,
    store: Arc<S>,
    notifier: Option<N>,
    clock: C,
  ) -> Self {
    let detector = notifier.map(|sink| OverdueDetector::new(Arc::clone(&store), sink));
    Self { settings, rates, source, store, detector, clock }
  }

  pub fn settings(&self) -> &SyncSettings { &self.settings }

  /// Run one cycle from FETCH_RATE through DETECT_OVERDUE.
  pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
    let mut cycle = Cycle::new();

    cycle.enter(SyncStep::FetchRate);
    let rate = self
      .rates
      .fetch_rate(&self.settings.currency)
      .await
      .map_err(|e| cycle.fail(e))?;
    info!(currency = %self.settings.currency, rate, "fetched exchange rate");

    cycle.enter(SyncStep::FetchPurchases);
    let snapshot = self
      .source
      .fetch_purchases(&self.settings.source_id)
      .await
      .map_err(|e| cycle.fail(e))?;
    let rows = snapshot.len();
    cycle.rows = Some(rows);
    debug!(source_id = %self.settings.source_id, rows, "fetched purchases");

    cycle.enter(SyncStep::Convert);
    let priced = convert(snapshot, rate).map_err(|e| cycle.fail(e))?;

    cycle.enter(SyncStep::Reconcile);
    let generation = self.clock.now();
    let reconcile = self
      .store
      .reconcile(priced, generation)
      .await
      .map_err(|e| cycle.fail(e))?;
    info!(
      total = reconcile.total_after,
      removed = reconcile.removed,
      added = reconcile.added,
      "reconciled purchases"
    );

    let overdue = match &self.detector {
      Some(detector) => {
        cycle.enter(SyncStep::DetectOverdue);
        let outcome = detector
          .detect_and_notify(self.clock.today())
          .await
          .map_err(|e| cycle.fail(e))?;
        Some(outcome)
      }
      None => {
        debug!("no notifier configured, skipping overdue detection");
        None
      }
    };

    Ok(CycleReport {
      generation,
      rate,
      rows,
      reconcile,
      overdue,
      transitions: cycle.transitions,
    })
  }

  /// Run cycles until `shutdown` completes.
  ///
  /// Cycle starts are spaced by the configured interval; a cycle that
  /// overruns the interval is followed immediately by the next one. The
  /// loop only stops between cycles, never inside one.
  pub async fn run(&self, shutdown: impl Future<Output = ()>) {
    tokio::pin!(shutdown);

    info!(
      currency = %self.settings.currency,
      source_id = %self.settings.source_id,
      interval = ?self.settings.interval,
      "starting sync loop"
    );

    loop {
      let started = self.clock.now();

      match self.run_cycle().await {
        Ok(report) => debug!(transitions = ?report.transitions, "sync cycle complete"),
        Err(e) => error!(
          step = %e.step,
          currency = %self.settings.currency,
          source_id = %self.settings.source_id,
          rows = ?e.rows,
          error = %e.source,
          "sync cycle failed"
        ),
      }

      let elapsed = (self.clock.now() - started).to_std().unwrap_or_default();
      let pause = self.settings.interval.saturating_sub(elapsed);
      debug!(step = %SyncStep::Sleep, ?pause, "waiting for next cycle");

      tokio::select! {
        biased;
        _ = &mut shutdown => {
          info!("shutdown requested, stopping sync loop");
          return;
        }
        _ = self.clock.sleep(pause) => {}
      }
    }
  }
}
