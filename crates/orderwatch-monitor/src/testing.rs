//! In-process fakes for driving the pipeline in tests.

use std::{
  future::Future,
  str::FromStr,
  sync::{Arc, Mutex},
  time::Duration,
};

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use orderwatch_core::{
  feed::{PurchaseSource, RateFeed},
  notify::{Delivery, NotificationSink},
  purchase::{PricedPurchase, SourcePurchase},
};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::clock::Clock;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeError(pub String);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A generation timestamp `secs` after a fixed epoch.
pub fn generation(secs: i64) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

pub fn source(id: &str, cost: &str, delivery: NaiveDate) -> SourcePurchase {
  SourcePurchase {
    id:            id.into(),
    cost_source:   Decimal::from_str(cost).unwrap(),
    delivery_date: delivery,
  }
}

pub fn priced(id: &str, cost: &str, delivery: NaiveDate) -> PricedPurchase {
  source(id, cost, delivery).priced(Decimal::ONE).unwrap()
}

// ─── Feeds ───────────────────────────────────────────────────────────────────

/// Returns the queued rate; `None` fails the fetch.
#[derive(Clone, Default)]
pub struct FakeRates {
  rate: Arc<Mutex<Option<f64>>>,
}

impl FakeRates {
  pub fn fixed(rate: f64) -> Self { Self { rate: Arc::new(Mutex::new(Some(rate))) } }

  pub fn failing() -> Self { Self::default() }
}

impl RateFeed for FakeRates {
  type Error = FakeError;

  async fn fetch_rate(&self, currency_code: &str) -> Result<f64, FakeError> {
    let rate = *self.rate.lock().unwrap();
    rate.ok_or_else(|| FakeError(format!("no rate for {currency_code}")))
  }
}

/// Serves whatever snapshot was last set; `None` fails the fetch.
#[derive(Clone, Default)]
pub struct FakeSource {
  rows: Arc<Mutex<Option<Vec<SourcePurchase>>>>,
}

impl FakeSource {
  pub fn with_rows(rows: Vec<SourcePurchase>) -> Self {
    Self { rows: Arc::new(Mutex::new(Some(rows))) }
  }

  pub fn set(&self, rows: Option<Vec<SourcePurchase>>) { *self.rows.lock().unwrap() = rows; }
}

impl PurchaseSource for FakeSource {
  type Error = FakeError;

  async fn fetch_purchases(&self, source_id: &str) -> Result<Vec<SourcePurchase>, FakeError> {
    let rows = self.rows.lock().unwrap().clone();
    rows.ok_or_else(|| FakeError(format!("source {source_id} unreachable")))
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

/// Records every broadcast to a single subscriber.
#[derive(Clone, Default)]
pub struct RecordingSink {
  messages: Arc<Mutex<Vec<String>>>,
  calls:    Arc<Mutex<usize>>,
  fail:     bool,
}

impl RecordingSink {
  pub fn failing() -> Self { Self { fail: true, ..Self::default() } }

  pub fn messages(&self) -> Vec<String> { self.messages.lock().unwrap().clone() }

  pub fn calls(&self) -> usize { *self.calls.lock().unwrap() }
}

impl NotificationSink for RecordingSink {
  type Error = FakeError;

  async fn notify_all(&self, text: &str) -> Result<Vec<Delivery>, FakeError> {
    *self.calls.lock().unwrap() += 1;
    if self.fail {
      return Err(FakeError("no subscriber reachable".into()));
    }
    self.messages.lock().unwrap().push(text.to_owned());
    Ok(vec![Delivery { subscriber: 1, error: None }])
  }
}

// ─── Time ────────────────────────────────────────────────────────────────────

/// A clock that only moves when asked to. Each tick of `now` advances it by
/// `step`, and `sleep` returns immediately after advancing by the requested
/// duration. After `stop_after` sleeps the shutdown sender fires.
#[derive(Clone)]
pub struct ManualClock {
  inner: Arc<Mutex<ClockState>>,
  today: NaiveDate,
}

struct ClockState {
  now:        DateTime<Utc>,
  step:       chrono::Duration,
  sleeps:     Vec<Duration>,
  stop_after: usize,
  shutdown:   Option<oneshot::Sender<()>>,
}

impl ManualClock {
  pub fn new(today: NaiveDate) -> Self {
    Self {
      inner: Arc::new(Mutex::new(ClockState {
        now:        generation(0),
        step:       chrono::Duration::zero(),
        sleeps:     Vec::new(),
        stop_after: usize::MAX,
        shutdown:   None,
      })),
      today,
    }
  }

  /// Every call to `now` advances the clock by `step` first.
  pub fn ticking(self, step: chrono::Duration) -> Self {
    self.inner.lock().unwrap().step = step;
    self
  }

  /// Returns a receiver that completes after `sleeps` calls to `sleep`.
  pub fn stop_after(&self, sleeps: usize) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    let mut state = self.inner.lock().unwrap();
    state.stop_after = sleeps;
    state.shutdown = Some(tx);
    rx
  }

  pub fn sleeps(&self) -> Vec<Duration> { self.inner.lock().unwrap().sleeps.clone() }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    let mut state = self.inner.lock().unwrap();
    state.now = state.now + state.step;
    state.now
  }

  fn today(&self) -> NaiveDate { self.today }

  fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
    let mut state = self.inner.lock().unwrap();
    state.now = state.now + chrono::Duration::from_std(duration).unwrap();
    state.sleeps.push(duration);
    if state.sleeps.len() >= state.stop_after {
      if let Some(tx) = state.shutdown.take() {
        let _ = tx.send(());
      }
    }
    std::future::ready(())
  }
}
