//! Time source for the sync loop, injectable so cycles can be driven from
//! tests without waiting.

use std::{future::Future, time::Duration};

use chrono::{DateTime, Local, NaiveDate, Utc};

pub trait Clock: Send + Sync {
  /// The instant used as a generation timestamp.
  fn now(&self) -> DateTime<Utc>;

  /// The calendar date against which delivery dates are judged overdue.
  fn today(&self) -> NaiveDate;

  fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Wall clock; `today` is the local calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }

  fn today(&self) -> NaiveDate { Local::now().date_naive() }

  fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
    tokio::time::sleep(duration)
  }
}
