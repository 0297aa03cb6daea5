//! Error type for `orderwatch-store-sqlite`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("decimal parse error: {0}")]
  Decimal(#[from] rust_decimal::Error),

  /// The store already holds a generation at or after the one being written.
  #[error("generation {attempted} is not newer than stored generation {latest}")]
  StaleGeneration {
    latest:    String,
    attempted: DateTime<Utc>,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
