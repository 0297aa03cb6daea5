//! Error type for `orderwatch-feeds`.
//!
//! Transport failures are [`Error::Unavailable`]; everything else describes
//! data the upstream returned in an unexpected shape. All of them are
//! retryable on the next sync cycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Unreachable, timed out, or answered with a non-success status.
  #[error("{service} unavailable: {reason}")]
  Unavailable {
    service: &'static str,
    reason:  String,
  },

  #[error("unknown currency: {0}")]
  UnknownCurrency(String),

  #[error("malformed exchange rate: {0:?}")]
  MalformedRate(String),

  #[error("malformed {service} response: {reason}")]
  MalformedResponse {
    service: &'static str,
    reason:  String,
  },

  #[error("source document not found: {0}")]
  SourceNotFound(String),

  /// `row` is 1-based within the requested cell range.
  #[error("row {row}: {reason}")]
  MalformedRow { row: usize, reason: String },

  #[error("credential error: {0}")]
  Credential(String),
}

impl Error {
  pub(crate) fn unavailable(
    service: &'static str,
    reason: impl std::fmt::Display,
  ) -> Self {
    Self::Unavailable { service, reason: reason.to_string() }
  }

  pub(crate) fn malformed(
    service: &'static str,
    reason: impl std::fmt::Display,
  ) -> Self {
    Self::MalformedResponse { service, reason: reason.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
