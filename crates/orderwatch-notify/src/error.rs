//! Error type for `orderwatch-notify`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("cannot read notifier state {}: {reason}", path.display())]
  StateRead { path: PathBuf, reason: String },

  #[error("cannot write notifier state {}: {reason}", path.display())]
  StateWrite { path: PathBuf, reason: String },

  #[error("bot API unavailable: {0}")]
  Unavailable(String),

  #[error("bot API error: {0}")]
  Api(String),

  /// There were subscribers and every send failed.
  #[error("message reached none of {attempted} subscribers")]
  NoDelivery { attempted: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
