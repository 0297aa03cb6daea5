//! Error types for `orderwatch-core`.

use thiserror::Error;

use crate::purchase::PurchaseId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("exchange rate must be a positive finite number, got {0}")]
  InvalidRate(f64),

  #[error("purchase {0} appears more than once in the snapshot")]
  DuplicatePurchaseId(PurchaseId),

  #[error("converted cost of purchase {0} is out of range")]
  CostOverflow(PurchaseId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
