//! Churn arithmetic for a reconciliation pass.
//!
//! The store joins the previous generation against the new one on every
//! content field (id, both costs, delivery date) with a full outer join. A row
//! whose cost or date changed therefore shows up once as removed and once as
//! added, even though its id survives.

use serde::{Deserialize, Serialize};

/// Counters reported after a generation has replaced its predecessor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
  /// Rows in the table once the old generation is gone.
  pub total_after: u64,
  /// Old rows with no identical row in the new generation.
  pub removed:     u64,
  /// New rows with no identical row in the old generation.
  pub added:       u64,
}

impl ReconcileReport {
  /// Build the report from the three counts of the outer-join mapping:
  /// all pairs, pairs with an old side, and pairs with a new side.
  pub fn from_join_counts(pairs: u64, old_side: u64, new_side: u64) -> Self {
    Self {
      total_after: new_side,
      removed:     pairs.saturating_sub(new_side),
      added:       pairs.saturating_sub(old_side),
    }
  }

  /// `true` when the new generation is identical to the old one.
  pub fn is_unchanged(&self) -> bool { self.removed == 0 && self.added == 0 }
}
