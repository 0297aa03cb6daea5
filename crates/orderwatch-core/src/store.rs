//! The `PurchaseStore` trait.
//!
//! Implemented by storage backends (e.g. `orderwatch-store-sqlite`). The
//! monitor and the read API depend on this abstraction, not on a concrete
//! backend.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  purchase::{Page, PricedPurchase, Purchase, PurchaseId},
  reconcile::ReconcileReport,
};

/// Abstraction over the relational purchase store.
///
/// Purchase rows are only ever appended and deleted by [`reconcile`]; overdue
/// markers are append-only.
///
/// [`reconcile`]: PurchaseStore::reconcile
pub trait PurchaseStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Generations ───────────────────────────────────────────────────────

  /// Replace the current generation with `snapshot`, tagged `generation`.
  ///
  /// Inserts the new rows, counts churn against the previous generation,
  /// then deletes every row older than `generation`, all atomically: a
  /// concurrent reader sees either the old generation or the new one.
  fn reconcile(
    &self,
    snapshot: Vec<PricedPurchase>,
    generation: DateTime<Utc>,
  ) -> impl Future<Output = Result<ReconcileReport, Self::Error>> + Send + '_;

  // ── Overdue markers ───────────────────────────────────────────────────

  /// Ids of purchases delivered strictly before `today` that carry no
  /// overdue marker yet, ordered by id.
  fn pending_overdue(
    &self,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<PurchaseId>, Self::Error>> + Send + '_;

  /// Record that `ids` have been announced. Markers that already exist are
  /// left alone; returns how many new markers were written.
  fn mark_overdue(
    &self,
    ids: Vec<PurchaseId>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Persisted purchases ordered by id.
  fn list_purchases(
    &self,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Purchase>, Self::Error>> + Send + '_;

  /// A single purchase by id, or `None`.
  fn get_purchase(
    &self,
    id: PurchaseId,
  ) -> impl Future<Output = Result<Option<Purchase>, Self::Error>> + Send + '_;
}
