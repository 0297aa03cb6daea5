//! [`SqliteStore`], the SQLite implementation of [`PurchaseStore`].

use std::{path::Path, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;

use orderwatch_core::{
  purchase::{Page, PricedPurchase, Purchase, PurchaseId},
  reconcile::ReconcileReport,
  store::PurchaseStore,
};

use crate::{
  encode::{
    encode_date, encode_decimal, encode_generation, EncodedPurchase, RawPurchase,
  },
  schema::{RECONCILE_COUNTS, SCHEMA},
  Error, Result,
};

/// How long a connection waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PURCHASE_COLUMNS: &str =
  "id, update_datetime, cost_source, cost_converted, delivery_date";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An orderwatch purchase store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What happened inside the reconciliation transaction.
enum ReconcileOutcome {
  Applied { pairs: i64, old_side: i64, new_side: i64 },
  Stale { latest: String },
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of rows in the `purchase` table, across all generations.
  pub async fn purchase_count(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM purchase", [], |r| r.get(0))?)
      })
      .await?;
    Ok(count as u64)
  }

  /// Number of overdue markers written so far.
  pub async fn marker_count(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM overdue_purchase", [], |r| {
          r.get(0)
        })?)
      })
      .await?;
    Ok(count as u64)
  }
}

// ─── PurchaseStore impl ──────────────────────────────────────────────────────

impl PurchaseStore for SqliteStore {
  type Error = Error;

  // ── Generations ───────────────────────────────────────────────────────────

  async fn reconcile(
    &self,
    snapshot:   Vec<PricedPurchase>,
    generation: DateTime<Utc>,
  ) -> Result<ReconcileReport> {
    let generation_str = encode_generation(generation);
    let rows: Vec<EncodedPurchase> = snapshot
      .iter()
      .map(|p| EncodedPurchase {
        id:             p.id.as_str().to_owned(),
        cost_source:    encode_decimal(p.cost_source),
        cost_converted: encode_decimal(p.cost_converted),
        delivery_date:  encode_date(p.delivery_date),
      })
      .collect();

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the staleness check,
        // the insert and the delete see one consistent table.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let latest: Option<String> = tx.query_row(
          "SELECT MAX(update_datetime) FROM purchase",
          [],
          |r| r.get(0),
        )?;
        if let Some(latest) = latest.filter(|l| *l >= generation_str) {
          return Ok(ReconcileOutcome::Stale { latest });
        }

        {
          let mut insert = tx.prepare(
            "INSERT INTO purchase (
               id, update_datetime, cost_source, cost_converted, delivery_date
             ) VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for row in &rows {
            insert.execute(rusqlite::params![
              row.id,
              generation_str,
              row.cost_source,
              row.cost_converted,
              row.delivery_date,
            ])?;
          }
        }

        let (pairs, old_side, new_side): (i64, i64, i64) = tx.query_row(
          RECONCILE_COUNTS,
          rusqlite::params![generation_str],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;

        tx.execute(
          "DELETE FROM purchase WHERE update_datetime < ?1",
          rusqlite::params![generation_str],
        )?;

        tx.commit()?;
        Ok(ReconcileOutcome::Applied { pairs, old_side, new_side })
      })
      .await?;

    match outcome {
      ReconcileOutcome::Applied { pairs, old_side, new_side } => {
        debug!(pairs, old_side, new_side, "reconciliation join counts");
        Ok(ReconcileReport::from_join_counts(
          pairs as u64,
          old_side as u64,
          new_side as u64,
        ))
      }
      ReconcileOutcome::Stale { latest } => {
        Err(Error::StaleGeneration { latest, attempted: generation })
      }
    }
  }

  // ── Overdue markers ───────────────────────────────────────────────────────

  async fn pending_overdue(&self, today: NaiveDate) -> Result<Vec<PurchaseId>> {
    let today_str = encode_date(today);

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT p.id
           FROM purchase p
           LEFT JOIN overdue_purchase o ON o.purchase_id = p.id
           WHERE p.delivery_date < ?1
             AND o.purchase_id IS NULL
           ORDER BY p.id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![today_str], |r| r.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(ids.into_iter().map(PurchaseId::new).collect())
  }

  async fn mark_overdue(&self, ids: Vec<PurchaseId>) -> Result<usize> {
    if ids.is_empty() {
      return Ok(0);
    }
    let ids: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut insert = tx.prepare(
            "INSERT OR IGNORE INTO overdue_purchase (purchase_id) VALUES (?1)",
          )?;
          for id in &ids {
            written += insert.execute(rusqlite::params![id])?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;

    Ok(written)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn list_purchases(&self, page: Page) -> Result<Vec<Purchase>> {
    // SQLite treats a negative LIMIT as "no limit"; oversized values clamp
    // to i64::MAX instead of wrapping negative.
    let limit_val  = page.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset_val = page.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));

    let raws: Vec<RawPurchase> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PURCHASE_COLUMNS}
           FROM purchase
           ORDER BY id, update_datetime
           LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val, offset_val], RawPurchase::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPurchase::into_purchase).collect()
  }

  async fn get_purchase(&self, id: PurchaseId) -> Result<Option<Purchase>> {
    let id_str = id.as_str().to_owned();

    let raw: Option<RawPurchase> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {PURCHASE_COLUMNS}
               FROM purchase
               WHERE id = ?1
               ORDER BY update_datetime DESC
               LIMIT 1"
            ),
            rusqlite::params![id_str],
            RawPurchase::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPurchase::into_purchase).transpose()
  }
}
