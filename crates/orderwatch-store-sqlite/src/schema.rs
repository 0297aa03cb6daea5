//! SQL schema for the orderwatch SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
///
/// `purchase` has no primary key: during reconciliation the previous and the
/// new generation of the same id coexist inside one transaction.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS purchase (
    id              TEXT NOT NULL,   -- opaque external id
    update_datetime TEXT NOT NULL,   -- generation; fixed-width RFC 3339 UTC
    cost_source     TEXT NOT NULL,   -- normalised decimal
    cost_converted  TEXT NOT NULL,   -- normalised decimal, 2 places at most
    delivery_date   TEXT NOT NULL    -- YYYY-MM-DD
);

-- Append-only. A marker permanently suppresses re-notification for its id.
CREATE TABLE IF NOT EXISTS overdue_purchase (
    purchase_id TEXT PRIMARY KEY
);

CREATE INDEX IF NOT EXISTS purchase_id_idx         ON purchase(id);
CREATE INDEX IF NOT EXISTS purchase_generation_idx ON purchase(update_datetime);
CREATE INDEX IF NOT EXISTS purchase_delivery_idx   ON purchase(delivery_date);

PRAGMA user_version = 1;
";

/// Counts of the full outer join between the previous generation (`?1` is
/// the current generation) and the current one on every content column.
pub const RECONCILE_COUNTS: &str = "
WITH
    old_purchase AS (SELECT * FROM purchase WHERE update_datetime < ?1),
    new_purchase AS (SELECT * FROM purchase WHERE update_datetime = ?1),
    purchase_mapping AS (
        SELECT old_purchase.id AS old_id, new_purchase.id AS new_id
        FROM old_purchase
        FULL OUTER JOIN new_purchase
            USING (id, cost_converted, cost_source, delivery_date)
    )
SELECT COUNT(*), COUNT(old_id), COUNT(new_id) FROM purchase_mapping
";
