//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Generations are stored as RFC 3339 UTC with a fixed microsecond width so
//! that string comparison in SQL matches chronological order. Decimals are
//! normalised (`12.50` → `12.5`) so that textual equality in the
//! reconciliation join is numeric equality.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use orderwatch_core::purchase::{Purchase, PurchaseId};
use rust_decimal::Decimal;

use crate::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

// ─── Generation timestamp ────────────────────────────────────────────────────

pub fn encode_generation(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_generation(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Calendar date ───────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.normalize().to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(Decimal::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for one `purchase` insert, encoded ahead of the blocking
/// call.
pub struct EncodedPurchase {
  pub id:             String,
  pub cost_source:    String,
  pub cost_converted: String,
  pub delivery_date:  String,
}

/// Raw strings read directly from a `purchase` row.
pub struct RawPurchase {
  pub id:              String,
  pub update_datetime: String,
  pub cost_source:     String,
  pub cost_converted:  String,
  pub delivery_date:   String,
}

impl RawPurchase {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      update_datetime: row.get(1)?,
      cost_source:     row.get(2)?,
      cost_converted:  row.get(3)?,
      delivery_date:   row.get(4)?,
    })
  }

  pub fn into_purchase(self) -> Result<Purchase> {
    Ok(Purchase {
      id:             PurchaseId::new(self.id),
      synced_at:      decode_generation(&self.update_datetime)?,
      cost_source:    decode_decimal(&self.cost_source)?,
      cost_converted: decode_decimal(&self.cost_converted)?,
      delivery_date:  decode_date(&self.delivery_date)?,
    })
  }
}
