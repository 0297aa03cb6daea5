//! Purchase types for each stage of a sync cycle.
//!
//! A row enters as a [`SourcePurchase`], gains its converted cost in the
//! CONVERT step as a [`PricedPurchase`], and is persisted as a [`Purchase`]
//! tagged with the generation (sync timestamp) that produced it. Rows are
//! replaced wholesale every cycle; no field is ever updated in place.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of decimal places kept on the converted cost.
pub const CONVERTED_SCALE: u32 = 2;

// ─── Identity ────────────────────────────────────────────────────────────────

/// The external order identifier. Opaque: compared for equality, never
/// interpreted numerically.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PurchaseId(String);

impl PurchaseId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PurchaseId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for PurchaseId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for PurchaseId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Stages ──────────────────────────────────────────────────────────────────

/// A purchase as read from the external tabular source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePurchase {
  pub id:            PurchaseId,
  /// Cost in the source currency.
  pub cost_source:   Decimal,
  pub delivery_date: NaiveDate,
}

impl SourcePurchase {
  /// Attach the converted cost for `rate`, rounded to [`CONVERTED_SCALE`]
  /// places with midpoints going to the even neighbour.
  pub fn priced(self, rate: Decimal) -> Result<PricedPurchase> {
    let cost_converted = self
      .cost_source
      .checked_mul(rate)
      .ok_or_else(|| Error::CostOverflow(self.id.clone()))?
      .round_dp_with_strategy(
        CONVERTED_SCALE,
        RoundingStrategy::MidpointNearestEven,
      );

    Ok(PricedPurchase {
      id: self.id,
      cost_source: self.cost_source,
      cost_converted,
      delivery_date: self.delivery_date,
    })
  }
}

/// A purchase with both costs, ready to be written as a new generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedPurchase {
  pub id:             PurchaseId,
  pub cost_source:    Decimal,
  /// Cost in the target currency.
  pub cost_converted: Decimal,
  pub delivery_date:  NaiveDate,
}

/// A persisted purchase row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
  pub id:             PurchaseId,
  /// Timestamp of the sync cycle that wrote this row. A generation marker,
  /// not a business timestamp.
  pub synced_at:      DateTime<Utc>,
  pub cost_source:    Decimal,
  pub cost_converted: Decimal,
  pub delivery_date:  NaiveDate,
}

impl Purchase {
  /// Overdue means the delivery date is strictly before `today`.
  pub fn is_overdue(&self, today: NaiveDate) -> bool {
    self.delivery_date < today
  }
}

// ─── Conversion ──────────────────────────────────────────────────────────────

/// The CONVERT step: price every row of `snapshot` at `rate`.
///
/// Rejects a rate that is not finite and positive, and a snapshot that lists
/// the same id twice; a generation may hold at most one row per id.
pub fn convert(
  snapshot: Vec<SourcePurchase>,
  rate: f64,
) -> Result<Vec<PricedPurchase>> {
  if !rate.is_finite() || rate <= 0.0 {
    return Err(Error::InvalidRate(rate));
  }
  let multiplier = Decimal::try_from(rate).map_err(|_| Error::InvalidRate(rate))?;

  let mut seen = HashSet::with_capacity(snapshot.len());
  snapshot
    .into_iter()
    .map(|purchase| {
      if !seen.insert(purchase.id.clone()) {
        return Err(Error::DuplicatePurchaseId(purchase.id));
      }
      purchase.priced(multiplier)
    })
    .collect()
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// A window over the persisted purchases, as requested by the read API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  fn row(id: &str, cost: &str, date: (i32, u32, u32)) -> SourcePurchase {
    SourcePurchase {
      id:            id.into(),
      cost_source:   Decimal::from_str(cost).unwrap(),
      delivery_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
    }
  }

  fn dec(s: &str) -> Decimal { Decimal::from_str(s).unwrap() }

  #[test]
  fn convert_multiplies_and_rounds_to_cents() {
    let priced = convert(vec![row("1", "10.3", (2024, 1, 10))], 73.5).unwrap();
    assert_eq!(priced.len(), 1);
    assert_eq!(priced[0].cost_converted, dec("757.05"));
    assert_eq!(priced[0].cost_source, dec("10.3"));
  }

  #[test]
  fn convert_rounds_midpoints_to_even() {
    let priced = convert(
      vec![row("a", "10.005", (2024, 1, 1)), row("b", "10.015", (2024, 1, 1))],
      1.0,
    )
    .unwrap();
    assert_eq!(priced[0].cost_converted, dec("10.00"));
    assert_eq!(priced[1].cost_converted, dec("10.02"));
  }

  #[test]
  fn convert_rejects_non_positive_rates() {
    for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
      let err = convert(vec![row("1", "1", (2024, 1, 1))], rate).unwrap_err();
      assert!(matches!(err, Error::InvalidRate(_)));
    }
  }

  #[test]
  fn convert_rejects_duplicate_ids() {
    let err = convert(
      vec![row("7", "1", (2024, 1, 1)), row("7", "2", (2024, 2, 1))],
      2.0,
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicatePurchaseId(id) if id.as_str() == "7"));
  }

  #[test]
  fn convert_accepts_empty_snapshot() {
    assert!(convert(Vec::new(), 90.0).unwrap().is_empty());
  }

  #[test]
  fn overdue_is_strictly_before_today() {
    let purchase = Purchase {
      id:             "1".into(),
      synced_at:      Utc::now(),
      cost_source:    dec("1"),
      cost_converted: dec("1"),
      delivery_date:  NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    };
    assert!(!purchase.is_overdue(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
    assert!(purchase.is_overdue(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
  }

  #[test]
  fn purchase_id_serialises_as_plain_string() {
    let json = serde_json::to_string(&PurchaseId::from("0042")).unwrap();
    assert_eq!(json, "\"0042\"");
  }
}
