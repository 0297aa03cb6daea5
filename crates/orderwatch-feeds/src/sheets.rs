//! Spreadsheet purchase source.
//!
//! Reads a fixed cell range (`B2:D` by default: id, cost, delivery date) of a
//! document through the Sheets v4 `values` endpoint.

use std::time::Duration;

use orderwatch_core::{
  feed::PurchaseSource,
  purchase::{PurchaseId, SourcePurchase},
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::{
  Error, Result,
  credentials::CredentialProvider,
  http,
  parse::{parse_day_first, parse_decimal},
};

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Id, cost, delivery date; the header row sits above it.
pub const DEFAULT_RANGE: &str = "B2:D";

const SERVICE: &str = "spreadsheet API";

/// The body of a `values.get` response. Trailing empty rows and cells are
/// omitted by the API, and `values` is absent altogether for an empty range.
#[derive(Debug, Deserialize)]
struct ValueRange {
  #[serde(default)]
  values: Vec<Vec<Value>>,
}

/// Reads purchases from a spreadsheet document.
pub struct SheetsSource<C> {
  client:      Client,
  api_base:    String,
  range:       String,
  credentials: C,
}

impl<C: CredentialProvider> SheetsSource<C> {
  pub fn new(
    api_base: impl Into<String>,
    range: impl Into<String>,
    credentials: C,
    timeout: Duration,
  ) -> Result<Self> {
    Ok(Self {
      client: http::client(SERVICE, timeout)?,
      api_base: api_base.into(),
      range: range.into(),
      credentials,
    })
  }

  fn url(&self, source_id: &str) -> String {
    format!(
      "{}/v4/spreadsheets/{}/values/{}",
      self.api_base.trim_end_matches('/'),
      source_id,
      self.range,
    )
  }
}

impl<C: CredentialProvider> PurchaseSource for SheetsSource<C> {
  type Error = Error;

  async fn fetch_purchases(&self, source_id: &str) -> Result<Vec<SourcePurchase>> {
    let credential = self.credentials.credential().await?;
    let resp = credential
      .apply(self.client.get(self.url(source_id)))
      .send()
      .await
      .map_err(|e| Error::unavailable(SERVICE, e))?;

    if resp.status() == StatusCode::NOT_FOUND {
      return Err(Error::SourceNotFound(source_id.to_owned()));
    }
    let range: ValueRange = http::require_success(SERVICE, resp)?
      .json()
      .await
      .map_err(|e| Error::malformed(SERVICE, e))?;

    let mut purchases = Vec::with_capacity(range.values.len());
    for (i, cells) in range.values.iter().enumerate() {
      if is_blank(cells) {
        debug!(source_id, row = i + 1, "skipping blank row");
        continue;
      }
      purchases.push(parse_row(i + 1, cells)?);
    }

    if purchases.is_empty() {
      return Err(Error::SourceNotFound(source_id.to_owned()));
    }
    debug!(source_id, rows = purchases.len(), "fetched purchases");
    Ok(purchases)
  }
}

/// Render a cell as text whether the API returned it formatted or raw.
fn cell_text(cell: &Value) -> String {
  match cell {
    Value::String(s) => s.trim().to_owned(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

/// A row the API returned with no cells, or with only empty ones.
fn is_blank(cells: &[Value]) -> bool {
  cells.iter().all(|cell| cell_text(cell).is_empty())
}

fn parse_row(row: usize, cells: &[Value]) -> Result<SourcePurchase> {
  let malformed = |reason: String| Error::MalformedRow { row, reason };

  let [id, cost, date] = match cells {
    [id, cost, date, ..] => [cell_text(id), cell_text(cost), cell_text(date)],
    _ => return Err(malformed(format!("expected 3 cells, found {}", cells.len()))),
  };

  if id.is_empty() {
    return Err(malformed("empty id".to_owned()));
  }
  let cost_source =
    parse_decimal(&cost).ok_or_else(|| malformed(format!("invalid cost {cost:?}")))?;
  let delivery_date = parse_day_first(&date)
    .ok_or_else(|| malformed(format!("invalid delivery date {date:?}")))?;

  Ok(SourcePurchase { id: PurchaseId::new(id), cost_source, delivery_date })
}
