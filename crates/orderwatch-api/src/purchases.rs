//! Handlers for `/purchases` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/purchases` | Optional `?limit=&offset=`, ordered by id |
//! | `GET`  | `/purchases/:id` | 404 if not found |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use orderwatch_core::{
  purchase::{Page, Purchase, PurchaseId},
  store::PurchaseStore,
};

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /purchases[?limit=<n>&offset=<n>]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  page: Result<Query<Page>, QueryRejection>,
) -> Result<Json<Vec<Purchase>>, ApiError>
where
  S: PurchaseStore,
{
  let Query(page) = page?;
  let purchases = store
    .list_purchases(page)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(purchases))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /purchases/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<Purchase>, ApiError>
where
  S: PurchaseStore,
{
  let purchase = store
    .get_purchase(PurchaseId::new(id.clone()))
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("purchase {id} not found")))?;
  Ok(Json(purchase))
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use chrono::{NaiveDate, TimeZone, Utc};
  use orderwatch_core::purchase::PricedPurchase;
  use orderwatch_store_sqlite::SqliteStore;
  use rust_decimal::Decimal;
  use serde_json::Value;
  use tower::ServiceExt;

  use super::*;
  use crate::api_router;

  fn priced(id: &str, cost: &str) -> PricedPurchase {
    PricedPurchase {
      id:             id.into(),
      cost_source:    Decimal::from_str(cost).unwrap(),
      cost_converted: Decimal::from_str(cost).unwrap() * Decimal::TEN,
      delivery_date:  NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    }
  }

  async fn seeded() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let generation = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    store
      .reconcile(vec![priced("b", "2"), priced("a", "1"), priced("c", "3")], generation)
      .await
      .unwrap();
    Arc::new(store)
  }

  async fn get(store: Arc<SqliteStore>, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = api_router(store).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  fn ids(body: &Value) -> Vec<&str> {
    body
      .as_array()
      .unwrap()
      .iter()
      .map(|p| p["id"].as_str().unwrap())
      .collect()
  }

  #[tokio::test]
  async fn list_is_ordered_by_id() {
    let (status, body) = get(seeded().await, "/purchases").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["a", "b", "c"]);
  }

  #[tokio::test]
  async fn list_honours_limit_and_offset() {
    let (status, body) = get(seeded().await, "/purchases?limit=1&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec!["b"]);
  }

  #[tokio::test]
  async fn empty_store_lists_nothing() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let (status, body) = get(store, "/purchases").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Array(Vec::new()));
  }

  #[tokio::test]
  async fn malformed_query_is_400_json() {
    let (status, body) = get(seeded().await, "/purchases?limit=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body["error"].as_str().unwrap().is_empty());

    let (status, body) = get(seeded().await, "/purchases?offset=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn get_one_returns_the_purchase() {
    let (status, body) = get(seeded().await, "/purchases/c").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "c");
    assert_eq!(body["delivery_date"], "2024-05-01");
  }

  #[tokio::test]
  async fn missing_purchase_is_404_json() {
    let (status, body) = get(seeded().await, "/purchases/zzz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "purchase zzz not found");
  }
}
