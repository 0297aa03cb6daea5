//! Read-only JSON API over the orderwatch purchase store.
//!
//! Exposes an axum [`Router`] backed by any
//! [`orderwatch_core::store::PurchaseStore`]. The monitor is the only writer;
//! this service never modifies the store.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", orderwatch_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod purchases;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::get};
use orderwatch_core::store::PurchaseStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Settings for the `orderwatch-api` binary.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("orderwatch.db") }

/// Build the API router for `store`, with request tracing.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: PurchaseStore + 'static,
{
  Router::new()
    .route("/purchases", get(purchases::list::<S>))
    .route("/purchases/{id}", get(purchases::get_one::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(store)
}
