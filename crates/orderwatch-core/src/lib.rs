//! Core types and trait definitions for orderwatch.
//!
//! This crate has no HTTP or database dependencies. The
//! store, feed, notifier, and monitor crates all depend on it.

// Native `async fn` in traits; the trait methods below spell out `Send`
// futures explicitly.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod feed;
pub mod notify;
pub mod path;
pub mod purchase;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};
