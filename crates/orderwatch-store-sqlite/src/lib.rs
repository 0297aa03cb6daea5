//! SQLite backend for the orderwatch purchase store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The monitor and the read API may
//! each open the same file; WAL mode and a busy timeout let them run side
//! by side.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
