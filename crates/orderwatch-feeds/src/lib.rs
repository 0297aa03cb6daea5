//! HTTP clients for the external inputs of a sync cycle.
//!
//! - [`rates::CbrRateFeed`] reads the daily exchange-rate XML feed.
//! - [`sheets::SheetsSource`] reads the purchase table from a spreadsheet.
//! - [`credentials`] supplies the key or token presented to the spreadsheet
//!   API.
//!
//! Every client applies a bounded request timeout; a timeout surfaces as
//! [`Error::Unavailable`] like any other transport failure.

pub mod credentials;
pub mod error;
pub mod parse;
pub mod rates;
pub mod sheets;

mod http;

pub use error::{Error, Result};
