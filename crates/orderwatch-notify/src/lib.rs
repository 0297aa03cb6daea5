//! Chat-bot notification channel for orderwatch.
//!
//! Subscribers and the command cursor live in a [`NotifierState`] file that
//! is loaded and saved around every pass, so the monitor (which broadcasts)
//! and the command processor (which edits subscriptions) can run as separate
//! processes.

pub mod command;
pub mod error;
pub mod state;
pub mod telegram;

pub use error::{Error, Result};
pub use state::NotifierState;
pub use telegram::TelegramNotifier;
