//! The orderwatch sync pipeline.
//!
//! A [`SyncLoop`] fetches the exchange rate and the purchase list, converts
//! costs, reconciles the new generation into the store, and hands overdue
//! purchases to an [`OverdueDetector`], once per interval, forever.

pub mod clock;
pub mod config;
pub mod overdue;
pub mod signal;
pub mod sync;

pub use clock::{Clock, SystemClock};
pub use self::config::MonitorConfig;
pub use overdue::{OverdueDetector, OverdueOutcome};
pub use signal::shutdown_signal;
pub use sync::{CycleError, CycleReport, SyncLoop, SyncSettings, SyncStep};

/// Type-erased error from one of the pipeline's collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[cfg(test)]
mod testing;
