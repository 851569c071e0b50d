//! Slotbook: provider availability scheduling and session booking over
//! SQLite.
//!
//! Providers describe recurring weekly availability as templates;
//! the generator expands templates into concrete bookable slots; the
//! booking coordinator moves slots through their state machine with
//! conditional writes so concurrent clients can never double-book; the
//! sweeper reclaims past availability nobody took.

pub mod activity;
pub mod booking;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod models;
pub mod slots;
pub mod sweeper;
pub mod templates;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::SchedulingError;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. RUST_LOG overrides the
/// default crate-level filter. Safe to call once per process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
