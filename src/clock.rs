//! Injected time source.
//!
//! Every operation that reads "now" takes a `&dyn Clock` so tests can
//! pin time and invoke sweeps deterministically. Production code passes
//! `SystemClock`.

use chrono::{NaiveDate, NaiveDateTime, Utc};

pub trait Clock: Send + Sync {
    /// Current UTC wall-clock time.
    fn now_utc(&self) -> NaiveDateTime;

    fn today_utc(&self) -> NaiveDate {
        self.now_utc().date()
    }
}

/// Real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// Clock pinned to one instant, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now_utc(&self) -> NaiveDateTime {
        self.0
    }
}
