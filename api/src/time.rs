//! Clock seam behind every `created_at` and `registration_date` stamp.
//!
//! Ledger ordering and renewal-run timestamps come from here rather than
//! from `Timestamp::now()` directly, so tests can pin the clock and step
//! it between fee collections to get a deterministic transaction order.

use jiff::Timestamp;
#[cfg(feature = "mock-time")]
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct TimeSource {
    #[cfg(feature = "mock-time")]
    time: Arc<Mutex<Timestamp>>,
}

impl TimeSource {
    #[allow(clippy::new_without_default)]
    #[cfg(not(feature = "mock-time"))]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(feature = "mock-time")]
    pub fn new(initial_time: Timestamp) -> Self {
        Self {
            time: Arc::new(Mutex::new(initial_time)),
        }
    }

    #[cfg(not(feature = "mock-time"))]
    pub fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    #[cfg(feature = "mock-time")]
    pub fn now(&self) -> Timestamp {
        *self.time.lock().unwrap()
    }

    /// Step the mocked clock forward, e.g. between ledger writes that a
    /// test wants ordered by `created_at`.
    #[cfg(feature = "mock-time")]
    pub fn advance(&self, span: jiff::Span) {
        *self.time.lock().unwrap() += span;
    }

    #[cfg(feature = "mock-time")]
    pub fn set(&self, time: Timestamp) {
        *self.time.lock().unwrap() = time;
    }
}
