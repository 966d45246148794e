//! Wall clock used to stamp `earned_at` and default certificate issue dates.

use crate::types::Timestamp;
use chrono::{Duration, Utc};
use std::sync::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The real clock. Used everywhere outside tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// A clock that only moves when told to.
/// Lets tests assert exact `earned_at` values.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self { current: Mutex::new(start) }
    }

    pub fn set(&self, at: Timestamp) {
        let mut guard = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *guard = at;
    }

    /// Move forward by `by`. Returns the new time.
    pub fn advance(&self, by: Duration) -> Timestamp {
        let mut guard = self.current.lock().unwrap_or_else(|p| p.into_inner());
        *guard += by;
        *guard
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|p| p.into_inner())
    }
}
