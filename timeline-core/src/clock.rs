//! Wall-clock source for cache freshness checks

use crate::Timestamp;
use chrono::Utc;
use std::fmt::Debug;

/// Supplies the current time used to stamp and judge cache entries.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Timestamp;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}
