use std::ops::{Add, Deref, Sub};
use std::time::Duration;

use tokio::time::Instant;

/// Monotonic point in time used for refresh deadlines and recency bookkeeping.
///
/// Backed by tokio's clock so paused-clock tests drive it the same way they
/// drive timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Instant);

impl Default for Timestamp {
    fn default() -> Self {
        Self(Instant::now())
    }
}

impl Deref for Timestamp {
    type Target = Instant;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Instant> for Timestamp {
    fn from(instant: Instant) -> Self {
        Self(instant)
    }
}

impl From<Timestamp> for Instant {
    fn from(wrapper: Timestamp) -> Self {
        wrapper.0
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: Duration) -> Self::Output {
        Timestamp(self.0 + duration)
    }
}

impl Sub<Duration> for Timestamp {
    type Output = Timestamp;

    fn sub(self, duration: Duration) -> Self::Output {
        Timestamp(self.0 - duration)
    }
}

impl Timestamp {
    pub fn new(instant: Instant) -> Self {
        Self(instant)
    }

    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn inner(&self) -> Instant {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}
