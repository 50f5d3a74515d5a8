use crate::traits::Clock;
use chrono::{DateTime, Utc};

/// The real wall clock. Tests inject a fixed or stepped `Clock` instead
/// so invariant checks around expiry don't race the actual time of day.
#[derive(Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant. Not gated behind `cfg(test)` since the
/// crate's own integration tests (in `tests/`) need it too.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
