//! Time source for tracker timestamps.

use chrono::{DateTime, SubsecRound, Utc};

/// Supplies the time stamped onto tracker records.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to microseconds so values survive a round trip
/// through a `TIMESTAMPTZ` column unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(6)
    }
}
