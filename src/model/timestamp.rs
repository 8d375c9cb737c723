use std::thread;
use std::time::Duration;

use chrono::Utc;

/// Smallest step the provider can tell apart: timestamps are whole seconds.
pub const TIMESTAMP_RESOLUTION: Duration = Duration::from_secs(1);

/// Source of wall-clock seconds, and the ability to wait.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Copy, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration)
    }
}

/// Hands out strictly increasing timestamps for one ticket's envelopes.
/// The provider rejects a timestamp that does not beat the last one it saw,
/// so if the clock has not moved on yet we wait until it has.
#[derive(Debug, Default)]
pub struct TimestampSequence {
    last: Option<i64>,
}

impl TimestampSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next<C: Clock + ?Sized>(&mut self, clock: &C) -> i64 {
        let mut now = clock.now();
        if let Some(last) = self.last {
            while now <= last {
                debug!("Timestamp {now} not after {last}, waiting");
                clock.sleep(TIMESTAMP_RESOLUTION);
                now = clock.now();
            }
        }
        self.last = Some(now);
        now
    }
}
