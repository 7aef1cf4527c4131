//! Wall-clock source for the limiter.
//!
//! Window boundaries are absolute epoch milliseconds, so the clock has to be
//! a real calendar clock rather than `Instant`.

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::LimiterError;

/// Source of "now" in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync + Debug {
    fn now_ms(&self) -> Result<u64, LimiterError>;
}

/// Reads the system clock through chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Result<u64, LimiterError> {
        let millis = chrono::Utc::now().timestamp_millis();
        u64::try_from(millis).map_err(|_| LimiterError::ClockBeforeEpoch(millis))
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to the limiter
/// and keep another to advance it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance_ms(&self, millis: u64) {
        self.now_ms.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set_ms(&self, millis: u64) {
        self.now_ms.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Result<u64, LimiterError> {
        Ok(self.now_ms.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        let now = SystemClock.now_ms().unwrap();
        assert!(now > 1_577_836_800_000);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(1_000);
        let handle = clock.clone();

        handle.advance_ms(500);
        assert_eq!(clock.now_ms().unwrap(), 1_500);

        handle.set_ms(10);
        assert_eq!(clock.now_ms().unwrap(), 10);
    }
}
