//! Nullable clock: deterministic time for testing.

use agora_governance::Clock;
use agora_types::time::NANOS_PER_SEC;
use agora_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to. Shared across tasks, so the
/// counter is atomic rather than a `Cell`.
#[derive(Debug, Default)]
pub struct NullClock {
    current: AtomicU64,
}

impl NullClock {
    pub fn new(initial_nanos: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_nanos),
        }
    }

    /// Advance time by a number of nanoseconds.
    pub fn advance(&self, nanos: u64) {
        self.current.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Advance time by a number of seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(secs * NANOS_PER_SEC);
    }

    /// Set the time to a specific value.
    pub fn set(&self, timestamp: Timestamp) {
        self.current.store(timestamp.as_nanos(), Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.current.load(Ordering::SeqCst))
    }
}
