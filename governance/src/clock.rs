//! Time source for the governor.

use agora_types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of "now" for every governor call.
///
/// Implementations must be monotonic non-decreasing: checkpoint capture
/// relies on each call observing a time no earlier than the previous one.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock that never goes backwards.
///
/// If the system clock steps back (NTP adjustment, VM migration) the last
/// returned value is repeated until wall time catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Timestamp::now().as_nanos();
        let prev = self.last.fetch_max(wall, Ordering::AcqRel);
        Timestamp::from_nanos(prev.max(wall))
    }
}
