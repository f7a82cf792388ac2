#![forbid(unsafe_code)]

//! Deterministic clock for replaying sessions.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

/// A clock that only moves when told to.
///
/// Clones share the same elapsed time.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    /// Current virtual instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }

    /// Milliseconds since the origin.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed.get().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    /// Jump to `ms` after the origin. Returns `false` (and does nothing) if
    /// that would move backwards.
    pub fn set_ms(&self, ms: u64) -> bool {
        let target = Duration::from_millis(ms);
        if target < self.elapsed.get() {
            return false;
        }
        self.elapsed.set(target);
        true
    }
}
