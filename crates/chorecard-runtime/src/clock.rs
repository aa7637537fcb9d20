#![forbid(unsafe_code)]

//! Host-driven monotonic clock.
//!
//! Chorecard never reads wall time. The host advances a [`HostClock`]
//! explicitly (from its animation frame callback, or a test), and every
//! deadline in the scheduler and gesture recognizer is an offset on it.
//! Clones share one time source, so a widget holding a clone sees the same
//! `now` the runtime does.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Shared, host-advanced monotonic time.
#[derive(Debug, Clone, Default)]
pub struct HostClock {
    now: Rc<Cell<Duration>>,
}

impl HostClock {
    /// Create a clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time.
    #[inline]
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Advance time by `dt`.
    pub fn advance(&self, dt: Duration) -> Duration {
        let now = self.now.get().saturating_add(dt);
        self.now.set(now);
        now
    }

    /// Move time forward to `now`. Earlier values are ignored.
    pub fn set(&self, now: Duration) -> Duration {
        let now = now.max(self.now.get());
        self.now.set(now);
        now
    }
}
