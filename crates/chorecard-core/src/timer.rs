#![forbid(unsafe_code)]

//! Deterministic timer queue.
//!
//! All deferred work in Chorecard (debounce windows, long-press delays,
//! confirmation auto-hide, swipe return animations) is a deadline in a
//! [`TimerQueue`]. Deadlines are host-clock offsets, never wall time, so a
//! test or a host can step time explicitly.
//!
//! # Invariants
//!
//! 1. Due timers fire in deadline order; equal deadlines fire in scheduling
//!    order.
//! 2. A cancelled timer never fires. Cancellation removes the entry; it does
//!    not merely mark it.
//! 3. [`TimerId`]s are never reused within one queue.

use std::collections::BTreeMap;
use std::time::Duration;

use ahash::AHashMap;

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw sequence number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Deadline-ordered queue of pending timers carrying a payload `T`.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    next_id: u64,
    entries: BTreeMap<(Duration, u64), T>,
    deadlines: AHashMap<u64, Duration>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
            deadlines: AHashMap::new(),
        }
    }

    /// Schedule `payload` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Duration, payload: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert((deadline, id), payload);
        self.deadlines.insert(id, deadline);
        TimerId(id)
    }

    /// Schedule `payload` to fire `delay` after `now`.
    pub fn schedule_after(&mut self, now: Duration, delay: Duration, payload: T) -> TimerId {
        self.schedule(now.saturating_add(delay), payload)
    }

    /// Cancel a timer, returning its payload if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let deadline = self.deadlines.remove(&id.0)?;
        self.entries.remove(&(deadline, id.0))
    }

    /// Whether a timer is still pending.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id.0)
    }

    /// Remove and return the earliest timer due at `now`, if any.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, T)> {
        let (&(deadline, id), _) = self.entries.first_key_value()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.entries
            .remove(&(deadline, id))
            .map(|payload| (TimerId(id), payload))
    }

    /// Remove and return every timer due at `now`, in firing order.
    pub fn drain_due(&mut self, now: Duration) -> Vec<(TimerId, T)> {
        let mut due = Vec::new();
        while let Some(entry) = self.pop_due(now) {
            due.push(entry);
        }
        due
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.first_key_value().map(|(&(deadline, _), _)| deadline)
    }

    /// Cancel every pending timer. Returns how many were cleared.
    pub fn clear(&mut self) -> usize {
        let cleared = self.entries.len();
        self.entries.clear();
        self.deadlines.clear();
        cleared
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pending payloads in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (TimerId, Duration, &T)> {
        self.entries
            .iter()
            .map(|(&(deadline, id), payload)| (TimerId(id), deadline, payload))
    }
}
