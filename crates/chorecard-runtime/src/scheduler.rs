#![forbid(unsafe_code)]

//! Render scheduling: debounce, fingerprint skip and re-entrancy guard.
//!
//! [`RenderScheduler`] decides *when* a render cycle runs; the runtime decides
//! what the cycle does. The protocol per host step is:
//!
//! 1. [`RenderScheduler::due`] yields a [`CycleTicket`] once the debounce
//!    deadline has passed.
//! 2. [`RenderScheduler::should_render`] compares the widget's fingerprint
//!    with the last accepted one (forced tickets always render).
//! 3. [`RenderScheduler::begin_cycle`] raises the in-progress guard and
//!    returns a [`CycleGuard`]; [`CycleGuard::commit`] stores the new
//!    fingerprint. Dropping the guard ends the cycle.
//!
//! # Invariants
//!
//! 1. At most one debounce deadline is armed; a new request restarts it.
//! 2. While a cycle is in progress, requests only set a single pending flag.
//! 3. Ending a cycle with the pending flag set arms a zero-delay forced
//!    request, so exactly one follow-up cycle runs.
//! 4. A forced request stays forced until its cycle runs; later non-forced
//!    requests in the same window do not delay it.
//! 5. The stored fingerprint changes only on a committed cycle.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Request during a cycle | Deferred, flagged pending |
//! | Request after close | Ignored |
//! | Cycle ends without commit | Counted as a failure, fingerprint kept |

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chorecard_core::RenderFingerprint;
use tracing::trace;

use crate::clock::HostClock;

/// Timing parameters for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Delay between a non-forced request and its cycle (default: 16ms).
    pub debounce: Duration,
    /// Width of the coarse time bucket folded into fingerprints
    /// (default: 60s). Zero disables time bucketing.
    pub time_bucket: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(16),
            time_bucket: Duration::from_secs(60),
        }
    }
}

/// What a render request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The debounce deadline is (re)armed at `deadline`.
    Scheduled { deadline: Duration, forced: bool },
    /// A cycle is running; one follow-up cycle will run after it.
    Deferred,
    /// The scheduler was closed.
    Ignored,
}

/// Permission to run one render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTicket {
    /// Forced cycles bypass the fingerprint check.
    pub forced: bool,
}

/// Counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Render requests received, deferred ones included.
    pub requests: u64,
    /// Requests that restarted an already armed deadline.
    pub coalesced: u64,
    /// Cycles started.
    pub renders: u64,
    /// Cycles skipped because the fingerprint was unchanged.
    pub skips: u64,
    /// Cycles that ended without a commit.
    pub failures: u64,
    /// Follow-up cycles armed because of a deferred request.
    pub rearmed: u64,
}

#[derive(Debug)]
struct SchedulerState {
    config: SchedulerConfig,
    clock: HostClock,
    deadline: Option<Duration>,
    forced: bool,
    in_progress: bool,
    pending: bool,
    closed: bool,
    last_fingerprint: Option<RenderFingerprint>,
    stats: SchedulerStats,
}

impl SchedulerState {
    fn request(&mut self, force: bool) -> RequestOutcome {
        if self.closed {
            return RequestOutcome::Ignored;
        }
        self.stats.requests += 1;
        if self.in_progress {
            self.pending = true;
            trace!(force, "render request deferred");
            return RequestOutcome::Deferred;
        }
        if self.deadline.is_some() {
            self.stats.coalesced += 1;
        }
        self.forced |= force;
        let delay = if self.forced {
            Duration::ZERO
        } else {
            self.config.debounce
        };
        let deadline = self.clock.now().saturating_add(delay);
        self.deadline = Some(deadline);
        trace!(
            forced = self.forced,
            deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
            "render scheduled"
        );
        RequestOutcome::Scheduled {
            deadline,
            forced: self.forced,
        }
    }
}

/// Cheap cloneable handle for requesting renders.
///
/// Widgets may hold one and call it from anywhere, including their own
/// render function; the request is then deferred, never run nested.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    state: Rc<RefCell<SchedulerState>>,
}

impl RenderHandle {
    /// Request a render cycle. `force` skips both debounce and fingerprint.
    pub fn request_render(&self, force: bool) -> RequestOutcome {
        self.state.borrow_mut().request(force)
    }

    /// Whether a render cycle is currently running.
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.state.borrow().in_progress
    }
}

/// Debouncing, fingerprint-gated, non-reentrant render scheduler.
#[derive(Debug)]
pub struct RenderScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl RenderScheduler {
    /// Create a scheduler reading time from `clock`.
    #[must_use]
    pub fn new(config: SchedulerConfig, clock: HostClock) -> Self {
        Self {
            state: Rc::new(RefCell::new(SchedulerState {
                config,
                clock,
                deadline: None,
                forced: false,
                in_progress: false,
                pending: false,
                closed: false,
                last_fingerprint: None,
                stats: SchedulerStats::default(),
            })),
        }
    }

    /// A handle sharing this scheduler.
    #[must_use]
    pub fn handle(&self) -> RenderHandle {
        RenderHandle {
            state: Rc::clone(&self.state),
        }
    }

    /// Request a render cycle. See [`RenderHandle::request_render`].
    pub fn request_render(&self, force: bool) -> RequestOutcome {
        self.state.borrow_mut().request(force)
    }

    /// Take the armed deadline if it has passed at `now`.
    ///
    /// Returns `None` while a cycle is running.
    pub fn due(&self, now: Duration) -> Option<CycleTicket> {
        let mut state = self.state.borrow_mut();
        if state.in_progress || state.closed {
            return None;
        }
        match state.deadline {
            Some(deadline) if deadline <= now => {
                state.deadline = None;
                let forced = std::mem::take(&mut state.forced);
                Some(CycleTicket { forced })
            }
            _ => None,
        }
    }

    /// Whether the cycle for `ticket` needs to render.
    ///
    /// `None` means the widget cannot fingerprint itself and always renders.
    /// A skipped cycle is counted and has no other effect.
    pub fn should_render(&self, ticket: CycleTicket, fingerprint: Option<RenderFingerprint>) -> bool {
        let mut state = self.state.borrow_mut();
        if ticket.forced {
            return true;
        }
        match fingerprint {
            Some(fp) if state.last_fingerprint == Some(fp) => {
                state.stats.skips += 1;
                false
            }
            _ => true,
        }
    }

    /// Raise the in-progress guard for one cycle.
    pub fn begin_cycle(&self) -> CycleGuard {
        {
            let mut state = self.state.borrow_mut();
            state.in_progress = true;
            state.stats.renders += 1;
        }
        CycleGuard {
            state: Rc::clone(&self.state),
            committed: false,
        }
    }

    /// Disarm the deadline and drop any pending request.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        state.deadline = None;
        state.forced = false;
        state.pending = false;
    }

    /// Cancel and refuse all later requests.
    pub fn close(&self) {
        self.cancel();
        self.state.borrow_mut().closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    /// Armed deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.borrow().deadline
    }

    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.state.borrow().in_progress
    }

    /// Whether a request arrived during the running cycle.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state.borrow().pending
    }

    /// Fingerprint of the last committed cycle.
    #[must_use]
    pub fn last_fingerprint(&self) -> Option<RenderFingerprint> {
        self.state.borrow().last_fingerprint
    }

    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        self.state.borrow().stats
    }

    #[must_use]
    pub fn config(&self) -> SchedulerConfig {
        self.state.borrow().config.clone()
    }
}

/// In-progress guard for one render cycle.
///
/// Dropping the guard lowers the guard and, if a request was deferred during
/// the cycle, arms a zero-delay forced follow-up.
#[derive(Debug)]
#[must_use = "dropping the guard ends the render cycle"]
pub struct CycleGuard {
    state: Rc<RefCell<SchedulerState>>,
    committed: bool,
}

impl CycleGuard {
    /// Mark the cycle successful and store its fingerprint.
    pub fn commit(mut self, fingerprint: Option<RenderFingerprint>) {
        self.state.borrow_mut().last_fingerprint = fingerprint;
        self.committed = true;
    }
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.in_progress = false;
        if !self.committed {
            state.stats.failures += 1;
        }
        if std::mem::take(&mut state.pending) && !state.closed {
            state.stats.rearmed += 1;
            state.forced = true;
            state.deadline = Some(state.clock.now());
            trace!("deferred render re-armed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    fn scheduler() -> (RenderScheduler, HostClock) {
        let clock = HostClock::new();
        (RenderScheduler::new(SchedulerConfig::default(), clock.clone()), clock)
    }

    fn fp(n: usize) -> Option<RenderFingerprint> {
        Some(RenderFingerprint::builder().entity_count(n).finish())
    }

    #[test]
    fn non_forced_request_waits_for_debounce() {
        let (s, _clock) = scheduler();
        assert_eq!(
            s.request_render(false),
            RequestOutcome::Scheduled {
                deadline: 16 * MS,
                forced: false
            }
        );
        assert_eq!(s.due(15 * MS), None);
        assert_eq!(s.due(16 * MS), Some(CycleTicket { forced: false }));
        assert_eq!(s.due(17 * MS), None);
    }

    #[test]
    fn deadline_saturates_at_end_of_time() {
        let (s, clock) = scheduler();
        clock.set(Duration::MAX);
        assert_eq!(
            s.request_render(false),
            RequestOutcome::Scheduled {
                deadline: Duration::MAX,
                forced: false
            }
        );
        assert!(s.due(Duration::MAX).is_some());
    }

    #[test]
    fn forced_request_is_due_immediately() {
        let (s, _clock) = scheduler();
        s.request_render(true);
        assert_eq!(s.due(Duration::ZERO), Some(CycleTicket { forced: true }));
    }

    #[test]
    fn requests_restart_the_window() {
        let (s, clock) = scheduler();
        s.request_render(false);
        clock.advance(10 * MS);
        s.request_render(false);
        assert_eq!(s.due(16 * MS), None);
        assert!(s.due(26 * MS).is_some());
        assert_eq!(s.stats().coalesced, 1);
    }

    #[test]
    fn force_stays_sticky_within_window() {
        let (s, clock) = scheduler();
        s.request_render(true);
        clock.advance(MS);
        s.request_render(false);
        assert_eq!(s.next_deadline(), Some(MS));
        assert_eq!(s.due(MS), Some(CycleTicket { forced: true }));
    }

    #[test]
    fn unchanged_fingerprint_skips() {
        let (s, _clock) = scheduler();
        let ticket = CycleTicket { forced: false };
        assert!(s.should_render(ticket, fp(1)));
        s.begin_cycle().commit(fp(1));
        assert!(!s.should_render(ticket, fp(1)));
        assert!(s.should_render(ticket, fp(2)));
        assert!(s.should_render(CycleTicket { forced: true }, fp(1)));
        assert!(s.should_render(ticket, None));
        assert_eq!(s.stats().skips, 1);
    }

    #[test]
    fn request_during_cycle_defers_and_rearms_once() {
        let (s, clock) = scheduler();
        clock.advance(40 * MS);
        let guard = s.begin_cycle();
        assert!(s.is_rendering());
        assert_eq!(s.request_render(false), RequestOutcome::Deferred);
        assert_eq!(s.handle().request_render(false), RequestOutcome::Deferred);
        assert_eq!(s.due(100 * MS), None);
        guard.commit(fp(1));
        assert!(!s.is_rendering());
        assert!(!s.has_pending());
        assert_eq!(s.due(40 * MS), Some(CycleTicket { forced: true }));
        assert_eq!(s.due(40 * MS), None);
        assert_eq!(s.stats().rearmed, 1);
    }

    #[test]
    fn failed_cycle_keeps_fingerprint() {
        let (s, _clock) = scheduler();
        s.begin_cycle().commit(fp(1));
        drop(s.begin_cycle());
        assert_eq!(s.last_fingerprint(), fp(1));
        assert_eq!(s.stats().failures, 1);
        assert_eq!(s.stats().renders, 2);
    }

    #[test]
    fn closed_scheduler_ignores_requests() {
        let (s, _clock) = scheduler();
        s.request_render(false);
        s.close();
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.request_render(true), RequestOutcome::Ignored);
        assert_eq!(s.due(Duration::from_secs(1)), None);
    }
}
