//! Property-based invariant tests for the render scheduler.
//!
//! 1. A burst of non-forced requests spaced under the debounce window yields
//!    exactly one cycle, due one window after the last request
//! 2. Any number of requests made during a cycle yields exactly one follow-up
//! 3. The guard is never left raised after a cycle ends
//! 4. A skipped cycle never changes the stored fingerprint

use std::time::Duration;

use chorecard_core::RenderFingerprint;
use chorecard_runtime::{CycleTicket, HostClock, RenderScheduler, SchedulerConfig};
use proptest::prelude::*;

const DEBOUNCE: Duration = Duration::from_millis(16);

fn scheduler() -> (RenderScheduler, HostClock) {
    let clock = HostClock::new();
    let config = SchedulerConfig {
        debounce: DEBOUNCE,
        ..SchedulerConfig::default()
    };
    (RenderScheduler::new(config, clock.clone()), clock)
}

fn fingerprint(n: u8) -> Option<RenderFingerprint> {
    Some(RenderFingerprint::builder().entity_count(usize::from(n)).finish())
}

// ── Strategies ──────────────────────────────────────────────────────────

/// Gaps between consecutive requests, each shorter than the window.
fn burst_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..16, 1..40)
}

/// Operations applied to a scheduler between steps.
#[derive(Debug, Clone)]
enum Op {
    Request(bool),
    Advance(u64),
    Step(u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Request),
        (0u64..40).prop_map(Op::Advance),
        (0u8..4).prop_map(Op::Step),
    ]
}

proptest! {
    // ═══ 1. Burst coalescing ═══

    #[test]
    fn burst_renders_once(gaps in burst_strategy()) {
        let (s, clock) = scheduler();
        let mut cycles = 0;
        for gap in &gaps {
            clock.advance(Duration::from_millis(*gap));
            s.request_render(false);
            if s.due(clock.now()).is_some() {
                cycles += 1;
            }
        }
        let last = clock.now();
        prop_assert_eq!(cycles, 0);
        prop_assert_eq!(s.next_deadline(), Some(last + DEBOUNCE));
        prop_assert!(s.due(last + DEBOUNCE - Duration::from_millis(1)).is_none());
        prop_assert_eq!(s.due(last + DEBOUNCE), Some(CycleTicket { forced: false }));
        prop_assert!(s.due(last + DEBOUNCE * 10).is_none());
    }

    // ═══ 2. Re-entrant requests ═══

    #[test]
    fn requests_during_cycle_rearm_once(inner in prop::collection::vec(any::<bool>(), 1..20)) {
        let (s, clock) = scheduler();
        clock.advance(Duration::from_millis(100));
        let guard = s.begin_cycle();
        for force in &inner {
            s.request_render(*force);
        }
        prop_assert!(s.due(Duration::from_secs(60)).is_none());
        guard.commit(fingerprint(0));

        prop_assert_eq!(s.due(clock.now()), Some(CycleTicket { forced: true }));
        prop_assert!(s.due(Duration::from_secs(60)).is_none());
        prop_assert_eq!(s.stats().rearmed, 1);
    }

    // ═══ 3 & 4. Guard and fingerprint under arbitrary sequences ═══

    #[test]
    fn arbitrary_sequences_keep_invariants(ops in prop::collection::vec(op_strategy(), 1..100)) {
        let (s, clock) = scheduler();
        for op in ops {
            match op {
                Op::Request(force) => {
                    s.request_render(force);
                }
                Op::Advance(ms) => {
                    clock.advance(Duration::from_millis(ms));
                }
                Op::Step(n) => {
                    if let Some(ticket) = s.due(clock.now()) {
                        let before = s.last_fingerprint();
                        if s.should_render(ticket, fingerprint(n)) {
                            s.begin_cycle().commit(fingerprint(n));
                            prop_assert_eq!(s.last_fingerprint(), fingerprint(n));
                        } else {
                            prop_assert!(!ticket.forced);
                            prop_assert_eq!(s.last_fingerprint(), before);
                        }
                    }
                }
            }
            prop_assert!(!s.is_rendering());
            prop_assert!(!s.has_pending());
        }
        let stats = s.stats();
        prop_assert_eq!(stats.failures, 0);
        prop_assert!(stats.renders + stats.skips <= stats.requests);
    }
}
