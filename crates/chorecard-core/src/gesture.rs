#![forbid(unsafe_code)]

//! Gesture recognition: turns raw pointer, touch and click events on a live
//! tree into taps, delete confirmations and swipe commits.
//!
//! [`GestureRecognizer`] owns all transient gesture state for one render root
//! and the single [`ListenerGroup`] its listeners are registered in. The host
//! (normally the runtime) feeds it events with [`process`] and time with
//! [`poll`]; every deferred continuation is an entry in an internal
//! [`TimerQueue`], never a wall-clock callback.
//!
//! # State Machine
//!
//! - **Long press** (per node): `idle → pending → confirmed`, or
//!   `pending → cancelled` when the press moves beyond the tolerance or is
//!   released before the delay elapses. A confirmed node shows its
//!   confirmation block until Confirm, Cancel, auto-hide, a dismissing tap
//!   elsewhere, or a new confirmation opening on another node.
//! - **Swipe** (one shared tracker, touch only): tracking begins on touch start
//!   over a swipeable node, is abandoned as soon as vertical displacement
//!   dominates, shows a direction class past the feedback distance and commits
//!   on release past the commit distance.
//! - **Tap**: a click on an action control dispatches unless a suppression
//!   rule applies.
//!
//! # Invariants
//!
//! 1. At most one press state exists per node; a new press on a node replaces
//!    the old one, and the old one's timer can never fire (generation check).
//! 2. At most one confirmation is open at a time.
//! 3. Each resolved gesture produces at most one [`GestureEvent::Dispatch`].
//! 4. Swipe tracking has a target exactly while it is tracking.
//! 5. After [`detach`], no timer is pending and no event is processed.
//!
//! # Failure Modes
//!
//! - Events without a usable position are ignored by coordinate-dependent
//!   gestures.
//! - Events targeting nodes no longer in the tree are ignored.
//!
//! [`process`]: GestureRecognizer::process
//! [`poll`]: GestureRecognizer::poll
//! [`detach`]: GestureRecognizer::detach

use std::time::Duration;

use ahash::AHashMap;
use tracing::{debug, trace};

use crate::action::{Dispatch, GestureKind, SwipeDirection};
use crate::event::{InputEvent, PointerEventKind, TouchEventKind};
use crate::geometry::Point;
use crate::listener::{ListenerGroup, ListenerKind, ListenerToken};
use crate::node::NodeId;
use crate::surface::{
    ConfirmChoice, GestureSurface, ResolvedTarget, classes, markers, resolve_target,
};
use crate::timer::{TimerId, TimerQueue};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds and delays for gesture recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Hold time before a press opens a confirmation (default: 500ms).
    pub long_press: Duration,
    /// Movement that cancels a pending press, strictly exceeded (default: 8px).
    pub move_tolerance: f64,
    /// Time an untouched confirmation stays open (default: 3000ms).
    pub confirm_timeout: Duration,
    /// Pointer block applied after a confirmation hides (default: 200ms).
    pub interaction_block: Duration,
    /// Horizontal distance before swipe feedback shows (default: 30px).
    pub swipe_feedback: f64,
    /// Horizontal distance a release must exceed to commit (default: 80px).
    pub swipe_commit: f64,
    /// Delay before swipe classes are cleared after release (default: 300ms).
    pub swipe_reset: Duration,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            long_press: Duration::from_millis(500),
            move_tolerance: 8.0,
            confirm_timeout: Duration::from_millis(3000),
            interaction_block: Duration::from_millis(200),
            swipe_feedback: 30.0,
            swipe_commit: 80.0,
            swipe_reset: Duration::from_millis(300),
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Why a pending long press ended without confirming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelReason {
    Moved,
    Released,
    Superseded,
    Detached,
}

/// Why an open confirmation was hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HideReason {
    Confirmed,
    Cancelled,
    TimedOut,
    /// Another node opened a confirmation.
    Superseded,
    /// A tap elsewhere closed it.
    Dismissed,
    Detached,
}

/// Why a click did not dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuppressReason {
    /// Pointer interaction is briefly disabled on the target.
    Blocked,
    /// The target is inside a node showing a confirmation.
    LongPressing,
    /// The target's node has an unresolved long press.
    PendingPress,
    /// The target is inside a node showing a swipe direction.
    Swiping,
}

/// Everything the recognizer reports while processing input or time.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent {
    LongPressStarted {
        node: NodeId,
    },
    LongPressCancelled {
        node: NodeId,
        reason: CancelReason,
    },
    ConfirmationOpened {
        node: NodeId,
    },
    /// The host should pulse haptic feedback if it can.
    Haptic {
        node: NodeId,
    },
    ConfirmationHidden {
        node: NodeId,
        reason: HideReason,
    },
    SwipeStarted {
        node: NodeId,
    },
    SwipeFeedback {
        node: NodeId,
        direction: SwipeDirection,
    },
    SwipeAbandoned {
        node: NodeId,
    },
    SwipeReleased {
        node: NodeId,
        committed: bool,
    },
    /// A resolved action for the owning widget.
    Dispatch(Dispatch),
    Suppressed {
        target: NodeId,
        reason: SuppressReason,
    },
}

impl GestureEvent {
    /// The dispatch carried by this event, if any.
    #[must_use]
    pub fn as_dispatch(&self) -> Option<&Dispatch> {
        match self {
            Self::Dispatch(dispatch) => Some(dispatch),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressPhase {
    Pending,
    Confirmed,
}

/// Long-press state of one node.
#[derive(Debug, Clone)]
struct PressState {
    owner: NodeId,
    start: Point,
    phase: PressPhase,
    /// Long-press timer while pending, auto-hide timer while confirmed.
    timer: Option<TimerId>,
    generation: u64,
}

/// The single shared swipe tracker.
#[derive(Debug, Clone, Default)]
struct SwipeTrack {
    start: Point,
    current: Point,
    target: Option<NodeId>,
    direction: Option<SwipeDirection>,
}

impl SwipeTrack {
    fn is_tracking(&self) -> bool {
        self.target.is_some()
    }

    fn clear(&mut self) -> Option<NodeId> {
        self.direction = None;
        self.target.take()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureTimer {
    LongPress { node: NodeId, generation: u64 },
    AutoHide { node: NodeId, generation: u64 },
    SwipeReset { node: NodeId },
    Unblock { node: NodeId },
}

// ---------------------------------------------------------------------------
// GestureRecognizer
// ---------------------------------------------------------------------------

/// Stateful gesture recognizer for one render root.
#[derive(Debug)]
pub struct GestureRecognizer {
    config: GestureConfig,
    group: Option<ListenerGroup>,
    next_group: u64,
    next_generation: u64,
    presses: AHashMap<NodeId, PressState>,
    swipe: SwipeTrack,
    timers: TimerQueue<GestureTimer>,
    blocked: AHashMap<NodeId, TimerId>,
    swipe_resets: AHashMap<NodeId, TimerId>,
}

impl Default for GestureRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl GestureRecognizer {
    /// Create a detached recognizer.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            group: None,
            next_group: 0,
            next_generation: 0,
            presses: AHashMap::new(),
            swipe: SwipeTrack::default(),
            timers: TimerQueue::new(),
            blocked: AHashMap::new(),
            swipe_resets: AHashMap::new(),
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    // --- lifecycle ---------------------------------------------------------

    /// Attach a fresh listener group to `surface`.
    ///
    /// The previous group, if any, is cancelled in bulk first. Gesture state
    /// does not survive re-attachment: pending presses are cancelled, open
    /// confirmations hidden and swipe tracking dropped. Swipe return and
    /// pointer-block timers keep running for nodes still in the tree.
    pub fn attach<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> (ListenerToken, Vec<GestureEvent>) {
        let mut out = Vec::new();
        if let Some(mut previous) = self.group.take() {
            let drained = previous.cancel();
            trace!(group = previous.id(), drained, "gesture listener group cancelled");
        }
        self.reset_gestures(surface, &mut out);
        self.prune_visual_timers(surface);

        self.next_group += 1;
        let mut group = ListenerGroup::new(self.next_group);
        for kind in ListenerKind::ALL {
            group.subscribe(kind);
        }
        let token = group.token();
        debug!(group = group.id(), listeners = group.subscriptions().len(), "gestures attached");
        self.group = Some(group);
        (token, out)
    }

    /// Tear down: cancel the listener group, clear every timer and restore
    /// the visual state gestures applied. Later events are ignored.
    pub fn detach<S: GestureSurface + ?Sized>(&mut self, surface: &mut S) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        if let Some(mut group) = self.group.take() {
            group.cancel();
        }
        self.reset_gestures(surface, &mut out);
        for (node, _) in self.swipe_resets.drain() {
            clear_swipe_classes(surface, node);
        }
        for (node, _) in self.blocked.drain() {
            surface.set_pointer_events(node, true);
        }
        let cleared = self.timers.clear();
        debug!(cleared_timers = cleared, "gestures detached");
        out
    }

    /// Forget state for nodes that left the tree.
    pub fn evict(&mut self, removed: &[NodeId]) {
        for node in removed {
            if let Some(state) = self.presses.remove(node)
                && let Some(timer) = state.timer
            {
                self.timers.cancel(timer);
            }
            if self.swipe.target == Some(*node) {
                self.swipe.clear();
            }
            if let Some(timer) = self.swipe_resets.remove(node) {
                self.timers.cancel(timer);
            }
            if let Some(timer) = self.blocked.remove(node) {
                self.timers.cancel(timer);
            }
        }
    }

    // --- input -------------------------------------------------------------

    /// Process one input event at host time `now`.
    ///
    /// Timers due at `now` fire first. Events are ignored while detached, when
    /// their listener kind is not subscribed, or when the target is not in the
    /// tree.
    pub fn process<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        event: &InputEvent,
        now: Duration,
    ) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        let live = self
            .group
            .as_ref()
            .is_some_and(|group| group.is_subscribed(event.listener_kind()));
        if !live {
            return out;
        }
        self.fire_due(surface, now, &mut out);

        let target = event.target();
        if !surface.contains(target) {
            trace!(%target, "event target not in tree");
            return out;
        }
        let resolved = resolve_target(surface, target);
        let position = event.position();

        match event {
            InputEvent::Pointer(pointer) => match pointer.kind {
                PointerEventKind::Down => self.begin_press(&resolved, position, now, &mut out),
                PointerEventKind::Move => self.check_press_movement(position, &mut out),
                PointerEventKind::Up | PointerEventKind::Cancel => {
                    self.release_presses(&mut out);
                }
                PointerEventKind::Leave => self.leave_press(target, &mut out),
            },
            InputEvent::Touch(touch) => match touch.kind {
                TouchEventKind::Start => {
                    self.begin_press(&resolved, position, now, &mut out);
                    self.begin_swipe(surface, &resolved, position, &mut out);
                }
                TouchEventKind::Move => {
                    self.check_press_movement(position, &mut out);
                    self.move_swipe(surface, position, &mut out);
                }
                TouchEventKind::End => {
                    self.release_presses(&mut out);
                    self.end_swipe(surface, event, position, now, true, &mut out);
                }
                TouchEventKind::Cancel => {
                    self.release_presses(&mut out);
                    self.end_swipe(surface, event, position, now, false, &mut out);
                }
            },
            InputEvent::Click(_) => self.click(surface, &resolved, event, now, &mut out),
        }
        out
    }

    /// Fire every timer due at `now`.
    pub fn poll<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        now: Duration,
    ) -> Vec<GestureEvent> {
        let mut out = Vec::new();
        self.fire_due(surface, now, &mut out);
        out
    }

    // --- queries -----------------------------------------------------------

    /// Whether a live listener group is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.group.as_ref().is_some_and(|group| !group.is_cancelled())
    }

    /// The current listener group.
    #[must_use]
    pub fn group(&self) -> Option<&ListenerGroup> {
        self.group.as_ref()
    }

    /// Node whose confirmation is open, if any.
    #[must_use]
    pub fn open_confirmation(&self) -> Option<NodeId> {
        self.presses
            .values()
            .find(|state| state.phase == PressPhase::Confirmed)
            .map(|state| state.owner)
    }

    /// Whether `node` has an unresolved long press.
    #[must_use]
    pub fn has_pending_press(&self, node: NodeId) -> bool {
        self.presses
            .get(&node)
            .is_some_and(|state| state.phase == PressPhase::Pending)
    }

    /// Whether a swipe is being tracked.
    #[must_use]
    pub fn is_tracking_swipe(&self) -> bool {
        self.swipe.is_tracking()
    }

    /// Node being swiped.
    #[must_use]
    pub fn swipe_target(&self) -> Option<NodeId> {
        self.swipe.target
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest pending timer deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    // --- long press --------------------------------------------------------

    fn is_confirmed(&self, node: NodeId) -> bool {
        self.presses
            .get(&node)
            .is_some_and(|state| state.phase == PressPhase::Confirmed)
    }

    fn confirmed_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .presses
            .values()
            .filter(|state| state.phase == PressPhase::Confirmed)
            .map(|state| state.owner)
            .collect();
        nodes.sort_unstable();
        nodes
    }

    fn begin_press(
        &mut self,
        resolved: &ResolvedTarget,
        position: Option<Point>,
        now: Duration,
        out: &mut Vec<GestureEvent>,
    ) {
        let Some(node) = resolved.long_press else {
            return;
        };
        if resolved.confirm.is_some() || resolved.blocked || self.is_confirmed(node) {
            return;
        }
        let Some(start) = position else {
            return;
        };

        if let Some(previous) = self.presses.remove(&node) {
            if let Some(timer) = previous.timer {
                self.timers.cancel(timer);
            }
            out.push(GestureEvent::LongPressCancelled {
                node,
                reason: CancelReason::Superseded,
            });
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        let timer = self.timers.schedule_after(
            now,
            self.config.long_press,
            GestureTimer::LongPress { node, generation },
        );
        self.presses.insert(
            node,
            PressState {
                owner: node,
                start,
                phase: PressPhase::Pending,
                timer: Some(timer),
                generation,
            },
        );
        trace!(%node, generation, "long press pending");
        out.push(GestureEvent::LongPressStarted { node });
    }

    fn check_press_movement(&mut self, position: Option<Point>, out: &mut Vec<GestureEvent>) {
        let Some(position) = position else {
            return;
        };
        let tolerance = self.config.move_tolerance;
        let moved: Vec<NodeId> = self
            .presses
            .values()
            .filter(|state| {
                state.phase == PressPhase::Pending && position.distance(state.start) > tolerance
            })
            .map(|state| state.owner)
            .collect();
        for node in moved {
            self.cancel_press(node, CancelReason::Moved, out);
        }
    }

    fn release_presses(&mut self, out: &mut Vec<GestureEvent>) {
        let pending: Vec<NodeId> = self
            .presses
            .values()
            .filter(|state| state.phase == PressPhase::Pending)
            .map(|state| state.owner)
            .collect();
        for node in pending {
            self.cancel_press(node, CancelReason::Released, out);
        }
    }

    /// Leave events fire per element; only leaving the owner itself ends a press.
    fn leave_press(&mut self, target: NodeId, out: &mut Vec<GestureEvent>) {
        if self.has_pending_press(target) {
            self.cancel_press(target, CancelReason::Released, out);
        }
    }

    fn cancel_press(&mut self, node: NodeId, reason: CancelReason, out: &mut Vec<GestureEvent>) {
        if let Some(state) = self.presses.remove(&node) {
            if let Some(timer) = state.timer {
                self.timers.cancel(timer);
            }
            trace!(%node, ?reason, "long press cancelled");
            out.push(GestureEvent::LongPressCancelled { node, reason });
        }
    }

    fn confirm_press<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        node: NodeId,
        generation: u64,
        now: Duration,
        out: &mut Vec<GestureEvent>,
    ) {
        let current = self.presses.get(&node).is_some_and(|state| {
            state.generation == generation && state.phase == PressPhase::Pending
        });
        if !current {
            trace!(%node, generation, "stale long-press timer ignored");
            return;
        }
        if !surface.contains(node) {
            self.presses.remove(&node);
            out.push(GestureEvent::LongPressCancelled {
                node,
                reason: CancelReason::Detached,
            });
            return;
        }

        for other in self.confirmed_nodes() {
            if other != node {
                self.hide(surface, other, HideReason::Superseded, now, out);
            }
        }

        let auto_hide = self.timers.schedule_after(
            now,
            self.config.confirm_timeout,
            GestureTimer::AutoHide { node, generation },
        );
        if let Some(state) = self.presses.get_mut(&node) {
            state.phase = PressPhase::Confirmed;
            state.timer = Some(auto_hide);
        }
        surface.add_class(node, classes::LONG_PRESSING);
        if let Some(block) = surface.find_descendant(node, markers::CONFIRM_BLOCK) {
            surface.remove_class(block, classes::HIDDEN);
        }
        if self.swipe.target == Some(node) {
            self.abandon_swipe(surface, out);
        }
        debug!(%node, "delete confirmation opened");
        out.push(GestureEvent::ConfirmationOpened { node });
        out.push(GestureEvent::Haptic { node });
    }

    /// Hide the confirmation on `node` and briefly block pointer interaction.
    fn hide<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        node: NodeId,
        reason: HideReason,
        now: Duration,
        out: &mut Vec<GestureEvent>,
    ) {
        if let Some(state) = self.presses.remove(&node)
            && let Some(timer) = state.timer
        {
            self.timers.cancel(timer);
        }
        surface.remove_class(node, classes::LONG_PRESSING);
        if let Some(block) = surface.find_descendant(node, markers::CONFIRM_BLOCK) {
            surface.add_class(block, classes::HIDDEN);
        }
        if surface.contains(node) {
            surface.set_pointer_events(node, false);
            if let Some(previous) = self.blocked.remove(&node) {
                self.timers.cancel(previous);
            }
            let unblock = self.timers.schedule_after(
                now,
                self.config.interaction_block,
                GestureTimer::Unblock { node },
            );
            self.blocked.insert(node, unblock);
        }
        debug!(%node, ?reason, "delete confirmation hidden");
        out.push(GestureEvent::ConfirmationHidden { node, reason });
    }

    // --- swipe -------------------------------------------------------------

    fn begin_swipe<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        resolved: &ResolvedTarget,
        position: Option<Point>,
        out: &mut Vec<GestureEvent>,
    ) {
        let Some(node) = resolved.swipe else {
            return;
        };
        if self.swipe.is_tracking() || resolved.blocked {
            return;
        }
        if surface.has_class(node, classes::LONG_PRESSING) {
            return;
        }
        let Some(start) = position else {
            return;
        };
        if let Some(reset) = self.swipe_resets.remove(&node) {
            self.timers.cancel(reset);
            clear_swipe_classes(surface, node);
        }
        self.swipe = SwipeTrack {
            start,
            current: start,
            target: Some(node),
            direction: None,
        };
        trace!(%node, "swipe tracking started");
        out.push(GestureEvent::SwipeStarted { node });
    }

    fn move_swipe<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        position: Option<Point>,
        out: &mut Vec<GestureEvent>,
    ) {
        let Some(node) = self.swipe.target else {
            return;
        };
        let Some(position) = position else {
            return;
        };
        self.swipe.current = position;
        let (dx, dy) = position.delta_from(self.swipe.start);

        // Vertical dominance is a scroll; check before any feedback.
        if dy.abs() > dx.abs() {
            self.abandon_swipe(surface, out);
            return;
        }
        if dx.abs() > self.config.swipe_feedback {
            let direction = SwipeDirection::from_dx(dx);
            if self.swipe.direction != Some(direction) {
                surface.remove_class(node, direction.opposite().class());
                surface.add_class(node, direction.class());
                self.swipe.direction = Some(direction);
                out.push(GestureEvent::SwipeFeedback { node, direction });
            }
        }
    }

    fn abandon_swipe<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        out: &mut Vec<GestureEvent>,
    ) {
        if let Some(node) = self.swipe.clear() {
            clear_swipe_classes(surface, node);
            trace!(%node, "swipe abandoned");
            out.push(GestureEvent::SwipeAbandoned { node });
        }
    }

    fn end_swipe<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        event: &InputEvent,
        position: Option<Point>,
        now: Duration,
        may_commit: bool,
        out: &mut Vec<GestureEvent>,
    ) {
        let Some(node) = self.swipe.target else {
            return;
        };
        if let Some(position) = position {
            self.swipe.current = position;
        }
        let (dx, dy) = self.swipe.current.delta_from(self.swipe.start);
        // The release is the last move sample: vertical dominance is a scroll.
        if dy.abs() > dx.abs() {
            self.abandon_swipe(surface, out);
            return;
        }
        let committed =
            may_commit && dx.abs() > self.config.swipe_commit && surface.contains(node);

        if committed {
            let direction = SwipeDirection::from_dx(dx);
            let (attr, default) = match direction {
                SwipeDirection::Left => (
                    markers::SWIPE_LEFT_ACTION,
                    markers::DEFAULT_SWIPE_LEFT_ACTION,
                ),
                SwipeDirection::Right => (
                    markers::SWIPE_RIGHT_ACTION,
                    markers::DEFAULT_SWIPE_RIGHT_ACTION,
                ),
            };
            let action = surface.attribute(node, attr).unwrap_or(default).to_owned();
            let id = surface.attribute(node, markers::ID).map(str::to_owned);
            debug!(%node, direction = direction.as_str(), %action, "swipe committed");
            out.push(GestureEvent::Dispatch(Dispatch::new(
                GestureKind::SwipeCommit(direction),
                action,
                id,
                event.clone(),
            )));
        }
        out.push(GestureEvent::SwipeReleased { node, committed });
        self.swipe.clear();

        if surface.contains(node) {
            if let Some(previous) = self.swipe_resets.remove(&node) {
                self.timers.cancel(previous);
            }
            let reset = self.timers.schedule_after(
                now,
                self.config.swipe_reset,
                GestureTimer::SwipeReset { node },
            );
            self.swipe_resets.insert(node, reset);
        }
    }

    // --- tap ---------------------------------------------------------------

    fn click<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        resolved: &ResolvedTarget,
        event: &InputEvent,
        now: Duration,
        out: &mut Vec<GestureEvent>,
    ) {
        let target = event.target();
        if resolved.blocked {
            out.push(GestureEvent::Suppressed {
                target,
                reason: SuppressReason::Blocked,
            });
            return;
        }

        // Confirm/Cancel controls never fall through to a tap.
        if let Some(control) = resolved.confirm {
            if self.is_confirmed(control.owner) {
                match control.choice {
                    ConfirmChoice::Confirm => {
                        let action = surface
                            .attribute(control.owner, markers::DELETE_ACTION)
                            .unwrap_or(markers::DEFAULT_DELETE_ACTION)
                            .to_owned();
                        let id = surface
                            .attribute(control.owner, markers::ID)
                            .map(str::to_owned);
                        out.push(GestureEvent::Dispatch(Dispatch::new(
                            GestureKind::ConfirmDelete,
                            action,
                            id,
                            event.clone(),
                        )));
                        self.hide(surface, control.owner, HideReason::Confirmed, now, out);
                    }
                    ConfirmChoice::Cancel => {
                        self.hide(surface, control.owner, HideReason::Cancelled, now, out);
                    }
                }
            }
            return;
        }

        if resolved.long_pressing.is_some() {
            out.push(GestureEvent::Suppressed {
                target,
                reason: SuppressReason::LongPressing,
            });
            return;
        }

        // A tap while a confirmation is open elsewhere only closes it.
        let open = self.confirmed_nodes();
        if !open.is_empty() {
            for node in open {
                self.hide(surface, node, HideReason::Dismissed, now, out);
            }
            return;
        }

        if resolved
            .long_press
            .is_some_and(|node| self.has_pending_press(node))
        {
            out.push(GestureEvent::Suppressed {
                target,
                reason: SuppressReason::PendingPress,
            });
            return;
        }
        if resolved.swiping.is_some() {
            out.push(GestureEvent::Suppressed {
                target,
                reason: SuppressReason::Swiping,
            });
            return;
        }

        if let Some(action) = &resolved.action {
            debug!(%action, id = ?resolved.id, "tap dispatched");
            out.push(GestureEvent::Dispatch(Dispatch::new(
                GestureKind::Tap,
                action.clone(),
                resolved.id.clone(),
                event.clone(),
            )));
        }
    }

    // --- timers ------------------------------------------------------------

    fn fire_due<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        now: Duration,
        out: &mut Vec<GestureEvent>,
    ) {
        // Handlers may schedule new timers; pop one at a time so a timer
        // scheduled already due still fires in this pass.
        while let Some((id, timer)) = self.timers.pop_due(now) {
            match timer {
                GestureTimer::LongPress { node, generation } => {
                    self.confirm_press(surface, node, generation, now, out);
                }
                GestureTimer::AutoHide { node, generation } => {
                    let current = self.presses.get(&node).is_some_and(|state| {
                        state.generation == generation && state.timer == Some(id)
                    });
                    if current {
                        self.hide(surface, node, HideReason::TimedOut, now, out);
                    }
                }
                GestureTimer::SwipeReset { node } => {
                    if self.swipe_resets.get(&node) == Some(&id) {
                        self.swipe_resets.remove(&node);
                        clear_swipe_classes(surface, node);
                    }
                }
                GestureTimer::Unblock { node } => {
                    if self.blocked.get(&node) == Some(&id) {
                        self.blocked.remove(&node);
                        surface.set_pointer_events(node, true);
                    }
                }
            }
        }
    }

    // --- reset -------------------------------------------------------------

    fn reset_gestures<S: GestureSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        out: &mut Vec<GestureEvent>,
    ) {
        let mut states: Vec<PressState> = self.presses.drain().map(|(_, state)| state).collect();
        states.sort_unstable_by_key(|state| state.owner);
        for state in states {
            if let Some(timer) = state.timer {
                self.timers.cancel(timer);
            }
            let node = state.owner;
            match state.phase {
                PressPhase::Pending => out.push(GestureEvent::LongPressCancelled {
                    node,
                    reason: CancelReason::Detached,
                }),
                PressPhase::Confirmed => {
                    surface.remove_class(node, classes::LONG_PRESSING);
                    if let Some(block) = surface.find_descendant(node, markers::CONFIRM_BLOCK) {
                        surface.add_class(block, classes::HIDDEN);
                    }
                    out.push(GestureEvent::ConfirmationHidden {
                        node,
                        reason: HideReason::Detached,
                    });
                }
            }
        }
        if let Some(node) = self.swipe.clear() {
            clear_swipe_classes(surface, node);
            out.push(GestureEvent::SwipeAbandoned { node });
        }
    }

    fn prune_visual_timers<S: GestureSurface + ?Sized>(&mut self, surface: &S) {
        let stale: Vec<NodeId> = self
            .swipe_resets
            .keys()
            .chain(self.blocked.keys())
            .copied()
            .filter(|node| !surface.contains(*node))
            .collect();
        self.evict(&stale);
    }
}

fn clear_swipe_classes<S: GestureSurface + ?Sized>(surface: &mut S, node: NodeId) {
    surface.remove_class(node, classes::SWIPING_LEFT);
    surface.remove_class(node, classes::SWIPING_RIGHT);
}
