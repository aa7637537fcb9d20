#![forbid(unsafe_code)]

//! Host-driven card runtime.
//!
//! [`CardRuntime`] composes a [`Widget`], the [`RenderScheduler`], the
//! [`TreeDiffer`] and the [`GestureRecognizer`] around one [`RenderTree`].
//! Nothing runs on its own: the host pushes input, advances the clock and
//! calls [`CardRuntime::step`], then drains [`CardRuntime::take_outputs`] to
//! mirror tree mutations and carry out host commands.
//!
//! ```ignore
//! let mut card = CardRuntime::new(MyCard::default(), RuntimeConfig::default());
//! card.step();                                  // first render
//! card.push_event(PointerEvent::new(PointerEventKind::Down, node, 10.0, 10.0));
//! card.advance_time(Duration::from_millis(16));
//! let result = card.step();
//! let outputs = card.take_outputs();
//! ```
//!
//! # Step order
//!
//! 1. A due render cycle runs (fingerprint check, render, diff, re-attach).
//! 2. Gesture timers due at the current time fire.
//! 3. Queued input events are processed; dispatches reach the widget.
//!
//! Renders requested in steps 2 and 3 run on a later step at the earliest,
//! so a gesture resolution and a render never share one step.
//!
//! # Failure Modes
//!
//! A render that returns an error, panics, or produces markup that cannot be
//! applied leaves the stored fingerprint untouched and replaces the tree with
//! a short error view carrying a [`RETRY_ACTION`] control. Activating it
//! requests a forced render.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use chorecard_core::{
    Dispatch, GestureEvent, GestureKind, GestureRecognizer, InputEvent, NodeId, SwipeDirection,
};
use chorecard_render::markup::escape_text;
use chorecard_render::{Mutation, RenderTree, TreeDiffer};
use tracing::{debug, error, trace};

use crate::clock::HostClock;
use crate::config::{RenderStrategy, RuntimeConfig};
use crate::error::RuntimeError;
use crate::scheduler::{CycleTicket, RenderHandle, RenderScheduler, RequestOutcome};
use crate::widget::{Cmd, RenderContext, Widget};

/// Action reserved for the retry control of the error view.
pub const RETRY_ACTION: &str = "retry-render";

/// Message shown in the error view.
pub const FALLBACK_MESSAGE: &str = "Something went wrong while showing this card.";

/// Markup of the error view shown after a failed render.
#[must_use]
pub fn fallback_markup(message: &str) -> String {
    format!(
        r#"<div class="card-error"><p class="card-error-message">{}</p><button data-action="{RETRY_ACTION}">Retry</button></div>"#,
        escape_text(message)
    )
}

/// Side effects the host should carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCommand {
    /// Pulse haptic feedback for `node`.
    Haptic { node: NodeId },
}

/// Everything produced since the last [`CardRuntime::take_outputs`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardOutputs {
    /// Tree changes, in order, to mirror onto the host surface.
    pub mutations: Vec<Mutation>,
    pub commands: Vec<HostCommand>,
    /// Gesture activity, dispatches included.
    pub gestures: Vec<GestureEvent>,
    /// Description of the most recent render failure.
    pub last_error: Option<String>,
}

impl CardOutputs {
    /// Dispatches among the recorded gesture events.
    pub fn dispatches(&self) -> impl Iterator<Item = &Dispatch> {
        self.gestures.iter().filter_map(GestureEvent::as_dispatch)
    }
}

/// Result of a single [`CardRuntime::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// False after [`CardRuntime::teardown`].
    pub running: bool,
    /// Whether a render cycle ran (fallbacks included, skips excluded).
    pub rendered: bool,
    pub events_processed: u32,
    /// Number of render cycles run so far.
    pub frame_idx: u64,
}

/// One card: widget, scheduler, differ and gestures over a live tree.
pub struct CardRuntime<W: Widget> {
    widget: W,
    config: RuntimeConfig,
    clock: HostClock,
    scheduler: RenderScheduler,
    differ: TreeDiffer,
    tree: RenderTree,
    gestures: GestureRecognizer,
    events: VecDeque<InputEvent>,
    outputs: CardOutputs,
    running: bool,
    frame_idx: u64,
}

impl<W: Widget> CardRuntime<W> {
    /// Create a runtime with a fresh clock at zero.
    ///
    /// The first render is requested (forced) and runs on the first step.
    #[must_use]
    pub fn new(widget: W, config: RuntimeConfig) -> Self {
        Self::with_clock(widget, config, HostClock::new())
    }

    /// Create a runtime reading time from a shared `clock`.
    #[must_use]
    pub fn with_clock(widget: W, config: RuntimeConfig, clock: HostClock) -> Self {
        let scheduler = RenderScheduler::new(config.scheduler_config(), clock.clone());
        let gestures = GestureRecognizer::new(config.gesture_config());
        scheduler.request_render(true);
        Self {
            widget,
            config,
            clock,
            scheduler,
            differ: TreeDiffer::new(),
            tree: RenderTree::new(),
            gestures,
            events: VecDeque::new(),
            outputs: CardOutputs::default(),
            running: true,
            frame_idx: 0,
        }
    }

    // --- host input --------------------------------------------------------

    /// A handle the widget can keep to request renders itself.
    #[must_use]
    pub fn handle(&self) -> RenderHandle {
        self.scheduler.handle()
    }

    /// Tell the runtime the widget's state changed.
    pub fn notify_state_changed(&self) -> RequestOutcome {
        self.scheduler.request_render(false)
    }

    /// Request a render cycle directly.
    pub fn request_render(&self, force: bool) -> RequestOutcome {
        self.scheduler.request_render(force)
    }

    /// Queue an input event for the next step. Ignored after teardown.
    pub fn push_event(&mut self, event: impl Into<InputEvent>) {
        if self.running {
            self.events.push_back(event.into());
        }
    }

    /// Advance the clock by `dt`.
    pub fn advance_time(&mut self, dt: Duration) {
        self.clock.advance(dt);
    }

    /// Move the clock forward to `now`.
    pub fn set_time(&mut self, now: Duration) {
        self.clock.set(now);
    }

    // --- stepping ----------------------------------------------------------

    /// Run whatever is due at the current time.
    pub fn step(&mut self) -> StepResult {
        if !self.running {
            return StepResult {
                running: false,
                rendered: false,
                events_processed: 0,
                frame_idx: self.frame_idx,
            };
        }
        let now = self.clock.now();

        let rendered = match self.scheduler.due(now) {
            Some(ticket) => self.run_cycle(ticket, now),
            None => false,
        };

        let fired = self.gestures.poll(&mut self.tree, now);
        self.handle_gesture_events(fired);

        let mut events_processed: u32 = 0;
        while let Some(event) = self.events.pop_front() {
            events_processed += 1;
            let resolved = self.gestures.process(&mut self.tree, &event, now);
            self.handle_gesture_events(resolved);
            if !self.running {
                break;
            }
        }

        self.outputs.mutations.extend(self.tree.take_mutations());
        StepResult {
            running: self.running,
            rendered,
            events_processed,
            frame_idx: self.frame_idx,
        }
    }

    /// Earliest time anything is scheduled to happen.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.scheduler.next_deadline(), self.gestures.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Stop the card: listeners cancelled, timers cleared, cache dropped.
    ///
    /// Later events, requests and timers have no effect.
    pub fn teardown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.scheduler.close();
        self.events.clear();
        let hidden = self.gestures.detach(&mut self.tree);
        self.outputs.gestures.extend(hidden);
        self.differ.forget(self.tree.id());
        self.outputs.mutations.extend(self.tree.take_mutations());
        debug!(root = self.tree.id().get(), "card torn down");
    }

    // --- outputs and accessors ---------------------------------------------

    /// Take the accumulated outputs, leaving empty defaults.
    pub fn take_outputs(&mut self) -> CardOutputs {
        std::mem::take(&mut self.outputs)
    }

    #[must_use]
    pub fn outputs(&self) -> &CardOutputs {
        &self.outputs
    }

    #[must_use]
    pub fn widget(&self) -> &W {
        &self.widget
    }

    /// Mutable widget access. Call [`notify_state_changed`](Self::notify_state_changed)
    /// after changing state.
    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    #[must_use]
    pub fn tree(&self) -> &RenderTree {
        &self.tree
    }

    #[must_use]
    pub fn gestures(&self) -> &GestureRecognizer {
        &self.gestures
    }

    #[must_use]
    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn clock(&self) -> &HostClock {
        &self.clock
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn frame_idx(&self) -> u64 {
        self.frame_idx
    }

    // --- render cycle ------------------------------------------------------

    fn run_cycle(&mut self, ticket: CycleTicket, now: Duration) -> bool {
        let ctx = RenderContext {
            now,
            time_bucket: self.scheduler.config().time_bucket,
        };
        let fingerprint = self.widget.fingerprint(&ctx);
        if !self.scheduler.should_render(ticket, fingerprint) {
            debug!(
                fingerprint = fingerprint.map(|fp| fp.digest()),
                "render skipped: fingerprint unchanged"
            );
            return false;
        }

        let span = tracing::debug_span!(
            target: "chorecard.runtime",
            "chorecard.render_cycle",
            forced = ticket.forced,
            frame = self.frame_idx,
            outcome = tracing::field::Empty,
        )
        .entered();

        let guard = self.scheduler.begin_cycle();
        let changed = match self.produce_and_apply() {
            Ok(changed) => {
                guard.commit(fingerprint);
                span.record("outcome", if changed { "applied" } else { "unchanged" });
                changed
            }
            Err(err) => {
                span.record("outcome", "failed");
                error!(error = %err, "render failed; showing error view");
                self.outputs.last_error = Some(err.to_string());
                self.show_fallback();
                drop(guard);
                true
            }
        };
        self.frame_idx += 1;

        let removed = self.tree.take_removed();
        if !removed.is_empty() {
            trace!(removed = removed.len(), "evicting gesture state");
            self.gestures.evict(&removed);
        }
        if changed || !self.gestures.is_attached() {
            let (_token, reset) = self.gestures.attach(&mut self.tree);
            self.handle_gesture_events(reset);
        }
        true
    }

    fn produce_and_apply(&mut self) -> Result<bool, RuntimeError> {
        let widget = &mut self.widget;
        let markup = match panic::catch_unwind(AssertUnwindSafe(|| widget.render())) {
            Ok(Ok(markup)) => markup,
            Ok(Err(err)) => return Err(RuntimeError::RenderFailed(err)),
            Err(payload) => return Err(RuntimeError::RenderPanicked(panic_message(&*payload))),
        };
        match self.config.render.strategy {
            RenderStrategy::Diff => Ok(self.differ.diff(&mut self.tree, &markup, None)?),
            RenderStrategy::FullReplace => {
                self.differ.replace(&mut self.tree, &markup)?;
                Ok(true)
            }
        }
    }

    fn show_fallback(&mut self) {
        let markup = fallback_markup(FALLBACK_MESSAGE);
        if let Err(err) = self.differ.replace(&mut self.tree, &markup) {
            error!(error = %err, "error view could not be applied");
        }
    }

    // --- gesture routing ---------------------------------------------------

    fn handle_gesture_events(&mut self, events: Vec<GestureEvent>) {
        for event in events {
            match &event {
                GestureEvent::Haptic { node } => {
                    self.outputs.commands.push(HostCommand::Haptic { node: *node });
                }
                GestureEvent::Dispatch(dispatch) => self.route(dispatch),
                _ => {}
            }
            self.outputs.gestures.push(event);
        }
    }

    fn route(&mut self, dispatch: &Dispatch) {
        debug!(
            action = %dispatch.action,
            id = dispatch.id(),
            kind = ?dispatch.kind,
            "dispatching"
        );
        if dispatch.action == RETRY_ACTION {
            self.scheduler.request_render(true);
            return;
        }
        let cmd = match dispatch.kind {
            GestureKind::SwipeCommit(SwipeDirection::Left) => self.widget.on_swipe_left(dispatch),
            GestureKind::SwipeCommit(SwipeDirection::Right) => self.widget.on_swipe_right(dispatch),
            GestureKind::Tap | GestureKind::ConfirmDelete => self.widget.dispatch(dispatch),
        };
        self.execute_cmd(cmd);
    }

    fn execute_cmd(&mut self, cmd: Cmd) {
        match cmd {
            Cmd::None => {}
            Cmd::StateChanged => {
                self.scheduler.request_render(false);
            }
            Cmd::ForceRender => {
                self.scheduler.request_render(true);
            }
            Cmd::Batch(cmds) => {
                for cmd in cmds {
                    self.execute_cmd(cmd);
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
