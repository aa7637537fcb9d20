#![forbid(unsafe_code)]

//! The widget seam: what a dashboard card supplies to the runtime.
//!
//! A widget owns its domain state and produces complete markup on demand.
//! It never touches the render tree; the runtime diffs its markup in. Gesture
//! resolutions reach it as [`Dispatch`] values and it answers with a [`Cmd`].

use std::time::Duration;

use chorecard_core::{Dispatch, FingerprintBuilder, RenderFingerprint};

use crate::error::RenderError;

/// Follow-up work requested by a widget.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Cmd {
    #[default]
    None,
    /// State changed; schedule a debounced render.
    StateChanged,
    /// Render on the next step, bypassing debounce and fingerprint.
    ForceRender,
    Batch(Vec<Cmd>),
}

impl Cmd {
    #[inline]
    #[must_use]
    pub const fn none() -> Self {
        Self::None
    }

    /// Combine commands, collapsing trivial batches.
    #[must_use]
    pub fn batch(cmds: Vec<Self>) -> Self {
        let mut cmds: Vec<Self> = cmds.into_iter().filter(|c| *c != Self::None).collect();
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or_default(),
            _ => Self::Batch(cmds),
        }
    }
}

/// Inputs available when a widget fingerprints itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    /// Host time of the cycle.
    pub now: Duration,
    /// Coarse time bucket width; zero disables bucketing.
    pub time_bucket: Duration,
}

impl RenderContext {
    /// A fingerprint builder with the time bucket already folded in.
    #[must_use]
    pub fn fingerprint(&self) -> FingerprintBuilder {
        RenderFingerprint::builder().time_bucket(self.now, self.time_bucket)
    }
}

/// A card hosted by [`CardRuntime`](crate::runtime::CardRuntime).
pub trait Widget {
    /// Produce the complete markup for the current state.
    fn render(&mut self) -> Result<String, RenderError>;

    /// Digest of everything `render` depends on.
    ///
    /// Equal fingerprints on consecutive non-forced cycles skip the render.
    /// Returning `None` always renders.
    fn fingerprint(&self, ctx: &RenderContext) -> Option<RenderFingerprint> {
        let _ = ctx;
        None
    }

    /// Handle a resolved tap or confirmed delete.
    fn dispatch(&mut self, dispatch: &Dispatch) -> Cmd;

    /// Handle a committed left swipe.
    fn on_swipe_left(&mut self, dispatch: &Dispatch) -> Cmd {
        self.dispatch(dispatch)
    }

    /// Handle a committed right swipe.
    fn on_swipe_right(&mut self, dispatch: &Dispatch) -> Cmd {
        self.dispatch(dispatch)
    }
}
