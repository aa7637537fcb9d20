#![forbid(unsafe_code)]

//! Chorecard public facade crate.
//!
//! Re-exports the types a host needs to run a dashboard card (input events,
//! the render tree and differ, the scheduler and [`CardRuntime`]) and offers a
//! lightweight prelude for widget authors.

pub mod error;

pub use error::{DegradationAction, Error, Result};

// --- Core re-exports -------------------------------------------------------

pub use chorecard_core::{
    ClickEvent, Dispatch, GestureConfig, GestureEvent, GestureKind, GestureRecognizer, InputEvent,
    NodeId, Point, PointerEvent, PointerEventKind, RenderFingerprint, SwipeDirection, TouchEvent,
    TouchEventKind,
};

// --- Render re-exports -----------------------------------------------------

pub use chorecard_render::{Mutation, Patch, RenderTree, TreeDiffer, VElement, VNode};

// --- Runtime re-exports ----------------------------------------------------

pub use chorecard_runtime::{
    CardOutputs, CardRuntime, Cmd, HostClock, HostCommand, RETRY_ACTION, RenderContext,
    RenderHandle, RenderScheduler, RenderStrategy, RuntimeConfig, SchedulerConfig, StepResult,
    Widget, init_tracing,
};

/// Everything a widget author usually needs.
pub mod prelude {
    pub use crate::{
        CardRuntime, Cmd, Dispatch, Error, InputEvent, Point, PointerEvent, RenderContext,
        RenderFingerprint, Result, RuntimeConfig, TouchEvent, Widget,
    };
    pub use chorecard_runtime::RenderError;

    pub use crate::{core, render, runtime};
}

pub use chorecard_core as core;
pub use chorecard_render as render;
pub use chorecard_runtime as runtime;
