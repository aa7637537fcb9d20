#![forbid(unsafe_code)]

//! Runtime: render scheduling and the host-driven card loop.
//!
//! # Role in Chorecard
//! `chorecard-runtime` decides when a card renders and routes what the user
//! does back to it. [`RenderScheduler`] debounces render requests, skips
//! cycles whose fingerprint has not changed and never nests a render inside
//! another. [`CardRuntime`] wires a [`Widget`] to the scheduler, the differ
//! and the gesture recognizer around one render tree.
//!
//! # Primary responsibilities
//! - **Scheduling**: debounce, fingerprint gate, re-entrancy guard.
//! - **Recovery**: failed or panicking renders become an error view with a
//!   retry control.
//! - **Routing**: gesture dispatches reach the widget; haptics and log lines
//!   reach the host as [`HostCommand`]s.
//! - **Configuration**: [`RuntimeConfig`] from TOML or JSON.
//!
//! # How it fits in the system
//! The host owns the loop. It pushes input events, advances the
//! [`HostClock`], calls [`CardRuntime::step`] and mirrors the recorded tree
//! mutations onto its real surface.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod scheduler;
pub mod widget;

pub use clock::HostClock;
pub use config::{RenderStrategy, RuntimeConfig};
pub use error::{ConfigError, RenderError, RuntimeError};
pub use logging::init_tracing;
pub use runtime::{CardOutputs, CardRuntime, HostCommand, RETRY_ACTION, StepResult};
pub use scheduler::{
    CycleGuard, CycleTicket, RenderHandle, RenderScheduler, RequestOutcome, SchedulerConfig,
    SchedulerStats,
};
pub use widget::{Cmd, RenderContext, Widget};
