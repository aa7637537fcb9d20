#![forbid(unsafe_code)]

//! Chorecard error model and graceful degradation.
//!
//! Each layer keeps its own typed error ([`MarkupError`], [`PatchError`],
//! [`RenderError`], [`ConfigError`]); this module folds them into one
//! [`Error`] and maps every variant to the [`DegradationAction`] a host takes
//! instead of panicking. Gesture input never produces an error: the
//! recognizer treats malformed or out-of-place events as no-ops.

use std::fmt;

use chorecard_render::{DiffError, MarkupError, PatchError};
use chorecard_runtime::{ConfigError, RenderError, RuntimeError};

// ── Unified Error ───────────────────────────────────────────────────────

/// Top-level error type for Chorecard hosts.
#[derive(Debug)]
pub enum Error {
    /// Widget markup could not be parsed.
    Markup(MarkupError),
    /// A computed patch did not fit the live tree.
    Patch(PatchError),
    /// The widget reported a render failure.
    Render(RenderError),
    /// The widget panicked while rendering (contained by the runtime).
    Panicked(String),
    /// Runtime configuration could not be loaded or validated.
    Config(ConfigError),
}

/// Standard result type for Chorecard APIs.
pub type Result<T> = std::result::Result<T, Error>;

// ── Graceful Degradation ────────────────────────────────────────────────

/// What a host should do when an error occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationAction {
    /// Replace the card body with the fallback error view and keep running.
    ErrorView,
    /// Refuse to start the card with this configuration.
    RejectConfiguration,
}

impl Error {
    /// Determine the graceful degradation action for this error.
    #[must_use]
    pub fn degradation(&self) -> DegradationAction {
        match self {
            Self::Markup(_) | Self::Patch(_) | Self::Render(_) | Self::Panicked(_) => {
                DegradationAction::ErrorView
            }
            Self::Config(_) => DegradationAction::RejectConfiguration,
        }
    }

    /// Error type label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Markup(_) => "markup",
            Self::Patch(_) => "patch",
            Self::Render(_) => "render",
            Self::Panicked(_) => "panic",
            Self::Config(_) => "config",
        }
    }

    /// Whether the card keeps running after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.degradation(), DegradationAction::RejectConfiguration)
    }
}

// ── Display ─────────────────────────────────────────────────────────────

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markup(err) => write!(f, "markup error: {err}"),
            Self::Patch(err) => write!(f, "patch error: {err}"),
            Self::Render(err) => write!(f, "render failed: {err}"),
            Self::Panicked(msg) => write!(f, "render panicked: {msg}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl fmt::Display for DegradationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ErrorView => write!(f, "error_view"),
            Self::RejectConfiguration => write!(f, "reject_configuration"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Markup(err) => Some(err),
            Self::Patch(err) => Some(err),
            Self::Render(err) => Some(err),
            Self::Panicked(_) => None,
            Self::Config(err) => Some(err),
        }
    }
}

// ── From conversions ────────────────────────────────────────────────────

impl From<MarkupError> for Error {
    fn from(err: MarkupError) -> Self {
        Self::Markup(err)
    }
}

impl From<PatchError> for Error {
    fn from(err: PatchError) -> Self {
        Self::Patch(err)
    }
}

impl From<DiffError> for Error {
    fn from(err: DiffError) -> Self {
        match err {
            DiffError::Markup(err) => Self::Markup(err),
            DiffError::Patch(err) => Self::Patch(err),
        }
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<RuntimeError> for Error {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::RenderFailed(err) => Self::Render(err),
            RuntimeError::RenderPanicked(msg) => Self::Panicked(msg),
            RuntimeError::Diff(err) => err.into(),
            RuntimeError::Config(err) => Self::Config(err),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────
