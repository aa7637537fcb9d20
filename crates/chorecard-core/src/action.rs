#![forbid(unsafe_code)]

//! Resolved gesture outcomes.
//!
//! A [`Dispatch`] is the one value that leaves the gesture layer for the
//! owning widget: a typed `{kind, action, id}` description plus the input
//! event that completed the gesture. The recognizer emits at most one per
//! resolved gesture.

use crate::event::InputEvent;

/// Horizontal swipe direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    /// Finger moved toward negative x.
    Left,
    /// Finger moved toward positive x.
    Right,
}

impl SwipeDirection {
    /// Direction of a signed horizontal displacement. Zero maps to `Right`.
    #[inline]
    #[must_use]
    pub fn from_dx(dx: f64) -> Self {
        if dx < 0.0 { Self::Left } else { Self::Right }
    }

    /// Visual class marking a node swiped in this direction.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            Self::Left => crate::surface::classes::SWIPING_LEFT,
            Self::Right => crate::surface::classes::SWIPING_RIGHT,
        }
    }

    /// The other direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Lowercase name, as used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Which gesture produced a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureKind {
    /// Plain activation of an action control.
    Tap,
    /// Horizontal swipe released past the commit threshold.
    SwipeCommit(SwipeDirection),
    /// Confirm control of an open delete confirmation.
    ConfirmDelete,
}

/// An identified action routed to the owning widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    /// Gesture that resolved to this action.
    pub kind: GestureKind,
    /// Action name from the markup.
    pub action: String,
    /// Target identifier from the markup, if any.
    pub id: Option<String>,
    /// Event that completed the gesture.
    pub source: InputEvent,
}

impl Dispatch {
    /// Create a dispatch.
    #[must_use]
    pub fn new(
        kind: GestureKind,
        action: impl Into<String>,
        id: Option<String>,
        source: InputEvent,
    ) -> Self {
        Self {
            kind,
            action: action.into(),
            id,
            source,
        }
    }

    /// Target identifier as a string slice.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
