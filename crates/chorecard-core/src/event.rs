#![forbid(unsafe_code)]

//! Canonical input event types.
//!
//! The host translates its native pointer, touch and click notifications into
//! these values and pushes them into the runtime. Every event names the node
//! it was delivered to; resolving that node against the markup markers happens
//! once per event inside the gesture recognizer.
//!
//! # Design Notes
//!
//! - Positions are optional. A host that cannot report coordinates for an
//!   event (or reports non-finite ones) produces `None`, and the recognizer
//!   treats the event as a no-op for coordinate-dependent gestures.
//! - Touch events carry the first changed touch only; multi-touch is not
//!   modelled.

use crate::geometry::Point;
use crate::listener::ListenerKind;
use crate::node::NodeId;

/// Canonical input event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Mouse or pen pointer event.
    Pointer(PointerEvent),
    /// Touch event.
    Touch(TouchEvent),
    /// Activation (click / tap) delivered after a press is released.
    Click(ClickEvent),
}

impl InputEvent {
    /// Node the event was delivered to.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        match self {
            Self::Pointer(e) => e.target,
            Self::Touch(e) => e.target,
            Self::Click(e) => e.target,
        }
    }

    /// Position of the event, if the host supplied a usable one.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        let pos = match self {
            Self::Pointer(e) => e.position,
            Self::Touch(e) => e.position,
            Self::Click(_) => None,
        };
        pos.filter(|p| p.is_finite())
    }

    /// Listener kind that delivers this event.
    #[must_use]
    pub const fn listener_kind(&self) -> ListenerKind {
        match self {
            Self::Pointer(e) => match e.kind {
                PointerEventKind::Down => ListenerKind::PointerDown,
                PointerEventKind::Move => ListenerKind::PointerMove,
                PointerEventKind::Up => ListenerKind::PointerUp,
                PointerEventKind::Cancel => ListenerKind::PointerCancel,
                PointerEventKind::Leave => ListenerKind::PointerLeave,
            },
            Self::Touch(e) => match e.kind {
                TouchEventKind::Start => ListenerKind::TouchStart,
                TouchEventKind::Move => ListenerKind::TouchMove,
                TouchEventKind::End => ListenerKind::TouchEnd,
                TouchEventKind::Cancel => ListenerKind::TouchCancel,
            },
            Self::Click(_) => ListenerKind::Click,
        }
    }

    /// Whether this event begins a press (pointer down or touch start).
    #[must_use]
    pub const fn is_press_start(&self) -> bool {
        matches!(
            self,
            Self::Pointer(PointerEvent {
                kind: PointerEventKind::Down,
                ..
            }) | Self::Touch(TouchEvent {
                kind: TouchEventKind::Start,
                ..
            })
        )
    }
}

/// A mouse or pen pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// What happened.
    pub kind: PointerEventKind,
    /// Node the event was delivered to.
    pub target: NodeId,
    /// Pointer position, when known.
    pub position: Option<Point>,
}

impl PointerEvent {
    /// Create a pointer event at a position.
    #[must_use]
    pub const fn new(kind: PointerEventKind, target: NodeId, x: f64, y: f64) -> Self {
        Self {
            kind,
            target,
            position: Some(Point::new(x, y)),
        }
    }

    /// Create a pointer event without position data.
    #[must_use]
    pub const fn without_position(kind: PointerEventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            position: None,
        }
    }
}

/// Pointer event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEventKind {
    /// Button pressed.
    Down,
    /// Pointer moved.
    Move,
    /// Button released.
    Up,
    /// The platform cancelled the pointer sequence.
    Cancel,
    /// Pointer left the node.
    Leave,
}

/// A touch event (first changed touch only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    /// What happened.
    pub kind: TouchEventKind,
    /// Node the event was delivered to.
    pub target: NodeId,
    /// Touch position, when known.
    pub position: Option<Point>,
}

impl TouchEvent {
    /// Create a touch event at a position.
    #[must_use]
    pub const fn new(kind: TouchEventKind, target: NodeId, x: f64, y: f64) -> Self {
        Self {
            kind,
            target,
            position: Some(Point::new(x, y)),
        }
    }

    /// Create a touch event without position data.
    #[must_use]
    pub const fn without_position(kind: TouchEventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            position: None,
        }
    }
}

/// Touch event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchEventKind {
    /// Finger down.
    Start,
    /// Finger moved.
    Move,
    /// Finger lifted.
    End,
    /// The platform cancelled the touch sequence.
    Cancel,
}

/// An activation (click or tap) event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickEvent {
    /// Node the event was delivered to.
    pub target: NodeId,
}

impl ClickEvent {
    /// Create a click event.
    #[must_use]
    pub const fn new(target: NodeId) -> Self {
        Self { target }
    }
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        Self::Pointer(event)
    }
}

impl From<TouchEvent> for InputEvent {
    fn from(event: TouchEvent) -> Self {
        Self::Touch(event)
    }
}

impl From<ClickEvent> for InputEvent {
    fn from(event: ClickEvent) -> Self {
        Self::Click(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        NodeId::new(1, 0)
    }

    #[test]
    fn non_finite_position_is_dropped() {
        let event = InputEvent::from(PointerEvent::new(
            PointerEventKind::Down,
            node(),
            f64::NAN,
            4.0,
        ));
        assert_eq!(event.position(), None);
    }

    #[test]
    fn click_has_no_position() {
        let event = InputEvent::from(ClickEvent::new(node()));
        assert_eq!(event.position(), None);
        assert_eq!(event.listener_kind(), ListenerKind::Click);
    }

    #[test]
    fn press_start_covers_pointer_and_touch() {
        let down = InputEvent::from(PointerEvent::new(PointerEventKind::Down, node(), 0.0, 0.0));
        let start = InputEvent::from(TouchEvent::new(TouchEventKind::Start, node(), 0.0, 0.0));
        let up = InputEvent::from(PointerEvent::new(PointerEventKind::Up, node(), 0.0, 0.0));
        assert!(down.is_press_start());
        assert!(start.is_press_start());
        assert!(!up.is_press_start());
    }

    #[test]
    fn listener_kinds_match_event_kinds() {
        let mv = InputEvent::from(TouchEvent::new(TouchEventKind::Move, node(), 1.0, 1.0));
        assert_eq!(mv.listener_kind(), ListenerKind::TouchMove);
        let leave = InputEvent::from(PointerEvent::without_position(
            PointerEventKind::Leave,
            node(),
        ));
        assert_eq!(leave.listener_kind(), ListenerKind::PointerLeave);
    }
}
