#![forbid(unsafe_code)]

//! Cancellable listener groups.
//!
//! Every listener the gesture recognizer needs on a render root is registered
//! in one [`ListenerGroup`]. Re-initializing gestures after a render, or
//! tearing the root down, cancels the whole group in one call: the
//! subscription list is drained and every [`ListenerToken`] handed to the host
//! observes the cancellation, so a host-side binding can unhook its native
//! listeners without tracking them individually.
//!
//! The execution model is single-threaded, so tokens share an `Rc<Cell<bool>>`
//! rather than an atomic.
//!
//! # Example
//!
//! ```
//! use chorecard_core::listener::{ListenerGroup, ListenerKind};
//!
//! let mut group = ListenerGroup::new(1);
//! group.subscribe(ListenerKind::Click);
//! let token = group.token();
//!
//! assert!(group.is_subscribed(ListenerKind::Click));
//! assert_eq!(group.cancel(), 1);
//! assert!(token.is_cancelled());
//! assert!(!group.is_subscribed(ListenerKind::Click));
//! ```

use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

/// Kinds of host listeners the recognizer registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerDown,
    PointerMove,
    PointerUp,
    PointerCancel,
    PointerLeave,
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
    Click,
}

impl ListenerKind {
    /// Every listener kind, in registration order.
    pub const ALL: [Self; 10] = [
        Self::PointerDown,
        Self::PointerMove,
        Self::PointerUp,
        Self::PointerCancel,
        Self::PointerLeave,
        Self::TouchStart,
        Self::TouchMove,
        Self::TouchEnd,
        Self::TouchCancel,
        Self::Click,
    ];

    /// Host event name for this listener.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PointerDown => "pointerdown",
            Self::PointerMove => "pointermove",
            Self::PointerUp => "pointerup",
            Self::PointerCancel => "pointercancel",
            Self::PointerLeave => "pointerleave",
            Self::TouchStart => "touchstart",
            Self::TouchMove => "touchmove",
            Self::TouchEnd => "touchend",
            Self::TouchCancel => "touchcancel",
            Self::Click => "click",
        }
    }

    const fn flag(self) -> ListenerKinds {
        match self {
            Self::PointerDown => ListenerKinds::POINTER_DOWN,
            Self::PointerMove => ListenerKinds::POINTER_MOVE,
            Self::PointerUp => ListenerKinds::POINTER_UP,
            Self::PointerCancel => ListenerKinds::POINTER_CANCEL,
            Self::PointerLeave => ListenerKinds::POINTER_LEAVE,
            Self::TouchStart => ListenerKinds::TOUCH_START,
            Self::TouchMove => ListenerKinds::TOUCH_MOVE,
            Self::TouchEnd => ListenerKinds::TOUCH_END,
            Self::TouchCancel => ListenerKinds::TOUCH_CANCEL,
            Self::Click => ListenerKinds::CLICK,
        }
    }
}

bitflags! {
    /// Set of listener kinds currently live in a group.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListenerKinds: u16 {
        const POINTER_DOWN = 1 << 0;
        const POINTER_MOVE = 1 << 1;
        const POINTER_UP = 1 << 2;
        const POINTER_CANCEL = 1 << 3;
        const POINTER_LEAVE = 1 << 4;
        const TOUCH_START = 1 << 5;
        const TOUCH_MOVE = 1 << 6;
        const TOUCH_END = 1 << 7;
        const TOUCH_CANCEL = 1 << 8;
        const CLICK = 1 << 9;
    }
}

/// Observer handle for a group's cancellation state.
///
/// Cloned into host bindings; cheap to clone.
#[derive(Debug, Clone)]
pub struct ListenerToken {
    cancelled: Rc<Cell<bool>>,
}

impl ListenerToken {
    /// Returns `true` once the owning group has been cancelled.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// One registered listener.
#[derive(Debug, Clone)]
pub struct Subscription {
    /// Sequence number within the group.
    pub id: u32,
    /// Which host event the listener observes.
    pub kind: ListenerKind,
}

/// A set of listener subscriptions cancellable as one unit.
///
/// Dropping a group cancels it: a discarded render root can never deliver
/// events through a stale group.
#[derive(Debug)]
pub struct ListenerGroup {
    id: u64,
    cancelled: Rc<Cell<bool>>,
    subscriptions: Vec<Subscription>,
    kinds: ListenerKinds,
}

impl ListenerGroup {
    /// Create an empty, live group.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Rc::new(Cell::new(false)),
            subscriptions: Vec::with_capacity(ListenerKind::ALL.len()),
            kinds: ListenerKinds::empty(),
        }
    }

    /// Group identifier.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Register a listener. Registering on a cancelled group is a no-op that
    /// returns `None`.
    pub fn subscribe(&mut self, kind: ListenerKind) -> Option<u32> {
        if self.is_cancelled() {
            return None;
        }
        let id = u32::try_from(self.subscriptions.len()).unwrap_or(u32::MAX);
        self.subscriptions.push(Subscription { id, kind });
        self.kinds |= kind.flag();
        Some(id)
    }

    /// Obtain a token observing this group.
    #[must_use]
    pub fn token(&self) -> ListenerToken {
        ListenerToken {
            cancelled: Rc::clone(&self.cancelled),
        }
    }

    /// Whether a live listener of `kind` is registered.
    #[must_use]
    pub fn is_subscribed(&self, kind: ListenerKind) -> bool {
        !self.is_cancelled() && self.kinds.contains(kind.flag())
    }

    /// Live listener kinds.
    #[must_use]
    pub const fn kinds(&self) -> ListenerKinds {
        self.kinds
    }

    /// Registered subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Cancel every subscription in the group. Returns how many were drained.
    ///
    /// Idempotent: a second call drains nothing.
    pub fn cancel(&mut self) -> usize {
        self.cancelled.set(true);
        self.kinds = ListenerKinds::empty();
        let drained = self.subscriptions.len();
        self.subscriptions.clear();
        drained
    }

    /// Whether [`cancel`](Self::cancel) has run.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

impl Drop for ListenerGroup {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_group() -> ListenerGroup {
        let mut group = ListenerGroup::new(7);
        for kind in ListenerKind::ALL {
            group.subscribe(kind);
        }
        group
    }

    #[test]
    fn new_group_is_live_and_empty() {
        let group = ListenerGroup::new(1);
        assert!(!group.is_cancelled());
        assert!(group.subscriptions().is_empty());
        assert_eq!(group.kinds(), ListenerKinds::empty());
    }

    #[test]
    fn subscribe_registers_kind() {
        let group = full_group();
        assert_eq!(group.subscriptions().len(), ListenerKind::ALL.len());
        assert_eq!(group.kinds(), ListenerKinds::all());
        assert!(group.is_subscribed(ListenerKind::TouchMove));
    }

    #[test]
    fn cancel_drains_in_bulk() {
        let mut group = full_group();
        assert_eq!(group.cancel(), ListenerKind::ALL.len());
        assert!(group.subscriptions().is_empty());
        for kind in ListenerKind::ALL {
            assert!(!group.is_subscribed(kind));
        }
    }

    #[test]
    fn cancel_propagates_to_all_tokens() {
        let mut group = full_group();
        let t1 = group.token();
        let t2 = t1.clone();
        group.cancel();
        assert!(t1.is_cancelled());
        assert!(t2.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut group = full_group();
        group.cancel();
        assert_eq!(group.cancel(), 0);
        assert!(group.is_cancelled());
    }

    #[test]
    fn subscribe_after_cancel_is_rejected() {
        let mut group = ListenerGroup::new(2);
        group.cancel();
        assert_eq!(group.subscribe(ListenerKind::Click), None);
        assert!(!group.is_subscribed(ListenerKind::Click));
    }

    #[test]
    fn drop_cancels_tokens() {
        let group = full_group();
        let token = group.token();
        drop(group);
        assert!(token.is_cancelled());
    }

    #[test]
    fn event_names_are_host_names() {
        assert_eq!(ListenerKind::TouchStart.event_name(), "touchstart");
        assert_eq!(ListenerKind::Click.event_name(), "click");
    }
}
