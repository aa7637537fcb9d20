#![forbid(unsafe_code)]

//! Core: input events, timers, listener groups, and gesture recognition.
//!
//! # Role in Chorecard
//! `chorecard-core` is the input layer. It owns the canonical pointer, touch
//! and click events a host pushes in, the deterministic timer queue every
//! deferred continuation runs on, and the [`GestureRecognizer`] that turns a
//! raw event stream into taps, long-press confirmations and swipe commits.
//!
//! # How it fits in the system
//! The render crate (`chorecard-render`) implements [`GestureSurface`] for its
//! live tree, so the recognizer never depends on a concrete tree type. The
//! runtime (`chorecard-runtime`) feeds events and time into the recognizer and
//! routes the resulting [`Dispatch`] values to the owning widget.
//!
//! [`GestureRecognizer`]: gesture::GestureRecognizer
//! [`GestureSurface`]: surface::GestureSurface
//! [`Dispatch`]: action::Dispatch

pub mod action;
pub mod event;
pub mod fingerprint;
pub mod geometry;
pub mod gesture;
pub mod listener;
pub mod node;
pub mod surface;
pub mod timer;

pub use action::{Dispatch, GestureKind, SwipeDirection};
pub use event::{ClickEvent, InputEvent, PointerEvent, PointerEventKind, TouchEvent, TouchEventKind};
pub use fingerprint::{FingerprintBuilder, RenderFingerprint};
pub use geometry::Point;
pub use gesture::{GestureConfig, GestureEvent, GestureRecognizer};
pub use listener::{ListenerGroup, ListenerKind, ListenerKinds, ListenerToken};
pub use node::NodeId;
pub use surface::GestureSurface;
pub use timer::{TimerId, TimerQueue};
