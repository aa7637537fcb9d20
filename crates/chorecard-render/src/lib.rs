#![forbid(unsafe_code)]

//! Render: markup parsing, live render trees, and positional tree diffing.
//!
//! # Role in Chorecard
//! `chorecard-render` owns the render root. A widget's render function
//! produces a markup string; [`TreeDiffer`] parses it next to the previously
//! applied markup, computes a minimal positional [`Patch`] list and applies it
//! to the [`RenderTree`], so unchanged nodes keep their identity across
//! renders.
//!
//! # Primary responsibilities
//! - **Markup**: parse and serialize the HTML subset widgets emit.
//! - **RenderTree**: generational arena with a mutation log for the host.
//! - **Diff/Patch**: index-by-index comparison and snapshot-resolved apply.
//!
//! # How it fits in the system
//! `chorecard-runtime` calls [`TreeDiffer::diff`] (or [`TreeDiffer::replace`]
//! for full replacement and error views) inside a scheduler cycle, then hands
//! the tree to the gesture recognizer through
//! [`GestureSurface`](chorecard_core::surface::GestureSurface).

pub mod diff;
pub mod markup;
pub mod patch;
pub mod tree;
pub mod vnode;

pub use diff::{DiffError, TreeDiffer, diff_markup, diff_nodes};
pub use markup::{MarkupError, MarkupErrorKind};
pub use patch::{AttrPatch, AttrPatches, Patch, PatchError};
pub use tree::{Mutation, RenderTree, RootId};
pub use vnode::{VElement, VNode};
