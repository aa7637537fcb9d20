#![forbid(unsafe_code)]

//! Patch operations and their application to a live tree.
//!
//! Patches are positional: every index refers to the parent's child list as
//! it was when the diff was computed. [`apply`] snapshots that list before
//! touching it, so a run of removals or a replacement resolves to the node
//! the differ saw even after earlier patches in the same list have shifted
//! positions. Additions are inserted into the live list, which by then holds
//! exactly the retained prefix.

use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use chorecard_core::node::NodeId;

use crate::tree::RenderTree;
use crate::vnode::VNode;

/// One attribute change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrPatch {
    Remove(String),
    Set(String, String),
}

/// Attribute changes for one element; most touch only one or two keys.
pub type AttrPatches = SmallVec<[AttrPatch; 4]>;

/// One positioned change to a parent's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// Insert a new node at `index`.
    Add { index: usize, node: VNode },
    /// Remove the child at `index`.
    Remove { index: usize },
    /// Replace the child at `index` with a new subtree.
    Replace { index: usize, node: VNode },
    /// Set the content of the text child at `index`.
    Text { index: usize, content: String },
    /// Change attributes of the element child at `index`.
    Attributes { index: usize, ops: AttrPatches },
    /// Patch the children of the element child at `index`.
    Children { index: usize, patches: Vec<Patch> },
}

impl Patch {
    /// Position this patch refers to.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::Add { index, .. }
            | Self::Remove { index }
            | Self::Replace { index, .. }
            | Self::Text { index, .. }
            | Self::Attributes { index, .. }
            | Self::Children { index, .. } => *index,
        }
    }

    /// Total number of operations, nested ones included.
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Children { patches, .. } => 1 + count(patches),
            _ => 1,
        }
    }
}

/// Total number of operations in a patch list, nested ones included.
#[must_use]
pub fn count(patches: &[Patch]) -> usize {
    patches.iter().map(Patch::count).sum()
}

/// Why a patch could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The parent node is not in the tree.
    MissingParent(NodeId),
    /// The index is outside the parent's child list.
    OutOfBounds {
        parent: NodeId,
        index: usize,
        len: usize,
    },
    /// A text patch targets a node that is not text.
    NotText(NodeId),
    /// An attribute or children patch targets a node that is not an element.
    NotElement(NodeId),
}

impl fmt::Display for PatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParent(node) => write!(f, "patch parent {node} is not in the tree"),
            Self::OutOfBounds { parent, index, len } => {
                write!(f, "patch index {index} out of bounds for {parent} with {len} children")
            }
            Self::NotText(node) => write!(f, "text patch on non-text node {node}"),
            Self::NotElement(node) => write!(f, "element patch on non-element node {node}"),
        }
    }
}

impl std::error::Error for PatchError {}

/// Apply `patches` to the children of `parent`, depth-first.
pub fn apply(tree: &mut RenderTree, parent: NodeId, patches: &[Patch]) -> Result<(), PatchError> {
    if !tree.is_element(parent) && parent != tree.root() {
        return Err(PatchError::MissingParent(parent));
    }
    let snapshot = tree.children(parent).to_vec();
    let resolve = |index: usize| {
        snapshot.get(index).copied().ok_or(PatchError::OutOfBounds {
            parent,
            index,
            len: snapshot.len(),
        })
    };

    for patch in patches {
        match patch {
            Patch::Add { index, node } => {
                let len = tree.children(parent).len();
                tree.insert(parent, (*index).min(len), node)
                    .ok_or(PatchError::MissingParent(parent))?;
            }
            Patch::Remove { index } => {
                let child = resolve(*index)?;
                tree.remove(child);
            }
            Patch::Replace { index, node } => {
                let child = resolve(*index)?;
                tree.replace(child, node)
                    .ok_or(PatchError::MissingParent(parent))?;
            }
            Patch::Text { index, content } => {
                let child = resolve(*index)?;
                if !tree.set_text(child, content) {
                    return Err(PatchError::NotText(child));
                }
            }
            Patch::Attributes { index, ops } => {
                let child = resolve(*index)?;
                if !tree.is_element(child) {
                    return Err(PatchError::NotElement(child));
                }
                for op in ops {
                    match op {
                        AttrPatch::Remove(name) => {
                            tree.remove_attribute(child, name);
                        }
                        AttrPatch::Set(name, value) => {
                            tree.set_attribute(child, name, value);
                        }
                    }
                }
            }
            Patch::Children { index, patches } => {
                let child = resolve(*index)?;
                if !tree.is_element(child) {
                    return Err(PatchError::NotElement(child));
                }
                apply(tree, child, patches)?;
            }
        }
    }
    trace!(%parent, patches = patches.len(), "patches applied");
    Ok(())
}
