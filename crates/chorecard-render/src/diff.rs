#![forbid(unsafe_code)]

//! Positional tree diffing.
//!
//! [`diff_nodes`] compares two ordered node lists index by index:
//!
//! - an index present only in the new list is an [`Patch::Add`];
//! - an index present only in the old list is a [`Patch::Remove`];
//! - text against text with different trimmed content is a [`Patch::Text`]
//!   carrying the new raw content;
//! - elements with the same tag diff their attributes (symmetric difference
//!   by key) and then their children, recursively;
//! - anything else is a [`Patch::Replace`].
//!
//! Keys are not used for matching: inserting or removing anywhere but the end
//! of a list shows up as edits to every following sibling plus a trailing add
//! or remove.
//!
//! [`TreeDiffer`] drives this against a [`RenderTree`], caching the last
//! applied markup per root so callers only pass the new markup.

use std::fmt;

use ahash::AHashMap;
use tracing::debug;

use crate::markup::{self, MarkupError};
use crate::patch::{self, AttrPatch, AttrPatches, Patch, PatchError};
use crate::tree::{RenderTree, RootId};
use crate::vnode::{VElement, VNode};

/// Diff two ordered node lists.
#[must_use]
pub fn diff_nodes(old: &[VNode], new: &[VNode]) -> Vec<Patch> {
    let mut patches = Vec::new();
    for index in 0..old.len().max(new.len()) {
        match (old.get(index), new.get(index)) {
            (None, Some(node)) => patches.push(Patch::Add {
                index,
                node: node.clone(),
            }),
            (Some(_), None) => patches.push(Patch::Remove { index }),
            (Some(a), Some(b)) => diff_node(index, a, b, &mut patches),
            (None, None) => {}
        }
    }
    patches
}

fn diff_node(index: usize, old: &VNode, new: &VNode, out: &mut Vec<Patch>) {
    match (old, new) {
        (VNode::Text { content: a, .. }, VNode::Text { content: b, raw }) => {
            if a != b {
                out.push(Patch::Text {
                    index,
                    content: raw.clone(),
                });
            }
        }
        (VNode::Element(a), VNode::Element(b)) if a.tag == b.tag => {
            let ops = diff_attributes(a, b);
            if !ops.is_empty() {
                out.push(Patch::Attributes { index, ops });
            }
            let children = diff_nodes(&a.children, &b.children);
            if !children.is_empty() {
                out.push(Patch::Children {
                    index,
                    patches: children,
                });
            }
        }
        _ => out.push(Patch::Replace {
            index,
            node: new.clone(),
        }),
    }
}

fn diff_attributes(old: &VElement, new: &VElement) -> AttrPatches {
    let mut ops = AttrPatches::new();
    for name in old.attributes.keys() {
        if !new.attributes.contains_key(name) {
            ops.push(AttrPatch::Remove(name.clone()));
        }
    }
    for (name, value) in &new.attributes {
        if old.attributes.get(name) != Some(value) {
            ops.push(AttrPatch::Set(name.clone(), value.clone()));
        }
    }
    ops
}

/// Parse both markup strings and diff them.
pub fn diff_markup(old: &str, new: &str) -> Result<Vec<Patch>, MarkupError> {
    let old_nodes = markup::parse(old)?;
    let new_nodes = markup::parse(new)?;
    Ok(diff_nodes(&old_nodes, &new_nodes))
}

/// Failure to bring a tree up to date with new markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffError {
    Markup(MarkupError),
    Patch(PatchError),
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Markup(e) => write!(f, "markup error: {e}"),
            Self::Patch(e) => write!(f, "patch error: {e}"),
        }
    }
}

impl std::error::Error for DiffError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Markup(e) => Some(e),
            Self::Patch(e) => Some(e),
        }
    }
}

impl From<MarkupError> for DiffError {
    fn from(e: MarkupError) -> Self {
        Self::Markup(e)
    }
}

impl From<PatchError> for DiffError {
    fn from(e: PatchError) -> Self {
        Self::Patch(e)
    }
}

/// Applies new markup to render trees, remembering the last markup per root.
#[derive(Debug, Default)]
pub struct TreeDiffer {
    cache: AHashMap<RootId, String>,
}

impl TreeDiffer {
    /// Create a differ with an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring `tree` from `old` (or the cached markup, or nothing) to `new`.
    ///
    /// Returns `Ok(false)` without touching the tree when the strings are
    /// equal. Otherwise applies the patches, caches `new` and returns whether
    /// any patch was produced. On error the cache is left unchanged.
    pub fn diff(
        &mut self,
        tree: &mut RenderTree,
        new: &str,
        old: Option<&str>,
    ) -> Result<bool, DiffError> {
        let root_id = tree.id();
        let old = old
            .or_else(|| self.cache.get(&root_id).map(String::as_str))
            .unwrap_or_default();
        if old == new {
            return Ok(false);
        }

        let patches = diff_markup(old, new)?;
        let root = tree.root();
        patch::apply(tree, root, &patches)?;
        debug!(
            root = root_id.get(),
            patches = patch::count(&patches),
            "diff applied"
        );
        self.cache.insert(root_id, new.to_owned());
        Ok(!patches.is_empty())
    }

    /// Replace the whole content of `tree` with `markup`.
    pub fn replace(&mut self, tree: &mut RenderTree, markup: &str) -> Result<(), DiffError> {
        let nodes = markup::parse(markup)?;
        let root = tree.root();
        tree.replace_children(root, &nodes);
        self.cache.insert(tree.id(), markup.to_owned());
        debug!(root = tree.id().get(), nodes = nodes.len(), "tree replaced");
        Ok(())
    }

    /// Last markup applied to `root`.
    #[must_use]
    pub fn cached(&self, root: RootId) -> Option<&str> {
        self.cache.get(&root).map(String::as_str)
    }

    /// Drop the cache entry for `root`.
    pub fn forget(&mut self, root: RootId) -> Option<String> {
        self.cache.remove(&root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use smallvec::smallvec;

    fn nodes(src: &str) -> Vec<VNode> {
        markup::parse(src).unwrap()
    }

    #[test]
    fn empty_to_two_is_two_adds() {
        let patches = diff_nodes(&[], &nodes(r#"<div data-id="1">A</div><div data-id="2">B</div>"#));
        assert_eq!(patches.len(), 2);
        assert!(matches!(patches[0], Patch::Add { index: 0, .. }));
        assert!(matches!(patches[1], Patch::Add { index: 1, .. }));
    }

    #[test]
    fn shrink_is_text_then_remove() {
        let old = nodes(r#"<div data-id="1">A</div><div data-id="2">B</div>"#);
        let new = nodes(r#"<div data-id="1">A*</div>"#);
        assert_eq!(
            diff_nodes(&old, &new),
            vec![
                Patch::Children {
                    index: 0,
                    patches: vec![Patch::Text {
                        index: 0,
                        content: "A*".into(),
                    }],
                },
                Patch::Remove { index: 1 },
            ]
        );
    }

    #[test]
    fn tag_change_replaces() {
        let patches = diff_nodes(&nodes("<p>a</p>"), &nodes("<span>a</span>"));
        assert!(matches!(patches[..], [Patch::Replace { index: 0, .. }]));
    }

    #[test]
    fn text_vs_element_replaces() {
        let patches = diff_nodes(&nodes("a"), &nodes("<b>a</b>"));
        assert!(matches!(patches[..], [Patch::Replace { index: 0, .. }]));
    }

    #[test]
    fn attributes_symmetric_difference() {
        let patches = diff_nodes(
            &nodes(r#"<i a="1" b="2" c="3"></i>"#),
            &nodes(r#"<i a="1" b="9" d="4"></i>"#),
        );
        let expected: AttrPatches = smallvec![
            AttrPatch::Remove("c".into()),
            AttrPatch::Set("b".into(), "9".into()),
            AttrPatch::Set("d".into(), "4".into()),
        ];
        assert_eq!(patches, vec![Patch::Attributes { index: 0, ops: expected }]);
    }

    #[test]
    fn whitespace_only_change_is_not_a_patch() {
        assert!(diff_nodes(&nodes("<p> a </p>"), &nodes("<p>a</p>")).is_empty());
    }

    #[test]
    fn front_removal_is_positional() {
        let old = nodes("<li>a</li><li>b</li><li>c</li>");
        let new = nodes("<li>b</li><li>c</li>");
        let patches = diff_nodes(&old, &new);
        assert_eq!(patches.len(), 3);
        assert_eq!(patches[2], Patch::Remove { index: 2 });
    }

    #[test]
    fn differ_fast_path_does_nothing() {
        let mut tree = RenderTree::new();
        let mut differ = TreeDiffer::new();
        assert!(differ.diff(&mut tree, "<p>x</p>", None).unwrap());
        tree.take_mutations();
        assert!(!differ.diff(&mut tree, "<p>x</p>", None).unwrap());
        assert!(tree.take_mutations().is_empty());
    }

    #[test]
    fn differ_uses_explicit_old_markup() {
        let mut tree = RenderTree::from_markup("<p>x</p>").unwrap();
        let mut differ = TreeDiffer::new();
        assert!(differ.diff(&mut tree, "<p>y</p>", Some("<p>x</p>")).unwrap());
        assert_eq!(tree.to_markup(), "<p>y</p>");
        assert_eq!(differ.cached(tree.id()), Some("<p>y</p>"));
    }

    #[test]
    fn markup_error_leaves_cache_unchanged() {
        let mut tree = RenderTree::new();
        let mut differ = TreeDiffer::new();
        differ.diff(&mut tree, "<p>x</p>", None).unwrap();
        let err = differ.diff(&mut tree, "<p>x</q>", None).unwrap_err();
        assert!(matches!(err, DiffError::Markup(_)));
        assert_eq!(differ.cached(tree.id()), Some("<p>x</p>"));
    }

    #[test]
    fn replace_resets_content_and_cache() {
        let mut tree = RenderTree::from_markup("<p>x</p><p>y</p>").unwrap();
        let mut differ = TreeDiffer::new();
        differ.replace(&mut tree, "<div>err</div>").unwrap();
        assert_eq!(tree.to_markup(), "<div>err</div>");
        assert!(!differ.diff(&mut tree, "<div>err</div>", None).unwrap());
    }

    #[test]
    fn forget_drops_cache() {
        let mut tree = RenderTree::new();
        let mut differ = TreeDiffer::new();
        differ.diff(&mut tree, "a", None).unwrap();
        assert_eq!(differ.forget(tree.id()).as_deref(), Some("a"));
        assert_eq!(differ.cached(tree.id()), None);
    }
}
