//! Property-based invariant tests for the tree differ.
//!
//! 1. Idempotence: diffing a markup string against itself reports no change
//!    and leaves the tree untouched.
//! 2. Round trip: patching a tree built from `old` towards `new` yields a
//!    tree structurally equal to one built from `new` directly.
//! 3. The mutation log is empty exactly when no patch was produced.
//! 4. Parsing never panics on arbitrary input.

use std::collections::BTreeMap;

use chorecard_render::markup::{parse, to_markup};
use chorecard_render::vnode::nodes_structurally_eq;
use chorecard_render::{RenderTree, TreeDiffer, VNode, diff_markup};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

fn vnode_strategy() -> impl Strategy<Value = VNode> {
    let leaf = "[a-z &<>]{1,6}".prop_map(VNode::text);
    leaf.prop_recursive(4, 32, 4, |inner| {
        (
            prop::sample::select(vec!["div", "p", "span", "li"]),
            prop::collection::btree_map(
                prop::sample::select(vec!["class", "data-id", "data-action"]),
                "[a-z0-9]{0,4}",
                0..3,
            ),
            prop::collection::vec(inner, 0..4),
        )
            .prop_map(|(tag, attrs, children)| {
                let attributes: BTreeMap<String, String> = attrs
                    .into_iter()
                    .map(|(k, v)| (k.to_owned(), v))
                    .collect();
                VNode::element(tag, attributes, children)
            })
    })
}

fn markup_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(vnode_strategy(), 0..5).prop_map(|nodes| to_markup(&nodes))
}

fn structure(tree: &RenderTree) -> Vec<VNode> {
    tree.to_vnodes(tree.root())
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Idempotence
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn diff_against_self_is_a_no_op(markup in markup_strategy()) {
        let mut tree = RenderTree::from_markup(&markup).unwrap();
        let before = tree.to_markup();
        let mut differ = TreeDiffer::new();
        let changed = differ.diff(&mut tree, &markup, Some(&markup)).unwrap();
        prop_assert!(!changed, "identical markup must report no change");
        prop_assert!(tree.take_mutations().is_empty());
        prop_assert_eq!(tree.to_markup(), before);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Round trip
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn patched_tree_matches_fresh_tree(old in markup_strategy(), new in markup_strategy()) {
        let mut tree = RenderTree::from_markup(&old).unwrap();
        let mut differ = TreeDiffer::new();
        differ.diff(&mut tree, &new, Some(&old)).unwrap();
        let fresh = RenderTree::from_markup(&new).unwrap();
        prop_assert!(
            nodes_structurally_eq(&structure(&tree), &structure(&fresh)),
            "patched: {}\nfresh:   {}",
            tree.to_markup(),
            fresh.to_markup()
        );
    }

    #[test]
    fn cached_chain_matches_last_markup(steps in prop::collection::vec(markup_strategy(), 1..5)) {
        let mut tree = RenderTree::new();
        let mut differ = TreeDiffer::new();
        for markup in &steps {
            differ.diff(&mut tree, markup, None).unwrap();
        }
        let last = steps.last().unwrap();
        let fresh = RenderTree::from_markup(last).unwrap();
        prop_assert!(nodes_structurally_eq(&structure(&tree), &structure(&fresh)));
        prop_assert_eq!(differ.cached(tree.id()), Some(last.as_str()));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Mutation log consistency
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mutations_iff_patches(old in markup_strategy(), new in markup_strategy()) {
        let patches = diff_markup(&old, &new).unwrap();
        let mut tree = RenderTree::from_markup(&old).unwrap();
        let mut differ = TreeDiffer::new();
        let changed = differ.diff(&mut tree, &new, Some(&old)).unwrap();
        prop_assert_eq!(changed, !patches.is_empty());
        prop_assert_eq!(tree.take_mutations().is_empty(), patches.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4. Parser robustness
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parse_never_panics(input in "[<>/a-z =\"'!&;#-]{0,64}") {
        let _ = parse(&input);
    }

    #[test]
    fn serialized_markup_reparses_identically(nodes in prop::collection::vec(vnode_strategy(), 0..4)) {
        let first = parse(&to_markup(&nodes)).unwrap();
        let second = parse(&to_markup(&first)).unwrap();
        prop_assert_eq!(first, second);
    }
}
