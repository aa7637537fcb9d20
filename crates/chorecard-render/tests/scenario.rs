//! Worked render scenarios against a live tree.

use chorecard_render::{Patch, RenderTree, TreeDiffer, diff_markup};
use pretty_assertions::assert_eq;

const TWO_CARDS: &str = r#"<div data-id="1">A</div><div data-id="2">B</div>"#;
const ONE_CARD: &str = r#"<div data-id="1">A*</div>"#;

#[test]
fn empty_root_receives_two_adds() {
    let patches = diff_markup("", TWO_CARDS).unwrap();
    assert!(matches!(
        patches[..],
        [Patch::Add { index: 0, .. }, Patch::Add { index: 1, .. }]
    ));

    let mut tree = RenderTree::new();
    let mut differ = TreeDiffer::new();
    assert!(differ.diff(&mut tree, TWO_CARDS, None).unwrap());
    let kids = tree.children(tree.root()).to_vec();
    assert_eq!(kids.len(), 2);
    assert_eq!(tree.text_content(kids[0]), "A");
    assert_eq!(tree.text_content(kids[1]), "B");
}

#[test]
fn shrinking_is_positional_text_then_remove() {
    let patches = diff_markup(TWO_CARDS, ONE_CARD).unwrap();
    assert_eq!(
        patches,
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

    let mut tree = RenderTree::new();
    let mut differ = TreeDiffer::new();
    differ.diff(&mut tree, TWO_CARDS, None).unwrap();
    let first = tree.children(tree.root())[0];
    differ.diff(&mut tree, ONE_CARD, None).unwrap();

    let kids = tree.children(tree.root()).to_vec();
    assert_eq!(kids, vec![first], "the surviving card keeps its identity");
    assert_eq!(tree.text_content(first), "A*");
    assert_eq!(tree.to_markup(), ONE_CARD);
}

#[test]
fn whitespace_formatting_survives_patch() {
    let old = "<p>\n  a\n</p>";
    let new = "<p>\n  b\n</p>";
    let mut tree = RenderTree::from_markup(old).unwrap();
    let mut differ = TreeDiffer::new();
    differ.diff(&mut tree, new, Some(old)).unwrap();
    assert_eq!(tree.to_markup(), new);
}

#[test]
fn removed_nodes_are_reported() {
    let mut tree = RenderTree::new();
    let mut differ = TreeDiffer::new();
    differ.diff(&mut tree, TWO_CARDS, None).unwrap();
    tree.take_removed();
    differ.diff(&mut tree, ONE_CARD, None).unwrap();
    // The second card and its text node.
    assert_eq!(tree.take_removed().len(), 2);
}
