#![no_main]

use chorecard_render::markup::parse;
use chorecard_render::vnode::nodes_structurally_eq;
use chorecard_render::{RenderTree, TreeDiffer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    // Old and new markup are separated by the first NUL.
    let (old, new) = input.split_once('\0').unwrap_or((input, ""));
    let (Ok(_), Ok(expected)) = (parse(old), parse(new)) else {
        return;
    };

    let mut tree = RenderTree::new();
    let mut differ = TreeDiffer::new();
    differ.diff(&mut tree, old, None).expect("first render applies");
    differ.diff(&mut tree, new, None).expect("second render applies");

    let actual = tree.to_vnodes(tree.root());
    assert!(
        nodes_structurally_eq(&actual, &expected),
        "patched tree diverged from fresh parse"
    );

    // A repeat of the same markup is a no-op.
    assert!(!differ.diff(&mut tree, new, None).expect("repeat applies"));
});
