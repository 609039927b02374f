//! Assertions over whole trees.

use sylva::{GrammarHandle, InputEdit, Tree};

/// Root covers the text; every child lies inside its parent, after its
/// previous sibling.
pub fn assert_well_formed(tree: &Tree) {
    assert_eq!(
        tree.root_node().byte_range(),
        0..tree.len(),
        "root range of {:?}",
        tree.text()
    );
    for node in tree.preorder() {
        let mut previous_end = node.start_byte();
        for child in node.children() {
            assert!(
                child.start_byte() >= previous_end && child.end_byte() <= node.end_byte(),
                "{child:?} escapes {node:?} in {:?}",
                tree.text()
            );
            previous_end = child.end_byte();
        }
    }
}

/// Apply one replacement to `old`, reparse incrementally and compare with
/// a full parse of the new text.
pub fn assert_incremental_matches(
    grammar: &GrammarHandle,
    old: &Tree,
    range: std::ops::Range<usize>,
    replacement: &str,
) -> Tree {
    let (edit, text) = InputEdit::apply(old.text(), range, replacement);
    let new = grammar
        .parse_incremental(old, &[edit], &text)
        .expect("edit is valid");
    let fresh = grammar.parse(&text);
    assert!(
        new.structurally_eq(&fresh),
        "incremental: {}\nfull: {}\ntext: {text:?}",
        new.to_sexp(),
        fresh.to_sexp()
    );
    assert_eq!(new.status(), fresh.status());
    new
}

pub fn kinds<'t>(nodes: &[sylva::Node<'t>]) -> Vec<&'t str> {
    nodes.iter().map(|node| node.kind()).collect()
}
