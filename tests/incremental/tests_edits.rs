//! Incremental reparses compared against full parses.

use rstest::rstest;
use sylva::{EditError, InputEdit, Subtree, Tree};

use crate::helpers::assertions::assert_incremental_matches;
use crate::helpers::grammars::{CALC, SLANG, SUM};
use crate::helpers::source_fixtures::{CALC_PROGRAM, SLANG_SHADER};

fn statements(tree: &Tree) -> Vec<Subtree> {
    tree.preorder()
        .filter(|node| node.kind() == "statement")
        .map(|node| node.subtree().clone())
        .collect()
}

#[test]
fn test_sum_insert_digit() {
    let old = sylva::parse(&SUM, "1+2");
    let (edit, text) = InputEdit::apply(old.text(), 3..3, "3");
    let new = sylva::parse_incremental(&SUM, &old, &[edit], &text).unwrap();
    assert!(new.structurally_eq(&sylva::parse(&SUM, "1+23")));
    assert_eq!(
        new.to_sexp(),
        "expr[expr[NUMBER[0,1)] '+'[1,2) expr[NUMBER[2,4)]]"
    );
    assert_eq!(new.version(), old.version() + 1);
}

#[rstest]
#[case("1+2;", 3..3, "3")]
#[case("1; 2; 3;", 3..4, "4+5")]
#[case("a; b; c;", 3..4, "bb*2")]
#[case("1; 2; 3;", 2..5, "")]
#[case("x;", 2..2, " y;")]
#[case("(1+2);", 0..1, "")]
#[case("1 /* c */ ;", 4..5, "d")]
#[case("1 /* c */ ;", 2..3, "")]
#[case("1;", 0..2, "")]
#[case("", 0..0, "1 + 2;")]
#[case("1; 2;", 1..2, "")]
#[case("a * b;", 2..3, "+")]
fn test_calc_edits(
    #[case] old: &str,
    #[case] range: std::ops::Range<usize>,
    #[case] replacement: &str,
) {
    let old = CALC.parse(old);
    assert_incremental_matches(&CALC, &old, range, replacement);
}

#[test]
fn test_untouched_statements_are_shared() {
    let old = CALC.parse("1; 2; 3;");
    let new = assert_incremental_matches(&CALC, &old, 3..4, "4+5");
    let (before, after) = (statements(&old), statements(&new));
    assert_eq!(after.len(), 3);
    assert!(after[0].ptr_eq(&before[0]));
    assert!(after[2].ptr_eq(&before[2]));
    assert_eq!(
        new.changed_ranges(&old),
        [sylva::TextRange::new(3.into(), 6.into())]
    );
}

#[test]
fn test_edits_across_program() {
    let mut tree = CALC.parse(CALC_PROGRAM);
    let steps: [(&str, &str); 4] = [
        ("total;", "sum;"),
        ("2 *", "2 * 10 *"),
        ("y * y;", ""),
        ("running", "total"),
    ];
    for (from, to) in steps {
        let start = tree.text().find(from).unwrap();
        tree = assert_incremental_matches(&CALC, &tree, start..start + from.len(), to);
    }
    assert_eq!(tree.version(), 4);
    assert!(!tree.has_errors());
}

#[test]
fn test_slang_edits() {
    let mut tree = SLANG.parse(SLANG_SHADER);
    let steps: [(&str, &str); 5] = [
        ("2.5", "3.0"),
        ("normal * intensity", "normal * intensity + 1"),
        ("return combine(lit, scale);", "return;"),
        ("void main() {", "void main() { int k = 0;"),
        ("shade(n, 1);", "shade(n, 1"),
    ];
    for (from, to) in steps {
        let start = tree.text().find(from).unwrap();
        tree = assert_incremental_matches(&SLANG, &tree, start..start + from.len(), to);
    }
    assert!(tree.has_errors());
}

#[test]
fn test_multiple_edits_in_one_call() {
    let old = CALC.parse("a; b; c;");
    let (first, text) = InputEdit::apply(old.text(), 0..1, "aa");
    let (second, text) = InputEdit::apply(&text, 7..8, "c + 1");
    let new = CALC
        .parse_incremental(&old, &[first, second], &text)
        .unwrap();
    assert_eq!(new.text(), "aa; b; c + 1;");
    assert!(new.structurally_eq(&CALC.parse(&text)));
}

#[test]
fn test_edit_marks_tree() {
    let old = CALC.parse("1; 2;");
    let (edit, text) = InputEdit::apply(old.text(), 3..4, "20");
    let edited = old.edit(&edit, &text).unwrap();
    assert!(edited.root().has_changes());
    assert_eq!(edited.root_node().byte_range(), 0..text.len());
    // The first statement ends before the edit and is left alone
    assert!(!statements(&edited)[0].has_changes());
    let new = CALC.parse_incremental(&old, &[edit], &text).unwrap();
    assert!(!new.root().has_changes());
}

#[test]
fn test_invalid_edits() {
    let old = CALC.parse("1;");
    let past_end = InputEdit::insert("1;  ", 4, "x");
    assert!(matches!(
        CALC.parse_incremental(&old, &[past_end], "1;  x"),
        Err(EditError::OutOfBounds { .. })
    ));

    let edit = InputEdit::insert(old.text(), 2, "2;");
    assert_eq!(
        CALC.parse_incremental(&old, &[edit], "1;").unwrap_err(),
        EditError::LengthMismatch {
            expected: 4,
            found: 2
        }
    );

    let foreign = SUM.parse("1");
    assert!(matches!(
        CALC.parse_incremental(&foreign, &[], "1"),
        Err(EditError::GrammarMismatch { .. })
    ));
}
