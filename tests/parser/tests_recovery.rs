//! Error recovery: the parse never fails and errors stay local.

use rstest::rstest;
use sylva::TreeStatus;
use sylva::diagnostics::ErrorCode;

use crate::helpers::assertions::{assert_well_formed, kinds};
use crate::helpers::grammars::{CALC, SLANG, SUM};
use crate::helpers::source_fixtures::SLANG_BROKEN;

#[test]
fn test_error_before_sync_token() {
    let tree = CALC.parse("1 + ; 2;");
    assert_eq!(tree.status(), TreeStatus::CompleteWithErrors);
    assert_well_formed(&tree);
    let root = tree.root_node();
    assert_eq!(kinds(&root.children()), ["ERROR", "statement"]);
    assert_eq!(root.child(0).unwrap().text(), "1 + ;");
    assert_eq!(root.child(1).unwrap().text(), "2;");
}

#[test]
fn test_syntax_error_diagnostic() {
    let tree = CALC.parse("1 + ; 2;");
    let diagnostics = tree.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    let error = &diagnostics[0];
    assert_eq!(error.code, ErrorCode::E0201);
    assert_eq!(error.message, "unexpected `1 + ;`");
    assert_eq!(error.range, sylva::TextRange::new(0.into(), 5.into()));
    assert!(error.hint.as_deref().is_some_and(|h| h.contains("NUMBER")));
    let rendered = error.to_string();
    assert!(rendered.starts_with("E0201: unexpected `1 + ;`\n  hint: "));
}

#[test]
fn test_invalid_characters_stay_inside_statement() {
    let tree = CALC.parse("1 # ;");
    let error = tree.preorder().find(|node| node.is_error()).unwrap();
    assert_eq!(error.text(), "#");
    assert_eq!(error.parent().unwrap().kind(), "statement");

    let diagnostics = tree.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, ErrorCode::E0101);
    assert_eq!(diagnostics[0].related[0].message, "in statement");
}

#[test]
fn test_unterminated_comment_is_lexical_error() {
    let tree = CALC.parse("1; /* open");
    assert!(tree.has_errors());
    assert_well_formed(&tree);
    for diagnostic in tree.diagnostics() {
        assert!(diagnostic.code.is_lexical() || diagnostic.code.is_syntax());
    }
}

#[test]
fn test_slang_error_is_local() {
    let tree = SLANG.parse(SLANG_BROKEN);
    assert!(tree.has_errors());
    assert_well_formed(&tree);
    let root = tree.root_node();
    let children = root.children();
    assert_eq!(children.first().unwrap().text(), "float a = 1;");
    assert_eq!(children.last().unwrap().kind(), "declaration");
    assert_eq!(children.last().unwrap().text(), "int c = 3;");
}

#[rstest]
#[case("")]
#[case(";")]
#[case(")")]
#[case("((((")]
#[case("1 2 3")]
#[case(";;;;")]
#[case("1 + + + 2;")]
#[case("@@@ 1;")]
#[case("/* a */ /*")]
fn test_garbage_input_still_yields_tree(#[case] input: &str) {
    let tree = CALC.parse(input);
    assert_well_formed(&tree);
    assert_ne!(tree.status(), TreeStatus::Cancelled);
}

#[rstest]
#[case("+")]
#[case("1+")]
#[case("++1")]
#[case("1 1")]
fn test_sum_errors(#[case] input: &str) {
    let tree = SUM.parse(input);
    assert!(tree.has_errors());
    assert_well_formed(&tree);
    assert_eq!(tree.status(), TreeStatus::CompleteWithErrors);
}
