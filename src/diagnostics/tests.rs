//! Diagnostics over parsed trees

use super::*;
use crate::grammar::{Grammar, pattern, repeat, seq, string, sym};
use crate::language::GrammarHandle;

fn statements() -> GrammarHandle {
    Grammar::new("stmts")
        .rule("program", repeat(sym("statement")))
        .rule(
            "statement",
            seq([sym("NAME"), string("="), sym("NUMBER"), string(";")]),
        )
        .token("NAME", pattern("[a-z]+"))
        .token("NUMBER", pattern(r"\d+"))
        .extra(pattern(r"\s+"))
        .sync(string(";"))
        .stable("statement")
        .compile()
        .unwrap()
        .into()
}

#[test]
fn test_clean_tree_has_no_diagnostics() {
    let tree = statements().parse("a = 1; b = 2;");
    assert!(tree.diagnostics().is_empty());
}

#[test]
fn test_lexical_error() {
    let text = "a = 1; b = @@ 2;";
    let tree = statements().parse(text);
    let errors = tree.diagnostics();
    let lexical: Vec<_> = errors
        .iter()
        .filter(|e| e.code == ErrorCode::E0101)
        .collect();
    assert_eq!(lexical.len(), 1);
    assert_eq!(lexical[0].message, "invalid characters `@@`");
    assert_eq!(lexical[0].range, TextRange::new(11.into(), 13.into()));
}

#[test]
fn test_syntax_error_hint() {
    let text = "a = 1; b = ; c = 3;";
    let tree = statements().parse(text);
    let errors = tree.diagnostics();
    let syntax: Vec<_> = errors.iter().filter(|e| e.code.is_syntax()).collect();
    assert_eq!(syntax.len(), 1, "{errors:?}");
    let error = syntax[0];
    assert!(
        error.message.starts_with("unexpected `b ="),
        "{}",
        error.message
    );
    assert_eq!(error.hint.as_deref(), Some("expected one of: NUMBER"));
    assert!(error.severity.is_error());
}

#[test]
fn test_unexpected_end_of_input() {
    let tree = statements().parse("a = 1; b =");
    let errors = tree.diagnostics();
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|e| e.code.is_syntax()));
}

#[test]
fn test_excerpt_truncates_on_char_boundary() {
    let text = "é".repeat(30);
    let range = TextRange::new(0.into(), (text.len() as u32).into());
    let excerpt = excerpt(&text, range);
    assert!(excerpt.ends_with("..."));
    assert_eq!(excerpt.chars().count(), 12 + 3);
}
