//! Cancellation, budgets and batch parsing.

use std::time::{Duration, Instant};

use sylva::diagnostics::{ErrorCode, Severity};
use sylva::{ParseOptions, Parser, TreeStatus};
use tokio_util::sync::CancellationToken;

use crate::helpers::assertions::assert_well_formed;
use crate::helpers::grammars::{CALC, SUM};
use crate::helpers::source_fixtures::CALC_PROGRAM;

#[test]
fn test_cancelled_parse_keeps_partial_tree() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let parser = Parser::with_options(CALC.clone(), ParseOptions::new().cancel_token(cancel));
    let tree = parser.parse(CALC_PROGRAM);
    assert_eq!(tree.status(), TreeStatus::Cancelled);

    let diagnostics = tree.diagnostics();
    let last = diagnostics.last().unwrap();
    assert_eq!(last.code, ErrorCode::E0901);
    assert_eq!(last.severity, Severity::Warning);

    let error = tree.into_complete().unwrap_err();
    assert_eq!(error.consumed, 0);
}

#[test]
fn test_child_token_follows_parent() {
    let parent = CancellationToken::new();
    let options = ParseOptions::new().cancel_token(parent.child_token());
    let parser = Parser::with_options(CALC.clone(), options);
    assert_eq!(parser.parse(CALC_PROGRAM).status(), TreeStatus::Complete);

    parent.cancel();
    assert_eq!(parser.parse(CALC_PROGRAM).status(), TreeStatus::Cancelled);
}

#[test]
fn test_byte_budget_stops_between_tokens() {
    let parser = Parser::with_options(CALC.clone(), ParseOptions::new().max_bytes(8));
    let tree = parser.parse("11; 22; 33; 44;");
    assert_eq!(tree.status(), TreeStatus::Cancelled);
    assert!(tree.consumed() >= 8);
    assert!(tree.consumed() < tree.len());
    assert_eq!(tree.root_node().end_byte(), tree.consumed());
}

#[test]
fn test_generous_limits_complete() {
    let options = ParseOptions::new()
        .timeout(Duration::from_secs(60))
        .max_bytes(1 << 20)
        .cancel_token(CancellationToken::new());
    let tree = Parser::with_options(CALC.clone(), options).parse(CALC_PROGRAM);
    assert_eq!(tree.status(), TreeStatus::Complete);
    assert!(tree.into_complete().is_ok());
}

#[test]
fn test_expired_deadline() {
    let options = ParseOptions::new().deadline(Instant::now() - Duration::from_millis(1));
    let tree = SUM.parse_with("1+2+3", options);
    assert_eq!(tree.status(), TreeStatus::Cancelled);
}

#[test]
fn test_single_version_still_parses_ambiguous_input() {
    let parser = Parser::with_options(SUM.clone(), ParseOptions::new().max_versions(1));
    let tree = parser.parse("1+2+3");
    assert!(!tree.has_errors());
    assert_well_formed(&tree);
}

#[test]
fn test_parse_batch_matches_sequential() {
    let texts: Vec<String> = (0..32).map(|i| format!("{i} + x * {i};")).collect();
    let parser = Parser::new(CALC.clone());
    let trees = parser.parse_batch(&texts);
    assert_eq!(trees.len(), texts.len());
    for (tree, text) in trees.iter().zip(&texts) {
        assert_eq!(tree.text(), text);
        assert!(tree.structurally_eq(&parser.parse(text)));
    }
}

#[test]
fn test_trees_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<sylva::Tree>();
    assert_send_sync::<sylva::GrammarHandle>();
    assert_send_sync::<sylva::Subtree>();
}
