//! Full parses of well-formed input.

use rstest::rstest;
use sylva::TreeStatus;

use crate::helpers::assertions::{assert_well_formed, kinds};
use crate::helpers::grammars::{CALC, SLANG, SUM, mixed_precedence, reduce_pair};
use crate::helpers::source_fixtures::{CALC_PROGRAM, SLANG_SHADER};

#[test]
fn test_sum_example() {
    let tree = sylva::parse(&SUM, "1+2");
    assert_eq!(
        tree.to_sexp(),
        "expr[expr[NUMBER[0,1)] '+'[1,2) expr[NUMBER[2,3)]]"
    );
    assert_eq!(tree.status(), TreeStatus::Complete);
    assert_eq!(tree.version(), 0);
}

#[test]
fn test_ambiguous_sum_is_deterministic() {
    let first = SUM.parse("1+2+3+4");
    for _ in 0..4 {
        assert_eq!(SUM.parse("1+2+3+4").to_sexp(), first.to_sexp());
    }
    assert!(!first.has_errors());
}

#[rstest]
#[case::product_declared_first(true)]
#[case::product_declared_second(false)]
fn test_higher_precedence_wins_in_any_order(#[case] product_first: bool) {
    let grammar = mixed_precedence(product_first);
    assert_eq!(
        grammar.parse("1+2*3").to_sexp(),
        "e[e[N[0,1)] '+'[1,2) e[e[N[2,3)] '*'[3,4) e[N[4,5)]]]"
    );
    assert_eq!(
        grammar.parse("1*2+3").to_sexp(),
        "e[e[e[N[0,1)] '*'[1,2) e[N[2,3)]] '+'[3,4) e[N[4,5)]]"
    );
}

#[rstest]
#[case::hi_declared_first(true)]
#[case::hi_declared_second(false)]
fn test_reduce_reduce_prefers_precedence(#[case] hi_first: bool) {
    let tree = reduce_pair(hi_first).parse("xyz");
    assert_eq!(tree.to_sexp(), "s[hi['x'[0,1) 'y'[1,2)] 'z'[2,3)]");
    assert!(!tree.has_errors());
}

#[rstest]
#[case("", "program[]")]
#[case("7;", "program[statement[expression[NUMBER[0,1)] ';'[1,2)]]")]
#[case(
    "1+2*3;",
    "program[statement[expression[expression[NUMBER[0,1)] '+'[1,2) expression[expression[NUMBER[2,3)] '*'[3,4) expression[NUMBER[4,5)]]] ';'[5,6)]]"
)]
#[case(
    "1-2-3;",
    "program[statement[expression[expression[expression[NUMBER[0,1)] '-'[1,2) expression[NUMBER[2,3)]] '-'[3,4) expression[NUMBER[4,5)]] ';'[5,6)]]"
)]
#[case("(x);", "program[statement[expression['('[0,1) expression[NAME[1,2)] ')'[2,3)] ';'[3,4)]]")]
#[case("1 /* one */ ;", "program[statement[expression[NUMBER[0,1)] comment[2,11) ';'[12,13)]]")]
fn test_calc_sexp(#[case] input: &str, #[case] expected: &str) {
    let tree = CALC.parse(input);
    assert_eq!(tree.to_sexp(), expected, "input: {input:?}");
    assert!(!tree.has_errors());
}

#[test]
fn test_calc_program() {
    let tree = CALC.parse(CALC_PROGRAM);
    assert_well_formed(&tree);
    assert!(!tree.has_errors());
    let root = tree.root_node();
    assert_eq!(
        kinds(&root.children()),
        ["statement", "comment", "statement", "statement"]
    );
    assert_eq!(root.named_children()[2].text(), "total + 2 * (3 - x);");
}

#[test]
fn test_slang_shader() {
    let tree = SLANG.parse(SLANG_SHADER);
    assert_well_formed(&tree);
    assert!(!tree.has_errors(), "{}", tree.to_sexp());
    let declarations = tree.root_node().named_children();
    assert_eq!(declarations.len(), 3);
    assert_eq!(declarations[0].text(), "float scale = 2.5;");

    let calls: Vec<&str> = tree
        .preorder()
        .filter(|node| node.kind() == "call")
        .map(|node| node.text())
        .collect();
    assert_eq!(calls, ["combine(lit, scale)", "shade(n, 1)"]);
}

#[rstest]
#[case("float2 v;", "float2")]
#[case("float v;", "float")]
#[case("int v;", "int")]
fn test_keyword_beats_identifier(#[case] input: &str, #[case] keyword: &str) {
    let tree = SLANG.parse(input);
    let ty = tree.preorder().find(|node| node.kind() == "type").unwrap();
    assert_eq!(ty.text(), keyword);
    assert!(!tree.has_errors());
}

#[test]
fn test_identifier_with_keyword_prefix() {
    let tree = SLANG.parse("int floaty = returned;");
    assert!(!tree.has_errors());
    let idents: Vec<&str> = tree
        .preorder()
        .filter(|node| node.kind() == "IDENT")
        .map(|node| node.text())
        .collect();
    assert_eq!(idents, ["floaty", "returned"]);
}

#[test]
fn test_extras_around_root() {
    let text = "  /* lead */ 1; /* tail */  ";
    let tree = CALC.parse(text);
    assert_eq!(tree.root_node().byte_range(), 0..text.len());
    assert_eq!(
        kinds(&tree.root_node().children()),
        ["comment", "statement", "comment"]
    );
}
