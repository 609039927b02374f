//! Grammar fixtures, compiled once per test binary.

use once_cell::sync::Lazy;
use sylva::GrammarHandle;
use sylva::grammar::dsl::parse_grammar;
use sylva::grammar::{Grammar, choice, pattern, prec, prec_left, repeat, seq, string, sym};
use sylva::lexer::{ExternalScanner, ScanCursor, ValidExternals};

/// `expr := expr '+' expr | NUMBER`, left ambiguous on purpose
pub static SUM: Lazy<GrammarHandle> = Lazy::new(|| {
    Grammar::new("sum")
        .rule(
            "expr",
            choice([seq([sym("expr"), string("+"), sym("expr")]), sym("NUMBER")]),
        )
        .token("NUMBER", pattern(r"\d+"))
        .extra(pattern(r"\s+"))
        .conflict(["expr"])
        .compile()
        .expect("sum grammar compiles")
        .into()
});

/// `e := e '+' e | prec(3, e '*' e) | N`, alternatives in either order
pub fn mixed_precedence(product_first: bool) -> GrammarHandle {
    let sum = seq([sym("e"), string("+"), sym("e")]);
    let product = prec(3, seq([sym("e"), string("*"), sym("e")]));
    let alternatives = if product_first {
        [product, sum, sym("N")]
    } else {
        [sum, product, sym("N")]
    };
    Grammar::new("mixed")
        .rule("e", choice(alternatives))
        .token("N", pattern(r"\d+"))
        .conflict(["e"])
        .compile()
        .expect("mixed grammar compiles")
        .into()
}

/// `s := lo 'z' | hi 'z'` where `hi` and `lo` both derive `'x' 'y'`
pub fn reduce_pair(hi_first: bool) -> GrammarHandle {
    let hi = prec(5, seq([string("x"), string("y")]));
    let lo = seq([string("x"), string("y")]);
    let rules = if hi_first {
        [("hi", hi), ("lo", lo)]
    } else {
        [("lo", lo), ("hi", hi)]
    };
    let grammar = Grammar::new("pair").rule(
        "s",
        choice([seq([sym("lo"), string("z")]), seq([sym("hi"), string("z")])]),
    );
    rules
        .into_iter()
        .fold(grammar, |grammar, (name, body)| grammar.rule(name, body))
        .compile()
        .expect("pair grammar compiles")
        .into()
}

/// Statements of arithmetic with `/* */` comments from an external scanner
pub static CALC: Lazy<GrammarHandle> = Lazy::new(|| {
    let table = Grammar::new("calc")
        .rule("program", repeat(sym("statement")))
        .rule("statement", seq([sym("expression"), string(";")]))
        .rule(
            "expression",
            choice([
                prec_left(1, seq([sym("expression"), string("+"), sym("expression")])),
                prec_left(1, seq([sym("expression"), string("-"), sym("expression")])),
                prec_left(2, seq([sym("expression"), string("*"), sym("expression")])),
                seq([string("("), sym("expression"), string(")")]),
                sym("NUMBER"),
                sym("NAME"),
            ]),
        )
        .token("NUMBER", pattern(r"\d+"))
        .token("NAME", pattern("[a-z_]+"))
        .external("comment")
        .extra(pattern(r"\s+"))
        .extra(sym("comment"))
        .sync(string(";"))
        .stable("statement")
        .compile()
        .expect("calc grammar compiles");
    GrammarHandle::new(table).with_scanner(BlockComments)
});

pub const SLANG_GRAMMAR: &str = r#"
grammar slang;

extras { /\s+/ }
sync { ";" "}" }
stable { declaration statement }

rule translation_unit = declaration* ;
rule declaration = function_definition | variable_declaration ;
rule function_definition = type IDENT "(" parameters? ")" block ;
rule parameters = parameter ("," parameter)* ;
rule parameter = type IDENT ;
rule variable_declaration = type IDENT ("=" expression)? ";" ;
rule block = "{" statement* "}" ;
rule statement = variable_declaration | return_statement | expression_statement | block ;
rule return_statement = "return" expression? ";" ;
rule expression_statement = expression ";" ;
rule expression = prec.left(1, expression "+" expression)
                | prec.left(2, expression "*" expression)
                | call
                | IDENT
                | NUMBER
                | "(" expression ")" ;
rule call = IDENT "(" arguments? ")" ;
rule arguments = expression ("," expression)* ;
rule type = "float" | "float2" | "float3" | "float4" | "int" | "void" ;

token IDENT = /[A-Za-z_][A-Za-z0-9_]*/ ;
token NUMBER = /\d+(\.\d+)?/ ;
"#;

/// A small shading language, written in the grammar text format
pub static SLANG: Lazy<GrammarHandle> = Lazy::new(|| {
    parse_grammar(SLANG_GRAMMAR)
        .expect("slang grammar parses")
        .compile()
        .expect("slang grammar compiles")
        .into()
});

/// Scans `/* ... */` comments. Unterminated comments are declined.
#[derive(Debug, Clone, Copy)]
pub struct BlockComments;

impl ExternalScanner for BlockComments {
    fn scan(&self, cursor: &mut ScanCursor<'_>, valid: &ValidExternals<'_>) -> Option<usize> {
        if !valid.contains(0) || cursor.lookahead() != Some('/') {
            return None;
        }
        cursor.advance();
        if cursor.lookahead() != Some('*') {
            return None;
        }
        cursor.advance();
        loop {
            if cursor.lookahead()? == '*' {
                cursor.advance();
                if cursor.lookahead() == Some('/') {
                    cursor.advance();
                    cursor.mark_end();
                    return Some(0);
                }
            } else {
                cursor.advance();
            }
        }
    }
}
