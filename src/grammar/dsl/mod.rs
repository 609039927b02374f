//! Text format for grammars
//!
//! ```text
//! grammar calc;
//! extras { /\s+/ }
//! sync { ";" }
//! stable { statement }
//! rule program = statement* ;
//! rule statement = expression ";" ;
//! rule expression = prec.left(1, expression "+" expression) | NUMBER ;
//! token NUMBER = /\d+/ ;
//! ```
//!
//! Declarations may appear in any order except that the first `rule` is the
//! start rule. `*`, `+` and `?` are postfix; `|` binds loosest. `prec`,
//! `prec.left` and `prec.right` take an optional integer level (required for
//! plain `prec`). `//` starts a comment.

mod lexer;
mod parser;

pub use lexer::{DslToken, Token, tokenize};
pub use parser::{DslParse, parse};

use super::Grammar;
use crate::error::GrammarError;

/// Parse grammar text, failing on the first syntax error.
pub fn parse_grammar(text: &str) -> Result<Grammar, GrammarError> {
    let parse = parse(text);
    match parse.errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(parse.grammar),
    }
}
