//! # sylva
//!
//! Incremental GLR parsing engine driven by compiled grammar tables.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! language    → GrammarHandle, load_grammar, GrammarRegistry
//!   ↓
//! parser      → GLR driver, error recovery, subtree reuse
//!   ↓
//! tree        → Persistent Subtree nodes, Tree, Node/TreeCursor views, edits
//!   ↓
//! table       → Grammar tables: symbols, actions, gotos, binary codec
//!   ↓
//! lexer       → Table-driven DFA lexer, external scanners
//!   ↓
//! grammar     → Rule combinators, Grammar builder, text DSL
//!   ↓
//! base        → Primitives (TextSize, TextRange, Point, LineIndex)
//! ```
//!
//! ## Quick start
//!
//! ```
//! use sylva::grammar::{Grammar, choice, pattern, seq, string, sym};
//! use sylva::{GrammarHandle, InputEdit};
//!
//! let grammar: GrammarHandle = Grammar::new("sum")
//!     .rule("expr", choice([seq([sym("expr"), string("+"), sym("expr")]), sym("NUMBER")]))
//!     .token("NUMBER", pattern(r"\d+"))
//!     .conflict(["expr"])
//!     .compile()
//!     .unwrap()
//!     .into();
//!
//! let tree = sylva::parse(&grammar, "1+2");
//! assert_eq!(tree.to_sexp(), "expr[expr[NUMBER[0,1)] '+'[1,2) expr[NUMBER[2,3)]]");
//!
//! let (edit, text) = InputEdit::apply(tree.text(), 3..3, "3");
//! let new_tree = sylva::parse_incremental(&grammar, &tree, &[edit], &text).unwrap();
//! assert!(new_tree.structurally_eq(&sylva::parse(&grammar, "1+23")));
//! ```

// ============================================================================
// MODULES (dependency order: base → grammar → lexer → table → tree → parser)
// ============================================================================

/// Foundation types: TextSize, TextRange, Point, LineIndex
pub mod base;

/// Grammar authoring: rule combinators and the text DSL
pub mod grammar;

/// Lexing from table DFAs and external scanners
pub mod lexer;

/// Compiled grammar tables and their binary format
pub mod table;

/// Persistent syntax trees and edits
pub mod tree;

/// GLR parser and parse options
pub mod parser;

/// Grammar handles and the shared registry
pub mod language;

/// Syntax errors recovered from trees
pub mod diagnostics;

/// Error types
pub mod error;

mod incremental;

// Re-export the main entry points
pub use error::{CancelledError, EditError, GrammarError, GrammarLoadError};
pub use language::{GrammarHandle, GrammarRegistry, load_grammar};
pub use parser::{ParseOptions, Parser};
pub use tree::{InputEdit, Node, Subtree, Tree, TreeCursor, TreeStatus};

// Re-export foundation types
pub use base::{LineIndex, Point, TextRange, TextSize};

/// Parse `text` from scratch with default options.
pub fn parse(grammar: &GrammarHandle, text: &str) -> Tree {
    grammar.parse(text)
}

/// Reparse after `edits` turned the text of `old_tree` into `new_text`.
pub fn parse_incremental(
    grammar: &GrammarHandle,
    old_tree: &Tree,
    edits: &[InputEdit],
    new_text: &str,
) -> Result<Tree, EditError> {
    grammar.parse_incremental(old_tree, edits, new_text)
}
