//! Error types surfaced to callers.
//!
//! Malformed *input text* is never an error here: lexical and syntax errors
//! live inside the tree as `ERROR` tokens and nodes (see
//! [`crate::diagnostics`]). Only grammar loading/compilation, caller contract
//! violations and cancellation are reported through these types.

use thiserror::Error;

use crate::lexer::LexerError;
use crate::tree::Tree;

/// Errors that can occur while loading a serialized grammar table.
///
/// A caller must never parse with a table that failed to load; none of these
/// variants carries a usable handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarLoadError {
    /// The blob does not start with the table magic.
    #[error("not a grammar table: bad magic bytes")]
    BadMagic,

    /// The table was written by an incompatible engine.
    #[error("unsupported table format version {found} (engine supports {expected})")]
    VersionMismatch { found: u8, expected: u8 },

    /// The blob ended before a complete table was read.
    #[error("grammar table truncated at byte {offset}")]
    Truncated { offset: usize },

    /// The trailing checksum does not match the payload.
    #[error("grammar table checksum mismatch (stored {stored:#010x}, computed {computed:#010x})")]
    ChecksumMismatch { stored: u32, computed: u32 },

    /// The payload decoded but is structurally invalid.
    #[error("corrupt grammar table: {0}")]
    Corrupt(String),
}

impl GrammarLoadError {
    /// Create a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}

/// Errors that can occur while compiling a grammar definition into tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// The grammar defines no syntactic rules.
    #[error("grammar `{0}` has no rules")]
    NoRules(String),

    /// Two rules share a name.
    #[error("duplicate rule `{0}`")]
    DuplicateRule(String),

    /// A rule references a name that is not a rule, token or external.
    #[error("undefined symbol `{name}` referenced from rule `{rule}`")]
    UndefinedSymbol { name: String, rule: String },

    /// A lexical pattern failed to parse.
    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The lexical rules together compile to an oversized automaton.
    #[error("lexical rules do not fit in an automaton: {0}")]
    LexerTooLarge(String),

    /// A token rule body is not a literal or pattern.
    #[error("token rule `{0}` must be a single string or pattern")]
    InvalidTokenRule(String),

    /// A grammar-level declaration (extras, sync, stable) names something invalid.
    #[error("invalid {kind} declaration: {message}")]
    InvalidDeclaration { kind: &'static str, message: String },

    /// Expanding choices produced more alternatives than the engine allows.
    #[error("rule `{rule}` expands to more than {limit} alternatives")]
    TooManyAlternatives { rule: String, limit: usize },

    /// Symbol ids are 16 bits wide.
    #[error("grammar has more than {0} symbols")]
    TooManySymbols(usize),

    /// Syntax error in the textual grammar format.
    #[error("grammar syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },
}

impl From<LexerError> for GrammarError {
    fn from(err: LexerError) -> Self {
        match err {
            LexerError::Pattern { pattern, message } => Self::InvalidPattern { pattern, message },
            LexerError::TooLarge(message) => Self::LexerTooLarge(message),
        }
    }
}

/// Caller contract violations when describing an edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// The edit's byte offsets are not ordered `start <= old_end`, `start <= new_end`.
    #[error("edit range is inverted: start {start}, old end {old_end}, new end {new_end}")]
    InvertedRange {
        start: usize,
        old_end: usize,
        new_end: usize,
    },

    /// The replaced range lies outside the text the tree was parsed from.
    #[error("edit old end {old_end} is past the end of the text ({len} bytes)")]
    OutOfBounds { old_end: usize, len: usize },

    /// The new text does not have the length the edits imply.
    #[error("new text is {found} bytes but the edits imply {expected}")]
    LengthMismatch { expected: usize, found: usize },

    /// The old tree was produced by a different grammar.
    #[error("old tree was parsed with grammar `{found}`, not `{expected}`")]
    GrammarMismatch { expected: String, found: String },
}

/// A parse stopped early by its budget, deadline or cancellation flag.
///
/// Carries the partial tree built so far.
#[derive(Debug, Clone, Error)]
#[error("parse cancelled after {consumed} bytes")]
pub struct CancelledError {
    pub partial: Tree,
    pub consumed: usize,
}
