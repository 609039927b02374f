//! Table-driven GLR parser
//!
//! This module turns text into a [`Tree`] using a compiled grammar table:
//! - **glr** drives the shift/reduce automaton over persistent stack versions
//! - **recovery** resynchronizes after syntax errors (the parse never fails)
//! - **reuse** hands unchanged old subtrees back to the driver on reparse
//!
//! ## Architecture
//!
//! ```text
//! Source Text
//!     ↓
//! Lexer (grammar table DFA + external scanner) → Token
//!     ↓
//! GLR driver → stack versions of Subtree frames
//!     ↓
//! Accept (or recovery) → root Subtree
//!     ↓
//! Tree → Node / TreeCursor views
//! ```

mod glr;
mod recovery;
mod reuse;
mod stack;

use std::time::{Duration, Instant};

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;

use crate::error::EditError;
use crate::incremental;
use crate::language::GrammarHandle;
use crate::tree::{InputEdit, Subtree, Tree};
use glr::Driver;

/// Default cap on simultaneous stack versions
pub const DEFAULT_MAX_VERSIONS: usize = 8;

/// Limits and switches for one parse
#[derive(Debug, Clone)]
pub struct ParseOptions {
    deadline: Option<Instant>,
    max_bytes: Option<usize>,
    cancel: Option<CancellationToken>,
    max_versions: usize,
    reuse: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            deadline: None,
            max_bytes: None,
            cancel: None,
            max_versions: DEFAULT_MAX_VERSIONS,
            reuse: true,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop at `deadline`, returning the partial tree.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// Stop once `max_bytes` of input have been consumed. The last token
    /// may end past the budget.
    pub fn max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    /// Stop as soon as `token` is cancelled. The token is polled between
    /// tokens.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Keep at most `max_versions` stack versions (at least one).
    pub fn max_versions(mut self, max_versions: usize) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    /// Reuse unchanged subtrees of the old tree on incremental reparse.
    pub fn reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    pub fn version_limit(&self) -> usize {
        self.max_versions
    }

    pub fn reuses_subtrees(&self) -> bool {
        self.reuse
    }

    /// Whether a parse at `position` of a `len`-byte text must stop
    pub(crate) fn exhausted(&self, position: usize, len: usize) -> bool {
        if position >= len {
            return false;
        }
        if self.max_bytes.is_some_and(|max| position >= max) {
            return true;
        }
        if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
            return true;
        }
        self.deadline.is_some_and(|at| Instant::now() >= at)
    }
}

/// A grammar plus parse options
#[derive(Debug, Clone)]
pub struct Parser {
    grammar: GrammarHandle,
    options: ParseOptions,
}

impl Parser {
    pub fn new(grammar: GrammarHandle) -> Self {
        Self::with_options(grammar, ParseOptions::default())
    }

    pub fn with_options(grammar: GrammarHandle, options: ParseOptions) -> Self {
        Self { grammar, options }
    }

    pub fn grammar(&self) -> &GrammarHandle {
        &self.grammar
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse `text` from scratch. Always returns a tree; syntax errors are
    /// recorded in it.
    pub fn parse(&self, text: &str) -> Tree {
        self.parse_reusing(text, None, 0)
    }

    /// Reparse after `edits`, applied in order to `old_tree`'s text, turned
    /// it into `new_text`. The result equals a full parse of `new_text`.
    pub fn parse_incremental(
        &self,
        old_tree: &Tree,
        edits: &[InputEdit],
        new_text: &str,
    ) -> Result<Tree, EditError> {
        incremental::reparse(self, old_tree, edits, new_text)
    }

    /// Parse many texts in parallel.
    pub fn parse_batch<S>(&self, texts: &[S]) -> Vec<Tree>
    where
        S: AsRef<str> + Sync,
    {
        texts
            .par_iter()
            .map(|text| self.parse(text.as_ref()))
            .collect()
    }

    pub(crate) fn parse_reusing(
        &self,
        text: &str,
        old_root: Option<&Subtree>,
        version: u64,
    ) -> Tree {
        let table = self.grammar.table();
        let reuse = old_root.filter(|_| self.options.reuse);
        let scanner = self.grammar.scanner();
        let outcome = Driver::new(table, scanner, text, &self.options, reuse).run();
        Tree::new(
            outcome.root,
            self.grammar.clone(),
            text,
            version,
            outcome.status,
            outcome.consumed,
        )
    }
}
