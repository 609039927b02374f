//! Persistent syntax trees
//!
//! A [`Tree`] is an immutable snapshot: a root [`Subtree`], the text it was
//! parsed from and the grammar that parsed it. Editing or reparsing never
//! mutates a tree; it produces a new one that shares every untouched
//! subtree with the old one, so older versions stay valid for as long as
//! something holds them.
//!
//! - [`Subtree`] - the shared node layer (kind, width, parse metadata)
//! - [`Node`] - positioned view with parent links, hidden rules flattened
//! - [`TreeCursor`] - stateful walk over visible nodes
//! - [`InputEdit`] - a text replacement, applied with [`Tree::edit`]

mod cursor;
mod edit;
mod node;
mod subtree;

pub use cursor::{PreorderIter, TreeCursor};
pub use edit::InputEdit;
pub use node::Node;
pub use subtree::Subtree;

pub(crate) use edit::edit_subtree;

use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::base::{LineIndex, Point};
use crate::diagnostics::{self, SyntaxError};
use crate::error::{CancelledError, EditError};
use crate::language::GrammarHandle;
use crate::table::GrammarTable;

/// How a parse ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeStatus {
    /// The whole input parsed without errors
    Complete,
    /// The whole input was consumed; the tree contains `ERROR` nodes
    CompleteWithErrors,
    /// Budget, deadline or cancellation flag stopped the parse early
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct Tree {
    root: Subtree,
    grammar: GrammarHandle,
    text: Arc<str>,
    line_index: Arc<LineIndex>,
    version: u64,
    status: TreeStatus,
    /// Bytes of input the parser got through
    consumed: usize,
}

impl Tree {
    pub(crate) fn new(
        root: Subtree,
        grammar: GrammarHandle,
        text: &str,
        version: u64,
        status: TreeStatus,
        consumed: usize,
    ) -> Self {
        Self {
            root,
            grammar,
            text: Arc::from(text),
            line_index: Arc::new(LineIndex::new(text)),
            version,
            status,
            consumed,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> &Subtree {
        &self.root
    }

    pub fn root_node(&self) -> Node<'_> {
        Node::root(self)
    }

    pub fn walk(&self) -> TreeCursor<'_> {
        TreeCursor::new(self.root_node())
    }

    /// Visible nodes in pre-order, starting with the root
    pub fn preorder(&self) -> PreorderIter<'_> {
        PreorderIter::new(self.root_node())
    }

    pub fn grammar(&self) -> &GrammarHandle {
        &self.grammar
    }

    pub(crate) fn grammar_table(&self) -> &GrammarTable {
        self.grammar.table()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn point(&self, offset: usize) -> Point {
        self.line_index.point(TextSize::new(offset as u32))
    }

    /// 0 for a full parse, incremented by each incremental reparse
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn status(&self) -> TreeStatus {
        self.status
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn has_errors(&self) -> bool {
        self.root.has_error()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Apply one edit, producing a tree for `new_text` whose nodes touched by
    /// the edit are marked changed. Pass it to an incremental reparse to get
    /// an accurate tree again.
    pub fn edit(&self, edit: &InputEdit, new_text: &str) -> Result<Tree, EditError> {
        edit.validate(self.len())?;
        let expected = edit.new_len(self.len());
        if new_text.len() != expected {
            return Err(EditError::LengthMismatch {
                expected,
                found: new_text.len(),
            });
        }
        Ok(Tree::new(
            edit_subtree(&self.root, edit),
            self.grammar.clone(),
            new_text,
            self.version,
            self.status,
            self.consumed.min(new_text.len()),
        ))
    }

    /// Ranges of this tree whose syntax differs from `old`. Subtrees shared
    /// by both versions are skipped without being visited.
    pub fn changed_ranges(&self, old: &Tree) -> Vec<TextRange> {
        let mut ranges = Vec::new();
        let mut pending = vec![(&old.root, &self.root, 0usize)];
        while let Some((old, new, start)) = pending.pop() {
            if old.ptr_eq(new) {
                continue;
            }
            let range = TextRange::at(offset(start), new.size());
            if old.kind() != new.kind()
                || old.is_leaf() != new.is_leaf()
                || old.is_error() != new.is_error()
            {
                ranges.push(range);
                continue;
            }
            if new.is_leaf() {
                if old.size() != new.size() {
                    ranges.push(range);
                }
                continue;
            }
            let (old_children, new_children) = (old.children(), new.children());
            if old_children.len() == new_children.len() {
                let mut child_start = start;
                for (old_child, new_child) in old_children.iter().zip(new_children) {
                    pending.push((old_child, new_child, child_start));
                    child_start += new_child.len();
                }
                continue;
            }
            // Different shapes: report everything between the common prefix and suffix
            let prefix = old_children
                .iter()
                .zip(new_children)
                .take_while(|(a, b)| a.structurally_eq(b))
                .count();
            let suffix = old_children[prefix..]
                .iter()
                .rev()
                .zip(new_children[prefix..].iter().rev())
                .take_while(|(a, b)| a.structurally_eq(b))
                .count();
            let before: usize = new_children[..prefix].iter().map(Subtree::len).sum();
            let middle_start = start + before;
            let middle_len: usize = new_children[prefix..new_children.len() - suffix]
                .iter()
                .map(Subtree::len)
                .sum();
            ranges.push(TextRange::at(offset(middle_start), offset(middle_len)));
        }
        merge_ranges(ranges)
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Same shape, kinds and widths as `other`
    pub fn structurally_eq(&self, other: &Tree) -> bool {
        self.root.structurally_eq(&other.root)
    }

    /// Render the visible tree, e.g. `expr[NUMBER[0,1) '+'[1,2) NUMBER[2,3)]`
    pub fn to_sexp(&self) -> String {
        self.root_node().to_sexp()
    }

    /// Syntax errors recorded in the tree, in source order
    pub fn diagnostics(&self) -> Vec<SyntaxError> {
        diagnostics::collect(self)
    }

    /// The tree, unless the parse was cancelled
    pub fn into_complete(self) -> Result<Tree, CancelledError> {
        match self.status {
            TreeStatus::Cancelled => Err(CancelledError {
                consumed: self.consumed,
                partial: self,
            }),
            TreeStatus::Complete | TreeStatus::CompleteWithErrors => Ok(self),
        }
    }
}

fn offset(value: usize) -> TextSize {
    TextSize::new(value as u32)
}

/// Sort and coalesce touching or overlapping ranges.
fn merge_ranges(mut ranges: Vec<TextRange>) -> Vec<TextRange> {
    ranges.sort_by_key(|range| (range.start(), range.end()));
    let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start() <= last.end() => {
                *last = last.cover(range);
            }
            _ => merged.push(range),
        }
    }
    merged
}
