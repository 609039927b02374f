//! Positioned view over the shared syntax tree
//!
//! A [`Node`] pairs a [`Subtree`] with its absolute offset and a link to its
//! parent. Hidden rules (names starting with `_`, repetition helpers) are
//! flattened away: their visible descendants appear as direct children.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use text_size::{TextRange, TextSize};

use super::{Subtree, Tree};
use crate::base::Point;
use crate::table::SymbolId;

#[derive(Clone)]
pub struct Node<'t> {
    tree: &'t Tree,
    subtree: &'t Subtree,
    start: TextSize,
    parent: Option<Rc<Node<'t>>>,
}

impl<'t> Node<'t> {
    pub(crate) fn root(tree: &'t Tree) -> Self {
        Self {
            tree,
            subtree: tree.root(),
            start: TextSize::new(0),
            parent: None,
        }
    }

    pub fn subtree(&self) -> &'t Subtree {
        self.subtree
    }

    pub fn kind_id(&self) -> SymbolId {
        self.subtree.kind()
    }

    pub fn kind(&self) -> &'t str {
        self.tree.grammar_table().symbol_name(self.subtree.kind())
    }

    /// Named nodes come from rules and named tokens; anonymous ones from literals
    pub fn is_named(&self) -> bool {
        self.tree.grammar_table().is_named(self.subtree.kind())
    }

    pub fn is_extra(&self) -> bool {
        self.subtree.is_extra()
    }

    pub fn is_error(&self) -> bool {
        self.subtree.is_error()
    }

    pub fn has_error(&self) -> bool {
        self.subtree.has_error()
    }

    pub fn start_byte(&self) -> usize {
        u32::from(self.start) as usize
    }

    pub fn end_byte(&self) -> usize {
        self.start_byte() + self.subtree.len()
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte()..self.end_byte()
    }

    pub fn range(&self) -> TextRange {
        TextRange::at(self.start, self.subtree.size())
    }

    pub fn start_point(&self) -> Point {
        self.tree.line_index().point(self.start)
    }

    pub fn end_point(&self) -> Point {
        self.tree.line_index().point(self.range().end())
    }

    /// Source text covered by this node
    pub fn text(&self) -> &'t str {
        self.tree.text().get(self.byte_range()).unwrap_or("")
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        self.parent.as_deref().cloned()
    }

    /// Visible children, in order
    pub fn children(&self) -> Vec<Node<'t>> {
        let table = self.tree.grammar_table();
        let parent = Rc::new(self.clone());
        let mut out = Vec::new();
        let mut stack = Vec::new();
        push_children(&mut stack, self.subtree, self.start);
        while let Some((subtree, start)) = stack.pop() {
            if subtree.is_error() || table.is_visible(subtree.kind()) {
                out.push(Node {
                    tree: self.tree,
                    subtree,
                    start,
                    parent: Some(parent.clone()),
                });
            } else {
                push_children(&mut stack, subtree, start);
            }
        }
        out
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn child(&self, index: usize) -> Option<Node<'t>> {
        self.children().into_iter().nth(index)
    }

    pub fn named_children(&self) -> Vec<Node<'t>> {
        self.children().into_iter().filter(Node::is_named).collect()
    }

    /// Render as `kind[start,end)` for leaves and `kind[child child]` for
    /// inner nodes; anonymous kinds are quoted.
    pub fn to_sexp(&self) -> String {
        let mut out = String::new();
        self.write_sexp(&mut out);
        out
    }

    fn write_sexp(&self, out: &mut String) {
        if self.is_named() {
            out.push_str(self.kind());
        } else {
            out.push('\'');
            out.push_str(self.kind());
            out.push('\'');
        }
        if self.subtree.is_leaf() {
            out.push_str(&format!("[{},{})", self.start_byte(), self.end_byte()));
            return;
        }
        out.push('[');
        for (i, child) in self.children().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            child.write_sexp(out);
        }
        out.push(']');
    }
}

/// Push `subtree`'s children so that they pop in source order.
fn push_children<'t>(
    stack: &mut Vec<(&'t Subtree, TextSize)>,
    subtree: &'t Subtree,
    start: TextSize,
) {
    let mut end = start + subtree.size();
    for child in subtree.children().iter().rev() {
        end -= child.size();
        stack.push((child, end));
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.subtree.ptr_eq(other.subtree)
            && self.start == other.start
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = (self.start_byte(), self.end_byte());
        write!(f, "{}[{start},{end})", self.kind())
    }
}
