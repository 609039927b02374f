//! Text edits and their effect on an existing tree

use std::ops::Range;

use text_size::TextSize;

use super::Subtree;
use crate::base::{LineIndex, Point};
use crate::error::EditError;

/// One text replacement, in the coordinates of the text before it applies.
///
/// Bytes `start_byte..old_end_byte` were replaced by new text ending at
/// `new_end_byte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    /// The edit that replaces `range` of `old_text` with `replacement`.
    pub fn replace(old_text: &str, range: Range<usize>, replacement: &str) -> Self {
        let index = LineIndex::new(old_text);
        let start_point = index.point(offset(range.start));
        Self {
            start_byte: range.start,
            old_end_byte: range.end,
            new_end_byte: range.start + replacement.len(),
            start_point,
            old_end_point: index.point(offset(range.end)),
            new_end_point: start_point.advance(replacement),
        }
    }

    pub fn insert(old_text: &str, at: usize, text: &str) -> Self {
        Self::replace(old_text, at..at, text)
    }

    pub fn delete(old_text: &str, range: Range<usize>) -> Self {
        Self::replace(old_text, range, "")
    }

    /// Apply a replacement to `text`, returning the edit and the new text.
    pub fn apply(text: &str, range: Range<usize>, replacement: &str) -> (Self, String) {
        let edit = Self::replace(text, range.clone(), replacement);
        let mut new_text = String::with_capacity(text.len() + replacement.len());
        new_text.push_str(&text[..range.start]);
        new_text.push_str(replacement);
        new_text.push_str(&text[range.end..]);
        (edit, new_text)
    }

    /// The edit that undoes this one when applied to the edited text.
    pub fn inverse(&self) -> Self {
        Self {
            start_byte: self.start_byte,
            old_end_byte: self.new_end_byte,
            new_end_byte: self.old_end_byte,
            start_point: self.start_point,
            old_end_point: self.new_end_point,
            new_end_point: self.old_end_point,
        }
    }

    /// Change in text length
    pub fn delta(&self) -> isize {
        self.new_end_byte as isize - self.old_end_byte as isize
    }

    /// Length of a `len`-byte text after this edit.
    pub fn new_len(&self, len: usize) -> usize {
        len - self.old_end_byte + self.new_end_byte
    }

    /// Check the edit against a text of `len` bytes.
    pub fn validate(&self, len: usize) -> Result<(), EditError> {
        if self.old_end_byte < self.start_byte || self.new_end_byte < self.start_byte {
            return Err(EditError::InvertedRange {
                start: self.start_byte,
                old_end: self.old_end_byte,
                new_end: self.new_end_byte,
            });
        }
        if self.old_end_byte > len {
            return Err(EditError::OutOfBounds {
                old_end: self.old_end_byte,
                len,
            });
        }
        Ok(())
    }

    /// New position of old offset `x`.
    ///
    /// Text inserted exactly at `x` is attributed to whatever ends at `x`,
    /// except at offset 0 where nothing precedes it.
    fn map(&self, x: usize) -> usize {
        let (a, b, c) = (self.start_byte, self.old_end_byte, self.new_end_byte);
        if x == 0 {
            0
        } else if x < a {
            x
        } else if x == a {
            if a == b { c } else { a }
        } else if x < b {
            c
        } else {
            x - b + c
        }
    }
}

fn offset(value: usize) -> TextSize {
    TextSize::new(value as u32)
}

/// Apply `edit` to `root`, which spans the whole old text.
///
/// Nodes outside the edit are shared untouched; nodes on the path to it are
/// copied with new sizes and marked changed. A node is changed when its
/// size changed or when the edit overlaps `[start, end + lookahead)`.
pub(crate) fn edit_subtree(root: &Subtree, edit: &InputEdit) -> Subtree {
    edit_node(root, 0, edit)
}

fn edit_node(node: &Subtree, start: usize, edit: &InputEdit) -> Subtree {
    let end = start + node.len();
    let new_start = edit.map(start);
    let new_end = edit.map(end);
    let resized = new_end - new_start != node.len();
    let overlaps = edit.start_byte < end + node.lookahead() as usize && edit.old_end_byte > start;
    if !resized && !overlaps {
        return node.clone();
    }
    let size = offset(new_end - new_start);
    if node.children().is_empty() {
        return node.edited(size, None);
    }
    let mut child_start = start;
    let children = node
        .children()
        .iter()
        .map(|child| {
            let edited = edit_node(child, child_start, edit);
            child_start += child.len();
            edited
        })
        .collect();
    node.edited(size, Some(children))
}
