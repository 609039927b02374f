//! Parse diagnostics
//!
//! Syntax errors are data in the tree: the lexer emits `ERROR` tokens for
//! unmatchable input and recovery wraps discarded input in `ERROR` nodes.
//! This module turns them into [`SyntaxError`] values on demand:
//! - Categorized error codes for filtering and documentation
//! - Hints listing the tokens the parser expected
//! - Related span pointing at the construct the error occurred in

mod codes;
mod error;

pub use codes::ErrorCode;
pub use error::{RelatedInfo, Severity, SyntaxError, SyntaxErrorBuilder};

use text_size::{TextRange, TextSize};

use crate::table::{GrammarTable, StateId, SymbolId};
use crate::tree::{Subtree, Tree, TreeStatus};

/// Longest source excerpt quoted in a message
const EXCERPT_LEN: usize = 24;

/// All diagnostics of `tree`, in source order.
pub(crate) fn collect(tree: &Tree) -> Vec<SyntaxError> {
    let table = tree.grammar().table();
    let text = tree.text();
    let mut errors = Vec::new();

    let mut stack: Vec<(&Subtree, usize, Option<(SymbolId, TextRange)>)> =
        vec![(tree.root(), 0, None)];
    while let Some((node, start, context)) = stack.pop() {
        if !node.has_error() {
            continue;
        }
        let range = TextRange::at(offset(start), node.size());
        if node.is_error() {
            errors.push(describe(table, text, node, range, context));
        }
        let kind = node.kind();
        let context = if !node.is_error() && table.is_visible(kind) && table.is_named(kind) {
            Some((kind, range))
        } else {
            context
        };
        let mut child_start = start + node.len();
        for child in node.children().iter().rev() {
            child_start -= child.len();
            stack.push((child, child_start, context));
        }
    }

    if tree.status() == TreeStatus::Cancelled {
        errors.push(
            SyntaxError::builder(ErrorCode::E0901)
                .message(format!("parse cancelled after {} bytes", tree.consumed()))
                .at_offset(offset(tree.consumed()))
                .severity(Severity::Warning)
                .build(),
        );
    }
    errors
}

fn describe(
    table: &GrammarTable,
    text: &str,
    node: &Subtree,
    range: TextRange,
    context: Option<(SymbolId, TextRange)>,
) -> SyntaxError {
    let lexical = node.is_leaf() && !range.is_empty();
    let builder = if range.is_empty() {
        SyntaxError::builder(ErrorCode::E0202)
    } else if lexical {
        SyntaxError::builder(ErrorCode::E0101)
            .message(format!("invalid characters `{}`", excerpt(text, range)))
    } else {
        SyntaxError::builder(ErrorCode::E0201)
            .message(format!("unexpected `{}`", excerpt(text, range)))
    };
    let mut builder = builder.range(range);
    if !lexical {
        if let Some(hint) = expected_hint(table, node.parse_state()) {
            builder = builder.hint(hint);
        }
    }
    if let Some((kind, context_range)) = context {
        builder = builder.related(format!("in {}", table.symbol_name(kind)), context_range);
    }
    builder.build()
}

/// "expected one of: ..." for the terminals `state` has actions for
fn expected_hint(table: &GrammarTable, state: StateId) -> Option<String> {
    let mut names: Vec<String> = table
        .expected_terminals(state)
        .filter(|&symbol| symbol != SymbolId::ERROR && !table.is_extra(symbol))
        .map(|symbol| {
            if symbol == SymbolId::END {
                "end of input".to_string()
            } else if table.is_named(symbol) {
                table.symbol_name(symbol).to_string()
            } else {
                format!("`{}`", table.symbol_name(symbol))
            }
        })
        .collect();
    names.dedup();
    if names.is_empty() {
        return None;
    }
    Some(format!("expected one of: {}", names.join(", ")))
}

fn excerpt(text: &str, range: TextRange) -> String {
    let start = u32::from(range.start()) as usize;
    let end = (u32::from(range.end()) as usize).min(text.len());
    let Some(slice) = text.get(start..end) else {
        return String::new();
    };
    let slice = slice.trim();
    if slice.len() <= EXCERPT_LEN {
        return slice.to_string();
    }
    let mut cut = EXCERPT_LEN;
    while !slice.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &slice[..cut])
}

fn offset(value: usize) -> TextSize {
    TextSize::new(value as u32)
}

#[cfg(test)]
mod tests;
