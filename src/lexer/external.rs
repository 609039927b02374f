//! External scanners
//!
//! Some tokens cannot be described by a regular pattern (heredocs, nested
//! comments, indentation). A grammar declares them as externals and the host
//! attaches an [`ExternalScanner`] to the grammar handle. The lexer calls the
//! scanner before its built-in rules whenever an external token is valid.

use std::fmt;

/// A host-provided scanner for a grammar's external tokens.
///
/// Scanners are stateless and shared across threads. Return the index (into
/// the grammar's `externals` declaration) of the token recognized at the
/// cursor, after calling [`ScanCursor::mark_end`] or advancing past it.
/// Returning an index that is not valid is treated as no match.
pub trait ExternalScanner: Send + Sync {
    fn scan(&self, cursor: &mut ScanCursor<'_>, valid: &ValidExternals<'_>) -> Option<usize>;
}

impl fmt::Debug for dyn ExternalScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExternalScanner")
    }
}

/// Which external tokens the parser can accept at this point
#[derive(Debug, Clone, Copy)]
pub struct ValidExternals<'a> {
    mask: &'a [bool],
    recovering: bool,
}

impl<'a> ValidExternals<'a> {
    pub(crate) fn new(mask: &'a [bool], recovering: bool) -> Self {
        Self { mask, recovering }
    }

    /// Whether external token `index` is acceptable. During error recovery
    /// every external token is.
    pub fn contains(&self, index: usize) -> bool {
        self.recovering || self.mask.get(index).copied().unwrap_or(false)
    }

    pub fn any(&self) -> bool {
        self.recovering || self.mask.iter().any(|&v| v)
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering
    }
}

/// Read-ahead cursor handed to external scanners.
///
/// Everything the scanner looks at is recorded; the furthest byte inspected
/// becomes the token's lookahead, so an edit anywhere in that range
/// invalidates the token.
#[derive(Debug)]
pub struct ScanCursor<'a> {
    text: &'a str,
    start: usize,
    position: usize,
    marked_end: Option<usize>,
    examined_end: usize,
}

impl<'a> ScanCursor<'a> {
    pub(crate) fn new(text: &'a str, start: usize) -> Self {
        Self {
            text,
            start,
            position: start,
            marked_end: None,
            examined_end: start,
        }
    }

    /// The char at the cursor, or `None` at end of input.
    pub fn lookahead(&mut self) -> Option<char> {
        let c = self.text[self.position..].chars().next();
        let seen = match c {
            Some(c) => self.position + c.len_utf8(),
            None => self.text.len() + 1,
        };
        self.examined_end = self.examined_end.max(seen);
        c
    }

    /// Consume the char at the cursor. Returns `false` at end of input.
    pub fn advance(&mut self) -> bool {
        match self.lookahead() {
            Some(c) => {
                self.position += c.len_utf8();
                true
            }
            None => false,
        }
    }

    /// Consume chars while `predicate` holds; returns how many were consumed.
    pub fn advance_while(&mut self, mut predicate: impl FnMut(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(c) = self.lookahead() {
            if !predicate(c) {
                break;
            }
            self.position += c.len_utf8();
            count += 1;
        }
        count
    }

    /// End the token at the current position. Later advances only look ahead.
    pub fn mark_end(&mut self) {
        self.marked_end = Some(self.position);
    }

    pub fn is_eof(&mut self) -> bool {
        self.lookahead().is_none()
    }

    /// Byte offset of the cursor
    pub fn position(&self) -> usize {
        self.position
    }

    /// Byte offset where the token being scanned starts
    pub fn token_start(&self) -> usize {
        self.start
    }

    /// End of the recognized token: the marked end, else the cursor.
    pub(crate) fn token_end(&self) -> usize {
        self.marked_end.unwrap_or(self.position)
    }

    pub(crate) fn examined_end(&self) -> usize {
        self.examined_end.max(self.token_end())
    }
}
