//! Table-driven lexer
//!
//! Tokenizes text against a grammar's lexical rules. All built-in rules run
//! in one DFA pass (longest match; literals beat patterns on ties, then
//! declaration order). When an external token is valid in the current parse
//! state the host's [`ExternalScanner`] runs first.
//!
//! Unrecognized input becomes an `ERROR` token spanning the run of
//! unmatchable characters. Every token records how far past its end the
//! lexer looked, which is what edit invalidation relies on.

mod dfa;
mod external;

pub use dfa::LexerError;
pub use external::{ExternalScanner, ScanCursor, ValidExternals};

pub(crate) use dfa::rule_hir;

use text_size::{TextRange, TextSize};

use crate::table::{LexicalRule, SymbolId, SymbolInfo};
use dfa::RuleDfa;

/// A lexed token. Tokens are ephemeral; the tree stores leaves instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: SymbolId,
    pub range: TextRange,
    /// Bytes examined past `range.end()` to decide this token
    pub lookahead: u32,
    pub is_extra: bool,
}

impl Token {
    pub fn start(&self) -> usize {
        u32::from(self.range.start()) as usize
    }

    pub fn end(&self) -> usize {
        u32::from(self.range.end()) as usize
    }

    pub fn len(&self) -> usize {
        u32::from(self.range.len()) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn is_end(&self) -> bool {
        self.kind == SymbolId::END
    }

    pub fn is_error(&self) -> bool {
        self.kind == SymbolId::ERROR
    }

    fn new(kind: SymbolId, start: usize, end: usize, examined_end: usize, is_extra: bool) -> Self {
        Self {
            kind,
            range: TextRange::new(offset(start), offset(end)),
            lookahead: examined_end.saturating_sub(end) as u32,
            is_extra,
        }
    }
}

fn offset(value: usize) -> TextSize {
    TextSize::new(value as u32)
}

/// Per-call lexing context supplied by the parser
#[derive(Clone, Copy, Default)]
pub struct LexState<'a> {
    pub(crate) scanner: Option<&'a dyn ExternalScanner>,
    /// Indexed like the grammar's external declarations
    pub(crate) valid_externals: &'a [bool],
    pub(crate) recovering: bool,
    /// Refuse zero-width external tokens (one was already produced here)
    pub(crate) forbid_empty: bool,
}

impl<'a> LexState<'a> {
    pub fn new(scanner: Option<&'a dyn ExternalScanner>, valid_externals: &'a [bool]) -> Self {
        Self {
            scanner,
            valid_externals,
            recovering: false,
            forbid_empty: false,
        }
    }
}

/// Compiled lexical rules of one grammar
#[derive(Debug, Clone)]
pub struct Lexer {
    dfa: RuleDfa,
    /// Terminal produced by each DFA rule
    rule_symbols: Vec<SymbolId>,
    /// Extra flag per symbol id
    extras: Vec<bool>,
    externals: Vec<SymbolId>,
}

impl Lexer {
    pub(crate) fn new(
        rules: &[LexicalRule],
        symbols: &[SymbolInfo],
        externals: &[SymbolId],
    ) -> Result<Self, LexerError> {
        let sources: Vec<(&str, bool)> = rules
            .iter()
            .map(|r| (r.pattern.as_str(), r.literal))
            .collect();
        Ok(Self {
            dfa: RuleDfa::new(&sources)?,
            rule_symbols: rules.iter().map(|r| r.symbol).collect(),
            extras: symbols.iter().map(|s| s.extra).collect(),
            externals: externals.to_vec(),
        })
    }

    fn is_extra(&self, kind: SymbolId) -> bool {
        self.extras.get(kind.index()).copied().unwrap_or(false)
    }

    /// Lex one token at byte `position`. At the end of `text` this returns
    /// the `end` token.
    pub fn next_token(&self, text: &str, position: usize, state: &LexState<'_>) -> Token {
        if position >= text.len() {
            return Token::new(SymbolId::END, text.len(), text.len(), text.len(), false);
        }
        // Whatever the scanner looked at influenced the result even when it
        // declined, so it counts towards the token's lookahead.
        let scanned_to = match self.scan_external(text, position, state) {
            Ok(token) => return token,
            Err(examined_end) => examined_end,
        };
        let found = self.dfa.longest_match(text, position);
        let examined_end = found.examined_end.max(scanned_to);
        if let Some((rule, end)) = found.best {
            let kind = self.rule_symbols[rule];
            return Token::new(kind, position, end, examined_end, self.is_extra(kind));
        }
        self.error_token(text, position, examined_end)
    }

    /// Coalesce unmatchable characters until some rule matches again.
    fn error_token(&self, text: &str, start: usize, examined_end: usize) -> Token {
        let mut examined_end = examined_end;
        let mut end = start;
        for c in text[start..].chars() {
            end += c.len_utf8();
            if end >= text.len() {
                break;
            }
            let attempt = self.dfa.longest_match(text, end);
            if attempt.best.is_some() {
                break;
            }
            examined_end = examined_end.max(attempt.examined_end);
        }
        Token::new(SymbolId::ERROR, start, end, examined_end.max(end), false)
    }

    /// The external token at `position`, or how far the scanner looked
    /// before declining.
    fn scan_external(
        &self,
        text: &str,
        position: usize,
        state: &LexState<'_>,
    ) -> Result<Token, usize> {
        let Some(scanner) = state.scanner else {
            return Err(position);
        };
        let valid = ValidExternals::new(state.valid_externals, state.recovering);
        if self.externals.is_empty() || !valid.any() {
            return Err(position);
        }
        let mut cursor = ScanCursor::new(text, position);
        let result = scanner.scan(&mut cursor, &valid);
        let examined_end = cursor.examined_end();
        let Some((index, &kind)) =
            result.and_then(|index| Some((index, self.externals.get(index)?)))
        else {
            return Err(examined_end);
        };
        let end = cursor.token_end().min(text.len());
        if !valid.contains(index) || end < position || (end == position && state.forbid_empty) {
            return Err(examined_end);
        }
        Ok(Token::new(kind, position, end, examined_end, self.is_extra(kind)))
    }
}
