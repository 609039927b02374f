//! Recursive descent parser for the grammar text format
//!
//! Builds a [`Grammar`] directly. Errors are collected and the parser
//! resynchronizes at the next `;` or `}` so one mistake does not hide the
//! rest.

use text_size::TextSize;

use super::lexer::{DslToken, Token, tokenize};
use crate::base::LineIndex;
use crate::error::GrammarError;
use crate::grammar::{Assoc, Grammar, Rule};

/// Parse result: the grammar built so far and every error found
#[derive(Debug, Clone)]
pub struct DslParse {
    pub grammar: Grammar,
    pub errors: Vec<GrammarError>,
}

impl DslParse {
    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse grammar source text, collecting all errors
pub fn parse(input: &str) -> DslParse {
    let tokens = tokenize(input);
    let mut parser = Parser::new(input, &tokens);
    parser.parse_file();
    parser.finish()
}

/// Tokens that can begin a rule expression
const ATOM_START: &[DslToken] = &[
    DslToken::String,
    DslToken::Regex,
    DslToken::Ident,
    DslToken::BlankKw,
    DslToken::LParen,
    DslToken::PrecKw,
    DslToken::PrecLeftKw,
    DslToken::PrecRightKw,
];

const DECLARATION_START: &[DslToken] = &[
    DslToken::GrammarKw,
    DslToken::RuleKw,
    DslToken::TokenKw,
    DslToken::ExtrasKw,
    DslToken::ExternalsKw,
    DslToken::SyncKw,
    DslToken::StableKw,
    DslToken::ConflictsKw,
];

const DECLARATION_RECOVERY: &[DslToken] = &[DslToken::Semicolon, DslToken::RBrace];

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    line_index: LineIndex,
    grammar: Grammar,
    errors: Vec<GrammarError>,
}

impl<'a> Parser<'a> {
    fn new(input: &str, tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            line_index: LineIndex::new(input),
            grammar: Grammar::default(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> DslParse {
        DslParse {
            grammar: self.grammar,
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<DslToken> {
        self.current().map(|t| t.kind)
    }

    fn current_text(&self) -> &'a str {
        self.tokens.get(self.pos).map(|t| t.text).unwrap_or("")
    }

    fn at(&self, kind: DslToken) -> bool {
        self.current_kind() == Some(kind)
    }

    fn at_any(&self, kinds: &[DslToken]) -> bool {
        self.current_kind().is_some_and(|k| kinds.contains(&k))
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    /// Consume the current token and any trivia after it, returning its text.
    fn bump(&mut self) -> &'a str {
        let text = self.current_text();
        if !self.at_eof() {
            self.pos += 1;
        }
        self.skip_trivia();
        text
    }

    fn eat(&mut self, kind: DslToken) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: DslToken) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {}", kind.describe()));
            false
        }
    }

    fn skip_trivia(&mut self) {
        while self.current().is_some_and(|t| t.kind.is_trivia()) {
            self.pos += 1;
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let offset = self
            .current()
            .map(|t| t.offset)
            .unwrap_or_else(|| self.line_index.len());
        let message = match self.current() {
            Some(token) => format!("{}, found {}", message.into(), token.kind.describe()),
            None => format!("{}, found end of input", message.into()),
        };
        let error = self.syntax_error(offset, message);
        self.errors.push(error);
    }

    fn syntax_error(&self, offset: TextSize, message: String) -> GrammarError {
        let point = self.line_index.point(offset);
        GrammarError::Syntax {
            line: point.row + 1,
            column: point.column + 1,
            message,
        }
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[DslToken]) {
        self.error(message);
        self.recover(recovery);
    }

    /// Skip through the next recovery token. The error was already reported.
    fn recover(&mut self, recovery: &[DslToken]) {
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump();
        }
        if self.at_any(recovery) {
            self.bump();
        }
    }

    fn update(&mut self, f: impl FnOnce(Grammar) -> Grammar) {
        self.grammar = f(std::mem::take(&mut self.grammar));
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn parse_file(&mut self) {
        self.skip_trivia();
        while let Some(kind) = self.current_kind() {
            match kind {
                DslToken::GrammarKw => self.parse_grammar_name(),
                DslToken::RuleKw | DslToken::TokenKw => self.parse_rule_declaration(),
                DslToken::ExtrasKw => self.parse_rule_block(|g, rule| g.extra(rule)),
                DslToken::SyncKw => self.parse_rule_block(|g, rule| g.sync(rule)),
                DslToken::ExternalsKw => self.parse_name_block(|g, name| g.external(name)),
                DslToken::StableKw => self.parse_name_block(|g, name| g.stable(name)),
                DslToken::ConflictsKw => self.parse_conflicts(),
                _ => {
                    self.error("expected a declaration");
                    // Always consume at least one token to make progress
                    self.bump();
                    while !self.at_eof() && !self.at_any(DECLARATION_START) {
                        self.bump();
                    }
                }
            }
        }
    }

    /// `grammar NAME ;`
    fn parse_grammar_name(&mut self) {
        self.bump();
        if !self.at(DslToken::Ident) {
            self.error_recover("expected grammar name", DECLARATION_RECOVERY);
            return;
        }
        let name = self.bump();
        self.update(|g| Grammar {
            name: name.into(),
            ..g
        });
        self.expect(DslToken::Semicolon);
    }

    /// `rule NAME = expr ;` or `token NAME = expr ;`
    fn parse_rule_declaration(&mut self) {
        let is_token = self.at(DslToken::TokenKw);
        self.bump();
        if !self.at(DslToken::Ident) {
            self.error_recover("expected rule name", DECLARATION_RECOVERY);
            return;
        }
        let name = self.bump();
        if !self.expect(DslToken::Eq) {
            self.recover(DECLARATION_RECOVERY);
            return;
        }
        let Some(rule) = self.parse_choice() else {
            self.recover(DECLARATION_RECOVERY);
            return;
        };
        if is_token {
            self.update(|g| g.token(name, rule));
        } else {
            self.update(|g| g.rule(name, rule));
        }
        if !self.expect(DslToken::Semicolon) {
            self.recover(DECLARATION_RECOVERY);
        }
    }

    /// `extras { expr, ... }`
    fn parse_rule_block(&mut self, add: fn(Grammar, Rule) -> Grammar) {
        self.bump();
        if !self.expect(DslToken::LBrace) {
            self.recover(DECLARATION_RECOVERY);
            return;
        }
        while !self.at_eof() && !self.at(DslToken::RBrace) {
            match self.parse_postfix() {
                Some(rule) => self.update(|g| add(g, rule)),
                None => {
                    self.recover(&[DslToken::RBrace]);
                    return;
                }
            }
            self.eat(DslToken::Comma);
        }
        self.expect(DslToken::RBrace);
    }

    /// `externals { name, ... }`
    fn parse_name_block(&mut self, add: fn(Grammar, &str) -> Grammar) {
        self.bump();
        if !self.expect(DslToken::LBrace) {
            self.recover(DECLARATION_RECOVERY);
            return;
        }
        while !self.at_eof() && !self.at(DslToken::RBrace) {
            if !self.at(DslToken::Ident) {
                self.error_recover("expected a name", &[DslToken::RBrace]);
                return;
            }
            let name = self.bump();
            self.update(|g| add(g, name));
            self.eat(DslToken::Comma);
        }
        self.expect(DslToken::RBrace);
    }

    /// `conflicts { [a, b] [c, d] }`
    fn parse_conflicts(&mut self) {
        self.bump();
        if !self.expect(DslToken::LBrace) {
            self.recover(DECLARATION_RECOVERY);
            return;
        }
        while !self.at_eof() && !self.at(DslToken::RBrace) {
            if !self.expect(DslToken::LBracket) {
                self.recover(&[DslToken::RBrace]);
                return;
            }
            let mut names = Vec::new();
            while self.at(DslToken::Ident) {
                names.push(self.bump());
                self.eat(DslToken::Comma);
            }
            if !self.expect(DslToken::RBracket) {
                self.recover(&[DslToken::RBrace]);
                return;
            }
            self.update(|g| g.conflict(names));
            self.eat(DslToken::Comma);
        }
        self.expect(DslToken::RBrace);
    }

    // =========================================================================
    // Rule expressions
    // =========================================================================

    /// `seq ('|' seq)*`
    fn parse_choice(&mut self) -> Option<Rule> {
        let mut alternatives = vec![self.parse_seq()?];
        while self.eat(DslToken::Pipe) {
            alternatives.push(self.parse_seq()?);
        }
        Some(if alternatives.len() == 1 {
            alternatives.swap_remove(0)
        } else {
            Rule::Choice(alternatives)
        })
    }

    fn parse_seq(&mut self) -> Option<Rule> {
        let mut items = Vec::new();
        while self.at_any(ATOM_START) {
            items.push(self.parse_postfix()?);
        }
        match items.len() {
            0 => {
                self.error("expected a rule expression");
                None
            }
            1 => items.pop(),
            _ => Some(Rule::Seq(items)),
        }
    }

    fn parse_postfix(&mut self) -> Option<Rule> {
        let mut rule = self.parse_atom()?;
        loop {
            rule = match self.current_kind() {
                Some(DslToken::Star) => Rule::Repeat(Box::new(rule)),
                Some(DslToken::Plus) => Rule::Repeat1(Box::new(rule)),
                Some(DslToken::Question) => Rule::Choice(vec![rule, Rule::Blank]),
                _ => return Some(rule),
            };
            self.bump();
        }
    }

    fn parse_atom(&mut self) -> Option<Rule> {
        match self.current_kind() {
            Some(DslToken::String) => {
                let text = self.bump();
                Some(Rule::String(unescape_string(&text[1..text.len() - 1])))
            }
            Some(DslToken::Regex) => {
                let text = self.bump();
                Some(Rule::Pattern(unescape_slashes(&text[1..text.len() - 1])))
            }
            Some(DslToken::Ident) => Some(Rule::symbol(self.bump())),
            Some(DslToken::BlankKw) => {
                self.bump();
                Some(Rule::Blank)
            }
            Some(DslToken::LParen) => {
                self.bump();
                let rule = self.parse_choice()?;
                self.expect(DslToken::RParen).then_some(rule)
            }
            Some(DslToken::PrecKw) => self.parse_prec(Assoc::None),
            Some(DslToken::PrecLeftKw) => self.parse_prec(Assoc::Left),
            Some(DslToken::PrecRightKw) => self.parse_prec(Assoc::Right),
            _ => {
                self.error("expected a rule expression");
                None
            }
        }
    }

    /// `prec(N, expr)`, `prec.left([N,] expr)`, `prec.right([N,] expr)`
    fn parse_prec(&mut self, assoc: Assoc) -> Option<Rule> {
        self.bump();
        if !self.expect(DslToken::LParen) {
            return None;
        }
        let value = if self.at(DslToken::Integer) {
            let offset = self.current().map(|t| t.offset).unwrap_or_default();
            let text = self.bump();
            let Ok(value) = text.parse::<i32>() else {
                let error = self.syntax_error(offset, format!("precedence `{text}` out of range"));
                self.errors.push(error);
                return None;
            };
            if !self.expect(DslToken::Comma) {
                return None;
            }
            value
        } else if assoc == Assoc::None {
            self.error("expected precedence value");
            return None;
        } else {
            0
        };
        let rule = self.parse_choice()?;
        if !self.expect(DslToken::RParen) {
            return None;
        }
        Some(Rule::Prec {
            value,
            assoc,
            rule: Box::new(rule),
        })
    }
}

fn unescape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Pattern escapes pass through; only `\/` is rewritten.
fn unescape_slashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
