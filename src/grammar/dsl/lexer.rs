//! Logos-based lexer for the grammar text format

use logos::Logos;
use text_size::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: DslToken,
    pub text: &'a str,
    pub offset: TextSize,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, DslToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: DslToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = logos_token.unwrap_or(DslToken::Error);

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DslToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("grammar")]
    GrammarKw,
    #[token("rule")]
    RuleKw,
    #[token("token")]
    TokenKw,
    #[token("extras")]
    ExtrasKw,
    #[token("externals")]
    ExternalsKw,
    #[token("sync")]
    SyncKw,
    #[token("stable")]
    StableKw,
    #[token("conflicts")]
    ConflictsKw,
    #[token("blank")]
    BlankKw,
    #[token("prec")]
    PrecKw,
    #[token("prec.left")]
    PrecLeftKw,
    #[token("prec.right")]
    PrecRightKw,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"-?[0-9]+")]
    Integer,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    #[regex(r"/([^/\\\n]|\\.)+/")]
    Regex,

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    #[token(";")]
    Semicolon,
    #[token("=")]
    Eq,
    #[token("|")]
    Pipe,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("?")]
    Question,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,

    /// Input no rule matched
    Error,
}

impl DslToken {
    pub fn is_trivia(self) -> bool {
        matches!(self, Self::Whitespace | Self::LineComment)
    }

    /// Human-readable description for error messages
    pub fn describe(self) -> &'static str {
        match self {
            Self::Whitespace => "whitespace",
            Self::LineComment => "comment",
            Self::GrammarKw => "`grammar`",
            Self::RuleKw => "`rule`",
            Self::TokenKw => "`token`",
            Self::ExtrasKw => "`extras`",
            Self::ExternalsKw => "`externals`",
            Self::SyncKw => "`sync`",
            Self::StableKw => "`stable`",
            Self::ConflictsKw => "`conflicts`",
            Self::BlankKw => "`blank`",
            Self::PrecKw => "`prec`",
            Self::PrecLeftKw => "`prec.left`",
            Self::PrecRightKw => "`prec.right`",
            Self::Ident => "identifier",
            Self::Integer => "integer",
            Self::String => "string",
            Self::Regex => "pattern",
            Self::Semicolon => "`;`",
            Self::Eq => "`=`",
            Self::Pipe => "`|`",
            Self::Star => "`*`",
            Self::Plus => "`+`",
            Self::Question => "`?`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::LBracket => "`[`",
            Self::RBracket => "`]`",
            Self::Comma => "`,`",
            Self::Error => "invalid input",
        }
    }
}
