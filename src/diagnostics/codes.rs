//! Error code definitions for parse diagnostics
//!
//! Error codes follow a naming convention: E{category}{number}
//! - E01xx: Lexical errors (input no token rule matches)
//! - E02xx: Syntax errors (tokens the grammar does not allow)
//! - E09xx: Incomplete parses

use std::fmt;

/// Error codes for parse diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // =========================================================================
    // E01xx: Lexical errors
    // =========================================================================
    /// Characters no lexical rule matches
    E0101,

    // =========================================================================
    // E02xx: Syntax errors
    // =========================================================================
    /// Tokens skipped by error recovery
    E0201,
    /// Input ended inside an unfinished construct
    E0202,

    // =========================================================================
    // E09xx: Incomplete parses
    // =========================================================================
    /// The parse was cancelled before the end of input
    E0901,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0901 => "E0901",
        }
    }

    /// Get a short description of the error category
    pub fn category_description(&self) -> &'static str {
        match self {
            Self::E0101 => "lexical error",
            Self::E0201 | Self::E0202 => "syntax error",
            Self::E0901 => "incomplete parse",
        }
    }

    /// Get the default message template for this error code
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::E0101 => "invalid characters",
            Self::E0201 => "unexpected input",
            Self::E0202 => "unexpected end of input",
            Self::E0901 => "parse cancelled",
        }
    }

    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::E0101)
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::E0201 | Self::E0202)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
