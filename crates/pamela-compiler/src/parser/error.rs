//! Parse error types.

use crate::foundation::Span;
use crate::lexer::Token;
use std::fmt;

/// Parse error with source location and context.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

/// Category of parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Character sequence the lexer cannot tokenize
    InvalidToken,
    /// Input ended inside an open form
    UnexpectedEof,
    /// Closing delimiter with no matching opener, or the wrong opener
    UnbalancedDelimiter,
    /// Map literal with a key but no value
    OddMapEntry,
}

impl ParseError {
    /// Lexer failure at a byte range.
    pub fn invalid_token(span: Span) -> Self {
        Self {
            kind: ParseErrorKind::InvalidToken,
            span,
            message: "invalid token".to_string(),
        }
    }

    pub fn unexpected_eof(context: &str, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::UnexpectedEof,
            span,
            message: format!("unexpected end of input {}", context),
        }
    }

    pub fn unbalanced(found: &Token, span: Span) -> Self {
        Self {
            kind: ParseErrorKind::UnbalancedDelimiter,
            span,
            message: format!("unbalanced delimiter {}", found),
        }
    }

    pub fn odd_map_entry(span: Span) -> Self {
        Self {
            kind: ParseErrorKind::OddMapEntry,
            span,
            message: "map literal has a key without a value".to_string(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}
