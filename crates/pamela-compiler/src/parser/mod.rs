//! Recursive descent parser from tokens to s-expression forms.
//!
//! # Architecture
//!
//! - `stream`: `TokenStream` wrapper with lookahead over `(Token, byte-range)`
//! - `error`: `ParseError` categories
//! - `forms`: the `Form` datum type and the descent itself
//!
//! The parser is deterministic: for any token sequence there is exactly one
//! derivation or one error, so ambiguity is not a failure class here.

mod error;
mod forms;
mod stream;

pub use error::{ParseError, ParseErrorKind};
pub use forms::{Form, FormKind, parse_forms};
pub use stream::TokenStream;

use crate::lexer::Token;
use logos::Logos;
use std::ops::Range;

/// Lex a source string into `(token, byte-range)` pairs.
///
/// The first untokenizable character stops the lex with an error.
pub fn lex_source(source: &str, file_id: u16) -> Result<Vec<(Token, Range<usize>)>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let range = lexer.span();
        match result {
            Ok(token) => tokens.push((token, range)),
            Err(()) => {
                return Err(ParseError::invalid_token(crate::foundation::Span::new(
                    file_id,
                    range.start as u32,
                    range.end as u32,
                )));
            }
        }
    }
    Ok(tokens)
}

/// Lex and parse a source string into top-level forms.
pub fn parse_source(source: &str, file_id: u16) -> Result<Vec<Form>, ParseError> {
    let tokens = lex_source(source, file_id)?;
    let mut stream = TokenStream::new(&tokens, file_id);
    parse_forms(&mut stream)
}
