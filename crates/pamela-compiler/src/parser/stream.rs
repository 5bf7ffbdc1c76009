//! Token stream wrapper for the recursive descent form parser.

use crate::foundation::Span;
use crate::lexer::Token;
use std::ops::Range;

/// Token stream with lookahead and span tracking.
///
/// Each token is paired with its byte range in the source so that spans on
/// forms and errors point at real source locations.
pub struct TokenStream<'src> {
    tokens: &'src [(Token, Range<usize>)],
    pos: usize,
    file_id: u16,
}

impl<'src> TokenStream<'src> {
    pub fn new(tokens: &'src [(Token, Range<usize>)], file_id: u16) -> Self {
        Self {
            tokens,
            pos: 0,
            file_id,
        }
    }

    /// Current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(tok, _)| tok)
    }

    /// Consume and return the current token.
    pub fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Span of the current token, or a zero-length span at EOF.
    pub fn current_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, range)) => Span::new(self.file_id, range.start as u32, range.end as u32),
            None => match self.tokens.last() {
                Some((_, range)) => Span::new(self.file_id, range.end as u32, range.end as u32),
                None => Span::zero(self.file_id),
            },
        }
    }

    /// Span covering everything from the token at `start` through the most
    /// recently consumed token.
    pub fn span_from(&self, start: usize) -> Span {
        let start_byte = self
            .tokens
            .get(start)
            .map_or(0, |(_, range)| range.start as u32);
        let end_byte = if self.pos > 0 {
            self.tokens
                .get(self.pos - 1)
                .map_or(start_byte, |(_, range)| range.end as u32)
        } else {
            start_byte
        };
        Span::new(self.file_id, start_byte, end_byte)
    }

    /// Index of the current token (for `span_from`).
    pub fn pos(&self) -> usize {
        self.pos
    }
}
