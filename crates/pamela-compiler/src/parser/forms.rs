//! S-expression forms: the parse tree of a PAMELA file.
//!
//! A `Form` is one datum (list, vector, map, or atom) with the span it
//! occupies in the source. The IR builder consumes forms bottom-up; nothing
//! downstream ever touches tokens again.

use super::{ParseError, TokenStream};
use crate::ast::Value;
use crate::foundation::Span;
use crate::lexer::Token;

/// One parsed datum with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub kind: FormKind,
    pub span: Span,
}

/// The datum sum: composites and atoms.
#[derive(Debug, Clone, PartialEq)]
pub enum FormKind {
    /// `( … )`
    List(Vec<Form>),
    /// `[ … ]`
    Vector(Vec<Form>),
    /// `{ k v … }`, entries in source order
    Map(Vec<(Form, Form)>),
    Symbol(String),
    /// Keyword without its leading `:`
    Keyword(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Form {
    pub fn new(kind: FormKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Symbol text, if this form is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Keyword name, if this form is a keyword.
    pub fn as_keyword(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.kind {
            FormKind::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Form]> {
        match &self.kind {
            FormKind::Vector(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Form]> {
        match &self.kind {
            FormKind::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(Form, Form)]> {
        match &self.kind {
            FormKind::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// True for a list whose head is the given symbol.
    pub fn is_call(&self, head: &str) -> bool {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(Form::as_symbol)
            == Some(head)
    }

    /// Literal value of an atom form, if it is one.
    pub fn as_value(&self) -> Option<Value> {
        match &self.kind {
            FormKind::Bool(b) => Some(Value::Bool(*b)),
            FormKind::Int(n) => Some(Value::Int(*n)),
            FormKind::Float(x) => Some(Value::Float(*x)),
            FormKind::Str(s) => Some(Value::Str(s.clone())),
            FormKind::Keyword(k) => Some(Value::Keyword(k.clone())),
            FormKind::Symbol(s) => Some(Value::Symbol(s.clone())),
            _ => None,
        }
    }

    /// Numeric value widened to f64 (bounds, costs, probabilities).
    pub fn as_number(&self) -> Option<f64> {
        match &self.kind {
            FormKind::Int(n) => Some(*n as f64),
            FormKind::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Compact rendering for error messages.
    pub fn describe(&self) -> String {
        match &self.kind {
            FormKind::List(_) => "a list".to_string(),
            FormKind::Vector(_) => "a vector".to_string(),
            FormKind::Map(_) => "a map".to_string(),
            FormKind::Symbol(s) => s.clone(),
            FormKind::Keyword(k) => format!(":{}", k),
            FormKind::Str(s) => format!("\"{}\"", s),
            FormKind::Int(n) => n.to_string(),
            // {:?} keeps the decimal point on round floats ("1.0", not "1")
            FormKind::Float(x) => format!("{:?}", x),
            FormKind::Bool(b) => b.to_string(),
        }
    }
}

/// Parse every top-level form in the stream.
pub fn parse_forms(stream: &mut TokenStream) -> Result<Vec<Form>, ParseError> {
    let mut forms = Vec::new();
    while !stream.at_end() {
        forms.push(parse_form(stream)?);
    }
    Ok(forms)
}

/// Parse a single form.
fn parse_form(stream: &mut TokenStream) -> Result<Form, ParseError> {
    let start = stream.pos();
    let span = stream.current_span();
    let token = match stream.advance() {
        Some(tok) => tok.clone(),
        None => return Err(ParseError::unexpected_eof("while expecting a form", span)),
    };

    match token {
        Token::LParen => parse_seq(stream, start, Token::RParen, FormKind::List),
        Token::LBracket => parse_seq(stream, start, Token::RBracket, FormKind::Vector),
        Token::LBrace => parse_map(stream, start),
        Token::RParen | Token::RBracket | Token::RBrace => {
            Err(ParseError::unbalanced(&token, span))
        }
        Token::True => Ok(Form::new(FormKind::Bool(true), span)),
        Token::False => Ok(Form::new(FormKind::Bool(false), span)),
        Token::Int(n) => Ok(Form::new(FormKind::Int(n), span)),
        Token::Float(x) => Ok(Form::new(FormKind::Float(x), span)),
        Token::Str(s) => Ok(Form::new(FormKind::Str(s), span)),
        Token::Keyword(k) => Ok(Form::new(FormKind::Keyword(k), span)),
        Token::Symbol(s) => Ok(Form::new(FormKind::Symbol(s), span)),
    }
}

/// Parse the tail of a list or vector up to `close`.
fn parse_seq(
    stream: &mut TokenStream,
    start: usize,
    close: Token,
    wrap: fn(Vec<Form>) -> FormKind,
) -> Result<Form, ParseError> {
    let mut items = Vec::new();
    loop {
        match stream.peek() {
            None => {
                return Err(ParseError::unexpected_eof(
                    "inside an open form",
                    stream.current_span(),
                ));
            }
            Some(tok) if *tok == close => {
                stream.advance();
                return Ok(Form::new(wrap(items), stream.span_from(start)));
            }
            Some(_) => items.push(parse_form(stream)?),
        }
    }
}

/// Parse the tail of a map literal.
fn parse_map(stream: &mut TokenStream, start: usize) -> Result<Form, ParseError> {
    let mut entries = Vec::new();
    loop {
        match stream.peek() {
            None => {
                return Err(ParseError::unexpected_eof(
                    "inside an open map",
                    stream.current_span(),
                ));
            }
            Some(Token::RBrace) => {
                stream.advance();
                return Ok(Form::new(FormKind::Map(entries), stream.span_from(start)));
            }
            Some(_) => {
                let key = parse_form(stream)?;
                if matches!(stream.peek(), Some(Token::RBrace) | None) {
                    return Err(ParseError::odd_map_entry(key.span));
                }
                let value = parse_form(stream)?;
                entries.push((key, value));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_source;
    use super::*;

    fn parse_one(src: &str) -> Form {
        let mut forms = parse_source(src, 0).expect("parse failed");
        assert_eq!(forms.len(), 1);
        forms.remove(0)
    }

    #[test]
    fn test_atoms() {
        assert_eq!(parse_one("42").kind, FormKind::Int(42));
        assert_eq!(parse_one("2.5").kind, FormKind::Float(2.5));
        assert_eq!(parse_one("true").kind, FormKind::Bool(true));
        assert_eq!(parse_one(":high").kind, FormKind::Keyword("high".into()));
        assert_eq!(parse_one("pwr").kind, FormKind::Symbol("pwr".into()));
        assert_eq!(parse_one("\"sw\"").kind, FormKind::Str("sw".into()));
    }

    #[test]
    fn test_nested_list() {
        let form = parse_one("(sequence (turn-on) (turn-off))");
        let items = form.as_list().expect("list");
        assert_eq!(items.len(), 3);
        assert!(items[1].is_call("turn-on"));
        assert!(items[2].is_call("turn-off"));
    }

    #[test]
    fn test_vector_and_map() {
        let form = parse_one("{:pre off :bounds [1 3]}");
        let entries = form.as_map().expect("map");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.as_keyword(), Some("pre"));
        assert_eq!(entries[1].1.as_vector().map(<[Form]>::len), Some(2));
    }

    #[test]
    fn test_spans_cover_whole_form() {
        let src = "(a [b c])";
        let form = parse_one(src);
        assert_eq!(form.span.start, 0);
        assert_eq!(form.span.end as usize, src.len());
    }

    #[test]
    fn test_unbalanced_close() {
        let err = parse_source(")", 0).expect_err("should fail");
        assert_eq!(err.kind, super::super::ParseErrorKind::UnbalancedDelimiter);
    }

    #[test]
    fn test_eof_in_open_form() {
        let err = parse_source("(sequence (delay)", 0).expect_err("should fail");
        assert_eq!(err.kind, super::super::ParseErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_map_missing_value() {
        let err = parse_source("{:pre}", 0).expect_err("should fail");
        assert_eq!(err.kind, super::super::ParseErrorKind::OddMapEntry);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let src = "(defpclass sw [] :modes [:on :off])";
        assert_eq!(parse_source(src, 0), parse_source(src, 0));
    }
}
