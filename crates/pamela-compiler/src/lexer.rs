//! Lexical analysis for PAMELA source and magic sidecar files.
//!
//! Tokenization uses logos. The token definitions are the concrete grammar:
//! PAMELA is a Lisp-syntax language, so the lexer only has to know about
//! delimiters, atoms, and the whitespace rule. Commas count as whitespace
//! and `;` starts a line comment, both handled as skip rules.
//!
//! # Design
//!
//! - `Token` — delimiters, literals, keywords (`:high`, `:off:on`), symbols
//! - Keywords are stored without their leading `:`
//! - Symbols may embed `.` (`this.reset`) and `:` (legacy `pwr.:high`)

use logos::Logos;

/// PAMELA token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[,\s]+")] // Whitespace, commas included
#[logos(skip r";[^\n]*")] // Line comment to end of line
pub enum Token {
    /// Delimiter `(`
    #[token("(")]
    LParen,
    /// Delimiter `)`
    #[token(")")]
    RParen,
    /// Delimiter `[`
    #[token("[")]
    LBracket,
    /// Delimiter `]`
    #[token("]")]
    RBracket,
    /// Delimiter `{`
    #[token("{")]
    LBrace,
    /// Delimiter `}`
    #[token("}")]
    RBrace,

    /// Boolean literal `true`
    #[token("true", priority = 10)]
    True,
    /// Boolean literal `false`
    #[token("false", priority = 10)]
    False,

    /// Integer literal, signed 64-bit
    #[regex(r"[+-]?[0-9]+", |lex| lex.slice().parse::<i64>().ok(), priority = 6)]
    Int(i64),

    /// Float literal, double precision
    #[regex(r"[+-]?[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok(), priority = 7)]
    #[regex(r"[+-]?[0-9]+[eE][+-]?[0-9]+", |lex| lex.slice().parse::<f64>().ok(), priority = 7)]
    Float(f64),

    /// String literal with the usual escapes resolved
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    Str(String),

    /// Keyword such as `:high`, `:off:on`, `:cost<=` (leading `:` stripped)
    #[regex(r":[a-zA-Z0-9*+!?<>=_.:&$%-]+", |lex| lex.slice()[1..].to_string())]
    Keyword(String),

    /// Symbol such as `defpclass`, `pwr`, `=`, `this.reset`, `*`
    #[regex(r"[a-zA-Z*+!?<>=_.$%&-][a-zA-Z0-9*+!?<>=_.:$%&-]*", |lex| lex.slice().to_string(), priority = 3)]
    Symbol(String),
}

/// Resolve escape sequences in a string literal body.
fn unescape(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                _ => return None,
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(x) => write!(f, "{}", x),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::Keyword(k) => write!(f, ":{}", k),
            Token::Symbol(s) => write!(f, "{}", s),
        }
    }
}
