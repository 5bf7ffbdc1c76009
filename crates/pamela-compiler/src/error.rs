//! Compile-time error reporting and diagnostics.
//!
//! # Design
//!
//! - `CompileError` — single diagnostic with a primary span and message
//! - `ErrorKind` — categorizes failures by compiler phase
//! - `DiagnosticFormatter` — renders diagnostics with source snippets
//!
//! Compilation stops at the first error: every phase returns
//! `Result<_, CompileError>` and the first producer wins. The `Display`
//! impl of `CompileError` is the single-line message callers see; the
//! formatter adds source context for terminal output.

use crate::foundation::{SourceMap, Span};
use std::fmt;

/// Compilation diagnostic with source location and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Category of this error
    pub kind: ErrorKind,
    /// Primary source location
    pub span: Span,
    /// Single-line error message
    pub message: String,
    /// Additional labeled spans ("declared here", ...)
    pub labels: Vec<Label>,
    /// Additional notes or hints
    pub notes: Vec<String>,
}

/// Category of compilation error.
///
/// # Invariant
///
/// The discriminant values must match the ERROR_KIND_NAMES array indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorKind {
    /// Input file missing or unreadable
    Io = 0,
    /// Lexer or form-parser failure
    Syntax = 1,
    /// Malformed construct shape (defpclass args, meta keys, field inits)
    InvalidStructure = 2,
    /// Symbol resolves to nothing in scope
    UndefinedName = 3,
    /// Mode keyword is not declared by the referenced pclass
    UnknownMode = 4,
    /// Plant call arity matches no overload
    WrongArgCount = 5,
    /// Plant call arity matches more than one overload
    AmbiguousCall = 6,
    /// `:depends` names a missing model or mismatched version
    DependencyError = 7,
    /// Bug in the compiler
    Internal = 8,
}

/// Human-readable names for error kinds, indexed by discriminant.
const ERROR_KIND_NAMES: &[&str] = &[
    "i/o error",            // 0: Io
    "syntax error",         // 1: Syntax
    "invalid structure",    // 2: InvalidStructure
    "undefined name",       // 3: UndefinedName
    "unknown mode",         // 4: UnknownMode
    "wrong argument count", // 5: WrongArgCount
    "ambiguous call",       // 6: AmbiguousCall
    "dependency error",     // 7: DependencyError
    "internal error",       // 8: Internal
];

/// Secondary labeled span in a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl CompileError {
    /// New error diagnostic with no secondary labels or notes.
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Attach a secondary labeled span (chaining).
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.labels.push(Label {
            span,
            message: message.into(),
        });
        self
    }

    /// Attach a note or hint (chaining).
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl ErrorKind {
    /// Human-readable name of this kind.
    pub fn name(self) -> &'static str {
        ERROR_KIND_NAMES[self as usize]
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Formats diagnostics with source code context.
///
/// Produces the usual compiler shape: message, `--> file:line:col`, the
/// offending source line, and a caret run under the span, followed by any
/// labels and notes.
pub struct DiagnosticFormatter<'a> {
    sources: &'a SourceMap,
}

impl<'a> DiagnosticFormatter<'a> {
    pub fn new(sources: &'a SourceMap) -> Self {
        Self { sources }
    }

    /// Format one diagnostic as a string with source context.
    pub fn format(&self, error: &CompileError) -> String {
        let mut out = String::new();
        out.push_str(&format!("error: {}: {}\n", error.kind.name(), error.message));

        if error.span.file_id as usize >= self.sources.file_count() {
            return out;
        }

        let (line, col) = self.sources.line_col(&error.span);
        out.push_str(&format!(
            "  --> {}:{}:{}\n",
            self.sources.file_path(&error.span).display(),
            line,
            col
        ));

        if let Some(text) = self.sources.file(&error.span).line_text(line) {
            out.push_str(&format!("{:4} | {}\n", line, text));
            let width = (error.span.end.saturating_sub(error.span.start)).max(1) as usize;
            let width = width.min(text.len().saturating_sub(col as usize - 1).max(1));
            out.push_str(&format!(
                "     | {}{}\n",
                " ".repeat(col as usize - 1),
                "^".repeat(width)
            ));
        }

        for label in &error.labels {
            let (lline, lcol) = self.sources.line_col(&label.span);
            out.push_str(&format!(
                "   = note: {} (at {}:{}:{})\n",
                label.message,
                self.sources.file_path(&label.span).display(),
                lline,
                lcol
            ));
        }
        for note in &error.notes {
            out.push_str(&format!("   = help: {}\n", note));
        }
        out
    }
}
