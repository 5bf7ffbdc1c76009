// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! # PAMELA front-end compiler
//!
//! Compiler front end for PAMELA, a Lisp-syntax modeling language for
//! hierarchical, temporally constrained, probabilistic plans. Sources
//! declare *pclasses* (components with fields, modes, transitions, and
//! methods); this crate turns them into a validated intermediate
//! representation for downstream passes.
//!
//! ## Architecture
//!
//! ```text
//! lexer      (~0.5k LOC) - logos tokens; [,\s]+ whitespace, ; comments
//!     ↓
//! parser     (~0.5k LOC) - recursive descent to s-expression forms
//!     ↓
//! build      (~1k LOC)   - forms → raw IR, desugaring + lvar interning
//!     ↓
//! validate   (~1k LOC)   - disambiguation, arity checks, hoisting
//!     ↓
//! compile (facade)       - files in, validated Model out
//! ```
//!
//! The `magic` module handles the lvar-defaults sidecar read before the
//! main parse and regenerated after it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pamela_compiler::{CompileOptions, compile};
//! use std::path::PathBuf;
//!
//! let options = CompileOptions::new(vec![PathBuf::from("psw.pamela")]);
//! let model = compile(&options)?;
//! ```

pub mod ast;
pub mod build;
pub mod compile;
pub mod error;
pub mod foundation;
pub mod lexer;
pub mod magic;
pub mod parser;
pub mod validate;

// Convenience re-exports: key types
pub use ast::{Condition, Field, FieldInit, Model, Pclass, Stmt, StmtKind, Value};
pub use error::{CompileError, CompileResult, DiagnosticFormatter, ErrorKind};
pub use foundation::{SourceMap, Span};
pub use lexer::Token;

// Convenience re-exports: pipeline entry points
pub use build::build_model;
pub use compile::{
    CompileOptions, CompileOutput, compile, compile_with_sources, deserialize_model,
    serialize_model,
};
pub use magic::parse_magic;
pub use parser::parse_source;
pub use validate::validate;

/// Compiler version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
