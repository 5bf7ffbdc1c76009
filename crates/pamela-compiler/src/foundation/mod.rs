//! Shared foundation types: source locations and source-file bookkeeping.

pub mod span;

pub use span::{SourceFile, SourceMap, Span};
