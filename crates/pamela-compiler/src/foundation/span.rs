//! Source location tracking for error reporting.
//!
//! # Design
//!
//! - `Span` — compact byte range into a source file
//! - `SourceMap` — owns all sources of a compile and resolves spans to
//!   paths, line/column pairs, and snippets
//! - `SourceFile` — one source with a precomputed line index

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Byte range in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap` files
    pub file_id: u16,
    /// Byte offset of the first byte
    pub start: u32,
    /// Byte offset one past the last byte
    pub end: u32,
}

impl Default for Span {
    fn default() -> Self {
        Span::zero(0)
    }
}

impl Span {
    pub fn new(file_id: u16, start: u32, end: u32) -> Self {
        Self {
            file_id,
            start,
            end,
        }
    }

    /// Zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0)
    }

    /// Smallest span covering both `self` and `other`.
    ///
    /// # Panics
    /// Panics if the spans point into different files.
    pub fn cover(&self, other: &Span) -> Span {
        assert_eq!(
            self.file_id, other.file_id,
            "cannot cover spans from different files"
        );
        Span {
            file_id: self.file_id,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// All source files of one compile.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with a line-start index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub source: String,
    /// Byte offset of each line start; the final entry is an EOF sentinel.
    line_starts: Vec<u32>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file and return its id.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");
        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    pub fn file(&self, span: &Span) -> &SourceFile {
        &self.files[span.file_id as usize]
    }

    pub fn file_path(&self, span: &Span) -> &Path {
        &self.files[span.file_id as usize].path
    }

    /// Source text covered by a span.
    pub fn snippet(&self, span: &Span) -> &str {
        let file = self.file(span);
        &file.source[span.start as usize..span.end as usize]
    }

    /// 1-based (line, column) of a span's start.
    pub fn line_col(&self, span: &Span) -> (u32, u32) {
        self.file(span).line_col(span.start)
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// 1-based (line, column) of a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };
        let line_idx = line_idx.min(self.line_starts.len().saturating_sub(2));
        (
            (line_idx + 1) as u32,
            offset.saturating_sub(self.line_starts[line_idx]) + 1,
        )
    }

    /// Text of a 1-based line, without its trailing newline.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[(line - 1) as usize] as usize;
        let end = self.line_starts[line as usize] as usize;
        Some(self.source[start..end].trim_end_matches('\n'))
    }
}

fn line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            starts.push((idx + 1) as u32);
        }
    }
    if starts.last() != Some(&(source.len() as u32)) {
        starts.push(source.len() as u32);
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover() {
        let a = Span::new(0, 4, 9);
        let b = Span::new(0, 7, 15);
        assert_eq!(a.cover(&b), Span::new(0, 4, 15));
    }

    #[test]
    #[should_panic(expected = "different files")]
    fn test_cover_rejects_cross_file() {
        let _ = Span::new(0, 0, 1).cover(&Span::new(1, 0, 1));
    }

    #[test]
    fn test_line_col_and_snippet() {
        let mut map = SourceMap::new();
        let id = map.add_file(
            PathBuf::from("sw.pamela"),
            "(defpclass sw [])\n(defpclass sw2 [])".to_string(),
        );
        let span = Span::new(id, 18, 28);
        assert_eq!(map.snippet(&span), "(defpclass");
        assert_eq!(map.line_col(&span), (2, 1));
        assert_eq!(map.file_path(&span).to_str(), Some("sw.pamela"));
    }

    #[test]
    fn test_line_text() {
        let file = SourceFile::new(PathBuf::from("x.pamela"), "(a)\n(b)\n".to_string());
        assert_eq!(file.line_text(1), Some("(a)"));
        assert_eq!(file.line_text(2), Some("(b)"));
        assert_eq!(file.line_text(3), None);
    }

    #[test]
    fn test_line_col_at_eof() {
        let file = SourceFile::new(PathBuf::from("x.pamela"), "(a)".to_string());
        assert_eq!(file.line_col(3), (1, 4));
    }
}
