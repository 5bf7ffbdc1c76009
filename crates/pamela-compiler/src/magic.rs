//! Magic sidecar files: lvar defaults read before the main parse and
//! regenerated after it.
//!
//! A magic file is a sequence of `(lvar "name" default?)` forms and nothing
//! else. Parsing folds the entries into a `name → default` mapping with
//! `:unset` standing in for a missing default; the mapping seeds the lvar
//! table so source-file lvars pick up their defaults by interning order.

use crate::ast::{LvarDefault, LvarTable};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::foundation::Span;
use crate::parser::{self, Form};
use indexmap::IndexMap;
use std::io::Write;
use std::path::Path;
use tracing::error;

/// Parse a magic file into an lvar-defaults mapping.
///
/// An empty file is a valid magic file with no entries. All failures are
/// logged at ERROR and returned as the compile error.
pub fn parse_magic(path: &Path) -> CompileResult<IndexMap<String, LvarDefault>> {
    let source = std::fs::read_to_string(path).map_err(|_| {
        let err = CompileError::new(
            ErrorKind::Io,
            Span::zero(0),
            format!("parse: magic file not found: {}", path.display()),
        );
        error!("{}", err);
        err
    })?;

    let forms = parser::parse_source(&source, 0).map_err(|parse_err| {
        let err = CompileError::new(
            ErrorKind::Syntax,
            parse_err.span,
            format!("parse: invalid magic file: {}", path.display()),
        )
        .with_note(parse_err.to_string());
        error!("{}", err);
        err
    })?;

    let mut table = IndexMap::new();
    for form in &forms {
        let (name, default) = lvar_entry(form).map_err(|detail| {
            let err = CompileError::new(
                ErrorKind::InvalidStructure,
                form.span,
                format!("parse: invalid magic file: {}", path.display()),
            )
            .with_note(detail);
            error!("{}", err);
            err
        })?;
        // First entry wins, matching lvar interning
        table.entry(name).or_insert(default);
    }
    Ok(table)
}

/// Decode one `(lvar "name" default?)` form.
fn lvar_entry(form: &Form) -> Result<(String, LvarDefault), String> {
    let items = form
        .as_list()
        .filter(|items| items.first().and_then(Form::as_symbol) == Some("lvar"))
        .ok_or_else(|| format!("expecting an lvar form, found {}", form.describe()))?;

    let name = items
        .get(1)
        .and_then(Form::as_str)
        .ok_or_else(|| "lvar name must be a string".to_string())?
        .to_string();

    let default = match items.get(2) {
        None => LvarDefault::Unset,
        Some(default_form) => {
            let value = default_form
                .as_value()
                .filter(|v| !v.is_symbol())
                .ok_or_else(|| {
                    format!("lvar default must be a literal, found {}", default_form.describe())
                })?;
            LvarDefault::Value(value)
        }
    };

    if items.len() > 3 {
        return Err("lvar takes at most a name and a default".to_string());
    }
    Ok((name, default))
}

/// Seed an lvar table from a parsed magic mapping.
pub fn seed_lvars(table: &mut LvarTable, defaults: IndexMap<String, LvarDefault>) {
    for (name, default) in defaults {
        table.intern(&name, default);
    }
}

/// Write the regenerated magic file for the lvars of a compile.
///
/// The output parses back to the same table (the round-trip property).
pub fn write_magic(path: &Path, inputs: &[String], lvars: &LvarTable) -> CompileResult<()> {
    let render = |file: &mut std::fs::File| -> std::io::Result<()> {
        writeln!(file, ";; -*- Mode: clojure; coding: utf-8  -*-")?;
        writeln!(file, ";; magic file corresponding to: {:?}", inputs)?;
        for (name, default) in lvars.entries() {
            match default {
                LvarDefault::Unset => writeln!(file, "(lvar \"{}\")", name)?,
                LvarDefault::Value(value) => writeln!(file, "(lvar \"{}\" {})", name, value)?,
            }
        }
        Ok(())
    };

    std::fs::File::create(path)
        .and_then(|mut file| render(&mut file))
        .map_err(|io_err| {
            let err = CompileError::new(
                ErrorKind::Io,
                Span::zero(0),
                format!("cannot write magic file: {}", path.display()),
            )
            .with_note(io_err.to_string());
            error!("{}", err);
            err
        })
}
