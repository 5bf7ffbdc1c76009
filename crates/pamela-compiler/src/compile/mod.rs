//! High-level compile API: files in, validated IR out.
//!
//! One compile is one sequential pass: seed lvars from the magic sidecar,
//! then per input file lex → parse → build, then validate the merged model
//! and emit the regenerated magic file if requested. The first error stops
//! the pipeline and is logged at ERROR before being returned.

use crate::ast::{LvarTable, Model};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::foundation::{SourceMap, Span};
use crate::magic;
use crate::parser::{self, Form};
use crate::{build, validate};
use std::path::PathBuf;
use tracing::{debug, error};

/// Options consumed by the compile entry point.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Ordered input paths; each must carry the `.pamela` extension
    pub input: Vec<PathBuf>,
    /// Optional magic sidecar with lvar defaults
    pub magic: Option<PathBuf>,
    /// When set and any lvars were discovered, the regenerated magic file
    /// is written here
    pub output_magic: Option<PathBuf>,
    /// Stop after parsing and return the raw parse trees
    pub check_only: bool,
}

impl CompileOptions {
    pub fn new(input: Vec<PathBuf>) -> Self {
        CompileOptions {
            input,
            ..CompileOptions::default()
        }
    }
}

/// Result of a compile: the validated IR, or the parse trees under
/// `check-only`.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileOutput {
    Model(Model),
    Tree(Vec<Form>),
}

impl CompileOutput {
    /// The validated model, if this was a full compile.
    pub fn model(&self) -> Option<&Model> {
        match self {
            CompileOutput::Model(model) => Some(model),
            CompileOutput::Tree(_) => None,
        }
    }

    pub fn into_model(self) -> Option<Model> {
        match self {
            CompileOutput::Model(model) => Some(model),
            CompileOutput::Tree(_) => None,
        }
    }
}

/// Compile PAMELA sources into the validated IR.
pub fn compile(options: &CompileOptions) -> CompileResult<CompileOutput> {
    let mut sources = SourceMap::new();
    compile_with_sources(options, &mut sources)
}

/// Compile, registering every source in the caller's `SourceMap` so errors
/// can be rendered with snippets via `DiagnosticFormatter`.
pub fn compile_with_sources(
    options: &CompileOptions,
    sources: &mut SourceMap,
) -> CompileResult<CompileOutput> {
    if options.input.is_empty() {
        return Err(log(CompileError::new(
            ErrorKind::Io,
            Span::zero(0),
            "parse: no input files",
        )));
    }

    let mut lvars = LvarTable::new();
    if let Some(magic_path) = &options.magic {
        // parse_magic logs its own failures
        let defaults = magic::parse_magic(magic_path)?;
        magic::seed_lvars(&mut lvars, defaults);
    }

    let mut model = Model::default();
    let mut trees = Vec::new();

    for path in &options.input {
        if path.extension().and_then(|ext| ext.to_str()) != Some("pamela") {
            return Err(log(CompileError::new(
                ErrorKind::Io,
                Span::zero(0),
                format!("parse: input file not a .pamela file: {}", path.display()),
            )));
        }
        let source = std::fs::read_to_string(path).map_err(|_| {
            log(CompileError::new(
                ErrorKind::Io,
                Span::zero(0),
                format!("parse: input file not found: {}", path.display()),
            ))
        })?;

        let file_id = sources.add_file(path.clone(), source.clone());
        debug!("parsing {} (file {})", path.display(), file_id);

        let forms = parser::parse_source(&source, file_id).map_err(|parse_err| {
            log(CompileError::new(
                ErrorKind::Syntax,
                parse_err.span,
                format!("parse: invalid input file: {}", path.display()),
            )
            .with_note(parse_err.to_string()))
        })?;

        if options.check_only {
            trees.extend(forms);
            continue;
        }
        build::build_file(&mut model, &forms, &mut lvars).map_err(log)?;
    }

    if options.check_only {
        return Ok(CompileOutput::Tree(trees));
    }

    model.lvars = lvars.entries().clone();
    let model = validate::validate(model).map_err(log)?;

    if let Some(output_magic) = &options.output_magic {
        if !lvars.is_empty() {
            let inputs: Vec<String> = options
                .input
                .iter()
                .map(|path| path.display().to_string())
                .collect();
            magic::write_magic(output_magic, &inputs, &lvars)?;
        }
    }

    Ok(CompileOutput::Model(model))
}

/// Serialize a validated model to JSON.
pub fn serialize_model(model: &Model) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(model)
}

/// Deserialize a model from JSON.
pub fn deserialize_model(json: &str) -> Result<Model, serde_json::Error> {
    serde_json::from_str(json)
}

fn log(err: CompileError) -> CompileError {
    error!("{}", err);
    err
}
