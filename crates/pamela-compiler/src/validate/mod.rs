//! Semantic validation: disambiguation, arity checking, and hoisting.
//!
//! The validator walks the raw IR one pclass at a time, in declaration
//! order, through staged checks gated by early exit on the first error:
//!
//! ```text
//! meta :depends → fields → modes → transitions → methods (pre → post → body)
//!      ^^^^^^^      ^^^^^    ^^^^^^^^^^^^^^^^^    ^^^^^^^
//!      mod.rs     fields.rs       mod.rs          body.rs + conditions.rs
//! ```
//!
//! Disambiguation rewrites bare symbols and keywords in conditions into
//! typed references against the pclass's lexical scope, and plant calls
//! against receiver fields with arity checking. State variables discovered
//! along the way accumulate in a side table and merge into the model after
//! every pclass validates.
//!
//! Validation is idempotent: already-resolved reference variants and
//! `plant-fn-field` nodes pass through unchanged.

mod body;
mod conditions;
mod fields;

use crate::ast::{FieldInit, Model, Pclass};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::foundation::Span;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// Validate a raw model, producing the disambiguated IR.
///
/// Deterministic: the first error in pclass-declaration order is returned
/// and later stages are skipped.
pub fn validate(mut model: Model) -> CompileResult<Model> {
    let index = ModelIndex::build(&model);
    let mut state_vars: IndexSet<String> = IndexSet::new();

    for i in 0..model.pclasses.len() {
        let (name, pclass) = model.pclasses.get_index_mut(i).expect("index in range");
        let name = name.clone();
        let info = index.info(&name).expect("indexed from the same model");

        validate_depends(&name, pclass, &index)?;
        fields::validate_fields(&name, pclass, info, &index)?;
        validate_modes(&name, pclass, info, &index, &mut state_vars)?;
        validate_transitions(&name, pclass, info, &index, &mut state_vars)?;
        body::validate_methods(&name, pclass, info, &index, &mut state_vars)?;
    }

    model.state_variables.extend(state_vars);
    Ok(model)
}

/// Per-pclass lookup tables, snapshotted before any rewriting starts.
#[derive(Debug, Default)]
pub(crate) struct PclassInfo {
    pub version: Option<String>,
    pub args: Vec<String>,
    pub fields: IndexSet<String>,
    /// Field name → target pclass, for fields with a direct ctor initializer
    pub ctor_targets: HashMap<String, String>,
    pub modes: IndexSet<String>,
    /// Method name → arity per overload, in overload order
    pub arities: HashMap<String, Vec<usize>>,
    pub span: Span,
}

/// Read-only index over every pclass of the model.
pub(crate) struct ModelIndex {
    pclasses: IndexMap<String, PclassInfo>,
}

impl ModelIndex {
    fn build(model: &Model) -> Self {
        let pclasses = model
            .pclasses
            .iter()
            .map(|(name, pclass)| (name.clone(), PclassInfo::build(pclass)))
            .collect();
        Self { pclasses }
    }

    pub(crate) fn info(&self, pclass: &str) -> Option<&PclassInfo> {
        self.pclasses.get(pclass)
    }
}

impl PclassInfo {
    fn build(pclass: &Pclass) -> Self {
        let mut info = PclassInfo {
            version: pclass.meta.as_ref().and_then(|meta| meta.version.clone()),
            args: pclass.args.clone(),
            span: pclass.span,
            ..PclassInfo::default()
        };
        for (name, field) in &pclass.fields {
            info.fields.insert(name.clone());
            if let Some(FieldInit::PclassCtor { pclass: target, .. }) = &field.initial {
                info.ctor_targets.insert(name.clone(), target.clone());
            }
        }
        for mode in pclass.modes.keys() {
            info.modes.insert(mode.clone());
        }
        for (name, defs) in &pclass.methods {
            info.arities
                .insert(name.clone(), defs.iter().map(|def| def.args.len()).collect());
        }
        info
    }

    /// Rendered mode list for error messages, e.g. `[:high :low]`.
    pub(crate) fn mode_list(&self) -> String {
        let rendered: Vec<String> = self.modes.iter().map(|m| format!(":{}", m)).collect();
        format!("[{}]", rendered.join(" "))
    }
}

/// Scope handed down to condition and body validation.
pub(crate) struct Ctx<'a> {
    pub pclass: &'a str,
    pub info: &'a PclassInfo,
    pub index: &'a ModelIndex,
    /// Formal args of the current method, empty outside method validation
    pub method_args: &'a [String],
    pub method: Option<&'a str>,
    /// Rendered location, e.g. `method run 0 :pre`
    pub place: String,
    pub span: Span,
}

impl Ctx<'_> {
    pub(crate) fn error(&self, kind: ErrorKind, message: impl Into<String>) -> CompileError {
        CompileError::new(kind, self.span, message)
    }
}

/// Check `:meta :depends` against the models actually in the compile.
fn validate_depends(name: &str, pclass: &Pclass, index: &ModelIndex) -> CompileResult<()> {
    let Some(meta) = &pclass.meta else {
        return Ok(());
    };
    for dep in &meta.depends {
        let target = index.info(&dep.model).ok_or_else(|| {
            CompileError::new(
                ErrorKind::DependencyError,
                pclass.span,
                format!(
                    "defpclass meta :depends upon a non-existent model: {}",
                    dep.model
                ),
            )
        })?;
        if target.version.as_deref() != Some(dep.version.as_str()) {
            return Err(CompileError::new(
                ErrorKind::DependencyError,
                pclass.span,
                format!(
                    "defpclass meta :depends upon [{} \"{}\"] but the available version is: \"{}\"",
                    dep.model,
                    dep.version,
                    target.version.as_deref().unwrap_or_default()
                ),
            )
            .with_note(format!("declared by pclass {}", name)));
        }
    }
    Ok(())
}

/// Validate every mode condition of a pclass.
fn validate_modes(
    name: &str,
    pclass: &mut Pclass,
    info: &PclassInfo,
    index: &ModelIndex,
    state_vars: &mut IndexSet<String>,
) -> CompileResult<()> {
    for i in 0..pclass.modes.len() {
        let (mode, condition) = pclass.modes.get_index_mut(i).expect("index in range");
        let ctx = Ctx {
            pclass: name,
            info,
            index,
            method_args: &[],
            method: None,
            place: format!("mode :{}", mode),
            span: info.span,
        };
        conditions::resolve_condition(condition, &ctx, state_vars)?;
    }
    Ok(())
}

/// Validate transition keys and their pre/post conditions.
///
/// Both ends of a `from:to` key must be declared modes or the `*` wildcard.
fn validate_transitions(
    name: &str,
    pclass: &mut Pclass,
    info: &PclassInfo,
    index: &ModelIndex,
    state_vars: &mut IndexSet<String>,
) -> CompileResult<()> {
    for i in 0..pclass.transitions.len() {
        let (key, transition) = pclass.transitions.get_index_mut(i).expect("index in range");
        let key = key.clone();
        let (from, to) = key.split_once(':').expect("shape checked by the builder");

        for end in [from, to] {
            if end != "*" && !info.modes.contains(end) {
                return Err(CompileError::new(
                    ErrorKind::UnknownMode,
                    info.span,
                    format!(
                        "transition {} mode :{} is not one of the defined modes: {}",
                        key,
                        end,
                        info.mode_list()
                    ),
                ));
            }
        }

        for (condition, stage) in [(&mut transition.pre, "pre"), (&mut transition.post, "post")] {
            if let Some(condition) = condition {
                let ctx = Ctx {
                    pclass: name,
                    info,
                    index,
                    method_args: &[],
                    method: None,
                    place: format!("transition {} :{}", key, stage),
                    span: info.span,
                };
                conditions::resolve_condition(condition, &ctx, state_vars)?;
            }
        }
    }
    Ok(())
}
