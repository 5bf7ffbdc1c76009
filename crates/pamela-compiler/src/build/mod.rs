//! IR builder: bottom-up lowering of parsed forms into the `Model`.
//!
//! Every construct has a builder that receives its already-parsed children,
//! mirroring the datum grammar one function per shape:
//!
//! ```text
//! defpclass → pclass record
//!   :meta        → Meta (key/type checked)
//!   :fields      → Field records        (fields.rs)
//!   :modes       → mode → condition map
//!   :transitions → "from:to" → Transition
//!   :methods     → defpmethod overloads (body.rs)
//! ```
//!
//! Conditions are lowered structurally only: bare symbols and keywords stay
//! as literals for the validator to disambiguate. Lvar interning is the one
//! side effect, threaded through the explicitly-passed `LvarTable`.

mod body;
mod fields;

use crate::ast::{Condition, Dependency, LvarTable, Meta, Model, Pclass, Transition, Value};
use crate::error::{CompileError, CompileResult, ErrorKind};
use crate::parser::{Form, FormKind};

/// Build a fresh model from the top-level forms of one file.
pub fn build_model(forms: &[Form], lvars: &mut LvarTable) -> CompileResult<Model> {
    let mut model = Model::default();
    build_file(&mut model, forms, lvars)?;
    Ok(model)
}

/// Build the top-level forms of one file into an existing model.
///
/// Multi-file compiles call this once per input in order; pclass names must
/// stay unique across the whole model.
pub fn build_file(model: &mut Model, forms: &[Form], lvars: &mut LvarTable) -> CompileResult<()> {
    let mut builder = Builder { lvars };
    for form in forms {
        let (name, pclass) = builder.defpclass(form)?;
        if model.pclasses.contains_key(&name) {
            return Err(structure_error(
                form,
                format!("defpclass {} is already defined", name),
            ));
        }
        model.pclasses.insert(name, pclass);
    }
    Ok(())
}

/// Shorthand for an `InvalidStructure` error at a form.
pub(crate) fn structure_error(form: &Form, message: impl Into<String>) -> CompileError {
    CompileError::new(ErrorKind::InvalidStructure, form.span, message)
}

/// Builder state threaded through one file's lowering.
pub(crate) struct Builder<'a> {
    pub(crate) lvars: &'a mut LvarTable,
}

impl Builder<'_> {
    /// Lower one `(defpclass name [args] opts…)` form.
    fn defpclass(&mut self, form: &Form) -> CompileResult<(String, Pclass)> {
        let items = form
            .as_list()
            .filter(|items| items.first().and_then(Form::as_symbol) == Some("defpclass"))
            .ok_or_else(|| {
                structure_error(
                    form,
                    format!("expecting a defpclass, found {}", form.describe()),
                )
            })?;

        let name = items
            .get(1)
            .and_then(Form::as_symbol)
            .ok_or_else(|| structure_error(form, "defpclass expects a symbol name"))?
            .to_string();

        let args_form = items
            .get(2)
            .ok_or_else(|| structure_error(form, "defpclass expects a vector of args."))?;
        let args = self.arg_vector(args_form)?;

        let mut pclass = Pclass {
            args,
            span: form.span,
            ..Pclass::default()
        };

        let mut rest = items[3..].iter();
        while let Some(opt) = rest.next() {
            let key = opt.as_keyword().ok_or_else(|| {
                structure_error(
                    opt,
                    format!("defpclass option must be a keyword, found {}", opt.describe()),
                )
            })?;
            let value = rest.next().ok_or_else(|| {
                structure_error(opt, format!("defpclass option :{} is missing its value", key))
            })?;
            match key {
                "meta" => pclass.meta = Some(self.meta(value)?),
                "inherit" => pclass.inherit = self.symbol_vector(value, ":inherit")?,
                "fields" => pclass.fields = self.fields(value)?,
                "modes" => pclass.modes = self.modes(value)?,
                "transitions" => pclass.transitions = self.transitions(value)?,
                "methods" => pclass.methods = self.methods(value)?,
                other => {
                    return Err(structure_error(
                        opt,
                        format!("defpclass option \":{}\" invalid", other),
                    ));
                }
            }
        }

        Ok((name, pclass))
    }

    /// Formal-argument vector of a defpclass.
    fn arg_vector(&self, form: &Form) -> CompileResult<Vec<String>> {
        let items = form
            .as_vector()
            .ok_or_else(|| structure_error(form, "defpclass expects a vector of args."))?;
        items
            .iter()
            .map(|item| {
                item.as_symbol()
                    .map(str::to_string)
                    .ok_or_else(|| structure_error(item, "All defpclass args must be symbols"))
            })
            .collect()
    }

    /// Vector of symbols (`:inherit [base]`).
    fn symbol_vector(&self, form: &Form, what: &str) -> CompileResult<Vec<String>> {
        let items = form
            .as_vector()
            .ok_or_else(|| structure_error(form, format!("defpclass {} must be a vector", what)))?;
        items
            .iter()
            .map(|item| {
                item.as_symbol().map(str::to_string).ok_or_else(|| {
                    structure_error(
                        item,
                        format!("defpclass {} entries must be symbols", what),
                    )
                })
            })
            .collect()
    }

    /// Lower a `:meta` map, checking keys and value types.
    fn meta(&self, form: &Form) -> CompileResult<Meta> {
        let entries = form
            .as_map()
            .ok_or_else(|| structure_error(form, "defpclass :meta must be a map"))?;

        let mut meta = Meta::default();
        for (key_form, value) in entries {
            let key = key_form.as_keyword().ok_or_else(|| {
                structure_error(
                    key_form,
                    format!("defpclass meta key \"{}\" invalid", key_form.describe()),
                )
            })?;
            match key {
                "version" => meta.version = Some(self.meta_string(value, "version")?),
                "doc" => meta.doc = Some(self.meta_string(value, "doc")?),
                "icon" => meta.icon = Some(self.meta_string(value, "icon")?),
                "depends" => meta.depends = self.depends(value)?,
                other => {
                    return Err(structure_error(
                        key_form,
                        format!("defpclass meta key \":{}\" invalid", other),
                    ));
                }
            }
        }
        Ok(meta)
    }

    fn meta_string(&self, form: &Form, key: &str) -> CompileResult<String> {
        form.as_str().map(str::to_string).ok_or_else(|| {
            structure_error(
                form,
                format!(
                    "defpclass meta :{} must be a string (not \"{}\")",
                    key,
                    form.describe()
                ),
            )
        })
    }

    /// `:depends [[model "version"] …]`.
    fn depends(&self, form: &Form) -> CompileResult<Vec<Dependency>> {
        let pairs = form.as_vector().ok_or_else(|| {
            structure_error(
                form,
                format!(
                    "defpclass meta :depends must be a vector of [model version] pairs (not \"{}\")",
                    form.describe()
                ),
            )
        })?;
        pairs
            .iter()
            .map(|pair| {
                let entry = pair.as_vector().filter(|entry| entry.len() == 2);
                match entry {
                    Some([model, version]) => {
                        let model = model.as_symbol().ok_or_else(|| {
                            structure_error(model, "defpclass meta :depends model must be a symbol")
                        })?;
                        let version = version.as_str().ok_or_else(|| {
                            structure_error(
                                version,
                                format!(
                                    "defpclass meta :depends version must be a string (not \"{}\")",
                                    version.describe()
                                ),
                            )
                        })?;
                        Ok(Dependency {
                            model: model.to_string(),
                            version: version.to_string(),
                        })
                    }
                    _ => Err(structure_error(
                        pair,
                        format!(
                            "defpclass meta :depends must be a vector of [model version] pairs (not \"{}\")",
                            pair.describe()
                        ),
                    )),
                }
            })
            .collect()
    }

    /// Lower `:modes`, either an enum vector or a map of conditions.
    fn modes(&mut self, form: &Form) -> CompileResult<indexmap::IndexMap<String, Condition>> {
        let mut modes = indexmap::IndexMap::new();
        match &form.kind {
            // Enumerated modes map each keyword to the literal-true condition
            FormKind::Vector(items) => {
                for item in items {
                    let mode = item.as_keyword().ok_or_else(|| {
                        structure_error(item, "defpclass :modes entries must be keywords")
                    })?;
                    modes.insert(mode.to_string(), Condition::literal_true());
                }
            }
            FormKind::Map(entries) => {
                for (key, value) in entries {
                    let mode = key.as_keyword().ok_or_else(|| {
                        structure_error(key, "defpclass :modes keys must be keywords")
                    })?;
                    modes.insert(mode.to_string(), self.condition(value)?);
                }
            }
            _ => {
                return Err(structure_error(
                    form,
                    "defpclass :modes must be a vector or a map",
                ));
            }
        }
        Ok(modes)
    }

    /// Lower `:transitions {:from:to {…}}`.
    fn transitions(
        &mut self,
        form: &Form,
    ) -> CompileResult<indexmap::IndexMap<String, Transition>> {
        let entries = form
            .as_map()
            .ok_or_else(|| structure_error(form, "defpclass :transitions must be a map"))?;

        let mut transitions = indexmap::IndexMap::new();
        for (key, value) in entries {
            let name = key.as_keyword().ok_or_else(|| {
                structure_error(key, "defpclass :transitions keys must be keywords")
            })?;
            if !name.contains(':') {
                return Err(structure_error(
                    key,
                    format!("transition \"{}\" must be of the form from:to", name),
                ));
            }
            transitions.insert(name.to_string(), self.transition(value)?);
        }
        Ok(transitions)
    }

    fn transition(&mut self, form: &Form) -> CompileResult<Transition> {
        let entries = form
            .as_map()
            .ok_or_else(|| structure_error(form, "transition body must be a map"))?;

        let mut transition = Transition::default();
        for (key, value) in entries {
            let key_name = key
                .as_keyword()
                .ok_or_else(|| structure_error(key, "transition keys must be keywords"))?;
            match key_name {
                "pre" => transition.pre = Some(self.condition(value)?),
                "post" => transition.post = Some(self.condition(value)?),
                "probability" => transition.probability = Some(self.probability(value)?),
                "doc" => {
                    transition.doc = Some(
                        value
                            .as_str()
                            .ok_or_else(|| {
                                structure_error(
                                    value,
                                    format!(
                                        "transition :doc must be a string (not \"{}\")",
                                        value.describe()
                                    ),
                                )
                            })?
                            .to_string(),
                    )
                }
                other => {
                    return Err(structure_error(
                        key,
                        format!("transition key \":{}\" invalid", other),
                    ));
                }
            }
        }
        Ok(transition)
    }

    /// Probability payload: a literal number or an lvar reference.
    fn probability(&mut self, form: &Form) -> CompileResult<crate::ast::FieldInit> {
        if form.is_call("lvar") {
            return self.lvar(form);
        }
        match form.as_number() {
            Some(p) => Ok(crate::ast::FieldInit::Literal {
                value: Value::Float(p),
            }),
            None => Err(structure_error(
                form,
                format!(
                    "transition :probability must be a number or lvar (not \"{}\")",
                    form.describe()
                ),
            )),
        }
    }

    /// Lower a condition form.
    ///
    /// Bare symbols and keywords stay literal here; the validator turns them
    /// into typed references. Only the logical connectives have structure.
    pub(crate) fn condition(&mut self, form: &Form) -> CompileResult<Condition> {
        if let Some(value) = form.as_value() {
            return Ok(Condition::literal(value));
        }
        let items = form
            .as_list()
            .ok_or_else(|| structure_error(form, format!("invalid condition {}", form.describe())))?;
        let head = items.first().and_then(Form::as_symbol).ok_or_else(|| {
            structure_error(form, "condition list must start with an operator symbol")
        })?;

        let args = items[1..]
            .iter()
            .map(|arg| self.condition(arg))
            .collect::<CompileResult<Vec<_>>>()?;

        Ok(match head {
            "and" => Condition::And { args },
            "or" => Condition::Or { args },
            "not" => Condition::Not { args },
            "implies" => Condition::Implies { args },
            "=" => Condition::Equal { args },
            other => {
                return Err(structure_error(
                    form,
                    format!("invalid condition operator {}", other),
                ));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn build(src: &str) -> CompileResult<Model> {
        let forms = parse_source(src, 0).expect("parse failed");
        let mut lvars = LvarTable::new();
        build_model(&forms, &mut lvars)
    }

    fn build_err(src: &str) -> String {
        build(src).expect_err("expected build error").to_string()
    }

    #[test]
    fn test_defpclass_minimal() {
        let model = build("(defpclass sw [])").expect("build failed");
        assert!(model.pclasses.contains_key("sw"));
        assert!(model.pclasses["sw"].args.is_empty());
    }

    #[test]
    fn test_defpclass_args() {
        let model = build("(defpclass sw [gnd pwr])").expect("build failed");
        assert_eq!(model.pclasses["sw"].args, vec!["gnd", "pwr"]);
    }

    #[test]
    fn test_defpclass_args_not_a_vector() {
        assert_eq!(
            build_err("(defpclass bad-args :not-a-vector)"),
            "defpclass expects a vector of args."
        );
    }

    #[test]
    fn test_defpclass_args_must_be_symbols() {
        assert_eq!(
            build_err("(defpclass no-sym-args [:a 123])"),
            "All defpclass args must be symbols"
        );
    }

    #[test]
    fn test_meta_unknown_key() {
        let msg = build_err("(defpclass bad-meta-key [] :meta {:foo :bar})");
        assert!(msg.starts_with("defpclass meta key \":foo\" invalid"), "{msg}");
    }

    #[test]
    fn test_meta_version_must_be_string() {
        assert_eq!(
            build_err("(defpclass bad-meta-ver [] :meta {:version 1.0})"),
            "defpclass meta :version must be a string (not \"1.0\")"
        );
    }

    #[test]
    fn test_meta_ok() {
        let model = build(
            "(defpclass sw [] :meta {:version \"0.2.0\" :doc \"A switch\" :depends [[base \"0.1.0\"]]})",
        )
        .expect("build failed");
        let meta = model.pclasses["sw"].meta.as_ref().expect("meta");
        assert_eq!(meta.version.as_deref(), Some("0.2.0"));
        assert_eq!(meta.doc.as_deref(), Some("A switch"));
        assert_eq!(
            meta.depends,
            vec![Dependency {
                model: "base".to_string(),
                version: "0.1.0".to_string()
            }]
        );
    }

    #[test]
    fn test_mode_enum_maps_to_literal_true() {
        let model = build("(defpclass pwrvals [] :modes [:high :none])").expect("build failed");
        let modes = &model.pclasses["pwrvals"].modes;
        assert_eq!(modes.len(), 2);
        assert!(modes["high"].is_literal_true());
        assert!(modes["none"].is_literal_true());
    }

    #[test]
    fn test_mode_map_with_conditions() {
        let model =
            build("(defpclass sw [pwr] :modes {:on (= pwr :high) :fail true})").expect("build");
        let modes = &model.pclasses["sw"].modes;
        assert!(matches!(modes["on"], Condition::Equal { .. }));
        assert!(modes["fail"].is_literal_true());
    }

    #[test]
    fn test_transitions() {
        let model = build(
            "(defpclass sw [] :modes [:on :off :fail]
               :transitions {:off:on {:pre off :post on :probability 0.99}
                             :*:fail {:probability (lvar \"pfail\" 0.01)}})",
        )
        .expect("build failed");
        let transitions = &model.pclasses["sw"].transitions;
        assert_eq!(transitions.len(), 2);
        assert!(transitions["off:on"].pre.is_some());
        assert!(matches!(
            transitions["*:fail"].probability,
            Some(crate::ast::FieldInit::Lvar { .. })
        ));
    }

    #[test]
    fn test_transition_key_shape() {
        let msg = build_err("(defpclass sw [] :transitions {:on {:pre true}})");
        assert!(msg.contains("must be of the form from:to"), "{msg}");
    }

    #[test]
    fn test_duplicate_pclass() {
        assert_eq!(
            build_err("(defpclass sw []) (defpclass sw [])"),
            "defpclass sw is already defined"
        );
    }

    #[test]
    fn test_top_level_must_be_defpclass() {
        let msg = build_err("(sequence)");
        assert!(msg.starts_with("expecting a defpclass"), "{msg}");
    }

    #[test]
    fn test_condition_connectives() {
        let model = build(
            "(defpclass sw [a b] :modes {:ready (and (not a) (or b true) (implies a b))})",
        )
        .expect("build failed");
        let ready = &model.pclasses["sw"].modes["ready"];
        match ready {
            Condition::And { args } => assert_eq!(args.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_rejects_unknown_operator() {
        let msg = build_err("(defpclass sw [] :modes {:on (xor a b)})");
        assert!(msg.contains("invalid condition operator xor"), "{msg}");
    }

    #[test]
    fn test_build_is_deterministic() {
        let src = "(defpclass sw [g] :fields {TP1 g} :modes [:on :off])";
        let a = build(src).expect("build");
        let b = build(src).expect("build");
        assert_eq!(a, b);
    }
}
