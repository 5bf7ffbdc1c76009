//! Field builders: `:fields` maps, field initializers, lvar and pclass
//! constructors.

use super::{Builder, structure_error};
use crate::ast::{Access, Field, FieldInit, LvarDefault};
use crate::error::CompileResult;
use crate::parser::{Form, FormKind};
use indexmap::IndexMap;

/// Ctor option keywords that may also appear positionally.
const CTOR_OPTIONS: [&str; 4] = ["id", "interface", "plant-part", "initial"];

impl Builder<'_> {
    /// Lower a `:fields` map.
    pub(crate) fn fields(&mut self, form: &Form) -> CompileResult<IndexMap<String, Field>> {
        let entries = form
            .as_map()
            .ok_or_else(|| structure_error(form, "defpclass :fields must be a map"))?;

        let mut fields = IndexMap::new();
        for (key, value) in entries {
            let name = key
                .as_symbol()
                .ok_or_else(|| structure_error(key, "defpclass :fields keys must be symbols"))?;
            fields.insert(name.to_string(), self.field(value)?);
        }
        Ok(fields)
    }

    /// Lower one field declaration: either a bare field-type (treated as the
    /// initializer) or a map of field-init entries.
    fn field(&mut self, form: &Form) -> CompileResult<Field> {
        let Some(entries) = form.as_map() else {
            return Ok(Field {
                initial: Some(self.field_init(form)?),
                ..Field::default()
            });
        };

        let mut field = Field::default();
        for (key, value) in entries {
            let key_name = key
                .as_keyword()
                .ok_or_else(|| structure_error(key, "field-init keys must be keywords"))?;
            match key_name {
                "initial" => field.initial = Some(self.field_init(value)?),
                "access" => {
                    field.access = match value.as_keyword() {
                        Some("private") => Access::Private,
                        Some("public") => Access::Public,
                        _ => {
                            return Err(structure_error(
                                value,
                                format!(
                                    "field :access must be :private or :public (not \"{}\")",
                                    value.describe()
                                ),
                            ));
                        }
                    }
                }
                "observable" => {
                    field.observable = match value.kind {
                        FormKind::Bool(b) => b,
                        _ => {
                            return Err(structure_error(
                                value,
                                format!(
                                    "field :observable must be a boolean (not \"{}\")",
                                    value.describe()
                                ),
                            ));
                        }
                    }
                }
                other => {
                    return Err(structure_error(
                        key,
                        format!("field-init key \":{}\" invalid", other),
                    ));
                }
            }
        }
        Ok(field)
    }

    /// Lower a field-type value expression.
    pub(crate) fn field_init(&mut self, form: &Form) -> CompileResult<FieldInit> {
        match &form.kind {
            FormKind::Symbol(name) => Ok(FieldInit::ArgReference { name: name.clone() }),
            FormKind::List(_) if form.is_call("lvar") => self.lvar(form),
            FormKind::List(_) if form.is_call("mode-of") => self.mode_of(form),
            FormKind::List(_) => self.pclass_ctor(form),
            _ => {
                let value = form.as_value().ok_or_else(|| {
                    structure_error(
                        form,
                        format!("invalid field initializer {}", form.describe()),
                    )
                })?;
                Ok(FieldInit::Literal { value })
            }
        }
    }

    /// Lower `(lvar "name" default?)`, interning into the lvar table.
    ///
    /// Interning is insert-if-absent: a second occurrence of the name keeps
    /// the first default. An anonymous `(lvar)` gets a generated name.
    pub(crate) fn lvar(&mut self, form: &Form) -> CompileResult<FieldInit> {
        let items = form.as_list().unwrap_or_default();

        let name = match items.get(1) {
            None => self.lvars.gensym(),
            Some(name_form) => name_form
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| {
                    structure_error(
                        name_form,
                        format!("lvar name must be a string (not \"{}\")", name_form.describe()),
                    )
                })?,
        };

        let default = match items.get(2) {
            None => LvarDefault::Unset,
            Some(default_form) => {
                let value = default_form.as_value().ok_or_else(|| {
                    structure_error(
                        default_form,
                        format!(
                            "lvar default must be a literal (not \"{}\")",
                            default_form.describe()
                        ),
                    )
                })?;
                LvarDefault::Value(value)
            }
        };

        if let Some(extra) = items.get(3) {
            return Err(structure_error(extra, "lvar takes at most a name and a default"));
        }

        self.lvars.intern(&name, default);
        Ok(FieldInit::Lvar { name })
    }

    /// Lower `(mode-of pclass :mode)`.
    fn mode_of(&self, form: &Form) -> CompileResult<FieldInit> {
        let items = form.as_list().unwrap_or_default();
        let (pclass, mode) = match items {
            [_, pclass, mode] => (pclass.as_symbol(), mode.as_keyword()),
            _ => (None, None),
        };
        match (pclass, mode) {
            (Some(pclass), Some(mode)) => Ok(FieldInit::ModeReference {
                pclass: pclass.to_string(),
                mode: mode.to_string(),
            }),
            _ => Err(structure_error(
                form,
                "mode-of expects a pclass symbol and a mode keyword",
            )),
        }
    }

    /// Lower a pclass constructor `(name args… opts…)`.
    ///
    /// Option keywords followed by a value are absorbed as options; anything
    /// else accumulates positionally. Positional keywords survive for the
    /// validator to reject or accept per the ctor argument rules.
    fn pclass_ctor(&mut self, form: &Form) -> CompileResult<FieldInit> {
        let items = form.as_list().unwrap_or_default();
        let pclass = items
            .first()
            .and_then(Form::as_symbol)
            .ok_or_else(|| {
                structure_error(form, "pclass constructor must start with a pclass symbol")
            })?
            .to_string();

        let mut args = Vec::new();
        let mut id = None;
        let mut interface = None;
        let mut plant_part = None;
        let mut initial = None;

        let mut rest = items[1..].iter().peekable();
        while let Some(item) = rest.next() {
            let option = item
                .as_keyword()
                .filter(|k| CTOR_OPTIONS.contains(k) && rest.peek().is_some());
            let Some(option) = option else {
                args.push(self.field_init(item)?);
                continue;
            };
            let value = rest.next().expect("peeked above");
            match option {
                "initial" => {
                    initial = Some(
                        value
                            .as_keyword()
                            .ok_or_else(|| {
                                structure_error(
                                    value,
                                    format!(
                                        "pclass :initial must be a mode keyword (not \"{}\")",
                                        value.describe()
                                    ),
                                )
                            })?
                            .to_string(),
                    );
                }
                key => {
                    let text = value
                        .as_str()
                        .ok_or_else(|| {
                            structure_error(
                                value,
                                format!(
                                    "pclass :{} must be a string (not \"{}\")",
                                    key,
                                    value.describe()
                                ),
                            )
                        })?
                        .to_string();
                    match key {
                        "id" => id = Some(text),
                        "interface" => interface = Some(text),
                        "plant-part" => plant_part = Some(text),
                        _ => unreachable!("option list is closed"),
                    }
                }
            }
        }

        Ok(FieldInit::PclassCtor {
            pclass,
            args,
            id,
            interface,
            plant_part,
            initial,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Access, FieldInit, LvarDefault, LvarTable, Model, Value};
    use crate::build::build_model;
    use crate::error::CompileResult;
    use crate::parser::parse_source;

    fn build(src: &str) -> CompileResult<Model> {
        let forms = parse_source(src, 0).expect("parse failed");
        build_model(&forms, &mut LvarTable::new())
    }

    fn build_with_lvars(src: &str) -> (Model, LvarTable) {
        let forms = parse_source(src, 0).expect("parse failed");
        let mut lvars = LvarTable::new();
        let model = build_model(&forms, &mut lvars).expect("build failed");
        (model, lvars)
    }

    #[test]
    fn test_bare_initializer_defaults() {
        let model = build("(defpclass sw [gnd] :fields {TP1 gnd})").expect("build failed");
        let field = &model.pclasses["sw"].fields["TP1"];
        assert_eq!(field.access, Access::Private);
        assert!(!field.observable);
        assert_eq!(
            field.initial,
            Some(FieldInit::ArgReference {
                name: "gnd".to_string()
            })
        );
    }

    #[test]
    fn test_field_init_map() {
        let model = build(
            "(defpclass sw [] :fields {pwr {:initial 0 :access :public :observable true}})",
        )
        .expect("build failed");
        let field = &model.pclasses["sw"].fields["pwr"];
        assert_eq!(field.access, Access::Public);
        assert!(field.observable);
        assert_eq!(
            field.initial,
            Some(FieldInit::Literal {
                value: Value::Int(0)
            })
        );
    }

    #[test]
    fn test_field_init_unknown_key() {
        let err = build("(defpclass sw [] :fields {pwr {:wobble 1}})").expect_err("should fail");
        assert!(err.to_string().contains(":wobble"), "{err}");
    }

    #[test]
    fn test_lvar_interning_and_defaults() {
        let (model, lvars) = build_with_lvars(
            "(defpclass sw [] :fields {a (lvar \"door\" 1) b (lvar \"door\" 2) c (lvar \"window\")})",
        );
        assert_eq!(lvars.len(), 2);
        // First default wins
        assert_eq!(lvars.get("door"), Some(&LvarDefault::Value(Value::Int(1))));
        assert_eq!(lvars.get("window"), Some(&LvarDefault::Unset));
        assert_eq!(
            model.pclasses["sw"].fields["b"].initial,
            Some(FieldInit::Lvar {
                name: "door".to_string()
            })
        );
    }

    #[test]
    fn test_anonymous_lvar_gets_gensym_name() {
        let (model, lvars) = build_with_lvars("(defpclass sw [] :fields {a (lvar)})");
        assert_eq!(lvars.len(), 1);
        assert_eq!(
            model.pclasses["sw"].fields["a"].initial,
            Some(FieldInit::Lvar {
                name: "lvar-0".to_string()
            })
        );
    }

    #[test]
    fn test_mode_of() {
        let model =
            build("(defpclass sw [] :fields {pwr (mode-of pwrvals :none)})").expect("build failed");
        assert_eq!(
            model.pclasses["sw"].fields["pwr"].initial,
            Some(FieldInit::ModeReference {
                pclass: "pwrvals".to_string(),
                mode: "none".to_string()
            })
        );
    }

    #[test]
    fn test_pclass_ctor_options_and_args() {
        let model = build(
            "(defpclass sw [gnd] :fields {pwr (pwrvals gnd :id \"sw-1\" :plant-part \"PSW\" :initial :none)})",
        )
        .expect("build failed");
        match &model.pclasses["sw"].fields["pwr"].initial {
            Some(FieldInit::PclassCtor {
                pclass,
                args,
                id,
                plant_part,
                initial,
                ..
            }) => {
                assert_eq!(pclass, "pwrvals");
                assert_eq!(args.len(), 1);
                assert_eq!(id.as_deref(), Some("sw-1"));
                assert_eq!(plant_part.as_deref(), Some("PSW"));
                assert_eq!(initial.as_deref(), Some("none"));
            }
            other => panic!("expected pclass ctor, got {:?}", other),
        }
    }

    #[test]
    fn test_pclass_ctor_stray_keyword_stays_positional() {
        let model = build("(defpclass sw [] :fields {pwr (pwrvals :medium)})").expect("build");
        match &model.pclasses["sw"].fields["pwr"].initial {
            Some(FieldInit::PclassCtor { args, .. }) => {
                assert_eq!(
                    args[0],
                    FieldInit::Literal {
                        value: Value::Keyword("medium".to_string())
                    }
                );
            }
            other => panic!("expected pclass ctor, got {:?}", other),
        }
    }
}
