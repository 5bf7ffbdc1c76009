//! Field-stage validation: constructor arguments and initializer
//! references.

use super::{ModelIndex, PclassInfo};
use crate::ast::{FieldInit, Pclass, Value};
use crate::error::{CompileError, CompileResult, ErrorKind};

/// Ctor option keywords that are legal as positional arguments.
const CTOR_KEYWORDS: [&str; 3] = ["id", "interface", "plant-part"];

/// Validate every field of a pclass.
pub(crate) fn validate_fields(
    name: &str,
    pclass: &Pclass,
    info: &PclassInfo,
    index: &ModelIndex,
) -> CompileResult<()> {
    for (field_name, field) in &pclass.fields {
        match &field.initial {
            Some(FieldInit::PclassCtor {
                pclass: target,
                args,
                initial,
                ..
            }) => {
                for arg in args {
                    validate_ctor_arg(name, field_name, arg, info)?;
                }
                if let Some(mode) = initial {
                    validate_initial_mode(target, mode, info, index)?;
                }
            }
            Some(FieldInit::ArgReference { name: referenced }) => {
                if !is_arg_or_sibling_field(referenced, field_name, info) {
                    return Err(symbol_not_in_args(referenced, info));
                }
            }
            Some(FieldInit::ModeReference { pclass: target, mode }) => {
                let target_info = if target == "this" {
                    Some(info)
                } else {
                    index.info(target)
                };
                let target_info = target_info.ok_or_else(|| {
                    CompileError::new(
                        ErrorKind::UndefinedName,
                        info.span,
                        format!("mode-of references unknown pclass {}", target),
                    )
                })?;
                if !target_info.modes.contains(mode.as_str()) {
                    return Err(CompileError::new(
                        ErrorKind::UnknownMode,
                        info.span,
                        format!(
                            "mode-of mode :{} is not one of the defined modes: {}",
                            mode,
                            target_info.mode_list()
                        ),
                    ));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Positional ctor arguments must be an option keyword, a sibling field, or
/// a formal argument of the enclosing pclass.
fn validate_ctor_arg(
    pclass_name: &str,
    field_name: &str,
    arg: &FieldInit,
    info: &PclassInfo,
) -> CompileResult<()> {
    match arg {
        FieldInit::Literal {
            value: Value::Keyword(keyword),
        } => {
            if !CTOR_KEYWORDS.contains(&keyword.as_str()) {
                return Err(CompileError::new(
                    ErrorKind::InvalidStructure,
                    info.span,
                    format!(
                        "pclass constructor for field {} of {} has invalid keyword argument :{} \
                         (expecting :id, :interface, or :plant-part)",
                        field_name, pclass_name, keyword
                    ),
                ));
            }
            Ok(())
        }
        FieldInit::ArgReference { name } => {
            if name == field_name || !is_arg_or_sibling_field(name, field_name, info) {
                return Err(symbol_not_in_args(name, info));
            }
            Ok(())
        }
        // Literals and lvars pass through unchecked
        _ => Ok(()),
    }
}

/// The `:initial` mode of a ctor must be declared by the target pclass.
fn validate_initial_mode(
    target: &str,
    mode: &str,
    info: &PclassInfo,
    index: &ModelIndex,
) -> CompileResult<()> {
    let target_info = index.info(target).ok_or_else(|| {
        CompileError::new(
            ErrorKind::UndefinedName,
            info.span,
            format!("pclass constructor references unknown pclass {}", target),
        )
    })?;
    if !target_info.modes.contains(mode) {
        return Err(CompileError::new(
            ErrorKind::UnknownMode,
            info.span,
            format!(
                "pclass :initial mode :{} is not one of the defined modes: {}",
                mode,
                target_info.mode_list()
            ),
        ));
    }
    Ok(())
}

fn is_arg_or_sibling_field(name: &str, field_name: &str, info: &PclassInfo) -> bool {
    info.args.iter().any(|arg| arg == name)
        || (name != field_name && info.fields.contains(name))
}

fn symbol_not_in_args(name: &str, info: &PclassInfo) -> CompileError {
    CompileError::new(
        ErrorKind::UndefinedName,
        info.span,
        format!("Symbol {} not in args [{}]", name, info.args.join(" ")),
    )
}

#[cfg(test)]
mod tests {
    use crate::validate::tests::compile_model;

    #[test]
    fn test_ctor_arg_symbol_resolves_to_formal_arg() {
        compile_model(
            "(defpclass pwrvals [] :modes [:high :none])
             (defpclass sw [gnd] :fields {pwr (pwrvals gnd)})",
        )
        .expect("validate failed");
    }

    #[test]
    fn test_ctor_arg_symbol_resolves_to_sibling_field() {
        compile_model(
            "(defpclass pwrvals [] :modes [:high :none])
             (defpclass sw [] :fields {gnd 0 pwr (pwrvals gnd)})",
        )
        .expect("validate failed");
    }

    #[test]
    fn test_ctor_arg_unknown_symbol() {
        let err = compile_model(
            "(defpclass pwrvals [] :modes [:high :none])
             (defpclass sw [a b] :fields {pwr (pwrvals mystery)})",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "Symbol mystery not in args [a b]");
    }

    #[test]
    fn test_ctor_arg_must_not_reference_itself() {
        let err = compile_model(
            "(defpclass pwrvals [] :modes [:high :none])
             (defpclass sw [a] :fields {pwr (pwrvals pwr)})",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "Symbol pwr not in args [a]");
    }

    #[test]
    fn test_ctor_stray_keyword_rejected() {
        let err = compile_model(
            "(defpclass pwrvals [] :modes [:high :none])
             (defpclass sw [] :fields {pwr (pwrvals :medium 1)})",
        )
        .expect_err("should fail");
        assert!(err.to_string().contains(":medium"), "{err}");
    }

    #[test]
    fn test_initial_mode_must_be_declared() {
        let err = compile_model(
            "(defpclass bad-initializer [] :modes [:high :low])
             (defpclass sw [] :fields {pwr (bad-initializer :initial :medium)})",
        )
        .expect_err("should fail");
        assert_eq!(
            err.to_string(),
            "pclass :initial mode :medium is not one of the defined modes: [:high :low]"
        );
    }

    #[test]
    fn test_field_arg_reference_must_resolve() {
        let err = compile_model("(defpclass sw [a] :fields {pwr missing})")
            .expect_err("should fail");
        assert_eq!(err.to_string(), "Symbol missing not in args [a]");
    }

    #[test]
    fn test_mode_of_checks_target_modes() {
        let err = compile_model(
            "(defpclass pwrvals [] :modes [:high :none])
             (defpclass sw [] :fields {pwr (mode-of pwrvals :warm)})",
        )
        .expect_err("should fail");
        assert_eq!(
            err.to_string(),
            "mode-of mode :warm is not one of the defined modes: [:high :none]"
        );
    }
}
