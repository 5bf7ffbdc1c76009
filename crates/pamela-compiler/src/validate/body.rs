//! Method-stage validation: pre/post conditions, body statements, and
//! plant-call arity resolution.

use super::{Ctx, ModelIndex, PclassInfo, conditions};
use crate::ast::{Pclass, Stmt, StmtKind};
use crate::error::{CompileResult, ErrorKind};
use indexmap::IndexSet;

/// Validate every method overload of a pclass, in declaration order.
pub(crate) fn validate_methods(
    name: &str,
    pclass: &mut Pclass,
    info: &PclassInfo,
    index: &ModelIndex,
    state_vars: &mut IndexSet<String>,
) -> CompileResult<()> {
    for i in 0..pclass.methods.len() {
        let (method_name, defs) = pclass.methods.get_index_mut(i).expect("index in range");
        let method_name = method_name.clone();

        for (overload, def) in defs.iter_mut().enumerate() {
            let method_args = def.args.clone();
            let span = def.span;
            let ctx = |stage: &str| Ctx {
                pclass: name,
                info,
                index,
                method_args: &method_args,
                method: Some(method_name.as_str()),
                place: format!("method {} {} :{}", method_name, overload, stage),
                span,
            };

            conditions::resolve_condition(&mut def.pre, &ctx("pre"), state_vars)?;
            conditions::resolve_condition(&mut def.post, &ctx("post"), state_vars)?;

            let body_ctx = ctx("body");
            for stmt in &mut def.body {
                validate_stmt(stmt, &body_ctx, state_vars)?;
            }
            for stmt in &mut def.betweens {
                validate_stmt(stmt, &body_ctx, state_vars)?;
            }
        }
    }
    Ok(())
}

/// Validate one statement tree: plant calls, embedded conditions, guards,
/// and sub-bodies.
fn validate_stmt(
    stmt: &mut Stmt,
    ctx: &Ctx<'_>,
    state_vars: &mut IndexSet<String>,
) -> CompileResult<()> {
    if let Some(guard) = &mut stmt.guard {
        conditions::resolve_condition(guard, ctx, state_vars)?;
    }

    match &mut stmt.kind {
        StmtKind::PlantFnSymbol { name, method, args } => {
            let argc = args.len();
            if name == "this" {
                resolve_arity(ctx.pclass, ctx.info, method, argc, ctx)?;
            } else if ctx.method_args.iter().any(|arg| arg == name)
                || ctx.info.args.iter().any(|arg| arg == name)
            {
                // Receiver is bound at run time; arity is checked when the
                // root task is resolved, outside this pass.
            } else if ctx.info.fields.contains(name.as_str()) {
                if let Some(target) = ctx.info.ctor_targets.get(name.as_str()) {
                    let target_info = ctx.index.info(target).ok_or_else(|| {
                        ctx.error(
                            ErrorKind::UndefinedName,
                            format!("field {} is constructed from unknown pclass {}", name, target),
                        )
                    })?;
                    resolve_arity(target, target_info, method, argc, ctx)?;
                    let resolved = StmtKind::PlantFnField {
                        field: name.clone(),
                        method: method.clone(),
                        args: args.clone(),
                    };
                    stmt.kind = resolved;
                }
                // Indirect initializer (e.g. an arg reference): accepted,
                // arity deferred.
            } else {
                return Err(ctx.error(
                    ErrorKind::UndefinedName,
                    format!(
                        "plant name {} used in method {} is not defined in the pclass {}",
                        name,
                        ctx.method.unwrap_or("?"),
                        ctx.pclass
                    ),
                ));
            }
        }
        StmtKind::Ask { condition }
        | StmtKind::Tell { condition }
        | StmtKind::Assert { condition }
        | StmtKind::Maintain { condition }
        | StmtKind::Unless { condition }
        | StmtKind::When { condition }
        | StmtKind::Whenever { condition } => {
            conditions::resolve_condition(condition, ctx, state_vars)?;
        }
        StmtKind::Try { catch } => {
            if let Some(catch) = catch {
                for child in catch {
                    validate_stmt(child, ctx, state_vars)?;
                }
            }
        }
        // Already resolved on a previous pass, or nothing to check
        _ => {}
    }

    for child in &mut stmt.body {
        validate_stmt(child, ctx, state_vars)?;
    }
    Ok(())
}

/// Pick the overload of `method` in `target` matching the call's arity.
///
/// Resolution is a pure function of (method, arity, pclass): exactly one
/// arity match succeeds, zero is an arity error, more than one is an
/// ambiguity error.
fn resolve_arity(
    target: &str,
    target_info: &PclassInfo,
    method: &str,
    argc: usize,
    ctx: &Ctx<'_>,
) -> CompileResult<()> {
    let arities = target_info
        .arities
        .get(method)
        .filter(|arities| !arities.is_empty())
        .ok_or_else(|| {
            ctx.error(
                ErrorKind::UndefinedName,
                format!("{} method not defined in pclass {}", method, target),
            )
        })?;

    match arities.iter().filter(|&&arity| arity == argc).count() {
        1 => Ok(()),
        0 => {
            let mut expected: Vec<usize> = arities.clone();
            expected.sort_unstable();
            expected.dedup();
            let rendered = expected
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(" or ");
            let plural = if expected.len() == 1 && expected[0] == 1 {
                "arg"
            } else {
                "args"
            };
            Err(ctx.error(
                ErrorKind::WrongArgCount,
                format!(
                    "{} has {} {}, but expects {} {}",
                    method,
                    argc,
                    if argc == 1 { "arg" } else { "args" },
                    rendered,
                    plural
                ),
            ))
        }
        matches => Err(ctx.error(
            ErrorKind::AmbiguousCall,
            format!(
                "{} call with {} args is ambiguous: {} overloads match in pclass {}",
                method, argc, matches, target
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::StmtKind;
    use crate::validate::tests::compile_model;

    #[test]
    fn test_this_call_resolves_by_arity() {
        compile_model(
            "(defpclass sw [] :methods [(defpmethod stop [])
                                        (defpmethod run [] (sequence (stop)))])",
        )
        .expect("validate failed");
    }

    #[test]
    fn test_arity_mismatch_message() {
        let err = compile_model(
            "(defpclass sw [] :methods [(defpmethod m [x])
                                        (defpmethod run [] (sequence (m)))])",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "m has 0 args, but expects 1 arg");
    }

    #[test]
    fn test_arity_mismatch_lists_overload_arities() {
        let err = compile_model(
            "(defpclass sw [] :methods [(defpmethod m [x])
                                        (defpmethod m [x y z])
                                        (defpmethod run [] (sequence (m 1 2)))])",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "m has 2 args, but expects 1 or 3 args");
    }

    #[test]
    fn test_method_not_defined() {
        let err = compile_model(
            "(defpclass sw [] :methods [(defpmethod run [] (sequence (vanish)))])",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "vanish method not defined in pclass sw");
    }

    #[test]
    fn test_ambiguous_overloads() {
        let err = compile_model(
            "(defpclass sw [] :methods [(defpmethod m [a])
                                        (defpmethod m [b])
                                        (defpmethod run [] (sequence (m 1)))])",
        )
        .expect_err("should fail");
        assert!(err.to_string().contains("ambiguous"), "{err}");
    }

    #[test]
    fn test_field_receiver_rewrites_to_plant_fn_field() {
        let model = compile_model(
            "(defpclass pump [] :methods [(defpmethod on [])
                                          (defpmethod on [rate])])
             (defpclass plant []
               :fields {p1 (pump)}
               :methods [(defpmethod run [] (sequence (p1.on 2.5)))])",
        )
        .expect("validate failed");
        let def = &model.pclasses["plant"].methods["run"][0];
        match &def.body[0].body[0].kind {
            StmtKind::PlantFnField { field, method, args } => {
                assert_eq!(field, "p1");
                assert_eq!(method, "on");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected plant-fn-field, got {:?}", other),
        }
    }

    #[test]
    fn test_field_receiver_arity_checked() {
        let err = compile_model(
            "(defpclass pump [] :methods [(defpmethod on [rate])])
             (defpclass plant []
               :fields {p1 (pump)}
               :methods [(defpmethod run [] (sequence (p1.on)))])",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "on has 0 args, but expects 1 arg");
    }

    #[test]
    fn test_method_arg_receiver_deferred() {
        // `dev` is a method argument: the receiver binds at run time, so
        // no arity check happens here.
        compile_model(
            "(defpclass plant []
               :methods [(defpmethod run [dev] (sequence (dev.on 1 2 3)))])",
        )
        .expect("validate failed");
    }

    #[test]
    fn test_pclass_arg_receiver_deferred() {
        compile_model(
            "(defpclass plant [dev]
               :methods [(defpmethod run [] (sequence (dev.on)))])",
        )
        .expect("validate failed");
    }

    #[test]
    fn test_indirect_field_receiver_deferred() {
        // `dev` is a field initialized from a pclass arg, not a direct
        // ctor: accepted with the arity check deferred.
        compile_model(
            "(defpclass plant [src]
               :fields {dev src}
               :methods [(defpmethod run [] (sequence (dev.on)))])",
        )
        .expect("validate failed");
    }

    #[test]
    fn test_unknown_plant_name() {
        let err = compile_model(
            "(defpclass plant []
               :methods [(defpmethod run [] (sequence (ghost.on)))])",
        )
        .expect_err("should fail");
        assert_eq!(
            err.to_string(),
            "plant name ghost used in method run is not defined in the pclass plant"
        );
    }

    #[test]
    fn test_conditions_inside_body_forms_resolve() {
        let model = compile_model(
            "(defpclass sw []
               :modes [:ready]
               :methods [(defpmethod run []
                           (whenever ready (sequence (delay))))])",
        )
        .expect("validate failed");
        let def = &model.pclasses["sw"].methods["run"][0];
        match &def.body[0].kind {
            StmtKind::Whenever { condition } => {
                assert_eq!(
                    condition,
                    &crate::ast::Condition::ModeReference {
                        pclass: "this".to_string(),
                        mode: "ready".to_string()
                    }
                );
            }
            other => panic!("expected whenever, got {:?}", other),
        }
    }

    #[test]
    fn test_catch_body_validated() {
        let err = compile_model(
            "(defpclass sw []
               :methods [(defpmethod run []
                           (try (sequence (delay)) catch (vanish)))])",
        )
        .expect_err("should fail");
        assert_eq!(err.to_string(), "vanish method not defined in pclass sw");
    }
}
