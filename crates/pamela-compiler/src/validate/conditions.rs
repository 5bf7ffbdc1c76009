//! Condition disambiguation.
//!
//! Bare symbols and keywords reaching the validator are resolved against
//! the pclass's lexical scope in priority order: field → mode → method
//! argument → pclass argument → state variable. Keywords resolve against
//! modes only; a keyword naming nothing stays a literal, though inside an
//! `=` condition it may still be mode-qualified against a ctor-initialized
//! field's target pclass. That qualification is the one type-driven
//! coercion performed.

use super::Ctx;
use crate::ast::{Condition, Value};
use crate::error::{CompileResult, ErrorKind};
use indexmap::IndexSet;
use tracing::warn;

/// Resolve a condition in place.
pub(crate) fn resolve_condition(
    condition: &mut Condition,
    ctx: &Ctx<'_>,
    state_vars: &mut IndexSet<String>,
) -> CompileResult<()> {
    resolve(condition, ctx, state_vars, false)
}

fn resolve(
    condition: &mut Condition,
    ctx: &Ctx<'_>,
    state_vars: &mut IndexSet<String>,
    in_equal: bool,
) -> CompileResult<()> {
    match condition {
        Condition::Literal { value } => match value {
            Value::Symbol(name) => {
                let name = name.clone();
                *condition = resolve_symbol(&name, ctx, state_vars)?;
            }
            Value::Keyword(keyword) => {
                if ctx.info.modes.contains(keyword.as_str()) {
                    let mode = keyword.clone();
                    *condition = Condition::ModeReference {
                        pclass: "this".to_string(),
                        mode,
                    };
                } else if !in_equal {
                    // Inside an `=` the mode-qualification pass gets a shot
                    // at this first; see `qualify_equal`.
                    warn!(
                        "keyword :{} in {} of pclass {} does not name a mode; kept as a literal",
                        keyword, ctx.place, ctx.pclass
                    );
                }
            }
            _ => {}
        },
        Condition::And { args }
        | Condition::Or { args }
        | Condition::Not { args }
        | Condition::Implies { args } => {
            for arg in args {
                resolve(arg, ctx, state_vars, false)?;
            }
        }
        Condition::Equal { args } => {
            for arg in args.iter_mut() {
                resolve(arg, ctx, state_vars, true)?;
            }
            qualify_equal(args, ctx);
        }
        // Reference variants only come out of this pass; accept them so
        // re-validation is a no-op.
        _ => {}
    }
    Ok(())
}

/// Resolve a bare or qualified symbol per the scope priority.
fn resolve_symbol(
    name: &str,
    ctx: &Ctx<'_>,
    state_vars: &mut IndexSet<String>,
) -> CompileResult<Condition> {
    if let Some((base, member)) = name.split_once('.') {
        return resolve_qualified(name, base, member, ctx);
    }

    if ctx.info.fields.contains(name) {
        return Ok(Condition::FieldReference {
            pclass: "this".to_string(),
            field: name.to_string(),
        });
    }
    if ctx.info.modes.contains(name) {
        return Ok(Condition::ModeReference {
            pclass: "this".to_string(),
            mode: name.to_string(),
        });
    }
    if ctx.method_args.iter().any(|arg| arg == name) {
        return Ok(Condition::MethodArgReference {
            name: name.to_string(),
        });
    }
    if ctx.info.args.iter().any(|arg| arg == name) {
        return Ok(Condition::ArgReference {
            name: name.to_string(),
        });
    }

    // Free identifier: a new state variable, hoisted to the model
    state_vars.insert(name.to_string());
    Ok(Condition::StateVariable {
        name: name.to_string(),
    })
}

/// Resolve `field.member` (and the deprecated `field.:member`) against the
/// target pclass of the base field's constructor initializer.
fn resolve_qualified(
    full: &str,
    base: &str,
    member: &str,
    ctx: &Ctx<'_>,
) -> CompileResult<Condition> {
    let member = member.strip_prefix(':').unwrap_or(member);

    if !ctx.info.fields.contains(base) {
        return Err(ctx.error(
            ErrorKind::UndefinedName,
            format!(
                "field {} referenced in {} is not defined in the pclass {}",
                base, ctx.place, ctx.pclass
            ),
        ));
    }
    let target = ctx.info.ctor_targets.get(base).ok_or_else(|| {
        ctx.error(
            ErrorKind::UndefinedName,
            format!(
                "cannot resolve {}: field {} is not initialized with a pclass constructor",
                full, base
            ),
        )
    })?;
    let target_info = ctx.index.info(target).ok_or_else(|| {
        ctx.error(
            ErrorKind::UndefinedName,
            format!("field {} is constructed from unknown pclass {}", base, target),
        )
    })?;

    if target_info.fields.contains(member) {
        Ok(Condition::FieldReferenceField {
            field: base.to_string(),
            member: member.to_string(),
        })
    } else if target_info.modes.contains(member) {
        Ok(Condition::FieldReferenceMode {
            field: base.to_string(),
            mode: member.to_string(),
        })
    } else {
        Err(ctx.error(
            ErrorKind::UndefinedName,
            format!(
                "pclass {} has neither a field nor a mode named {}",
                target, member
            ),
        ))
    }
}

/// Mode qualification on `=` conditions.
///
/// When one argument references a field constructed from pclass `P` and
/// another is a bare keyword literal naming one of `P`'s modes, the keyword
/// is rewritten into a mode reference on `P`.
fn qualify_equal(args: &mut [Condition], ctx: &Ctx<'_>) {
    let targets: Vec<String> = args
        .iter()
        .filter_map(|arg| match arg {
            Condition::FieldReference { field, .. } => ctx.info.ctor_targets.get(field).cloned(),
            Condition::FieldReferenceField { field, member } => ctx
                .info
                .ctor_targets
                .get(field)
                .and_then(|target| ctx.index.info(target))
                .and_then(|target_info| target_info.ctor_targets.get(member).cloned()),
            _ => None,
        })
        .collect();

    for arg in args {
        let Condition::Literal {
            value: Value::Keyword(keyword),
        } = arg
        else {
            continue;
        };
        let qualified = targets.iter().find(|target| {
            ctx.index
                .info(target)
                .is_some_and(|info| info.modes.contains(keyword.as_str()))
        });
        match qualified {
            Some(target) => {
                let (pclass, mode) = (target.clone(), keyword.clone());
                *arg = Condition::ModeReference { pclass, mode };
            }
            None => warn!(
                "keyword :{} in {} of pclass {} does not name a mode; kept as a literal",
                keyword, ctx.place, ctx.pclass
            ),
        }
    }
}
