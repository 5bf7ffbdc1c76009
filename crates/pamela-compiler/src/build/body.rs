//! Method builders: `defpmethod` overloads, body statements, and the
//! slack/soft/optional/dotimes rewrites.

use super::{Builder, structure_error};
use crate::ast::{Bounds, MethodDef, Stmt, StmtKind, UpperBound};
use crate::error::CompileResult;
use crate::parser::{Form, FormKind};
use indexmap::IndexMap;

/// Keyword options absorbed by fn combinators and plant calls.
const STMT_OPTIONS: [&str; 12] = [
    "bounds",
    "label",
    "cost<=",
    "reward>=",
    "probability",
    "controllable",
    "guard",
    "enter",
    "leave",
    "min",
    "max",
    "exactly",
];

impl Builder<'_> {
    /// Lower a `:methods` vector of `defpmethod` forms.
    ///
    /// Multiple definitions of the same name coalesce into a vector of
    /// overloads, preserving source order.
    pub(crate) fn methods(
        &mut self,
        form: &Form,
    ) -> CompileResult<IndexMap<String, Vec<MethodDef>>> {
        let items = form
            .as_vector()
            .ok_or_else(|| structure_error(form, "defpclass :methods must be a vector"))?;

        let mut methods: IndexMap<String, Vec<MethodDef>> = IndexMap::new();
        for item in items {
            let (name, def) = self.defpmethod(item)?;
            methods.entry(name).or_default().push(def);
        }
        Ok(methods)
    }

    /// Lower one `(defpmethod name cond-map? [args] body? betweens…)` form.
    fn defpmethod(&mut self, form: &Form) -> CompileResult<(String, MethodDef)> {
        let items = form
            .as_list()
            .filter(|items| items.first().and_then(Form::as_symbol) == Some("defpmethod"))
            .ok_or_else(|| {
                structure_error(
                    form,
                    format!("defpclass :methods expects defpmethod forms, found {}", form.describe()),
                )
            })?;

        let name = items
            .get(1)
            .and_then(Form::as_symbol)
            .ok_or_else(|| structure_error(form, "defpmethod expects a symbol name"))?
            .to_string();

        let mut def = MethodDef {
            span: form.span,
            ..MethodDef::default()
        };

        // Optional condition-map before the argument vector
        let mut next = 2;
        let mut user_primitive = None;
        if let Some(map) = items.get(next).filter(|f| f.as_map().is_some()) {
            user_primitive = self.condition_map(&name, map, &mut def)?;
            next += 1;
        }

        let args_form = items.get(next).ok_or_else(|| {
            structure_error(form, format!("defpmethod {} expects a vector of args", name))
        })?;
        let args = args_form
            .as_vector()
            .ok_or_else(|| {
                structure_error(
                    args_form,
                    format!("defpmethod {} expects a vector of args", name),
                )
            })?
            .iter()
            .map(|arg| {
                arg.as_symbol().map(str::to_string).ok_or_else(|| {
                    structure_error(arg, format!("defpmethod {} args must be symbols", name))
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        for (idx, arg) in args.iter().enumerate() {
            if args[..idx].contains(arg) {
                return Err(structure_error(
                    args_form,
                    format!("defpmethod {} argument names must be unique", name),
                ));
            }
        }
        def.args = args;
        next += 1;

        // Body expression(s), with between statements routed to the method
        for stmt_form in &items[next..] {
            let stmt = self.stmt(stmt_form)?;
            if stmt.is_between() {
                def.betweens.push(stmt);
            } else {
                def.body.push(stmt);
            }
        }

        // A method with no body is primitive regardless of the user flag
        def.primitive = if def.body.is_empty() {
            true
        } else {
            user_primitive.unwrap_or(false)
        };

        Ok((name, def))
    }

    /// Merge a defpmethod condition-map over the defaults.
    ///
    /// Returns the user-supplied `:primitive` flag, if any.
    fn condition_map(
        &mut self,
        name: &str,
        form: &Form,
        def: &mut MethodDef,
    ) -> CompileResult<Option<bool>> {
        let entries = form.as_map().expect("checked by caller");
        let mut primitive = None;
        for (key, value) in entries {
            let key_name = key.as_keyword().ok_or_else(|| {
                structure_error(key, format!("defpmethod {} option keys must be keywords", name))
            })?;
            match key_name {
                "pre" => def.pre = self.condition(value)?,
                "post" => def.post = self.condition(value)?,
                "cost" => def.cost = self.number(value, "cost")?,
                "reward" => def.reward = self.number(value, "reward")?,
                "bounds" => def.temporal_constraints = vec![self.bounds(value)?],
                "controllable" => def.controllable = self.boolean(value, "controllable")?,
                "primitive" => primitive = Some(self.boolean(value, "primitive")?),
                "doc" => {
                    def.doc = Some(self.meta_string(value, "doc").map_err(|_| {
                        structure_error(
                            value,
                            format!(
                                "defpmethod :doc must be a string (not \"{}\")",
                                value.describe()
                            ),
                        )
                    })?)
                }
                "display-name" => {
                    def.display_name = Some(
                        value
                            .as_str()
                            .ok_or_else(|| {
                                structure_error(
                                    value,
                                    format!(
                                        "defpmethod :display-name must be a string (not \"{}\")",
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
                        format!("defpmethod option \":{}\" invalid", other),
                    ));
                }
            }
        }
        Ok(primitive)
    }

    /// Lower one body statement.
    pub(crate) fn stmt(&mut self, form: &Form) -> CompileResult<Stmt> {
        let items = form
            .as_list()
            .ok_or_else(|| {
                structure_error(form, format!("invalid statement {}", form.describe()))
            })?;
        let head = items
            .first()
            .and_then(Form::as_symbol)
            .ok_or_else(|| structure_error(form, "statement must start with a symbol"))?;

        match head {
            "sequence" => self.combinator(StmtKind::Sequence, &items[1..]),
            "parallel" => self.combinator(StmtKind::Parallel, &items[1..]),
            "choose" => self.combinator(StmtKind::Choose, &items[1..]),
            "choose-whenever" => self.combinator(StmtKind::ChooseWhenever, &items[1..]),
            "choice" => self.combinator(StmtKind::Choice, &items[1..]),
            "delay" => self.combinator(StmtKind::Delay, &items[1..]),
            "ask" | "tell" | "assert" | "maintain" | "unless" | "when" | "whenever" => {
                self.conditional(form, head, &items[1..])
            }
            "try" => self.try_stmt(&items[1..]),
            "between" | "between-starts" | "between-ends" => self.between(form, head, &items[1..]),
            "optional" | "slack-sequence" | "slack-parallel" | "soft-sequence"
            | "soft-parallel" => self.rewrite(head, &items[1..]),
            "dotimes" => self.dotimes(form, &items[1..]),
            _ => self.plant_fn(form, head, &items[1..]),
        }
    }

    /// Fn combinator: absorb options, lower remaining children as the body.
    fn combinator(&mut self, kind: StmtKind, items: &[Form]) -> CompileResult<Stmt> {
        let mut stmt = Stmt::of(kind);
        let rest = self.absorb_options(items, &mut stmt)?;
        for child in rest {
            let child = self.stmt(child)?;
            stmt.body.push(child);
        }
        Ok(stmt)
    }

    /// Conditional form: first non-option child is the condition, the rest
    /// is the body.
    fn conditional(&mut self, form: &Form, head: &str, items: &[Form]) -> CompileResult<Stmt> {
        let mut stmt = Stmt::of(StmtKind::Sequence); // placeholder kind
        let rest = self.absorb_options(items, &mut stmt)?;
        let mut rest = rest.into_iter();
        let condition_form = rest
            .next()
            .ok_or_else(|| structure_error(form, format!("{} expects a condition", head)))?;
        let condition = self.condition(condition_form)?;
        stmt.kind = match head {
            "ask" => StmtKind::Ask { condition },
            "tell" => StmtKind::Tell { condition },
            "assert" => StmtKind::Assert { condition },
            "maintain" => StmtKind::Maintain { condition },
            "unless" => StmtKind::Unless { condition },
            "when" => StmtKind::When { condition },
            "whenever" => StmtKind::Whenever { condition },
            _ => unreachable!("dispatched on head"),
        };
        for child in rest {
            let child = self.stmt(child)?;
            stmt.body.push(child);
        }
        Ok(stmt)
    }

    /// `(try body… catch catch-body…)`: the `catch` symbol switches
    /// accumulation from the body to the catch body.
    fn try_stmt(&mut self, items: &[Form]) -> CompileResult<Stmt> {
        let mut stmt = Stmt::of(StmtKind::Try { catch: None });
        let rest = self.absorb_options(items, &mut stmt)?;

        let mut catch: Option<Vec<Stmt>> = None;
        for child in rest {
            if child.as_symbol() == Some("catch") {
                if catch.is_some() {
                    return Err(structure_error(child, "try has more than one catch"));
                }
                catch = Some(Vec::new());
                continue;
            }
            let lowered = self.stmt(child)?;
            match &mut catch {
                Some(body) => body.push(lowered),
                None => stmt.body.push(lowered),
            }
        }
        stmt.kind = StmtKind::Try { catch };
        Ok(stmt)
    }

    /// `(between :from :to opts…)` and the starts/ends variants.
    fn between(&mut self, form: &Form, head: &str, items: &[Form]) -> CompileResult<Stmt> {
        let (from, to) = match items {
            [from, to, ..] => (from.as_keyword(), to.as_keyword()),
            _ => (None, None),
        };
        let (Some(from), Some(to)) = (from, to) else {
            return Err(structure_error(
                form,
                format!("{} expects two label keywords", head),
            ));
        };
        let kind = match head {
            "between" => StmtKind::Between {
                from: from.to_string(),
                to: to.to_string(),
            },
            "between-starts" => StmtKind::BetweenStarts {
                from: from.to_string(),
                to: to.to_string(),
            },
            _ => StmtKind::BetweenEnds {
                from: from.to_string(),
                to: to.to_string(),
            },
        };
        let mut stmt = Stmt::of(kind);
        let rest = self.absorb_options(&items[2..], &mut stmt)?;
        if let Some(stray) = rest.first() {
            return Err(structure_error(
                stray,
                format!("unexpected form {} in {}", stray.describe(), head),
            ));
        }
        Ok(stmt)
    }

    /// Mechanical rewrites: slack/soft sequence/parallel and optional.
    ///
    /// Options on the surface form re-attach to the rewritten root.
    fn rewrite(&mut self, head: &str, items: &[Form]) -> CompileResult<Stmt> {
        let mut opts = Stmt::of(StmtKind::Sequence);
        let rest = self.absorb_options(items, &mut opts)?;
        let body = rest
            .into_iter()
            .map(|child| self.stmt(child))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut root = match head {
            "slack-sequence" => slack_sequence(body),
            "slack-parallel" => slack_parallel(body),
            "optional" => optional(body),
            "soft-sequence" => soft_sequence(body),
            _ => soft_parallel(body),
        };
        transfer_options(&opts, &mut root);
        Ok(root)
    }

    /// `(dotimes n stmt…)` desugars to a sequence of n copies.
    fn dotimes(&mut self, form: &Form, items: &[Form]) -> CompileResult<Stmt> {
        let mut opts = Stmt::of(StmtKind::Sequence);
        let rest = self.absorb_options(items, &mut opts)?;
        let mut rest = rest.into_iter();
        let count = rest
            .next()
            .and_then(|f| match f.kind {
                FormKind::Int(n) if n >= 0 => Some(n as usize),
                _ => None,
            })
            .ok_or_else(|| {
                structure_error(form, "dotimes expects a non-negative integer count")
            })?;
        let body = rest
            .map(|child| self.stmt(child))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut repeated = Vec::with_capacity(count * body.len());
        for _ in 0..count {
            repeated.extend(body.iter().cloned());
        }
        let mut root = Stmt::with_body(StmtKind::Sequence, repeated);
        transfer_options(&opts, &mut root);
        Ok(root)
    }

    /// Plant call: `(method args…)` or `(recv.method args…)`.
    ///
    /// Bare calls target `this`; the validator resolves receivers and
    /// checks arity later.
    fn plant_fn(&mut self, form: &Form, head: &str, items: &[Form]) -> CompileResult<Stmt> {
        let (name, method) = match head.split_once('.') {
            Some((receiver, method)) => (receiver.to_string(), method.to_string()),
            None => ("this".to_string(), head.to_string()),
        };
        if name.is_empty() || method.is_empty() {
            return Err(structure_error(
                form,
                format!("invalid plant function name {}", head),
            ));
        }

        let mut stmt = Stmt::of(StmtKind::PlantFnSymbol {
            name,
            method,
            args: Vec::new(),
        });
        let rest = self.absorb_options(items, &mut stmt)?;
        let args = rest
            .into_iter()
            .map(|arg| {
                arg.as_value().ok_or_else(|| {
                    structure_error(
                        arg,
                        format!(
                            "plant function arguments must be literals or symbols (not {})",
                            arg.describe()
                        ),
                    )
                })
            })
            .collect::<CompileResult<Vec<_>>>()?;
        if let StmtKind::PlantFnSymbol { args: slot, .. } = &mut stmt.kind {
            *slot = args;
        }
        Ok(stmt)
    }

    /// Absorb keyword options into a statement; returns the non-option
    /// children in order.
    fn absorb_options<'f>(
        &mut self,
        items: &'f [Form],
        stmt: &mut Stmt,
    ) -> CompileResult<Vec<&'f Form>> {
        let mut rest = Vec::new();
        let mut iter = items.iter().peekable();
        while let Some(item) = iter.next() {
            let option = item
                .as_keyword()
                .filter(|k| STMT_OPTIONS.contains(k) && iter.peek().is_some());
            let Some(option) = option else {
                rest.push(item);
                continue;
            };
            let value = iter.next().expect("peeked above");
            match option {
                "bounds" => stmt.temporal_constraints = Some(vec![self.bounds(value)?]),
                "label" => {
                    stmt.label = Some(
                        value
                            .as_keyword()
                            .or_else(|| value.as_str())
                            .ok_or_else(|| {
                                structure_error(
                                    value,
                                    format!(
                                        ":label must be a keyword or string (not \"{}\")",
                                        value.describe()
                                    ),
                                )
                            })?
                            .to_string(),
                    )
                }
                "cost<=" => stmt.cost_le = Some(self.number(value, "cost<=")?),
                "reward>=" => stmt.reward_ge = Some(self.number(value, "reward>=")?),
                "probability" => stmt.probability = Some(self.number(value, "probability")?),
                "controllable" => stmt.controllable = Some(self.boolean(value, "controllable")?),
                "guard" => stmt.guard = Some(self.condition(value)?),
                "enter" => stmt.enter = value.as_value(),
                "leave" => stmt.leave = value.as_value(),
                "min" => stmt.min = Some(self.integer(value, "min")?),
                "max" => stmt.max = Some(self.integer(value, "max")?),
                "exactly" => stmt.exactly = Some(self.integer(value, "exactly")?),
                _ => unreachable!("option list is closed"),
            }
        }
        Ok(rest)
    }

    /// `[lower upper]` where upper may be `:infinity`.
    pub(crate) fn bounds(&self, form: &Form) -> CompileResult<Bounds> {
        let err = || {
            structure_error(
                form,
                format!(
                    ":bounds must be [lower upper] with numeric lower (not \"{}\")",
                    form.describe()
                ),
            )
        };
        let items = form.as_vector().ok_or_else(err)?;
        let [lower, upper] = items else {
            return Err(err());
        };
        let lower = lower.as_number().ok_or_else(err)?;
        let upper = match (upper.as_number(), upper.as_keyword()) {
            (Some(value), _) => UpperBound::Finite(value),
            (None, Some("infinity")) => UpperBound::Infinity,
            _ => return Err(err()),
        };
        Ok(Bounds { lower, upper })
    }

    fn number(&self, form: &Form, what: &str) -> CompileResult<f64> {
        form.as_number().ok_or_else(|| {
            structure_error(
                form,
                format!(":{} must be a number (not \"{}\")", what, form.describe()),
            )
        })
    }

    fn integer(&self, form: &Form, what: &str) -> CompileResult<i64> {
        match form.kind {
            FormKind::Int(n) => Ok(n),
            _ => Err(structure_error(
                form,
                format!(":{} must be an integer (not \"{}\")", what, form.describe()),
            )),
        }
    }

    fn boolean(&self, form: &Form, what: &str) -> CompileResult<bool> {
        match form.kind {
            FormKind::Bool(b) => Ok(b),
            _ => Err(structure_error(
                form,
                format!(":{} must be a boolean (not \"{}\")", what, form.describe()),
            )),
        }
    }
}

/// `slack-sequence(body)` → `sequence` with a default delay interposed
/// between, before, and after the original children.
fn slack_sequence(body: Vec<Stmt>) -> Stmt {
    let mut slack = Vec::with_capacity(body.len() * 2 + 1);
    slack.push(Stmt::default_delay());
    for stmt in body {
        slack.push(stmt);
        slack.push(Stmt::default_delay());
    }
    Stmt::with_body(StmtKind::Sequence, slack)
}

/// `slack-parallel(body)` → `parallel` of one slack sequence per child.
fn slack_parallel(body: Vec<Stmt>) -> Stmt {
    let branches = body
        .into_iter()
        .map(|stmt| slack_sequence(vec![stmt]))
        .collect();
    Stmt::with_body(StmtKind::Parallel, branches)
}

/// `optional(body)` → binary choose between a zero delay and the body.
fn optional(body: Vec<Stmt>) -> Stmt {
    let skip = Stmt::with_body(StmtKind::Choice, vec![Stmt::zero_delay()]);
    let take = Stmt::with_body(StmtKind::Choice, body);
    Stmt::with_body(StmtKind::Choose, vec![skip, take])
}

/// `soft-sequence(body)` → `sequence` of one optional per child.
fn soft_sequence(body: Vec<Stmt>) -> Stmt {
    let optionals = body.into_iter().map(|stmt| optional(vec![stmt])).collect();
    Stmt::with_body(StmtKind::Sequence, optionals)
}

/// `soft-parallel(body)` → `parallel` of one optional per child.
fn soft_parallel(body: Vec<Stmt>) -> Stmt {
    let optionals = body.into_iter().map(|stmt| optional(vec![stmt])).collect();
    Stmt::with_body(StmtKind::Parallel, optionals)
}

/// Re-attach surface options to a rewritten root.
fn transfer_options(from: &Stmt, to: &mut Stmt) {
    macro_rules! copy {
        ($($field:ident),*) => {
            $(if from.$field.is_some() {
                to.$field = from.$field.clone();
            })*
        };
    }
    copy!(
        temporal_constraints,
        label,
        cost_le,
        reward_ge,
        probability,
        controllable,
        guard,
        enter,
        leave,
        min,
        max,
        exactly
    );
}
