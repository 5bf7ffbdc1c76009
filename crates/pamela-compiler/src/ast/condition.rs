//! Condition expressions: the tagged sum used by modes, transitions, and
//! method pre/post conditions.
//!
//! The grammar only ever produces literals and the logical connectives;
//! bare symbols and keywords arrive as `Literal` values. The validator
//! rewrites those into the typed reference variants (`FieldReference`,
//! `ModeReference`, `ArgReference`, ...) during disambiguation, and nothing
//! else is allowed to construct them from source.

use super::model::Value;
use serde::{Deserialize, Serialize};

/// Condition sum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Condition {
    Literal {
        value: Value,
    },
    And {
        args: Vec<Condition>,
    },
    Or {
        args: Vec<Condition>,
    },
    Not {
        args: Vec<Condition>,
    },
    Implies {
        args: Vec<Condition>,
    },
    Equal {
        args: Vec<Condition>,
    },
    /// Field of the enclosing pclass (`pclass` is `this`)
    FieldReference {
        pclass: String,
        field: String,
    },
    /// Qualified reference to a field of a ctor-initialized field's pclass
    FieldReferenceField {
        field: String,
        member: String,
    },
    /// Qualified reference to a mode of a ctor-initialized field's pclass
    FieldReferenceMode {
        field: String,
        mode: String,
    },
    ModeReference {
        pclass: String,
        mode: String,
    },
    /// Formal argument of the enclosing pclass
    ArgReference {
        name: String,
    },
    /// Formal argument of the enclosing method
    MethodArgReference {
        name: String,
    },
    /// Free identifier hoisted to the top-level IR
    StateVariable {
        name: String,
    },
}

impl Condition {
    pub fn literal(value: Value) -> Self {
        Condition::Literal { value }
    }

    pub fn literal_true() -> Self {
        Condition::literal(Value::Bool(true))
    }

    pub fn literal_false() -> Self {
        Condition::literal(Value::Bool(false))
    }

    pub fn is_literal_true(&self) -> bool {
        matches!(
            self,
            Condition::Literal {
                value: Value::Bool(true)
            }
        )
    }

    /// True once no `Literal` symbol remains anywhere in the tree, i.e.
    /// the validator has disambiguated every bare identifier.
    pub fn is_resolved(&self) -> bool {
        match self {
            Condition::Literal { value } => !value.is_symbol(),
            Condition::And { args }
            | Condition::Or { args }
            | Condition::Not { args }
            | Condition::Implies { args }
            | Condition::Equal { args } => args.iter().all(Condition::is_resolved),
            _ => true,
        }
    }
}
