//! Method body statements.
//!
//! A `Stmt` is one behavior-tree node: a kind plus the optional decorations
//! shared across node kinds (bounds, label, cost/reward caps, probability,
//! choose/choice options). Children live in `body`, except `try` catch
//! bodies and method-level `between` statements which have their own slots.
//!
//! The slack/soft/optional surface forms and `dotimes` never reach this
//! type: the IR builder desugars them into `sequence`/`parallel`/`choose`
//! trees before construction.

use super::condition::Condition;
use super::model::{Bounds, Value};
use serde::{Deserialize, Serialize};

/// One body statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    #[serde(flatten)]
    pub kind: StmtKind,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub body: Vec<Stmt>,
    #[serde(
        rename = "temporal-constraints",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub temporal_constraints: Option<Vec<Bounds>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub label: Option<String>,
    #[serde(rename = "cost<=", skip_serializing_if = "Option::is_none", default)]
    pub cost_le: Option<f64>,
    #[serde(rename = "reward>=", skip_serializing_if = "Option::is_none", default)]
    pub reward_ge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub probability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub controllable: Option<bool>,
    /// Guard condition on a `choice`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub guard: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub enter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub leave: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exactly: Option<i64>,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StmtKind {
    Sequence,
    Parallel,
    Choose,
    ChooseWhenever,
    Choice,
    Delay,
    Ask { condition: Condition },
    Tell { condition: Condition },
    Assert { condition: Condition },
    Maintain { condition: Condition },
    Unless { condition: Condition },
    When { condition: Condition },
    Whenever { condition: Condition },
    Try {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        catch: Option<Vec<Stmt>>,
    },
    Between { from: String, to: String },
    BetweenStarts { from: String, to: String },
    BetweenEnds { from: String, to: String },
    /// Plant call before receiver resolution
    PlantFnSymbol {
        name: String,
        method: String,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        args: Vec<Value>,
    },
    /// Plant call whose receiver resolved to a ctor-initialized field
    PlantFnField {
        field: String,
        method: String,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        args: Vec<Value>,
    },
}

impl Stmt {
    /// Bare statement of a kind, no body and no decorations.
    pub fn of(kind: StmtKind) -> Self {
        Stmt {
            kind,
            body: Vec::new(),
            temporal_constraints: None,
            label: None,
            cost_le: None,
            reward_ge: None,
            probability: None,
            controllable: None,
            guard: None,
            enter: None,
            leave: None,
            min: None,
            max: None,
            exactly: None,
        }
    }

    /// Statement of a kind with the given children.
    pub fn with_body(kind: StmtKind, body: Vec<Stmt>) -> Self {
        let mut stmt = Stmt::of(kind);
        stmt.body = body;
        stmt
    }

    /// A `(delay)` with the unconstrained default bounds.
    pub fn default_delay() -> Self {
        let mut stmt = Stmt::of(StmtKind::Delay);
        stmt.temporal_constraints = Some(vec![Bounds::DEFAULT]);
        stmt
    }

    /// A `(delay)` with zero bounds, used by the `optional` rewrite.
    pub fn zero_delay() -> Self {
        let mut stmt = Stmt::of(StmtKind::Delay);
        stmt.temporal_constraints = Some(vec![Bounds::ZERO]);
        stmt
    }

    /// True when this is a `between`/`between-starts`/`between-ends`
    /// statement, which belongs to the enclosing method rather than a body.
    pub fn is_between(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Between { .. } | StmtKind::BetweenStarts { .. } | StmtKind::BetweenEnds { .. }
        )
    }
}
