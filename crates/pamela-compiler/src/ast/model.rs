//! Model-level IR records: pclasses, fields, transitions, methods, lvars.

use super::condition::Condition;
use super::stmt::Stmt;
use crate::foundation::Span;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Literal value as it appears in source: the atom sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Keyword without its leading `:`
    Keyword(String),
    Symbol(String),
}

impl Value {
    pub fn is_keyword(&self) -> bool {
        matches!(self, Value::Keyword(_))
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self, Value::Symbol(_))
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // {:?} keeps the decimal point on round floats ("1.0", not "1")
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::Symbol(s) => write!(f, "{}", s),
        }
    }
}

/// Default of a logic variable.
///
/// `Unset` is a distinguished sentinel, not a missing value: an lvar
/// declared without a default still owns its slot in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LvarDefault {
    Unset,
    Value(Value),
}

/// Interning table for logic variables, threaded through one compile.
///
/// Interning is monotonic: the first occurrence of a name wins and later
/// occurrences are no-ops. The table starts empty, is seeded from the magic
/// sidecar, grows during IR building, and is emitted as `Model::lvars`.
#[derive(Debug, Clone, Default)]
pub struct LvarTable {
    entries: IndexMap<String, LvarDefault>,
    gensym: u32,
}

impl LvarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-if-absent. Returns true when the name was new.
    pub fn intern(&mut self, name: &str, default: LvarDefault) -> bool {
        if self.entries.contains_key(name) {
            return false;
        }
        self.entries.insert(name.to_string(), default);
        true
    }

    /// Fresh name for an anonymous lvar.
    pub fn gensym(&mut self) -> String {
        let name = format!("lvar-{}", self.gensym);
        self.gensym += 1;
        name
    }

    pub fn get(&self, name: &str) -> Option<&LvarDefault> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &IndexMap<String, LvarDefault> {
        &self.entries
    }

    pub fn into_entries(self) -> IndexMap<String, LvarDefault> {
        self.entries
    }
}

/// Upper end of a temporal bound; `Infinity` is the open upper end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpperBound {
    Finite(f64),
    Infinity,
}

/// Temporal bounds `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: UpperBound,
}

impl Bounds {
    /// The unconstrained default, `[0, ∞]`.
    pub const DEFAULT: Bounds = Bounds {
        lower: 0.0,
        upper: UpperBound::Infinity,
    };

    /// The instantaneous bound, `[0, 0]`.
    pub const ZERO: Bounds = Bounds {
        lower: 0.0,
        upper: UpperBound::Finite(0.0),
    };

    pub fn finite(lower: f64, upper: f64) -> Self {
        Bounds {
            lower,
            upper: UpperBound::Finite(upper),
        }
    }
}

/// One `[model "version"]` entry of `:meta :depends`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub model: String,
    pub version: String,
}

/// `:meta` block of a pclass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub depends: Vec<Dependency>,
}

/// Field visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    Private,
    Public,
}

/// Field initializer: the value-expr sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FieldInit {
    Literal {
        value: Value,
    },
    /// Reference to an interned logic variable
    Lvar {
        name: String,
    },
    /// Construction of another pclass as a plant
    #[serde(rename_all = "kebab-case")]
    PclassCtor {
        pclass: String,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        args: Vec<FieldInit>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        interface: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        plant_part: Option<String>,
        /// Initial mode keyword, checked against the target's modes
        #[serde(skip_serializing_if = "Option::is_none", default)]
        initial: Option<String>,
    },
    /// `(mode-of pclass :mode)`
    ModeReference {
        pclass: String,
        mode: String,
    },
    /// Bare symbol: a formal argument or sibling field
    ArgReference {
        name: String,
    },
}

/// Field record of a pclass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub access: Access,
    pub observable: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub initial: Option<FieldInit>,
}

impl Default for Field {
    fn default() -> Self {
        Field {
            access: Access::Private,
            observable: false,
            initial: None,
        }
    }
}

/// Transition record, keyed `"from:to"` in the owning pclass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pre: Option<Condition>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post: Option<Condition>,
    /// Literal number or lvar reference
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub probability: Option<FieldInit>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc: Option<String>,
}

/// One overload of a method. Overloads share a name and differ in arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub args: Vec<String>,
    pub pre: Condition,
    pub post: Condition,
    pub cost: f64,
    pub reward: f64,
    pub controllable: bool,
    #[serde(rename = "temporal-constraints")]
    pub temporal_constraints: Vec<Bounds>,
    /// True when the method has no body
    pub primitive: bool,
    #[serde(rename = "display-name", skip_serializing_if = "Option::is_none", default)]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub doc: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub body: Vec<Stmt>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub betweens: Vec<Stmt>,
    #[serde(skip)]
    pub span: Span,
}

impl Default for MethodDef {
    fn default() -> Self {
        MethodDef {
            args: Vec::new(),
            pre: Condition::literal_true(),
            post: Condition::literal_true(),
            cost: 0.0,
            reward: 0.0,
            controllable: false,
            temporal_constraints: vec![Bounds::DEFAULT],
            primitive: false,
            display_name: None,
            doc: None,
            body: Vec::new(),
            betweens: Vec::new(),
            span: Span::zero(0),
        }
    }
}

/// Pclass record: the unit of reuse in a PAMELA model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pclass {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub meta: Option<Meta>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub inherit: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub fields: IndexMap<String, Field>,
    /// Mode keyword → condition; enumerated modes map to literal-true
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub modes: IndexMap<String, Condition>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub transitions: IndexMap<String, Transition>,
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub methods: IndexMap<String, Vec<MethodDef>>,
    #[serde(skip)]
    pub span: Span,
}

impl Pclass {
    /// Arities available for a method name, in overload order.
    pub fn method_arities(&self, method: &str) -> Vec<usize> {
        self.methods
            .get(method)
            .map(|defs| defs.iter().map(|d| d.args.len()).collect())
            .unwrap_or_default()
    }
}

/// The intermediate representation of one compile.
///
/// Mirrors the canonical mapping shape: one entry per pclass, the
/// `pamela/lvars` table (present iff non-empty), and one entry per hoisted
/// state variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub pclasses: IndexMap<String, Pclass>,
    #[serde(rename = "pamela/lvars", skip_serializing_if = "IndexMap::is_empty", default)]
    pub lvars: IndexMap<String, LvarDefault>,
    #[serde(
        rename = "state-variables",
        skip_serializing_if = "IndexSet::is_empty",
        default
    )]
    pub state_variables: IndexSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lvar_interning_is_monotonic() {
        let mut table = LvarTable::new();
        assert!(table.intern("door", LvarDefault::Value(Value::Int(1))));
        assert!(!table.intern("door", LvarDefault::Value(Value::Int(2))));
        assert_eq!(table.get("door"), Some(&LvarDefault::Value(Value::Int(1))));
    }

    #[test]
    fn test_lvar_gensym_is_sequential() {
        let mut table = LvarTable::new();
        assert_eq!(table.gensym(), "lvar-0");
        assert_eq!(table.gensym(), "lvar-1");
    }

    #[test]
    fn test_default_bounds() {
        assert_eq!(Bounds::DEFAULT.lower, 0.0);
        assert_eq!(Bounds::DEFAULT.upper, UpperBound::Infinity);
        assert_eq!(Bounds::ZERO.upper, UpperBound::Finite(0.0));
    }

    #[test]
    fn test_field_defaults() {
        let field = Field::default();
        assert_eq!(field.access, Access::Private);
        assert!(!field.observable);
        assert!(field.initial.is_none());
    }

    #[test]
    fn test_method_def_defaults() {
        let def = MethodDef::default();
        assert_eq!(def.pre, Condition::literal_true());
        assert_eq!(def.post, Condition::literal_true());
        assert_eq!(def.cost, 0.0);
        assert_eq!(def.reward, 0.0);
        assert!(!def.controllable);
        assert_eq!(def.temporal_constraints, vec![Bounds::DEFAULT]);
    }

    #[test]
    fn test_method_arities() {
        let mut pclass = Pclass::default();
        pclass.methods.insert(
            "go".to_string(),
            vec![
                MethodDef::default(),
                MethodDef {
                    args: vec!["speed".to_string()],
                    ..MethodDef::default()
                },
            ],
        );
        assert_eq!(pclass.method_arities("go"), vec![0, 1]);
        assert!(pclass.method_arities("stop").is_empty());
    }

    #[test]
    fn test_model_serializes_lvars_only_when_present() {
        let model = Model::default();
        let json = serde_json::to_value(&model).expect("serialize");
        assert!(json.get("pamela/lvars").is_none());

        let mut model = Model::default();
        model
            .lvars
            .insert("door".to_string(), LvarDefault::Unset);
        let json = serde_json::to_value(&model).expect("serialize");
        assert!(json.get("pamela/lvars").is_some());
    }
}
