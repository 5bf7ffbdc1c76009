//! The PAMELA intermediate representation.
//!
//! The IR is the canonical tree-of-records output of the front end: a
//! `Model` mapping pclass names to `Pclass` records, plus the lvar table and
//! any state variables hoisted during validation. Ordered maps are
//! `IndexMap` throughout so that source order survives into the IR and the
//! serialized output.

pub mod condition;
pub mod model;
pub mod stmt;

pub use condition::Condition;
pub use model::{
    Access, Bounds, Dependency, Field, FieldInit, LvarDefault, LvarTable, Meta, MethodDef, Model,
    Pclass, Transition, UpperBound, Value,
};
pub use stmt::{Stmt, StmtKind};
