//! Flat constraint-model AST.
//!
//! An in-memory representation of a flattened constraint problem as produced
//! by an external parser: variables with finite domains, constraints with
//! typed arguments, annotations, and a solve goal.
//!
//! - [`FlatModel`] — variables, constraints and the solve goal
//! - [`Argument`] — tagged constraint argument with typed accessors
//! - [`ConstraintTag`] — normalised constraint kind
//! - [`Annotation`] — search/output annotations carried through presolve

mod annotation;
mod argument;
mod constraint;
mod model;

pub use annotation::Annotation;
pub use argument::Argument;
pub use constraint::{ConstraintTag, FlatConstraint};
pub use model::{FlatModel, FlatVariable, SolveGoal, VarId, VarKind};
