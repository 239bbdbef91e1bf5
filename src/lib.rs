//! # cproute
//!
//! Constraint-programming routing toolkit: a vehicle routing model with a
//! local-search stack, a flat constraint-model presolve/dispatch pipeline,
//! and symmetry-graph construction for pseudo-Boolean problems.
//!
//! ## Modules
//!
//! - [`routing`] — Vehicle routing model (index space, dimensions,
//!   disjunctions, pickup/delivery pairs, cost classes)
//! - [`search`] — First-solution heuristics, neighborhood operators,
//!   filters, metaheuristics and limits
//! - [`flat`] — Flat constraint-model AST (variables, typed arguments,
//!   constraints, annotations)
//! - [`presolve`] — Fix-point rewriting of flat models (equivalence
//!   classes, affine substitution, unreification)
//! - [`dispatch`] — Translation of flat constraints onto CP primitives
//! - [`cp`] — The CP model surface targeted by the dispatcher
//! - [`domain`] — Finite integer domains
//! - [`sat`] — Pseudo-Boolean problems and symmetry graphs
//!
//! ## Example
//!
//! ```
//! use cproute::routing::{matrix_evaluator, RoutingModel, RoutingStatus};
//!
//! let mut model = RoutingModel::with_depot(4, 1, 0);
//! model.set_cost(matrix_evaluator(vec![
//!     vec![0, 1, 2, 3],
//!     vec![1, 0, 1, 2],
//!     vec![2, 1, 0, 1],
//!     vec![3, 2, 1, 0],
//! ]));
//! model.close_model();
//! assert_eq!(model.solve(None), RoutingStatus::Success);
//! ```

pub mod cp;
pub mod dispatch;
pub mod domain;
mod error;
pub mod flat;
pub mod presolve;
pub mod routing;
pub mod sat;
pub mod search;

pub use error::{Error, Result};
