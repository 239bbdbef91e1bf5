//! Linear pseudo-Boolean problems and their symmetry graphs.
//!
//! - [`LinearBooleanProblem`] — literals, linear constraints, objective
//! - [`generate_symmetry_graph`] — a labelled graph whose automorphism
//!   group encodes the problem's symmetries
//! - [`find_symmetries`] — runs a pluggable symmetry finder and restricts
//!   its generators to the literal nodes

mod problem;
mod symmetry;

pub use problem::{
    CanonicalBooleanLinearProblem, LinearBooleanProblem, LinearConstraint, LinearObjective,
    LinearTerm, Literal, ProblemType,
};
pub use symmetry::{
    find_symmetries, generate_symmetry_graph, SparsePermutation, SymmetryFinder, SymmetryGraph,
};
