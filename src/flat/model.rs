//! The flat model: variables, constraints and the solve goal.

use log::warn;

use super::{Annotation, Argument, ConstraintTag, FlatConstraint};
use crate::domain::Domain;
use crate::error::{Error, Result};

/// Index of a variable in the flat model's arena.
pub type VarId = usize;

/// The kind of a flat variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Integer variable.
    Int,
    /// Boolean variable (domain `{0, 1}`).
    Bool,
    /// Set variable. Accepted for parser completeness; unsupported at
    /// dispatch time.
    Set,
}

/// A flat integer or boolean variable.
#[derive(Debug, Clone)]
pub struct FlatVariable {
    /// Parser-given name.
    pub name: String,
    /// Current domain. Presolve may tighten it.
    pub domain: Domain,
    /// Variable kind.
    pub kind: VarKind,
    /// `true` for compiler-introduced variables.
    pub introduced: bool,
    /// Alias pointer set by presolve when this variable collapsed onto
    /// another. All references must be resolved through alias chains.
    pub alias: Option<VarId>,
}

/// The solve goal of the flat model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveGoal {
    /// Find any solution.
    Satisfy,
    /// Minimise the given variable.
    Minimize(VarId),
    /// Maximise the given variable.
    Maximize(VarId),
}

/// An in-memory flat constraint problem.
///
/// Append-only during parse; during presolve, variables may gain alias
/// pointers, constraints may be marked trivially true or have their
/// arguments rewritten.
///
/// # Examples
///
/// ```
/// use cproute::flat::{Argument, ConstraintTag, FlatConstraint, FlatModel};
///
/// let mut model = FlatModel::new("example");
/// let x = model.new_int_var("x", 0, 10, false);
/// let y = model.new_int_var("y", 0, 10, false);
/// model.add_constraint(FlatConstraint::new(
///     ConstraintTag::IntEq,
///     vec![Argument::Var(x), Argument::Var(y)],
/// ));
/// assert_eq!(model.constraints.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct FlatModel {
    /// Model name.
    pub name: String,
    /// Variable arena.
    pub variables: Vec<FlatVariable>,
    /// Constraints in parse order.
    pub constraints: Vec<FlatConstraint>,
    /// Solve goal.
    pub goal: SolveGoal,
    /// Annotations attached to the solve item.
    pub solve_annotations: Vec<Annotation>,
}

impl FlatModel {
    /// Creates an empty model with a `Satisfy` goal.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            goal: SolveGoal::Satisfy,
            solve_annotations: Vec::new(),
        }
    }

    /// Adds an integer variable with domain `[lo, hi]`.
    pub fn new_int_var(&mut self, name: impl Into<String>, lo: i64, hi: i64, introduced: bool) -> VarId {
        self.push_variable(name.into(), Domain::interval(lo, hi), VarKind::Int, introduced)
    }

    /// Adds an integer variable with an explicit value domain.
    pub fn new_int_var_with_domain(
        &mut self,
        name: impl Into<String>,
        domain: Domain,
        introduced: bool,
    ) -> VarId {
        self.push_variable(name.into(), domain, VarKind::Int, introduced)
    }

    /// Adds a boolean variable (domain `{0, 1}`).
    pub fn new_bool_var(&mut self, name: impl Into<String>, introduced: bool) -> VarId {
        self.push_variable(name.into(), Domain::boolean(), VarKind::Bool, introduced)
    }

    /// Adds a set variable.
    ///
    /// Set variables exist for parser completeness only; any set variable
    /// reaching dispatch fails with
    /// [`Error::UnsupportedSetVariable`](crate::Error::UnsupportedSetVariable).
    pub fn new_set_var(&mut self, name: impl Into<String>, introduced: bool) -> VarId {
        self.push_variable(name.into(), Domain::interval(0, 0), VarKind::Set, introduced)
    }

    fn push_variable(
        &mut self,
        name: String,
        domain: Domain,
        kind: VarKind,
        introduced: bool,
    ) -> VarId {
        let id = self.variables.len();
        self.variables.push(FlatVariable {
            name,
            domain,
            kind,
            introduced,
            alias: None,
        });
        id
    }

    /// Appends a constraint, enforcing that a target variable is defined by
    /// at most one constraint. A duplicate target link is dropped with a
    /// warning.
    pub fn add_constraint(&mut self, mut constraint: FlatConstraint) {
        if let Some(target) = constraint.target {
            let already_defined = self
                .constraints
                .iter()
                .any(|ct| ct.target == Some(target) && !ct.trivially_true);
            if already_defined {
                warn!(
                    "variable {} already has a defining constraint, dropping target link of {}",
                    self.variables[target].name,
                    constraint.tag.name()
                );
                constraint.target = None;
            }
        }
        self.constraints.push(constraint);
    }

    /// Sets a `Satisfy` goal with annotations.
    pub fn satisfy(&mut self, annotations: Vec<Annotation>) {
        self.goal = SolveGoal::Satisfy;
        self.solve_annotations = annotations;
    }

    /// Sets a `Minimize` goal with annotations.
    pub fn minimize(&mut self, objective: VarId, annotations: Vec<Annotation>) {
        self.goal = SolveGoal::Minimize(objective);
        self.solve_annotations = annotations;
    }

    /// Sets a `Maximize` goal with annotations.
    pub fn maximize(&mut self, objective: VarId, annotations: Vec<Annotation>) {
        self.goal = SolveGoal::Maximize(objective);
        self.solve_annotations = annotations;
    }

    /// Resolves a variable through its alias chain to the representative.
    ///
    /// Chains terminate by construction (an alias is only ever installed
    /// from a live variable onto its representative); resolution is
    /// idempotent.
    pub fn resolve(&self, mut var: VarId) -> VarId {
        let mut steps = 0;
        while let Some(alias) = self.variables[var].alias {
            var = alias;
            steps += 1;
            debug_assert!(steps <= self.variables.len(), "alias cycle");
        }
        var
    }

    /// Marks `from` as an alias of `to`, intersecting domains.
    ///
    /// Returns an error if the two variables are already the same
    /// representative (a variable never aliases itself).
    pub fn set_alias(&mut self, from: VarId, to: VarId) -> Result<()> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        if from == to {
            return Err(Error::TypeError(format!(
                "variable {} would alias itself",
                self.variables[from].name
            )));
        }
        let from_domain = self.variables[from].domain.clone();
        self.variables[to].domain.intersect(&from_domain);
        self.variables[from].alias = Some(to);
        Ok(())
    }

    /// The domain of a variable, resolved through aliases.
    pub fn domain(&self, var: VarId) -> &Domain {
        &self.variables[self.resolve(var)].domain
    }

    /// Mutable domain access, resolved through aliases.
    pub fn domain_mut(&mut self, var: VarId) -> &mut Domain {
        let var = self.resolve(var);
        &mut self.variables[var].domain
    }

    /// Returns `true` if the argument is fixed to a known value: either a
    /// constant or a variable with a singleton domain.
    pub fn arg_is_fixed(&self, arg: &Argument) -> bool {
        match arg {
            Argument::Int(_) => true,
            Argument::Var(id) => self.domain(*id).is_fixed(),
            _ => false,
        }
    }

    /// The fixed value of an argument, if any.
    pub fn arg_value(&self, arg: &Argument) -> Option<i64> {
        match arg {
            Argument::Int(value) => Some(*value),
            Argument::Var(id) => self.domain(*id).value(),
            _ => None,
        }
    }

    /// Number of constraints not marked trivially true.
    pub fn live_constraints(&self) -> usize {
        self.constraints
            .iter()
            .filter(|ct| !ct.trivially_true)
            .count()
    }

    /// Returns `true` if any live constraint references a set variable.
    pub fn uses_set_variables(&self) -> bool {
        self.constraints
            .iter()
            .filter(|ct| !ct.trivially_true)
            .flat_map(|ct| ct.args.iter())
            .any(|arg| match arg {
                Argument::Var(id) => self.variables[self.resolve(*id)].kind == VarKind::Set,
                Argument::VarArray(ids) => ids
                    .iter()
                    .any(|id| self.variables[self.resolve(*id)].kind == VarKind::Set),
                _ => false,
            })
    }

    /// Finds the constraint defining `target`, if any.
    pub fn defining_constraint(&self, target: VarId) -> Option<usize> {
        self.constraints
            .iter()
            .position(|ct| ct.target == Some(target) && !ct.trivially_true)
    }

    /// Marks the tag of constraint `index` as `true_constraint` and flags it
    /// as trivially true.
    pub fn eliminate_constraint(&mut self, index: usize) {
        let ct = &mut self.constraints[index];
        ct.tag = ConstraintTag::TrueConstraint;
        ct.mark_trivially_true();
    }
}
