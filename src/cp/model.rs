//! CP model: variables, primitive constraints, brute-force checking.

use crate::domain::Domain;
use crate::error::{Error, Result};

/// Index of a variable in the CP model.
pub type CpVarId = usize;

/// Relation of a scalar-product constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearRelation {
    /// `Σ c_i · x_i = rhs`
    Eq,
    /// `Σ c_i · x_i ≤ rhs`
    Le,
    /// `Σ c_i · x_i ≥ rhs`
    Ge,
    /// `Σ c_i · x_i ≠ rhs`
    Ne,
}

/// A primitive constraint posted on the CP model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CpConstraint {
    /// `x = y`
    Eq(CpVarId, CpVarId),
    /// `x = k`
    EqConst(CpVarId, i64),
    /// `x ≠ y`
    Ne(CpVarId, CpVarId),
    /// `x ≠ k`
    NeConst(CpVarId, i64),
    /// `x < y`
    Lt(CpVarId, CpVarId),
    /// `x ≤ y`
    Le(CpVarId, CpVarId),
    /// `x ≤ k`
    LeConst(CpVarId, i64),
    /// `x ≥ k`
    GeConst(CpVarId, i64),
    /// `Σ coefficients · vars R rhs`
    ScalProd {
        coefficients: Vec<i64>,
        vars: Vec<CpVarId>,
        relation: LinearRelation,
        rhs: i64,
    },
    /// `target = values[index]` with a 0-based index variable.
    ElementEq {
        values: Vec<i64>,
        index: CpVarId,
        target: CpVarId,
    },
    /// All variables take pairwise distinct values.
    AllDifferent(Vec<CpVarId>),
    /// All variables take pairwise distinct values, 0 excepted.
    AllDifferentExcept0(Vec<CpVarId>),
    /// `target = min(vars)` over booleans (conjunction).
    BoolAndEq(Vec<CpVarId>, CpVarId),
    /// `target = max(vars)` over booleans (disjunction).
    BoolOrEq(Vec<CpVarId>, CpVarId),
    /// Always false; posted when a constant form is violated.
    False,
}

/// Optimisation direction over one variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Minimise the variable.
    Minimize(CpVarId),
    /// Maximise the variable.
    Maximize(CpVarId),
}

/// A constraint-programming model: variables over finite domains and posted
/// primitive constraints.
///
/// # Examples
///
/// ```
/// use cproute::cp::{CpConstraint, CpModel};
///
/// let mut model = CpModel::new("m");
/// let x = model.new_var("x", 0, 2);
/// let y = model.new_var("y", 0, 2);
/// model.post(CpConstraint::Lt(x, y));
/// let solutions = model.enumerate_solutions(100);
/// assert_eq!(solutions.len(), 3); // (0,1), (0,2), (1,2)
/// ```
#[derive(Debug, Clone, Default)]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Variable names, parallel to `domains`.
    pub names: Vec<String>,
    /// Variable domains.
    pub domains: Vec<Domain>,
    /// Posted constraints.
    pub constraints: Vec<CpConstraint>,
    /// Optional objective.
    pub objective: Option<Objective>,
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a variable with domain `[lo, hi]`.
    pub fn new_var(&mut self, name: impl Into<String>, lo: i64, hi: i64) -> CpVarId {
        self.new_var_with_domain(name, Domain::interval(lo, hi))
    }

    /// Adds a variable with an explicit domain.
    pub fn new_var_with_domain(&mut self, name: impl Into<String>, domain: Domain) -> CpVarId {
        let id = self.domains.len();
        self.names.push(name.into());
        self.domains.push(domain);
        id
    }

    /// Posts a constraint.
    pub fn post(&mut self, constraint: CpConstraint) {
        self.constraints.push(constraint);
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Checks that every referenced variable exists.
    pub fn validate(&self) -> Result<()> {
        let check = |id: CpVarId| -> Result<()> {
            if id >= self.domains.len() {
                return Err(Error::InvalidIndex(id as i64));
            }
            Ok(())
        };
        for ct in &self.constraints {
            match ct {
                CpConstraint::Eq(a, b)
                | CpConstraint::Ne(a, b)
                | CpConstraint::Lt(a, b)
                | CpConstraint::Le(a, b) => {
                    check(*a)?;
                    check(*b)?;
                }
                CpConstraint::EqConst(a, _)
                | CpConstraint::NeConst(a, _)
                | CpConstraint::LeConst(a, _)
                | CpConstraint::GeConst(a, _) => check(*a)?,
                CpConstraint::ScalProd { vars, coefficients, .. } => {
                    if vars.len() != coefficients.len() {
                        return Err(Error::TypeError(
                            "scalar product arity mismatch".to_string(),
                        ));
                    }
                    for &v in vars {
                        check(v)?;
                    }
                }
                CpConstraint::ElementEq { index, target, .. } => {
                    check(*index)?;
                    check(*target)?;
                }
                CpConstraint::AllDifferent(vars)
                | CpConstraint::AllDifferentExcept0(vars) => {
                    for &v in vars {
                        check(v)?;
                    }
                }
                CpConstraint::BoolAndEq(vars, target) | CpConstraint::BoolOrEq(vars, target) => {
                    for &v in vars {
                        check(v)?;
                    }
                    check(*target)?;
                }
                CpConstraint::False => {}
            }
        }
        Ok(())
    }

    /// Evaluates one constraint under a total assignment.
    pub fn constraint_holds(constraint: &CpConstraint, values: &[i64]) -> bool {
        match constraint {
            CpConstraint::Eq(a, b) => values[*a] == values[*b],
            CpConstraint::EqConst(a, k) => values[*a] == *k,
            CpConstraint::Ne(a, b) => values[*a] != values[*b],
            CpConstraint::NeConst(a, k) => values[*a] != *k,
            CpConstraint::Lt(a, b) => values[*a] < values[*b],
            CpConstraint::Le(a, b) => values[*a] <= values[*b],
            CpConstraint::LeConst(a, k) => values[*a] <= *k,
            CpConstraint::GeConst(a, k) => values[*a] >= *k,
            CpConstraint::ScalProd {
                coefficients,
                vars,
                relation,
                rhs,
            } => {
                let sum: i64 = coefficients
                    .iter()
                    .zip(vars.iter())
                    .map(|(c, v)| c * values[*v])
                    .sum();
                match relation {
                    LinearRelation::Eq => sum == *rhs,
                    LinearRelation::Le => sum <= *rhs,
                    LinearRelation::Ge => sum >= *rhs,
                    LinearRelation::Ne => sum != *rhs,
                }
            }
            CpConstraint::ElementEq {
                values: array,
                index,
                target,
            } => {
                let i = values[*index];
                i >= 0 && (i as usize) < array.len() && array[i as usize] == values[*target]
            }
            CpConstraint::AllDifferent(vars) => {
                let mut seen = std::collections::HashSet::new();
                vars.iter().all(|&v| seen.insert(values[v]))
            }
            CpConstraint::AllDifferentExcept0(vars) => {
                let mut seen = std::collections::HashSet::new();
                vars.iter()
                    .all(|&v| values[v] == 0 || seen.insert(values[v]))
            }
            CpConstraint::BoolAndEq(vars, target) => {
                let conjunction = vars.iter().all(|&v| values[v] != 0) as i64;
                values[*target] == conjunction
            }
            CpConstraint::BoolOrEq(vars, target) => {
                let disjunction = vars.iter().any(|&v| values[v] != 0) as i64;
                values[*target] == disjunction
            }
            CpConstraint::False => false,
        }
    }

    /// Returns `true` if the total assignment satisfies every constraint.
    pub fn check(&self, values: &[i64]) -> bool {
        self.constraints
            .iter()
            .all(|ct| Self::constraint_holds(ct, values))
    }

    /// Enumerates all satisfying total assignments, up to `limit`.
    ///
    /// Exponential; intended for tests on models with a handful of small
    /// domains, standing in for the external engine.
    pub fn enumerate_solutions(&self, limit: usize) -> Vec<Vec<i64>> {
        let mut solutions = Vec::new();
        let mut values = vec![0; self.domains.len()];
        self.enumerate_recursive(0, &mut values, limit, &mut solutions);
        solutions
    }

    fn enumerate_recursive(
        &self,
        var: usize,
        values: &mut Vec<i64>,
        limit: usize,
        solutions: &mut Vec<Vec<i64>>,
    ) {
        if solutions.len() >= limit {
            return;
        }
        if var == self.domains.len() {
            if self.check(values) {
                solutions.push(values.clone());
            }
            return;
        }
        let candidates: Vec<i64> = self.domains[var].iter().collect();
        for value in candidates {
            values[var] = value;
            self.enumerate_recursive(var + 1, values, limit, solutions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_lt() {
        let mut model = CpModel::new("m");
        let x = model.new_var("x", 0, 2);
        let y = model.new_var("y", 0, 2);
        model.post(CpConstraint::Lt(x, y));
        let solutions = model.enumerate_solutions(100);
        assert_eq!(solutions.len(), 3);
        for sol in solutions {
            assert!(sol[x] < sol[y]);
        }
    }

    #[test]
    fn test_false_constraint() {
        let mut model = CpModel::new("m");
        model.new_var("x", 0, 1);
        model.post(CpConstraint::False);
        assert!(model.enumerate_solutions(10).is_empty());
    }

    #[test]
    fn test_scal_prod() {
        let mut model = CpModel::new("m");
        let x = model.new_var("x", 0, 3);
        let y = model.new_var("y", 0, 3);
        model.post(CpConstraint::ScalProd {
            coefficients: vec![1, 2],
            vars: vec![x, y],
            relation: LinearRelation::Eq,
            rhs: 4,
        });
        let solutions = model.enumerate_solutions(100);
        // (0,2), (2,1)
        assert_eq!(solutions.len(), 2);
    }

    #[test]
    fn test_element() {
        let mut model = CpModel::new("m");
        let index = model.new_var("i", 0, 2);
        let target = model.new_var("t", 0, 100);
        model.post(CpConstraint::ElementEq {
            values: vec![10, 20, 30],
            index,
            target,
        });
        let solutions = model.enumerate_solutions(1000);
        assert_eq!(solutions.len(), 3);
        assert!(solutions.iter().any(|s| s[index] == 1 && s[target] == 20));
    }

    #[test]
    fn test_all_different() {
        let mut model = CpModel::new("m");
        let vars: Vec<_> = (0..3).map(|i| model.new_var(format!("v{i}"), 0, 2)).collect();
        model.post(CpConstraint::AllDifferent(vars));
        assert_eq!(model.enumerate_solutions(100).len(), 6);
    }

    #[test]
    fn test_bool_and_or() {
        let mut model = CpModel::new("m");
        let a = model.new_var("a", 0, 1);
        let b = model.new_var("b", 0, 1);
        let t = model.new_var("t", 0, 1);
        model.post(CpConstraint::BoolAndEq(vec![a, b], t));
        for sol in model.enumerate_solutions(100) {
            assert_eq!(sol[t], (sol[a] == 1 && sol[b] == 1) as i64);
        }
    }

    #[test]
    fn test_validate_arity() {
        let mut model = CpModel::new("m");
        let x = model.new_var("x", 0, 1);
        model.post(CpConstraint::ScalProd {
            coefficients: vec![1, 2],
            vars: vec![x],
            relation: LinearRelation::Eq,
            rhs: 0,
        });
        assert!(model.validate().is_err());
    }
}
