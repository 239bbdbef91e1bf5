//! Fix-point presolver for the flat model.
//!
//! Iterates a set of rewrite rules over every constraint until no rule
//! fires. Each rule either eliminates a constraint, rewrites it into a
//! simpler form, or tightens a variable domain, so the loop terminates.
//! Discovered variable equivalences are kept in a union-find and applied to
//! the whole model between passes.

mod union_find;

pub use union_find::UnionFind;

use std::collections::HashMap;

use log::{debug, warn};

use crate::flat::{Annotation, Argument, ConstraintTag, FlatModel, VarId};

/// A linear mapping onto one variable: `var * coefficient + offset`.
#[derive(Debug, Clone, Copy)]
pub struct AffineMapping {
    /// The base variable.
    pub var: VarId,
    /// Multiplier.
    pub coefficient: i64,
    /// Additive offset.
    pub offset: i64,
}

/// The presolver. Holds the equivalence classes and the affine map
/// accumulated across passes.
///
/// # Examples
///
/// ```
/// use cproute::flat::{Argument, ConstraintTag, FlatConstraint, FlatModel};
/// use cproute::presolve::Presolver;
///
/// let mut model = FlatModel::new("m");
/// let x = model.new_int_var("x", 0, 10, false);
/// model.add_constraint(FlatConstraint::new(
///     ConstraintTag::IntEq,
///     vec![Argument::Var(x), Argument::Int(4)],
/// ));
/// let mut presolver = Presolver::new();
/// assert!(presolver.run(&mut model));
/// assert_eq!(model.domain(x).value(), Some(4));
/// assert_eq!(model.live_constraints(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Presolver {
    affine_map: HashMap<VarId, AffineMapping>,
}

impl Presolver {
    /// Creates an empty presolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies all rules to the model until exhaustion.
    ///
    /// Returns `true` iff some transformation was applied. Afterwards the
    /// model may contain unused variables and constraints marked trivially
    /// true; no further rule is applicable.
    pub fn run(&mut self, model: &mut FlatModel) -> bool {
        let mut modified = false;
        loop {
            let mut union = UnionFind::new(model.variables.len());
            let mut changed = false;
            for index in 0..model.constraints.len() {
                if model.constraints[index].trivially_true {
                    continue;
                }
                changed |= self.presolve_one_constraint(model, index, &mut union);
            }
            changed |= Self::substitute_everywhere(model, &mut union);
            if !changed {
                break;
            }
            modified = true;
        }
        debug!(
            "presolve left {} live constraints of {}",
            model.live_constraints(),
            model.constraints.len()
        );
        modified
    }

    /// Strips target links the CP dispatcher prefers to post as plain
    /// relations: reified constraints and boolean array aggregates.
    pub fn clean_up_model_for_cp_solver(&self, model: &mut FlatModel) {
        for ct in &mut model.constraints {
            if ct.target.is_none() {
                continue;
            }
            let strip = ct.tag.unreified().is_some()
                || matches!(
                    ct.tag,
                    ConstraintTag::ArrayBoolAnd | ConstraintTag::ArrayBoolOr
                );
            if strip {
                ct.target = None;
            }
        }
    }

    fn presolve_one_constraint(
        &mut self,
        model: &mut FlatModel,
        index: usize,
        union: &mut UnionFind,
    ) -> bool {
        use ConstraintTag::*;
        let tag = model.constraints[index].tag;
        match tag {
            Bool2Int => Self::presolve_bool2int(model, index, union),
            IntEq | BoolEq => Self::presolve_int_eq(model, index, union),
            IntNe | BoolNe => Self::presolve_int_ne(model, index),
            IntLt | IntLe | IntGt | IntGe | BoolLt | BoolLe | BoolGt | BoolGe => {
                Self::presolve_inequality(model, index)
            }
            SetIn => Self::presolve_set_in(model, index),
            ArrayBoolAnd => Self::presolve_array_bool_and(model, index),
            ArrayBoolOr => Self::presolve_array_bool_or(model, index),
            BoolEqReif | BoolNeReif => Self::presolve_bool_eq_ne_reif(model, index),
            ArrayIntElement | ArrayBoolElement => {
                Self::presolve_array_int_element(model, index)
                    || self.presolve_simplify_element(model, index)
            }
            IntDiv => Self::presolve_int_div(model, index),
            IntTimes => Self::presolve_int_times(model, index),
            IntLinGt | IntLinLt => Self::presolve_strict_linear(model, index),
            IntLinEq => {
                Self::presolve_linear(model, index)
                    || self.presolve_store_mapping(model, index)
                    || Self::presolve_positive_linear(model, index)
            }
            IntLinLe | IntLinGe | IntLinNe => {
                Self::presolve_linear(model, index) || Self::presolve_positive_linear(model, index)
            }
            tag if tag.unreified().is_some() => Self::unreify(model, index),
            _ => false,
        }
    }

    // bool2int(b, x): b and x take the same value, the constraint is pure
    // glue.
    fn presolve_bool2int(model: &mut FlatModel, index: usize, union: &mut UnionFind) -> bool {
        let (Ok(b), Ok(x)) = (
            model.constraints[index].arg(0).var(),
            model.constraints[index].arg(1).var(),
        ) else {
            return false;
        };
        union.union(model.resolve(b), model.resolve(x));
        model.eliminate_constraint(index);
        true
    }

    // int_eq(x, y): both variables -> equivalence; one constant -> domain
    // assignment. Constant/constant forms are left for dispatch to check.
    fn presolve_int_eq(model: &mut FlatModel, index: usize, union: &mut UnionFind) -> bool {
        let left = model.constraints[index].arg(0).clone();
        let right = model.constraints[index].arg(1).clone();
        match (&left, &right) {
            (Argument::Var(x), Argument::Var(y)) => {
                union.union(model.resolve(*x), model.resolve(*y));
                model.eliminate_constraint(index);
                true
            }
            (Argument::Var(x), Argument::Int(k)) | (Argument::Int(k), Argument::Var(x)) => {
                model.domain_mut(*x).fix(*k);
                model.eliminate_constraint(index);
                true
            }
            _ => false,
        }
    }

    // int_ne with one side constant removes the value from the other side.
    fn presolve_int_ne(model: &mut FlatModel, index: usize) -> bool {
        let left = model.constraints[index].arg(0).clone();
        let right = model.constraints[index].arg(1).clone();
        match (&left, &right) {
            (Argument::Var(x), Argument::Int(k)) | (Argument::Int(k), Argument::Var(x)) => {
                model.domain_mut(*x).remove_value(*k);
                model.eliminate_constraint(index);
                true
            }
            _ => false,
        }
    }

    // Inequalities with one side constant tighten a bound.
    fn presolve_inequality(model: &mut FlatModel, index: usize) -> bool {
        use ConstraintTag::*;
        let tag = model.constraints[index].tag;
        let left = model.constraints[index].arg(0).clone();
        let right = model.constraints[index].arg(1).clone();
        match (&left, &right) {
            (Argument::Var(x), Argument::Int(k)) => {
                let domain = model.domain_mut(*x);
                match tag {
                    IntLt | BoolLt => domain.set_max(k - 1),
                    IntLe | BoolLe => domain.set_max(*k),
                    IntGt | BoolGt => domain.set_min(k + 1),
                    IntGe | BoolGe => domain.set_min(*k),
                    _ => unreachable!(),
                }
                model.eliminate_constraint(index);
                true
            }
            (Argument::Int(k), Argument::Var(x)) => {
                let domain = model.domain_mut(*x);
                match tag {
                    IntLt | BoolLt => domain.set_min(k + 1),
                    IntLe | BoolLe => domain.set_min(*k),
                    IntGt | BoolGt => domain.set_max(k - 1),
                    IntGe | BoolGe => domain.set_max(*k),
                    _ => unreachable!(),
                }
                model.eliminate_constraint(index);
                true
            }
            _ => false,
        }
    }

    // set_in(x, S) with a literal set intersects the domain.
    fn presolve_set_in(model: &mut FlatModel, index: usize) -> bool {
        let Ok(x) = model.constraints[index].arg(0).var() else {
            return false;
        };
        let Ok(set) = model.constraints[index].arg(1).set_domain() else {
            return false;
        };
        model.domain_mut(x).intersect(&set);
        model.eliminate_constraint(index);
        true
    }

    // array_bool_and(vars, target): all operands fixed -> fix the target.
    fn presolve_array_bool_and(model: &mut FlatModel, index: usize) -> bool {
        let Ok(vars) = model.constraints[index].arg(0).vars().map(<[_]>::to_vec) else {
            return false;
        };
        if !vars.iter().all(|&v| model.domain(v).is_fixed()) {
            return false;
        }
        let value = vars
            .iter()
            .all(|&v| model.domain(v).value() == Some(1)) as i64;
        let target = model.constraints[index].arg(1).clone();
        if let Argument::Var(t) = target {
            model.domain_mut(t).fix(value);
            model.eliminate_constraint(index);
            return true;
        }
        false
    }

    // array_bool_or(vars, target): all operands fixed -> fix the target.
    fn presolve_array_bool_or(model: &mut FlatModel, index: usize) -> bool {
        let Ok(vars) = model.constraints[index].arg(0).vars().map(<[_]>::to_vec) else {
            return false;
        };
        if !vars.iter().all(|&v| model.domain(v).is_fixed()) {
            return false;
        }
        let value = vars
            .iter()
            .any(|&v| model.domain(v).value() == Some(1)) as i64;
        let target = model.constraints[index].arg(1).clone();
        if let Argument::Var(t) = target {
            model.domain_mut(t).fix(value);
            model.eliminate_constraint(index);
            return true;
        }
        false
    }

    // Reified boolean (non-)equality with a fixed reified output becomes the
    // direct constraint.
    fn presolve_bool_eq_ne_reif(model: &mut FlatModel, index: usize) -> bool {
        let Some(reified) = model
            .constraints[index]
            .args
            .get(2)
            .and_then(|arg| model.arg_value(arg))
        else {
            return false;
        };
        let tag = model.constraints[index].tag;
        let direct = match (tag, reified) {
            (ConstraintTag::BoolEqReif, 1) | (ConstraintTag::BoolNeReif, 0) => ConstraintTag::BoolEq,
            (ConstraintTag::BoolEqReif, 0) | (ConstraintTag::BoolNeReif, 1) => ConstraintTag::BoolNe,
            _ => return false,
        };
        let ct = &mut model.constraints[index];
        ct.tag = direct;
        ct.args.truncate(2);
        ct.target = None;
        true
    }

    // Element with a fixed index becomes an equality with the selected
    // constant. Indices are 1-based.
    fn presolve_array_int_element(model: &mut FlatModel, index: usize) -> bool {
        let Some(position) = model.arg_value(&model.constraints[index].args[0].clone()) else {
            return false;
        };
        let Ok(values) = model.constraints[index].arg(1).values().map(<[_]>::to_vec) else {
            return false;
        };
        if position < 1 || position as usize > values.len() {
            return false;
        }
        let selected = values[(position - 1) as usize];
        let target = model.constraints[index].args[2].clone();
        let ct = &mut model.constraints[index];
        ct.tag = ConstraintTag::IntEq;
        ct.args = vec![target, Argument::Int(selected)];
        ct.target = None;
        true
    }

    // int_div(x, y, z): unit divisor collapses to equality, zero dividend
    // propagates zero.
    fn presolve_int_div(model: &mut FlatModel, index: usize) -> bool {
        let x = model.constraints[index].args[0].clone();
        let y = model.constraints[index].args[1].clone();
        let z = model.constraints[index].args[2].clone();
        if model.arg_value(&y) == Some(1) {
            let ct = &mut model.constraints[index];
            ct.tag = ConstraintTag::IntEq;
            ct.args = vec![x, z];
            return true;
        }
        if model.arg_value(&x) == Some(0) {
            if let Argument::Var(t) = z {
                model.domain_mut(t).fix(0);
                model.eliminate_constraint(index);
                return true;
            }
        }
        false
    }

    // int_times(x, y, z): unit factor collapses to equality, zero factor
    // propagates zero.
    fn presolve_int_times(model: &mut FlatModel, index: usize) -> bool {
        let x = model.constraints[index].args[0].clone();
        let y = model.constraints[index].args[1].clone();
        let z = model.constraints[index].args[2].clone();
        for (factor, other) in [(&x, &y), (&y, &x)] {
            match model.arg_value(factor) {
                Some(1) => {
                    let ct = &mut model.constraints[index];
                    ct.tag = ConstraintTag::IntEq;
                    ct.args = vec![other.clone(), z];
                    return true;
                }
                Some(0) => {
                    if let Argument::Var(t) = z {
                        model.domain_mut(t).fix(0);
                        model.eliminate_constraint(index);
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    // Strict linear comparisons become non-strict with the constant nudged
    // by one.
    fn presolve_strict_linear(model: &mut FlatModel, index: usize) -> bool {
        let tag = model.constraints[index].tag;
        let Ok(rhs) = model.constraints[index].arg(2).value() else {
            return false;
        };
        let ct = &mut model.constraints[index];
        match tag {
            ConstraintTag::IntLinGt => {
                ct.tag = ConstraintTag::IntLinGe;
                ct.args[2] = Argument::Int(rhs + 1);
            }
            ConstraintTag::IntLinLt => {
                ct.tag = ConstraintTag::IntLinLe;
                ct.args[2] = Argument::Int(rhs - 1);
            }
            _ => return false,
        }
        true
    }

    // Drops zero-coefficient terms from a linear constraint.
    fn presolve_linear(model: &mut FlatModel, index: usize) -> bool {
        let Ok(coefficients) = model.constraints[index].arg(0).values().map(<[_]>::to_vec) else {
            return false;
        };
        if !coefficients.contains(&0) {
            return false;
        }
        let Ok(vars) = model.constraints[index].arg(1).vars().map(<[_]>::to_vec) else {
            return false;
        };
        let mut kept_coefficients = Vec::with_capacity(coefficients.len());
        let mut kept_vars = Vec::with_capacity(vars.len());
        for (&coefficient, &var) in coefficients.iter().zip(vars.iter()) {
            if coefficient != 0 {
                kept_coefficients.push(coefficient);
                kept_vars.push(var);
            }
        }
        let ct = &mut model.constraints[index];
        ct.args[0] = Argument::IntArray(kept_coefficients);
        ct.args[1] = Argument::VarArray(kept_vars);
        true
    }

    // All-positive linear forms: rhs 0 fixes everything at zero, otherwise
    // coefficients bound each variable's maximum.
    fn presolve_positive_linear(model: &mut FlatModel, index: usize) -> bool {
        let tag = model.constraints[index].tag;
        if !matches!(tag, ConstraintTag::IntLinEq | ConstraintTag::IntLinLe) {
            return false;
        }
        let Ok(coefficients) = model.constraints[index].arg(0).values().map(<[_]>::to_vec) else {
            return false;
        };
        let Ok(vars) = model.constraints[index].arg(1).vars().map(<[_]>::to_vec) else {
            return false;
        };
        let Ok(rhs) = model.constraints[index].arg(2).value() else {
            return false;
        };
        if coefficients.is_empty() || coefficients.iter().any(|&c| c <= 0) {
            return false;
        }
        if vars.iter().any(|&v| model.domain(v).min() < Some(0)) {
            return false;
        }
        if rhs == 0 {
            for &var in &vars {
                model.domain_mut(var).fix(0);
            }
            model.eliminate_constraint(index);
            return true;
        }
        // max(x_i) <= rhs / c_i once every other term's minimum is zero
        if vars.iter().all(|&v| model.domain(v).min() == Some(0)) {
            let mut changed = false;
            for (&coefficient, &var) in coefficients.iter().zip(vars.iter()) {
                let bound = rhs / coefficient;
                let domain = model.domain_mut(var);
                if domain.max() > Some(bound) {
                    domain.set_max(bound);
                    changed = true;
                }
            }
            return changed;
        }
        false
    }

    // int_lin_eq([1, -a], [y, x], b) defines y = a*x + b.
    fn presolve_store_mapping(&mut self, model: &mut FlatModel, index: usize) -> bool {
        let Ok(coefficients) = model.constraints[index].arg(0).values().map(<[_]>::to_vec) else {
            return false;
        };
        let Ok(vars) = model.constraints[index].arg(1).vars().map(<[_]>::to_vec) else {
            return false;
        };
        let Ok(rhs) = model.constraints[index].arg(2).value() else {
            return false;
        };
        if coefficients.len() != 2 || coefficients[0] != 1 || coefficients[1] >= 0 {
            return false;
        }
        let y = model.resolve(vars[0]);
        let x = model.resolve(vars[1]);
        if self.affine_map.contains_key(&y) {
            return false;
        }
        self.affine_map.insert(
            y,
            AffineMapping {
                var: x,
                coefficient: -coefficients[1],
                offset: rhs,
            },
        );
        true
    }

    // Element whose index is an affine image y = a*x + b of another variable
    // is rewritten to index directly on x, compacting the value array.
    fn presolve_simplify_element(&mut self, model: &mut FlatModel, index: usize) -> bool {
        let Ok(index_var) = model.constraints[index].arg(0).var() else {
            return false;
        };
        let Some(mapping) = self.affine_map.get(&model.resolve(index_var)).copied() else {
            return false;
        };
        if mapping.coefficient <= 0 {
            return false;
        }
        let Ok(values) = model.constraints[index].arg(1).values().map(<[_]>::to_vec) else {
            return false;
        };
        let base_domain = model.domain(mapping.var).clone();
        let (Some(base_min), Some(base_max)) = (base_domain.min(), base_domain.max()) else {
            return false;
        };
        if base_min < 1 {
            return false;
        }
        // Every image a*x + b must be a valid 1-based position.
        let mut new_values = Vec::new();
        for x in 1..=base_max {
            let position = mapping.coefficient * x + mapping.offset;
            if x >= base_min && (position < 1 || position as usize > values.len()) {
                return false;
            }
            let clamped = position.clamp(1, values.len() as i64);
            new_values.push(values[(clamped - 1) as usize]);
        }
        let ct = &mut model.constraints[index];
        ct.args[0] = Argument::Var(mapping.var);
        ct.args[1] = Argument::IntArray(new_values);
        true
    }

    // A reified constraint whose boolean output is fixed becomes the direct
    // constraint (or its negation).
    fn unreify(model: &mut FlatModel, index: usize) -> bool {
        let tag = model.constraints[index].tag;
        let Some(direct) = tag.unreified() else {
            return false;
        };
        let Some(reified_arg) = model.constraints[index].args.last().cloned() else {
            return false;
        };
        let Some(value) = model.arg_value(&reified_arg) else {
            return false;
        };
        let new_tag = if value == 1 {
            direct
        } else {
            match direct.negated() {
                Some(negated) => negated,
                None => return false,
            }
        };
        let ct = &mut model.constraints[index];
        ct.tag = new_tag;
        ct.args.pop();
        ct.target = None;
        true
    }

    // Applies the union-find classes to the model: non-representatives gain
    // alias pointers and every reference is rewritten.
    fn substitute_everywhere(model: &mut FlatModel, union: &mut UnionFind) -> bool {
        let mut changed = false;
        for var in 0..model.variables.len() {
            let representative = union.find(var);
            if representative == var {
                continue;
            }
            if model.resolve(var) != model.resolve(representative) {
                if let Err(err) = model.set_alias(var, representative) {
                    warn!("skipping equivalence: {err}");
                    continue;
                }
                changed = true;
            }
        }
        if !changed {
            return false;
        }
        let resolved: Vec<VarId> = (0..model.variables.len())
            .map(|var| model.resolve(var))
            .collect();
        for ct in &mut model.constraints {
            for arg in &mut ct.args {
                match arg {
                    Argument::Var(id) => *id = resolved[*id],
                    Argument::VarArray(ids) => {
                        for id in ids.iter_mut() {
                            *id = resolved[*id];
                        }
                    }
                    _ => {}
                }
            }
            if let Some(target) = ct.target {
                ct.target = Some(resolved[target]);
            }
        }
        for annotation in &mut model.solve_annotations {
            Self::substitute_annotation(annotation, &resolved);
        }
        if let crate::flat::SolveGoal::Minimize(var) = model.goal {
            model.goal = crate::flat::SolveGoal::Minimize(resolved[var]);
        } else if let crate::flat::SolveGoal::Maximize(var) = model.goal {
            model.goal = crate::flat::SolveGoal::Maximize(resolved[var]);
        }
        true
    }

    fn substitute_annotation(annotation: &mut Annotation, resolved: &[VarId]) {
        match annotation {
            Annotation::Var(id) => *id = resolved[*id],
            Annotation::VarArray(ids) => {
                for id in ids.iter_mut() {
                    *id = resolved[*id];
                }
            }
            Annotation::Call(_, args) => {
                for arg in args {
                    Self::substitute_annotation(arg, resolved);
                }
            }
            Annotation::Atom(_) | Annotation::Int(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Domain;
    use crate::flat::FlatConstraint;

    fn lin_eq(coefficients: Vec<i64>, vars: Vec<VarId>, rhs: i64) -> FlatConstraint {
        FlatConstraint::new(
            ConstraintTag::IntLinEq,
            vec![
                Argument::IntArray(coefficients),
                Argument::VarArray(vars),
                Argument::Int(rhs),
            ],
        )
    }

    #[test]
    fn test_int_eq_alias_substitutes_everywhere() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        let z = model.new_int_var("z", 0, 10, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntEq,
            vec![Argument::Var(x), Argument::Var(y)],
        ));
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntLe,
            vec![Argument::Var(x), Argument::Var(z)],
        ));
        assert!(Presolver::new().run(&mut model));
        // one of x, y aliases the other and every reference now uses the
        // representative
        let representative = model.resolve(x);
        assert_eq!(model.resolve(y), representative);
        assert!(model.constraints[0].trivially_true);
        assert_eq!(
            model.constraints[1].arg(0).var().unwrap(),
            representative
        );
    }

    #[test]
    fn test_int_eq_constant_assigns() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntEq,
            vec![Argument::Int(7), Argument::Var(x)],
        ));
        Presolver::new().run(&mut model);
        assert_eq!(model.domain(x).value(), Some(7));
        assert_eq!(model.live_constraints(), 0);
    }

    #[test]
    fn test_int_ne_removes_value() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 3, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntNe,
            vec![Argument::Var(x), Argument::Int(2)],
        ));
        Presolver::new().run(&mut model);
        assert!(!model.domain(x).contains(2));
        assert_eq!(model.domain(x).size(), 3);
    }

    #[test]
    fn test_inequality_tightens() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntLt,
            vec![Argument::Var(x), Argument::Int(5)],
        ));
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntGe,
            vec![Argument::Int(4), Argument::Var(y)],
        ));
        Presolver::new().run(&mut model);
        assert_eq!(model.domain(x).max(), Some(4));
        assert_eq!(model.domain(y).max(), Some(4));
        assert_eq!(model.live_constraints(), 0);
    }

    #[test]
    fn test_set_in_intersects() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::SetIn,
            vec![Argument::Var(x), Argument::Set(vec![2, 4, 12])],
        ));
        Presolver::new().run(&mut model);
        assert_eq!(model.domain(x).iter().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_array_bool_and_fixed_operands() {
        let mut model = FlatModel::new("m");
        let a = model.new_bool_var("a", false);
        let b = model.new_bool_var("b", false);
        let target = model.new_bool_var("t", true);
        model.domain_mut(a).fix(1);
        model.domain_mut(b).fix(0);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::ArrayBoolAnd,
            vec![Argument::VarArray(vec![a, b]), Argument::Var(target)],
        ));
        Presolver::new().run(&mut model);
        assert_eq!(model.domain(target).value(), Some(0));
    }

    #[test]
    fn test_element_fixed_index_rewrites_to_eq() {
        let mut model = FlatModel::new("m");
        let index = model.new_int_var("i", 2, 2, false);
        let target = model.new_int_var("t", 0, 100, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::ArrayIntElement,
            vec![
                Argument::Var(index),
                Argument::IntArray(vec![10, 20, 30]),
                Argument::Var(target),
            ],
        ));
        Presolver::new().run(&mut model);
        // rewritten to int_eq(target, 20) and then solved to target = 20
        assert_eq!(model.domain(target).value(), Some(20));
        assert_eq!(model.live_constraints(), 0);
    }

    #[test]
    fn test_strict_linear_becomes_non_strict() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let mut ct = lin_eq(vec![1], vec![x], 5);
        ct.tag = ConstraintTag::IntLinLt;
        model.add_constraint(ct);
        Presolver::new().run(&mut model);
        let ct = &model.constraints[0];
        assert_eq!(ct.tag, ConstraintTag::IntLinLe);
        assert_eq!(ct.arg(2).value().unwrap(), 4);
    }

    #[test]
    fn test_linear_drops_zero_coefficients() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        model.add_constraint(lin_eq(vec![2, 0], vec![x, y], 6));
        Presolver::new().run(&mut model);
        let ct = &model.constraints[0];
        assert_eq!(ct.arg(0).values().unwrap(), &[2]);
        assert_eq!(ct.arg(1).vars().unwrap(), &[x]);
    }

    #[test]
    fn test_positive_linear_zero_rhs_fixes() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        model.add_constraint(lin_eq(vec![2, 3], vec![x, y], 0));
        Presolver::new().run(&mut model);
        assert_eq!(model.domain(x).value(), Some(0));
        assert_eq!(model.domain(y).value(), Some(0));
        assert_eq!(model.live_constraints(), 0);
    }

    #[test]
    fn test_positive_linear_bounds() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 100, false);
        let mut ct = lin_eq(vec![3], vec![x], 10);
        ct.tag = ConstraintTag::IntLinLe;
        model.add_constraint(ct);
        Presolver::new().run(&mut model);
        assert_eq!(model.domain(x).max(), Some(3));
    }

    #[test]
    fn test_unreify_fixed_true() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        let b = model.new_bool_var("b", true);
        model.domain_mut(b).fix(1);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntLtReif,
            vec![Argument::Var(x), Argument::Var(y), Argument::Var(b)],
        ));
        Presolver::new().run(&mut model);
        let ct = &model.constraints[0];
        assert_eq!(ct.tag, ConstraintTag::IntLt);
        assert_eq!(ct.args.len(), 2);
    }

    #[test]
    fn test_unreify_fixed_false_negates() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        let b = model.new_bool_var("b", true);
        model.domain_mut(b).fix(0);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntEqReif,
            vec![Argument::Var(x), Argument::Var(y), Argument::Var(b)],
        ));
        Presolver::new().run(&mut model);
        assert_eq!(model.constraints[0].tag, ConstraintTag::IntNe);
    }

    #[test]
    fn test_affine_mapping_simplifies_element() {
        let mut model = FlatModel::new("m");
        // y = 2*x + 0, x in [1, 2]
        let y = model.new_int_var("y", 1, 4, true);
        let x = model.new_int_var("x", 1, 2, false);
        let target = model.new_int_var("t", 0, 100, false);
        model.add_constraint(lin_eq(vec![1, -2], vec![y, x], 0));
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::ArrayIntElement,
            vec![
                Argument::Var(y),
                Argument::IntArray(vec![10, 20, 30, 40]),
                Argument::Var(target),
            ],
        ));
        Presolver::new().run(&mut model);
        let element = &model.constraints[1];
        assert_eq!(element.arg(0).var().unwrap(), x);
        // x = 1 -> position 2 -> 20; x = 2 -> position 4 -> 40
        assert_eq!(element.arg(1).values().unwrap(), &[20, 40]);
    }

    #[test]
    fn test_fix_point_quiescence() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let y = model.new_int_var("y", 0, 10, false);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntEq,
            vec![Argument::Var(x), Argument::Var(y)],
        ));
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::IntLt,
            vec![Argument::Var(y), Argument::Int(5)],
        ));
        let mut presolver = Presolver::new();
        assert!(presolver.run(&mut model));
        // a second run finds nothing left to do
        assert!(!presolver.run(&mut model));
    }

    #[test]
    fn test_bool2int_merges() {
        let mut model = FlatModel::new("m");
        let b = model.new_bool_var("b", false);
        let x = model.new_int_var("x", 0, 1, true);
        model.add_constraint(FlatConstraint::new(
            ConstraintTag::Bool2Int,
            vec![Argument::Var(b), Argument::Var(x)],
        ));
        Presolver::new().run(&mut model);
        assert_eq!(model.resolve(b), model.resolve(x));
        assert_eq!(model.live_constraints(), 0);
    }

    #[test]
    fn test_clean_up_strips_reified_targets() {
        let mut model = FlatModel::new("m");
        let x = model.new_int_var("x", 0, 10, false);
        let b = model.new_bool_var("b", true);
        model.add_constraint(
            FlatConstraint::new(
                ConstraintTag::IntEqReif,
                vec![Argument::Var(x), Argument::Int(3), Argument::Var(b)],
            )
            .with_target(b),
        );
        let presolver = Presolver::new();
        presolver.clean_up_model_for_cp_solver(&mut model);
        assert_eq!(model.constraints[0].target, None);
    }
}
