//! Constraint dispatcher: flat model → CP primitives.
//!
//! A table lookup from [`ConstraintTag`] to a handler. Each handler reads
//! the constraint's arguments (resolved through alias chains), fetches the
//! CP variable for every reference, and posts a primitive constraint.
//! Handlers fail fast with [`Error::UnsupportedConstraint`] when a tag has
//! no implementation; the presolver is expected to have eliminated trivial
//! cases first.

use log::debug;

use crate::cp::{CpConstraint, CpModel, CpVarId, LinearRelation, Objective};
use crate::error::{Error, Result};
use crate::flat::{Argument, ConstraintTag, FlatModel, SolveGoal, VarId, VarKind};

/// The result of extracting a flat model: the CP model plus the mapping
/// from flat variables to CP variables.
#[derive(Debug)]
pub struct Extraction {
    /// The populated CP model.
    pub cp: CpModel,
    /// `var_map[flat_var]` is the CP variable of the flat variable's
    /// representative, `None` for set variables.
    pub var_map: Vec<Option<CpVarId>>,
}

impl Extraction {
    /// Reads the value of a flat variable out of a CP solution, resolving
    /// aliases.
    pub fn value_of(&self, flat: &FlatModel, var: VarId, solution: &[i64]) -> Option<i64> {
        self.var_map[flat.resolve(var)].map(|cp_var| solution[cp_var])
    }
}

/// Translates every live constraint of the flat model onto CP primitives.
///
/// # Examples
///
/// ```
/// use cproute::dispatch::extract_model;
/// use cproute::flat::{Argument, ConstraintTag, FlatConstraint, FlatModel};
///
/// let mut model = FlatModel::new("m");
/// let x = model.new_int_var("x", 0, 3, false);
/// let y = model.new_int_var("y", 0, 3, false);
/// model.add_constraint(FlatConstraint::new(
///     ConstraintTag::IntLt,
///     vec![Argument::Var(x), Argument::Var(y)],
/// ));
/// let extraction = extract_model(&model).unwrap();
/// assert_eq!(extraction.cp.constraints.len(), 1);
/// ```
pub fn extract_model(flat: &FlatModel) -> Result<Extraction> {
    if flat.uses_set_variables() {
        return Err(Error::UnsupportedSetVariable);
    }
    let mut cp = CpModel::new(flat.name.clone());
    let mut var_map: Vec<Option<CpVarId>> = vec![None; flat.variables.len()];
    for (id, variable) in flat.variables.iter().enumerate() {
        if variable.alias.is_some() || variable.kind == VarKind::Set {
            continue;
        }
        var_map[id] =
            Some(cp.new_var_with_domain(variable.name.clone(), variable.domain.clone()));
    }
    for id in 0..flat.variables.len() {
        if flat.variables[id].alias.is_some() {
            var_map[id] = var_map[flat.resolve(id)];
        }
    }

    let mut extractor = Extractor {
        flat,
        cp: &mut cp,
        var_map: &var_map,
    };
    for (index, constraint) in flat.constraints.iter().enumerate() {
        if constraint.trivially_true {
            continue;
        }
        debug!("extracting {} (#{index})", constraint.tag.name());
        extractor.extract_constraint(index)?;
    }

    match flat.goal {
        SolveGoal::Satisfy => {}
        SolveGoal::Minimize(var) => {
            let cp_var = var_map[flat.resolve(var)]
                .ok_or(Error::UnsupportedSetVariable)?;
            cp.set_objective(Objective::Minimize(cp_var));
        }
        SolveGoal::Maximize(var) => {
            let cp_var = var_map[flat.resolve(var)]
                .ok_or(Error::UnsupportedSetVariable)?;
            cp.set_objective(Objective::Maximize(cp_var));
        }
    }
    Ok(Extraction { cp, var_map })
}

/// One side of a binary comparison: a CP variable or a constant.
enum Operand {
    Var(CpVarId),
    Const(i64),
}

struct Extractor<'a> {
    flat: &'a FlatModel,
    cp: &'a mut CpModel,
    var_map: &'a [Option<CpVarId>],
}

impl Extractor<'_> {
    fn extract_constraint(&mut self, index: usize) -> Result<()> {
        use ConstraintTag::*;
        let ct = &self.flat.constraints[index];
        match ct.tag {
            AllDifferentInt => {
                let vars = self.var_array(ct.arg(0))?;
                self.cp.post(CpConstraint::AllDifferent(vars));
                Ok(())
            }
            AlldifferentExcept0 => {
                let vars = self.var_array(ct.arg(0))?;
                self.cp.post(CpConstraint::AllDifferentExcept0(vars));
                Ok(())
            }
            ArrayBoolAnd => {
                let vars = self.var_array(ct.arg(0))?;
                let target = self.var(ct.arg(1).var()?)?;
                self.cp.post(CpConstraint::BoolAndEq(vars, target));
                Ok(())
            }
            ArrayBoolOr => {
                let vars = self.var_array(ct.arg(0))?;
                let target = self.var(ct.arg(1).var()?)?;
                self.cp.post(CpConstraint::BoolOrEq(vars, target));
                Ok(())
            }
            ArrayIntElement | ArrayBoolElement => self.extract_element(index),
            IntEq | BoolEq => self.extract_comparison(index, Comparison::Eq),
            IntNe | BoolNe => self.extract_comparison(index, Comparison::Ne),
            IntLt | BoolLt => self.extract_comparison(index, Comparison::Lt),
            IntLe | BoolLe => self.extract_comparison(index, Comparison::Le),
            IntGt | BoolGt => self.extract_comparison(index, Comparison::Gt),
            IntGe | BoolGe => self.extract_comparison(index, Comparison::Ge),
            IntLinEq | BoolLinEq => self.extract_linear(index, LinearRelation::Eq),
            IntLinLe | BoolLinLe => self.extract_linear(index, LinearRelation::Le),
            IntLinGe => self.extract_linear(index, LinearRelation::Ge),
            IntLinNe => self.extract_linear(index, LinearRelation::Ne),
            IntPlus => self.extract_sum(index, 1),
            IntMinus => self.extract_sum(index, -1),
            BoolNot => {
                let left = self.var(ct.arg(0).var()?)?;
                let right = self.var(ct.arg(1).var()?)?;
                self.cp.post(CpConstraint::Ne(left, right));
                Ok(())
            }
            SetIn => Err(Error::UnsupportedConstraint(
                "set_in (should have been presolved out)".to_string(),
            )),
            Bool2Int => Err(Error::UnsupportedConstraint(
                "bool2int (should have been presolved out)".to_string(),
            )),
            TrueConstraint => Ok(()),
            other => Err(Error::UnsupportedConstraint(other.name().to_string())),
        }
    }

    fn var(&self, id: VarId) -> Result<CpVarId> {
        self.var_map[self.flat.resolve(id)].ok_or(Error::UnsupportedSetVariable)
    }

    fn var_array(&self, arg: &Argument) -> Result<Vec<CpVarId>> {
        arg.vars()?.iter().map(|&id| self.var(id)).collect()
    }

    fn operand(&self, arg: &Argument) -> Result<Operand> {
        match arg {
            Argument::Int(value) => Ok(Operand::Const(*value)),
            Argument::Var(id) => Ok(Operand::Var(self.var(*id)?)),
            other => Err(Error::TypeError(format!(
                "expected variable or constant, got {other:?}"
            ))),
        }
    }

    // Binary comparisons: each side is independently a variable or a
    // constant, yielding four branches. Constant/constant collapses to a
    // feasibility check.
    fn extract_comparison(&mut self, index: usize, comparison: Comparison) -> Result<()> {
        let ct = &self.flat.constraints[index];
        let left = self.operand(ct.arg(0))?;
        let right = self.operand(ct.arg(1))?;
        let posted = match (left, right) {
            (Operand::Var(a), Operand::Var(b)) => comparison.between_vars(a, b),
            (Operand::Var(a), Operand::Const(k)) => comparison.var_const(a, k),
            (Operand::Const(k), Operand::Var(b)) => comparison.mirrored().var_const(b, k),
            (Operand::Const(a), Operand::Const(b)) => {
                if comparison.holds(a, b) {
                    return Ok(());
                }
                CpConstraint::False
            }
        };
        self.cp.post(posted);
        Ok(())
    }

    // int_lin_R: argument 0 coefficients, argument 1 variables, argument 2
    // right-hand side.
    fn extract_linear(&mut self, index: usize, relation: LinearRelation) -> Result<()> {
        let ct = &self.flat.constraints[index];
        let coefficients = ct.arg(0).values()?.to_vec();
        let vars = self.var_array(ct.arg(1))?;
        let rhs = ct.arg(2).value()?;
        self.cp.post(CpConstraint::ScalProd {
            coefficients,
            vars,
            relation,
            rhs,
        });
        Ok(())
    }

    // int_plus / int_minus: x ± y = z as a fixed scalar product.
    fn extract_sum(&mut self, index: usize, y_sign: i64) -> Result<()> {
        let ct = &self.flat.constraints[index];
        let x = self.var(ct.arg(0).var()?)?;
        let y = self.var(ct.arg(1).var()?)?;
        let z = self.var(ct.arg(2).var()?)?;
        self.cp.post(CpConstraint::ScalProd {
            coefficients: vec![1, y_sign, -1],
            vars: vec![x, y, z],
            relation: LinearRelation::Eq,
            rhs: 0,
        });
        Ok(())
    }

    // Element: the 1-based index is shifted to a 0-based introduced
    // variable clamped to the index domain, the value array is sliced
    // accordingly, and the target equals the element expression.
    fn extract_element(&mut self, index: usize) -> Result<()> {
        let ct = &self.flat.constraints[index];
        let index_var = self.var(ct.arg(0).var()?)?;
        let values = ct.arg(1).values()?;
        let target = self.var(ct.arg(2).var()?)?;

        let index_domain = &self.cp.domains[index_var];
        let imin = index_domain.min().unwrap_or(1).max(1);
        let imax = index_domain
            .max()
            .unwrap_or(values.len() as i64)
            .min(values.len() as i64);
        if imin > imax {
            self.cp.post(CpConstraint::False);
            return Ok(());
        }
        let shifted = self
            .cp
            .new_var(format!("{}_shifted", self.cp.names[index_var]), 0, imax - imin);
        // shifted = index - imin
        self.cp.post(CpConstraint::ScalProd {
            coefficients: vec![1, -1],
            vars: vec![index_var, shifted],
            relation: LinearRelation::Eq,
            rhs: imin,
        });
        let sliced = values[(imin - 1) as usize..imax as usize].to_vec();
        self.cp.post(CpConstraint::ElementEq {
            values: sliced,
            index: shifted,
            target,
        });
        Ok(())
    }
}

/// The six binary comparison forms.
#[derive(Debug, Clone, Copy)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn holds(&self, a: i64, b: i64) -> bool {
        match self {
            Comparison::Eq => a == b,
            Comparison::Ne => a != b,
            Comparison::Lt => a < b,
            Comparison::Le => a <= b,
            Comparison::Gt => a > b,
            Comparison::Ge => a >= b,
        }
    }

    /// The comparison seen from the right-hand side, for const-var forms.
    fn mirrored(&self) -> Comparison {
        match self {
            Comparison::Eq => Comparison::Eq,
            Comparison::Ne => Comparison::Ne,
            Comparison::Lt => Comparison::Gt,
            Comparison::Le => Comparison::Ge,
            Comparison::Gt => Comparison::Lt,
            Comparison::Ge => Comparison::Le,
        }
    }

    fn between_vars(&self, a: CpVarId, b: CpVarId) -> CpConstraint {
        match self {
            Comparison::Eq => CpConstraint::Eq(a, b),
            Comparison::Ne => CpConstraint::Ne(a, b),
            Comparison::Lt => CpConstraint::Lt(a, b),
            Comparison::Le => CpConstraint::Le(a, b),
            Comparison::Gt => CpConstraint::Lt(b, a),
            Comparison::Ge => CpConstraint::Le(b, a),
        }
    }

    fn var_const(&self, a: CpVarId, k: i64) -> CpConstraint {
        match self {
            Comparison::Eq => CpConstraint::EqConst(a, k),
            Comparison::Ne => CpConstraint::NeConst(a, k),
            Comparison::Lt => CpConstraint::LeConst(a, k - 1),
            Comparison::Le => CpConstraint::LeConst(a, k),
            Comparison::Gt => CpConstraint::GeConst(a, k + 1),
            Comparison::Ge => CpConstraint::GeConst(a, k),
        }
    }
}
