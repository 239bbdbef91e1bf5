//! Flat constraints and their tags.

use super::{Annotation, Argument, VarId};

macro_rules! constraint_tags {
    ($($variant:ident => $name:literal,)*) => {
        /// The kind of a flat constraint.
        ///
        /// Tag strings are normalised to this enum once, when the parser
        /// populates the model; all later pattern matching is on the enum.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ConstraintTag {
            $($variant,)*
        }

        impl ConstraintTag {
            /// Parses a flatzinc tag string.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(ConstraintTag::$variant),)*
                    _ => None,
                }
            }

            /// The flatzinc tag string.
            pub fn name(&self) -> &'static str {
                match self {
                    $(ConstraintTag::$variant => $name,)*
                }
            }
        }
    };
}

constraint_tags! {
    AllDifferentInt => "all_different_int",
    AlldifferentExcept0 => "alldifferent_except_0",
    ArrayBoolAnd => "array_bool_and",
    ArrayBoolElement => "array_bool_element",
    ArrayBoolOr => "array_bool_or",
    ArrayBoolXor => "array_bool_xor",
    ArrayIntElement => "array_int_element",
    ArrayVarBoolElement => "array_var_bool_element",
    ArrayVarIntElement => "array_var_int_element",
    Bool2Int => "bool2int",
    BoolAnd => "bool_and",
    BoolClause => "bool_clause",
    BoolEq => "bool_eq",
    BoolEqReif => "bool_eq_reif",
    BoolGe => "bool_ge",
    BoolGeReif => "bool_ge_reif",
    BoolGt => "bool_gt",
    BoolGtReif => "bool_gt_reif",
    BoolLe => "bool_le",
    BoolLeReif => "bool_le_reif",
    BoolLinEq => "bool_lin_eq",
    BoolLinLe => "bool_lin_le",
    BoolLt => "bool_lt",
    BoolLtReif => "bool_lt_reif",
    BoolNe => "bool_ne",
    BoolNeReif => "bool_ne_reif",
    BoolNot => "bool_not",
    BoolOr => "bool_or",
    BoolXor => "bool_xor",
    IntAbs => "int_abs",
    IntDiv => "int_div",
    IntEq => "int_eq",
    IntEqReif => "int_eq_reif",
    IntGe => "int_ge",
    IntGeReif => "int_ge_reif",
    IntGt => "int_gt",
    IntGtReif => "int_gt_reif",
    IntLe => "int_le",
    IntLeReif => "int_le_reif",
    IntLinEq => "int_lin_eq",
    IntLinEqReif => "int_lin_eq_reif",
    IntLinGe => "int_lin_ge",
    IntLinGeReif => "int_lin_ge_reif",
    IntLinGt => "int_lin_gt",
    IntLinLe => "int_lin_le",
    IntLinLeReif => "int_lin_le_reif",
    IntLinLt => "int_lin_lt",
    IntLinNe => "int_lin_ne",
    IntLinNeReif => "int_lin_ne_reif",
    IntLt => "int_lt",
    IntLtReif => "int_lt_reif",
    IntMax => "int_max",
    IntMin => "int_min",
    IntMinus => "int_minus",
    IntMod => "int_mod",
    IntNe => "int_ne",
    IntNeReif => "int_ne_reif",
    IntPlus => "int_plus",
    IntTimes => "int_times",
    MaximumInt => "maximum_int",
    MinimumInt => "minimum_int",
    SetIn => "set_in",
    SetInReif => "set_in_reif",
    TrueConstraint => "true_constraint",
}

impl ConstraintTag {
    /// Maps a reified tag to its direct counterpart.
    pub fn unreified(&self) -> Option<ConstraintTag> {
        use ConstraintTag::*;
        match self {
            IntEqReif => Some(IntEq),
            IntNeReif => Some(IntNe),
            IntLtReif => Some(IntLt),
            IntLeReif => Some(IntLe),
            IntGtReif => Some(IntGt),
            IntGeReif => Some(IntGe),
            IntLinEqReif => Some(IntLinEq),
            IntLinNeReif => Some(IntLinNe),
            IntLinLeReif => Some(IntLinLe),
            IntLinGeReif => Some(IntLinGe),
            BoolEqReif => Some(BoolEq),
            BoolNeReif => Some(BoolNe),
            BoolLtReif => Some(BoolLt),
            BoolLeReif => Some(BoolLe),
            BoolGtReif => Some(BoolGt),
            BoolGeReif => Some(BoolGe),
            SetInReif => Some(SetIn),
            _ => None,
        }
    }

    /// Maps a comparison tag to its logical negation.
    pub fn negated(&self) -> Option<ConstraintTag> {
        use ConstraintTag::*;
        match self {
            IntEq => Some(IntNe),
            IntNe => Some(IntEq),
            IntLt => Some(IntGe),
            IntLe => Some(IntGt),
            IntGt => Some(IntLe),
            IntGe => Some(IntLt),
            IntLinEq => Some(IntLinNe),
            IntLinNe => Some(IntLinEq),
            IntLinLe => Some(IntLinGt),
            IntLinGe => Some(IntLinLt),
            IntLinGt => Some(IntLinLe),
            IntLinLt => Some(IntLinGe),
            BoolEq => Some(BoolNe),
            BoolNe => Some(BoolEq),
            BoolLt => Some(BoolGe),
            BoolLe => Some(BoolGt),
            BoolGt => Some(BoolLe),
            BoolGe => Some(BoolLt),
            _ => None,
        }
    }
}

/// A flat constraint: tag, ordered arguments, optional target variable,
/// trivially-true flag and annotations.
///
/// A constraint marked trivially true has been eliminated by presolve and
/// must produce no solver constraint at dispatch time.
#[derive(Debug, Clone)]
pub struct FlatConstraint {
    /// Constraint kind.
    pub tag: ConstraintTag,
    /// Ordered argument list.
    pub args: Vec<Argument>,
    /// Variable defined by this constraint, if it is functional.
    pub target: Option<VarId>,
    /// Set by presolve when the constraint has been eliminated.
    pub trivially_true: bool,
    /// Annotations attached by the parser.
    pub annotations: Vec<Annotation>,
}

impl FlatConstraint {
    /// Creates a constraint with no target and no annotations.
    pub fn new(tag: ConstraintTag, args: Vec<Argument>) -> Self {
        Self {
            tag,
            args,
            target: None,
            trivially_true: false,
            annotations: Vec::new(),
        }
    }

    /// Sets the target variable.
    pub fn with_target(mut self, target: VarId) -> Self {
        self.target = Some(target);
        self
    }

    /// The `i`-th argument.
    ///
    /// # Panics
    ///
    /// Panics if the constraint has fewer than `i + 1` arguments.
    pub fn arg(&self, i: usize) -> &Argument {
        &self.args[i]
    }

    /// Marks the constraint as eliminated.
    pub fn mark_trivially_true(&mut self) {
        self.trivially_true = true;
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip() {
        for tag in [
            ConstraintTag::IntEq,
            ConstraintTag::ArrayIntElement,
            ConstraintTag::Bool2Int,
            ConstraintTag::TrueConstraint,
        ] {
            assert_eq!(ConstraintTag::from_name(tag.name()), Some(tag));
        }
        assert_eq!(ConstraintTag::from_name("no_such_tag"), None);
    }

    #[test]
    fn test_unreified() {
        assert_eq!(
            ConstraintTag::IntEqReif.unreified(),
            Some(ConstraintTag::IntEq)
        );
        assert_eq!(ConstraintTag::IntEq.unreified(), None);
    }

    #[test]
    fn test_negated() {
        assert_eq!(ConstraintTag::IntLt.negated(), Some(ConstraintTag::IntGe));
        assert_eq!(
            ConstraintTag::IntGe.negated().and_then(|t| t.negated()),
            Some(ConstraintTag::IntGe)
        );
        assert_eq!(ConstraintTag::IntAbs.negated(), None);
    }

    #[test]
    fn test_mark_trivially_true_clears_target() {
        let mut ct =
            FlatConstraint::new(ConstraintTag::IntEq, vec![Argument::Var(0), Argument::Int(1)])
                .with_target(0);
        ct.mark_trivially_true();
        assert!(ct.trivially_true);
        assert!(ct.target.is_none());
    }
}
