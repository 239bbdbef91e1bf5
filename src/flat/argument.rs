//! Typed constraint arguments.

use super::{Annotation, VarId};
use crate::domain::Domain;
use crate::error::{Error, Result};

/// A tagged constraint argument.
///
/// Arguments carry everything an extractor needs without reinspecting source
/// text. Typed accessors return [`Error::TypeError`] when the variant does
/// not match.
///
/// # Examples
///
/// ```
/// use cproute::flat::Argument;
///
/// let arg = Argument::Int(42);
/// assert_eq!(arg.value().unwrap(), 42);
/// assert!(arg.var().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// An integer constant.
    Int(i64),
    /// A reference to a model variable.
    Var(VarId),
    /// An array of integer constants.
    IntArray(Vec<i64>),
    /// An array of variable references.
    VarArray(Vec<VarId>),
    /// A set literal expressed as an interval `lo..hi`.
    Interval(i64, i64),
    /// A set literal expressed as an enumerated value set.
    Set(Vec<i64>),
    /// An annotation call used in argument position.
    Annotation(Annotation),
}

impl Argument {
    /// Returns `true` for an integer constant.
    pub fn is_constant(&self) -> bool {
        matches!(self, Argument::Int(_))
    }

    /// Returns `true` for a variable reference.
    pub fn is_var(&self) -> bool {
        matches!(self, Argument::Var(_))
    }

    /// The integer constant.
    pub fn value(&self) -> Result<i64> {
        match self {
            Argument::Int(value) => Ok(*value),
            other => Err(Error::TypeError(format!(
                "expected integer constant, got {other:?}"
            ))),
        }
    }

    /// The referenced variable.
    pub fn var(&self) -> Result<VarId> {
        match self {
            Argument::Var(id) => Ok(*id),
            other => Err(Error::TypeError(format!(
                "expected variable reference, got {other:?}"
            ))),
        }
    }

    /// The constant array.
    pub fn values(&self) -> Result<&[i64]> {
        match self {
            Argument::IntArray(values) => Ok(values),
            other => Err(Error::TypeError(format!(
                "expected constant array, got {other:?}"
            ))),
        }
    }

    /// The variable-reference array.
    pub fn vars(&self) -> Result<&[VarId]> {
        match self {
            Argument::VarArray(vars) => Ok(vars),
            other => Err(Error::TypeError(format!(
                "expected variable array, got {other:?}"
            ))),
        }
    }

    /// The set literal as a domain.
    pub fn set_domain(&self) -> Result<Domain> {
        match self {
            Argument::Interval(lo, hi) => Ok(Domain::interval(*lo, *hi)),
            Argument::Set(values) => Ok(Domain::values(values.clone())),
            other => Err(Error::TypeError(format!(
                "expected set literal, got {other:?}"
            ))),
        }
    }

    /// Replaces every reference to `from` with `to`.
    pub fn substitute(&mut self, from: VarId, to: VarId) {
        match self {
            Argument::Var(id) => {
                if *id == from {
                    *id = to;
                }
            }
            Argument::VarArray(vars) => {
                for id in vars.iter_mut() {
                    if *id == from {
                        *id = to;
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Argument::Int(3).value().unwrap(), 3);
        assert_eq!(Argument::Var(2).var().unwrap(), 2);
        assert_eq!(Argument::IntArray(vec![1, 2]).values().unwrap(), &[1, 2]);
        assert_eq!(Argument::VarArray(vec![0, 1]).vars().unwrap(), &[0, 1]);
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(
            Argument::Var(0).value(),
            Err(Error::TypeError(_))
        ));
        assert!(matches!(Argument::Int(1).vars(), Err(Error::TypeError(_))));
    }

    #[test]
    fn test_set_domain() {
        let d = Argument::Interval(1, 4).set_domain().unwrap();
        assert_eq!(d, Domain::interval(1, 4));
        let d = Argument::Set(vec![5, 1, 3]).set_domain().unwrap();
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![1, 3, 5]);
    }

    #[test]
    fn test_substitute() {
        let mut arg = Argument::VarArray(vec![0, 1, 0]);
        arg.substitute(0, 7);
        assert_eq!(arg.vars().unwrap(), &[7, 1, 7]);
    }
}
