//! Solve and constraint annotations.

use super::VarId;

/// An annotation attached to a constraint or to the solve goal.
///
/// Annotations are carried through presolve untouched except for variable
/// substitution; unrecognised ones are reported at warning severity and
/// otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// A bare identifier, e.g. `input_order`.
    Atom(String),
    /// A call with arguments, e.g. `int_search(vars, input_order, ...)`.
    Call(String, Vec<Annotation>),
    /// A variable reference.
    Var(VarId),
    /// An array of variable references.
    VarArray(Vec<VarId>),
    /// An integer literal.
    Int(i64),
}

impl Annotation {
    /// Returns the call arguments if this is a call with the given name.
    pub fn call_args(&self, name: &str) -> Option<&[Annotation]> {
        match self {
            Annotation::Call(call_name, args) if call_name == name => Some(args),
            _ => None,
        }
    }

    /// Returns `true` for the atom with the given name.
    pub fn is_atom(&self, name: &str) -> bool {
        matches!(self, Annotation::Atom(atom) if atom == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_args() {
        let ann = Annotation::Call(
            "int_search".to_string(),
            vec![Annotation::Atom("input_order".to_string())],
        );
        assert!(ann.call_args("int_search").is_some());
        assert!(ann.call_args("bool_search").is_none());
        assert_eq!(ann.call_args("int_search").map(|a| a.len()), Some(1));
    }

    #[test]
    fn test_is_atom() {
        assert!(Annotation::Atom("complete".to_string()).is_atom("complete"));
        assert!(!Annotation::Int(3).is_atom("complete"));
    }
}
