//! Crate-wide error type.

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building or translating models.
///
/// Search-time outcomes (timeout, no solution found) are reported as
/// [`crate::routing::RoutingStatus`] values, not as errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The dispatcher reached a constraint tag with no implementation.
    #[error("unsupported constraint: {0}")]
    UnsupportedConstraint(String),

    /// A set-valued variable reached dispatch or printing.
    #[error("set variables are not supported")]
    UnsupportedSetVariable,

    /// A flat argument accessor received the wrong variant.
    #[error("type error: {0}")]
    TypeError(String),

    /// Mutation was attempted after the routing model was closed.
    #[error("the model is closed")]
    ModelClosed,

    /// A route referenced a variable index outside the model.
    #[error("invalid index: {0}")]
    InvalidIndex(i64),

    /// A route referenced a node outside the external node id space.
    #[error("invalid node: {0}")]
    InvalidNode(i64),

    /// A route assigned a node to a vehicle excluded by its vehicle variable.
    #[error("vehicle {vehicle} is not allowed at index {index}")]
    VehicleNotAllowed { vehicle: usize, index: usize },

    /// A node was listed twice across routes.
    #[error("index {0} is used multiple times")]
    DuplicateIndex(i64),

    /// A route referenced a node that can no longer be active.
    #[error("index {0} is not active")]
    InactiveNodeUsed(i64),

    /// Posted constraints prove the model infeasible.
    #[error("the model is infeasible")]
    Infeasible,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::UnsupportedConstraint("int_mod".to_string());
        assert_eq!(e.to_string(), "unsupported constraint: int_mod");
        let e = Error::VehicleNotAllowed {
            vehicle: 2,
            index: 5,
        };
        assert_eq!(e.to_string(), "vehicle 2 is not allowed at index 5");
    }
}
