//! Error taxonomy shared by every entry point
//!
//! Construction and shape errors are detected before any kernel work is
//! dispatched. Device and communication failures are fatal for the call in
//! flight. Hitting an iteration cap is not an error: see [`ConvergenceWarning`].

use thiserror::Error;

/// Errors returned by graph construction, the engine, and the collective layer
#[derive(Debug, Error)]
pub enum GraphError {
    /// Graph not built, or a view is missing a required orientation
    #[error("Invalid call: {0}")]
    InvalidCall(String),

    /// Parallel input arrays have different lengths
    #[error("Size mismatch for {what}: {left} vs {right}")]
    SizeMismatch {
        /// Which inputs disagree
        what: &'static str,
        /// Length of the first input
        left: usize,
        /// Length of the second input
        right: usize,
    },

    /// Identifier or weight dtype outside the supported set
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Edge list has no edges
    #[error("Dataset is empty")]
    DatasetEmpty,

    /// Renumbered vertex space does not fit the 32-bit id range
    #[error("Vertex id overflow: {count} distinct vertices exceed the limit of {limit}")]
    Overflow {
        /// Number of distinct vertices found
        count: usize,
        /// Largest supported vertex count
        limit: usize,
    },

    /// Kernel launch or device memory failure
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Collective transport failure; aborts the whole distributed call
    #[error("Communication failure: {0}")]
    CommunicationFailure(String),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, GraphError>;

/// Non-fatal: the iteration cap was reached before the tolerance was met
///
/// Carried alongside the last computed values, never returned as `Err`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceWarning {
    /// Iterations executed (equals the configured cap)
    pub iterations: usize,
    /// Convergence metric after the last iteration
    pub residual: f64,
    /// Tolerance the metric had to drop below
    pub tolerance: f64,
}

impl std::fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "did not converge after {} iterations (residual {:.3e} >= tolerance {:.3e})",
            self.iterations, self.residual, self.tolerance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GraphError::DatasetEmpty;
        assert_eq!(err.to_string(), "Dataset is empty");

        let err = GraphError::SizeMismatch {
            what: "source/destination",
            left: 3,
            right: 2,
        };
        assert_eq!(err.to_string(), "Size mismatch for source/destination: 3 vs 2");

        let err = GraphError::Overflow {
            count: 10,
            limit: 5,
        };
        assert!(err.to_string().contains("10 distinct vertices"));
    }

    #[test]
    fn test_convergence_warning_display() {
        let warning = ConvergenceWarning {
            iterations: 3,
            residual: 0.5,
            tolerance: 1e-6,
        };
        assert!(warning.to_string().starts_with("did not converge after 3 iterations"));
    }
}
