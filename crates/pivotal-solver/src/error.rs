use thiserror::Error;

/// Failures that abort a solve call.
///
/// Unbounded and infeasible models are not errors; they come back as a
/// [`SolutionStatus`](crate::SolutionStatus) on an ordinary result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Problem has no decision variables")]
    EmptyObjective,
    #[error("Constraint '{constraint}' has {found} coefficients, expected {expected}")]
    DimensionMismatch {
        constraint: String,
        expected: usize,
        found: usize,
    },
    #[error("Non-finite coefficient in {0}")]
    NonFiniteCoefficient(String),
    #[error("Constraint '{0}' is not in <= form with a non-negative right-hand side; use the dual simplex")]
    NotStandardForm(String),
    #[error("Not a 0/1 knapsack model: {0}")]
    NotKnapsack(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("Basis matrix is singular")]
    SingularBasis,
    #[error("Zero pivot at row {row}, column {column}")]
    ZeroPivot { row: usize, column: usize },
    #[error("Iteration limit of {0} exceeded")]
    IterationLimit(usize),
}
