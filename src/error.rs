//! Error types for colvex evaluation.

use arrow::error::ArrowError;
use thiserror::Error;

/// Result type alias using [`ColvexError`].
pub type Result<T> = std::result::Result<T, ColvexError>;

/// Error types raised while evaluating expressions, aggregates and lambdas.
#[derive(Debug, Error)]
pub enum ColvexError {
    /// An argument's resolved type is incompatible with the function.
    #[error("Type error: expected {expected}, got {actual}")]
    TypeError { expected: String, actual: String },

    /// The requested mode or feature is not implemented by the function.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Exact-checked arithmetic overflowed.
    #[error("Arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    /// A vector or row-set has the wrong shape for the requested entry point.
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Malformed expression tree (unbound parameter, missing column, ...).
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    /// Function lookup, registration or arity failures.
    #[error("Function error: {0}")]
    FunctionError(String),

    /// General execution errors.
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Errors raised by Arrow compute kernels.
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

impl ColvexError {
    /// Builds a [`ColvexError::TypeError`] from anything displayable.
    pub fn type_error(expected: impl Into<String>, actual: impl std::fmt::Display) -> Self {
        ColvexError::TypeError {
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }
}
