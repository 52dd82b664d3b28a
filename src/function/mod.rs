//! Function registration contract.
//!
//! Scalar functions evaluate row-aligned over the current rows; aggregate
//! functions evaluate once per group of a table-typed vector. Numeric
//! aggregates implement both traits so they can run in either mode.

mod registry;

use std::fmt;

use crate::aggregate::AggregateMode;
use crate::error::{ColvexError, Result};
use crate::expr::{EvalContext, Expr};
use crate::types::DataType;
use crate::vector::{ValueVector, VectorRef};

pub use registry::FunctionRegistry;

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(usize),
    /// Between `min` and `max` arguments, inclusive.
    Range(usize, usize),
    /// At least this many arguments.
    Variadic(usize),
}

impl Arity {
    /// Returns true if `count` arguments are acceptable.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Variadic(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Range(min, max) => write!(f, "{min} to {max}"),
            Arity::Variadic(min) => write!(f, "at least {min}"),
        }
    }
}

/// Associates a lambda argument with the argument supplying its values.
///
/// The lambda's parameter binds to the evaluated `source` argument: to the
/// whole vector for scalar arguments, or per row to the nested vector for
/// list-like arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LambdaBinding {
    /// Position of the argument whose values the parameter binds to.
    pub source: usize,
    /// Position of the lambda argument.
    pub lambda: usize,
}

/// A row-aligned function.
pub trait ScalarFunction: fmt::Debug + Send + Sync {
    /// Canonical (upper-case) name.
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Lambda arguments and their sources.
    fn lambda_bindings(&self) -> &[LambdaBinding] {
        &[]
    }

    /// Resolves the static result type from the argument types.
    ///
    /// # Errors
    ///
    /// Returns a type error for unsupported argument types.
    fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType>;

    /// Evaluates the function over the rows of `ctx`.
    ///
    /// # Errors
    ///
    /// Propagates argument evaluation and function-specific errors.
    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef>;
}

/// A function producing one value per group.
pub trait AggregateFunction: fmt::Debug + Send + Sync {
    /// Canonical (upper-case) name.
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    /// Resolves the static result type from the argument types.
    ///
    /// # Errors
    ///
    /// Returns a type error for unsupported argument types.
    fn resolve_aggregate_type(&self, args: &[DataType]) -> Result<DataType>;

    /// Evaluates the aggregate once per row of the table-typed `groups`.
    ///
    /// # Errors
    ///
    /// Returns a shape error if `groups` is not table-typed, an
    /// unsupported-operation error for modes the function does not
    /// implement, and propagates evaluation errors.
    fn evaluate_grouped(
        &self,
        args: &[Expr],
        mode: AggregateMode,
        groups: &dyn ValueVector,
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef>;
}

/// Returns the single argument of a one-argument call.
pub(crate) fn single_arg<'a, T>(name: &str, args: &'a [T]) -> Result<&'a T> {
    match args {
        [arg] => Ok(arg),
        _ => Err(ColvexError::FunctionError(format!(
            "{name} expects 1 argument, got {}",
            args.len()
        ))),
    }
}

/// Returns the (argument, lambda) pair of a two-argument lambda call.
pub(crate) fn lambda_args<'a, T>(name: &str, args: &'a [T]) -> Result<(&'a T, &'a T)> {
    match args {
        [source, lambda] => Ok((source, lambda)),
        _ => Err(ColvexError::FunctionError(format!(
            "{name} expects 2 arguments, got {}",
            args.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_accepts() {
        assert!(Arity::Fixed(2).accepts(2));
        assert!(!Arity::Fixed(2).accepts(1));
        assert!(Arity::Range(0, 1).accepts(0));
        assert!(!Arity::Range(0, 1).accepts(2));
        assert!(Arity::Variadic(1).accepts(5));
        assert!(!Arity::Variadic(1).accepts(0));
    }

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::Range(0, 1).to_string(), "0 to 1");
        assert_eq!(Arity::Variadic(2).to_string(), "at least 2");
    }

    #[test]
    fn test_arg_helpers() {
        assert_eq!(*single_arg("F", &[1]).unwrap(), 1);
        assert!(single_arg::<i32>("F", &[]).is_err());
        assert_eq!(lambda_args("F", &[1, 2]).unwrap(), (&1, &2));
        assert!(lambda_args("F", &[1]).is_err());
    }
}
