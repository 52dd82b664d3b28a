//! Higher-order functions over lambdas: MAP, FILTER, FLAT_MAP and the
//! ANY/ALL/NONE_MATCH family.
//!
//! Every function evaluates its lambda through [`apply_lambda`], which picks
//! one of two shapes from the argument's type:
//!
//! - non-list arguments bind the parameter to the whole argument vector and
//!   evaluate the body once, row-aligned;
//! - array and table arguments bind the parameter per outer row to that
//!   row's elements (table rows are seen as objects), with outer columns and
//!   parameters broadcast from the current row.

mod filter;
mod map;
mod matching;

use std::ops::Range;
use std::sync::Arc;

use crate::error::{ColvexError, Result};
use crate::expr::{EvalContext, Expr, ParamId};
use crate::function::LambdaBinding;
use crate::types::{Category, DataType};
use crate::vector::{RowSetObjects, ValueVector, VectorRef};

pub use filter::{FilterFunction, LazyFilter};
pub use map::{FlatMapFunction, MapFunction};
pub use matching::{MatchFunction, MatchKind};

/// Argument layout shared by every lambda function: `f(source, x -> body)`.
pub(crate) const LAMBDA_BINDINGS: &[LambdaBinding] = &[LambdaBinding {
    source: 0,
    lambda: 1,
}];

/// What one outer row of a lambda application produced.
#[derive(Debug, Clone, Copy)]
pub struct LambdaOutput<'r> {
    /// Outer row index.
    pub row: usize,
    /// Values the parameter was bound to: the nested elements of a list
    /// row, otherwise the whole argument vector.
    pub input: &'r VectorRef,
    /// Lambda result aligned with `input`; `None` for a null outer row.
    pub result: Option<&'r VectorRef>,
    /// True when `input` holds the elements of a list row.
    pub list: bool,
}

impl LambdaOutput<'_> {
    /// Positions of `input` and `result` belonging to this row.
    #[must_use]
    pub fn positions(&self) -> Range<usize> {
        if self.list {
            0..self.input.len()
        } else {
            self.row..self.row + 1
        }
    }
}

/// Splits a lambda expression into its parameter and body.
///
/// # Errors
///
/// Returns a function error if `expr` is not a lambda.
pub fn lambda_parts<'e>(name: &str, expr: &'e Expr) -> Result<(ParamId, &'e Expr)> {
    match expr {
        Expr::Lambda { param, body, .. } => Ok((*param, body)),
        other => Err(ColvexError::FunctionError(format!(
            "{name} expects a lambda, got {other:?}"
        ))),
    }
}

/// Evaluates `lambda` over `argument` and hands every outer row to
/// `consumer`, in row order.
///
/// `argument` must be row-aligned with `ctx`. On the non-list path the body
/// is not evaluated at all when every argument row is null.
///
/// # Errors
///
/// Propagates evaluation errors of the body and errors returned by
/// `consumer`.
pub fn apply_lambda<F>(
    name: &str,
    argument: &VectorRef,
    lambda: &Expr,
    ctx: &EvalContext<'_>,
    mut consumer: F,
) -> Result<()>
where
    F: FnMut(LambdaOutput<'_>) -> Result<()>,
{
    let (param, body) = lambda_parts(name, lambda)?;
    if !argument.data_type().is_list_like() {
        let all_null = argument.is_nullable() && (0..argument.len()).all(|r| argument.is_null(r));
        let result = if all_null {
            log::trace!("{name}: every argument row is null, skipping the lambda body");
            None
        } else {
            Some(ctx.bind(param, argument.clone()).evaluate(body)?)
        };
        for row in 0..argument.len() {
            let result = result.as_ref().filter(|_| !argument.is_null(row));
            consumer(LambdaOutput {
                row,
                input: argument,
                result,
                list: false,
            })?;
        }
        return Ok(());
    }

    let table = argument.data_type().category() == Category::Table;
    for row in 0..argument.len() {
        if argument.is_null(row) {
            consumer(LambdaOutput {
                row,
                input: argument,
                result: None,
                list: true,
            })?;
            continue;
        }
        let nested: VectorRef = if table {
            Arc::new(RowSetObjects::new(argument.get_table(row)))
        } else {
            argument.get_array(row)
        };
        log::trace!("{name}: row {row} binds {} elements", nested.len());
        let result = ctx.nested(row, param, nested.clone()).evaluate(body)?;
        consumer(LambdaOutput {
            row,
            input: &nested,
            result: Some(&result),
            list: true,
        })?;
    }
    Ok(())
}

/// Reads a predicate result; `None` for null or non-boolean values.
pub(crate) fn predicate_at(vector: &dyn ValueVector, index: usize) -> Option<bool> {
    if vector.is_null(index) {
        return None;
    }
    match vector.data_type().category() {
        Category::Boolean => Some(vector.get_bool(index)),
        _ => vector.value(index).as_bool(),
    }
}

/// Checks that a lambda body can serve as a predicate.
pub(crate) fn ensure_predicate(name: &str, body: &DataType) -> Result<()> {
    if crate::expr::is_predicate_type(body) {
        Ok(())
    } else {
        Err(ColvexError::type_error(
            format!("BOOLEAN lambda result for {name}"),
            body,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalConfig;
    use crate::expr::ArithmeticOp;
    use crate::types::Value;
    use crate::vector::{from_values, to_values};

    fn times_ten(data_type: DataType) -> Expr {
        let body = Expr::arithmetic(
            Expr::param(1, DataType::Int64),
            ArithmeticOp::Mul,
            Expr::literal(10i64),
        )
        .unwrap();
        Expr::lambda(1, data_type, body)
    }

    #[test]
    fn test_scalar_path_evaluates_once() {
        let config = EvalConfig::default();
        let argument =
            from_values(&DataType::Int64, &[Value::Int64(1), Value::Null, Value::Int64(3)])
                .unwrap();
        let ctx = EvalContext::without_columns(3, &config);
        let mut seen = Vec::new();
        apply_lambda("T", &argument, &times_ten(DataType::Int64), &ctx, |out| {
            assert!(!out.list);
            seen.push(out.result.map(|r| r.value(out.row)));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![Some(Value::Int64(10)), None, Some(Value::Int64(30))]
        );
    }

    #[test]
    fn test_scalar_path_all_null_skips_body() {
        let config = EvalConfig::default();
        let argument = from_values(&DataType::Int64, &[Value::Null, Value::Null]).unwrap();
        let ctx = EvalContext::without_columns(2, &config);
        // An unbound parameter would fail if the body were evaluated.
        let lambda = Expr::lambda(1, DataType::Int64, Expr::param(9, DataType::Int64));
        let mut rows = 0;
        apply_lambda("T", &argument, &lambda, &ctx, |out| {
            assert!(out.result.is_none());
            rows += 1;
            Ok(())
        })
        .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_list_path_binds_elements() {
        let config = EvalConfig::default();
        let dt = DataType::array(DataType::Int64);
        let argument = from_values(
            &dt,
            &[
                Value::List(vec![Value::Int64(1), Value::Int64(2)]),
                Value::Null,
                Value::List(vec![]),
            ],
        )
        .unwrap();
        let ctx = EvalContext::without_columns(3, &config);
        let mut seen = Vec::new();
        apply_lambda("T", &argument, &times_ten(DataType::Int64), &ctx, |out| {
            assert!(out.list);
            seen.push(out.result.map(|r| to_values(r.as_ref())));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            seen,
            vec![
                Some(vec![Value::Int64(10), Value::Int64(20)]),
                None,
                Some(vec![]),
            ]
        );
    }

    #[test]
    fn test_not_a_lambda() {
        let err = lambda_parts("MAP", &Expr::literal(1)).unwrap_err();
        assert!(matches!(err, ColvexError::FunctionError(_)));
    }

    #[test]
    fn test_predicate_at_any() {
        let v = from_values(&DataType::Any, &[Value::Bool(true), Value::Int32(1), Value::Null])
            .unwrap();
        assert_eq!(predicate_at(v.as_ref(), 0), Some(true));
        assert_eq!(predicate_at(v.as_ref(), 1), None);
        assert_eq!(predicate_at(v.as_ref(), 2), None);
    }
}
