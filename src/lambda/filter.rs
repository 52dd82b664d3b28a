//! FILTER.

use std::sync::Arc;

use crate::error::Result;
use crate::expr::{EvalContext, Expr, ParamId};
use crate::function::{lambda_args, Arity, LambdaBinding, ScalarFunction};
use crate::types::{Category, DataType, Value};
use crate::vector::{from_values, Selection, SelectionView, VectorBuilder, VectorRef};

use super::{apply_lambda, ensure_predicate, lambda_parts, predicate_at, LAMBDA_BINDINGS};

/// `FILTER(source, x -> predicate)`: keeps the elements whose predicate is
/// true.
///
/// Array rows become selection views over their own elements and table rows
/// become selections of their member rows. A non-list value is kept when
/// the predicate holds and nulled otherwise. `Any` arguments are filtered
/// value by value through [`LazyFilter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterFunction;

impl ScalarFunction for FilterFunction {
    fn name(&self) -> &str {
        "FILTER"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn lambda_bindings(&self) -> &[LambdaBinding] {
        LAMBDA_BINDINGS
    }

    fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
        let (source, body) = lambda_args(self.name(), args)?;
        ensure_predicate(self.name(), body)?;
        Ok(source.clone())
    }

    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
        let (source, lambda) = lambda_args(self.name(), args)?;
        let argument = ctx.evaluate(source)?;
        if argument.data_type().category() == Category::Any {
            return filter_dynamic(&argument, lambda, ctx);
        }

        let mut builder = VectorBuilder::new(argument.data_type().clone(), argument.len());
        apply_lambda(self.name(), &argument, lambda, ctx, |out| {
            let Some(result) = out.result else {
                builder.set_null(out.row);
                return Ok(());
            };
            if !out.list {
                if predicate_at(result.as_ref(), out.row) == Some(true) {
                    builder.copy(out.row, argument.as_ref(), out.row)?;
                } else {
                    builder.set_null(out.row);
                }
                return Ok(());
            }
            let keep: Vec<usize> = out
                .positions()
                .filter(|&i| predicate_at(result.as_ref(), i) == Some(true))
                .collect();
            let selection = Selection::indices(keep);
            match out.input.as_row_set() {
                Some(rows) => builder.set_table(out.row, rows.select(&selection)),
                None => builder.set_array(
                    out.row,
                    Arc::new(SelectionView::new(out.input.clone(), selection)),
                ),
            }
            Ok(())
        })?;
        builder.build()
    }
}

/// Filters dynamically typed rows: list values element by element, other
/// values as a whole.
fn filter_dynamic(
    argument: &VectorRef,
    lambda: &Expr,
    ctx: &EvalContext<'_>,
) -> Result<VectorRef> {
    let (param, body) = lambda_parts("FILTER", lambda)?;
    let mut builder = VectorBuilder::new(DataType::Any, argument.len());
    for row in 0..argument.len() {
        match argument.value(row) {
            Value::Null => builder.set_null(row),
            Value::List(items) => {
                let kept = LazyFilter::new(items.into_iter(), param, body, ctx, row)
                    .collect::<Result<Vec<Value>>>()?;
                builder.set_object(row, Value::List(kept));
            }
            value => {
                let mut single = LazyFilter::new(std::iter::once(value), param, body, ctx, row);
                match single.next().transpose()? {
                    Some(kept) => builder.set_object(row, kept),
                    None => builder.set_null(row),
                }
            }
        }
    }
    builder.build()
}

/// Single-pass filter over boxed values of one outer row.
///
/// The lambda parameter is rebound to each source value in turn; outer
/// columns and parameters are broadcast from `row`. Evaluation errors are
/// yielded in place of the failing value.
pub struct LazyFilter<'c, 'a, I> {
    source: I,
    param: ParamId,
    body: &'c Expr,
    ctx: &'c EvalContext<'a>,
    row: usize,
}

impl<'c, 'a, I> LazyFilter<'c, 'a, I>
where
    I: Iterator<Item = Value>,
{
    /// Creates a filter evaluating `body` with `param` bound to each value.
    #[must_use]
    pub fn new(
        source: I,
        param: ParamId,
        body: &'c Expr,
        ctx: &'c EvalContext<'a>,
        row: usize,
    ) -> Self {
        LazyFilter {
            source,
            param,
            body,
            ctx,
            row,
        }
    }

    fn accepts(&self, value: &Value) -> Result<bool> {
        let bound = from_values(&DataType::Any, std::slice::from_ref(value))?;
        let verdict = self
            .ctx
            .nested(self.row, self.param, bound)
            .evaluate(self.body)?;
        Ok(predicate_at(verdict.as_ref(), 0) == Some(true))
    }
}

impl<I> Iterator for LazyFilter<'_, '_, I>
where
    I: Iterator<Item = Value>,
{
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(value) = self.source.next() {
            match self.accepts(&value) {
                Ok(true) => return Some(Ok(value)),
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
