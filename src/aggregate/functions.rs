//! Built-in aggregate functions: SUM, AVG, COUNT, MIN, MAX.

use crate::error::Result;
use crate::expr::{EvalContext, Expr};
use crate::function::{single_arg, AggregateFunction, Arity, ScalarFunction};
use crate::types::{Category, DataType, Value};
use crate::vector::{ValueVector, VectorBuilder, VectorRef};

use super::engine::{numeric_result_type, NumericAggregator};
use super::minmax::{comparable_result_type, Extreme, MinMaxAggregator};
use super::reducer::ReducerKind;
use super::window::{ensure_groups, evaluate_groups, group_window};
use super::{ensure_all, AggregateMode};

macro_rules! numeric_function {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl ScalarFunction for $name {
            fn name(&self) -> &str {
                $kind.name()
            }

            fn arity(&self) -> Arity {
                Arity::Fixed(1)
            }

            fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
                numeric_result_type($kind.name(), single_arg($kind.name(), args)?)
            }

            fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
                let arg = ctx.evaluate(single_arg($kind.name(), args)?)?;
                NumericAggregator::new($kind).evaluate_scalar(&arg, ctx.config())
            }
        }

        impl AggregateFunction for $name {
            fn name(&self) -> &str {
                $kind.name()
            }

            fn arity(&self) -> Arity {
                Arity::Fixed(1)
            }

            fn resolve_aggregate_type(&self, args: &[DataType]) -> Result<DataType> {
                numeric_result_type($kind.name(), single_arg($kind.name(), args)?)
            }

            fn evaluate_grouped(
                &self,
                args: &[Expr],
                mode: AggregateMode,
                groups: &dyn ValueVector,
                ctx: &EvalContext<'_>,
            ) -> Result<VectorRef> {
                ensure_all($kind.name(), mode)?;
                let arg = single_arg($kind.name(), args)?;
                NumericAggregator::new($kind).evaluate_grouped(arg, groups, ctx)
            }
        }
    };
}

macro_rules! extreme_function {
    ($(#[$meta:meta])* $name:ident, $extreme:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl ScalarFunction for $name {
            fn name(&self) -> &str {
                $extreme.name()
            }

            fn arity(&self) -> Arity {
                Arity::Fixed(1)
            }

            fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
                comparable_result_type($extreme.name(), single_arg($extreme.name(), args)?)
            }

            fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
                let arg = ctx.evaluate(single_arg($extreme.name(), args)?)?;
                MinMaxAggregator::new($extreme).evaluate_scalar(&arg)
            }
        }

        impl AggregateFunction for $name {
            fn name(&self) -> &str {
                $extreme.name()
            }

            fn arity(&self) -> Arity {
                Arity::Fixed(1)
            }

            fn resolve_aggregate_type(&self, args: &[DataType]) -> Result<DataType> {
                comparable_result_type($extreme.name(), single_arg($extreme.name(), args)?)
            }

            fn evaluate_grouped(
                &self,
                args: &[Expr],
                mode: AggregateMode,
                groups: &dyn ValueVector,
                ctx: &EvalContext<'_>,
            ) -> Result<VectorRef> {
                ensure_all($extreme.name(), mode)?;
                let arg = single_arg($extreme.name(), args)?;
                MinMaxAggregator::new($extreme).evaluate_grouped(arg, groups, ctx)
            }
        }
    };
}

numeric_function!(
    /// Overflow-checked sum of the non-null elements.
    SumFunction,
    ReducerKind::Sum
);

numeric_function!(
    /// Mean of the non-null elements, in the element lane.
    AvgFunction,
    ReducerKind::Avg
);

extreme_function!(
    /// Smallest non-null element; ties keep the first.
    MinFunction,
    Extreme::Min
);

extreme_function!(
    /// Largest non-null element; ties keep the first.
    MaxFunction,
    Extreme::Max
);

/// Number of non-null elements. Never null.
///
/// Without an argument, or with a literal argument, grouped mode counts the
/// member rows of each group without evaluating anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountFunction;

const COUNT: &str = "COUNT";

impl CountFunction {
    fn count_rows(groups: &dyn ValueVector, literal: Option<&Value>) -> Result<VectorRef> {
        let mut builder = VectorBuilder::new(DataType::Int64, groups.len());
        let counts_nothing = literal.is_some_and(Value::is_null);
        for group in 0..groups.len() {
            let count = if counts_nothing || groups.is_null(group) {
                0
            } else {
                groups.get_table(group).num_rows()
            };
            builder.set_int64(group, count as i64);
        }
        builder.build()
    }
}

/// Non-null elements of one scalar-mode row.
fn count_row(vector: &dyn ValueVector, row: usize) -> usize {
    if vector.is_null(row) {
        return 0;
    }
    if vector.data_type().category() == Category::Array {
        let nested = vector.get_array(row);
        return (0..nested.len()).filter(|&i| !nested.is_null(i)).count();
    }
    1
}

impl ScalarFunction for CountFunction {
    fn name(&self) -> &str {
        COUNT
    }

    fn arity(&self) -> Arity {
        Arity::Range(0, 1)
    }

    fn resolve_scalar_type(&self, _args: &[DataType]) -> Result<DataType> {
        Ok(DataType::Int64)
    }

    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
        let mut builder = VectorBuilder::new(DataType::Int64, ctx.num_rows());
        match args.first() {
            None => {
                for row in 0..ctx.num_rows() {
                    builder.set_int64(row, 1);
                }
            }
            Some(arg) => {
                let vector = ctx.evaluate(arg)?;
                for row in 0..vector.len() {
                    builder.set_int64(row, count_row(vector.as_ref(), row) as i64);
                }
            }
        }
        builder.build()
    }
}

impl AggregateFunction for CountFunction {
    fn name(&self) -> &str {
        COUNT
    }

    fn arity(&self) -> Arity {
        Arity::Range(0, 1)
    }

    fn resolve_aggregate_type(&self, _args: &[DataType]) -> Result<DataType> {
        Ok(DataType::Int64)
    }

    fn evaluate_grouped(
        &self,
        args: &[Expr],
        mode: AggregateMode,
        groups: &dyn ValueVector,
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef> {
        ensure_all(COUNT, mode)?;
        ensure_groups(COUNT, groups)?;
        let arg = match args.first() {
            None => return Self::count_rows(groups, None),
            Some(Expr::Literal { value, .. }) => return Self::count_rows(groups, Some(value)),
            Some(arg) => arg,
        };
        let vectors = evaluate_groups(COUNT, arg, groups, ctx)?;
        let mut builder = VectorBuilder::new(DataType::Int64, vectors.len());
        for (group, vector) in vectors.iter().enumerate() {
            let count: usize = vector.as_ref().map_or(0, |vector| {
                group_window(vector)
                    .iter()
                    .map(|segment| {
                        segment
                            .range
                            .clone()
                            .filter(|&i| !segment.vector.is_null(i))
                            .count()
                    })
                    .sum()
            });
            builder.set_int64(group, count as i64);
        }
        builder.build()
    }
}
