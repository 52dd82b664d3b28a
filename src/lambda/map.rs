//! MAP and FLAT_MAP.

use std::ops::Range;

use crate::error::Result;
use crate::expr::{EvalContext, Expr};
use crate::function::{lambda_args, Arity, LambdaBinding, ScalarFunction};
use crate::types::{Category, DataType, Value};
use crate::vector::{build_list, VectorBuilder, VectorRef};

use super::{apply_lambda, LAMBDA_BINDINGS};

/// `MAP(source, x -> body)`: applies the lambda to every element of an
/// array (or table) row, or to the value of a non-list row.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapFunction;

fn map_type(source: &DataType, body: &DataType) -> DataType {
    if source.is_list_like() {
        DataType::array(body.clone())
    } else {
        body.clone()
    }
}

impl ScalarFunction for MapFunction {
    fn name(&self) -> &str {
        "MAP"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn lambda_bindings(&self) -> &[LambdaBinding] {
        LAMBDA_BINDINGS
    }

    fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
        let (source, body) = lambda_args(self.name(), args)?;
        Ok(map_type(source, body))
    }

    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
        let (source, lambda) = lambda_args(self.name(), args)?;
        let argument = ctx.evaluate(source)?;
        let output = map_type(argument.data_type(), lambda.data_type());
        let mut builder = VectorBuilder::new(output, argument.len());
        apply_lambda(self.name(), &argument, lambda, ctx, |out| {
            match out.result {
                None => builder.set_null(out.row),
                Some(result) if out.list => builder.set_array(out.row, result.clone()),
                Some(result) => builder.copy(out.row, result.as_ref(), out.row)?,
            }
            Ok(())
        })?;
        builder.build()
    }
}

/// `FLAT_MAP(source, x -> body)`: like MAP, but array results are unrolled
/// into one array per outer row.
///
/// An `Any` result is inspected per value: lists are unrolled, anything
/// else is kept as one element. Null array results contribute no elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatMapFunction;

/// Element type of the unrolled output.
fn flat_element(body: &DataType) -> DataType {
    body.element_type().unwrap_or(body).clone()
}

/// A run of output elements of one row.
#[derive(Debug)]
enum Piece {
    Elements(VectorRef, Range<usize>),
    Boxed(Vec<Value>),
}

impl Piece {
    fn len(&self) -> usize {
        match self {
            Piece::Elements(_, range) => range.len(),
            Piece::Boxed(values) => values.len(),
        }
    }
}

/// Unrolls `result[index]` into `pieces`.
fn unroll(result: &VectorRef, index: usize, pieces: &mut Vec<Piece>) {
    match result.data_type().category() {
        Category::Array => {
            if !result.is_null(index) {
                let nested = result.get_array(index);
                let range = 0..nested.len();
                pieces.push(Piece::Elements(nested, range));
            }
        }
        Category::Any => match result.value(index) {
            Value::List(items) => pieces.push(Piece::Boxed(items)),
            other => pieces.push(Piece::Boxed(vec![other])),
        },
        _ => pieces.push(Piece::Elements(result.clone(), index..index + 1)),
    }
}

impl ScalarFunction for FlatMapFunction {
    fn name(&self) -> &str {
        "FLAT_MAP"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(2)
    }

    fn lambda_bindings(&self) -> &[LambdaBinding] {
        LAMBDA_BINDINGS
    }

    fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
        let (_, body) = lambda_args(self.name(), args)?;
        Ok(DataType::array(flat_element(body)))
    }

    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
        let (source, lambda) = lambda_args(self.name(), args)?;
        let argument = ctx.evaluate(source)?;
        let mut rows: Vec<Option<Vec<Piece>>> = Vec::with_capacity(argument.len());
        apply_lambda(self.name(), &argument, lambda, ctx, |out| {
            let pieces = out.result.map(|result| {
                let mut pieces = Vec::new();
                for index in out.positions() {
                    unroll(result, index, &mut pieces);
                }
                pieces
            });
            rows.push(pieces);
            Ok(())
        })?;

        let lengths: Vec<Option<usize>> = rows
            .iter()
            .map(|row| row.as_ref().map(|pieces| pieces.iter().map(Piece::len).sum()))
            .collect();
        let total: usize = lengths.iter().flatten().sum();
        log::debug!("FLAT_MAP unrolled {} rows into {total} elements", rows.len());

        let mut elements = VectorBuilder::new(flat_element(lambda.data_type()), total);
        let mut pos = 0;
        for piece in rows.iter().flatten().flatten() {
            match piece {
                Piece::Elements(vector, range) => {
                    for index in range.clone() {
                        elements.copy(pos, vector.as_ref(), index)?;
                        pos += 1;
                    }
                }
                Piece::Boxed(values) => {
                    for value in values {
                        elements.set_value(pos, value)?;
                        pos += 1;
                    }
                }
            }
        }
        build_list(elements, &lengths)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::EvalConfig;
    use crate::expr::{ArithmeticOp, ParamId};
    use crate::types::{ColumnDef, Schema};
    use crate::vector::{from_values, to_values, RowSet, TableVector};

    const X: ParamId = 1;

    fn ints(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int64).collect())
    }

    fn array_ctx<'a>(config: &'a EvalConfig, rows: &[Value]) -> EvalContext<'a> {
        let dt = DataType::array(DataType::Int64);
        let argument = from_values(&dt, rows).unwrap();
        EvalContext::without_columns(rows.len(), config).bind(0, argument)
    }

    fn source() -> Expr {
        Expr::param(0, DataType::array(DataType::Int64))
    }

    fn x() -> Expr {
        Expr::param(X, DataType::Int64)
    }

    #[test]
    fn test_map_arrays() {
        let config = EvalConfig::default();
        let ctx = array_ctx(&config, &[ints(&[1, 2]), Value::Null, ints(&[])]);
        let body = Expr::arithmetic(x(), ArithmeticOp::Add, Expr::literal(1i64)).unwrap();
        let call = Expr::call(
            Arc::new(MapFunction),
            vec![source(), Expr::lambda(X, DataType::Int64, body)],
        )
        .unwrap();
        assert_eq!(call.data_type(), &DataType::array(DataType::Int64));
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(
            to_values(result.as_ref()),
            vec![ints(&[2, 3]), Value::Null, ints(&[])]
        );
    }

    #[test]
    fn test_map_sees_outer_columns() {
        let config = EvalConfig::default();
        let schema = Arc::new(Schema::new(vec![
            ColumnDef::new("k", DataType::Int64),
            ColumnDef::new("a", DataType::array(DataType::Int64)),
        ]));
        let k = from_values(&DataType::Int64, &[Value::Int64(100), Value::Int64(200)]).unwrap();
        let a = from_values(
            &DataType::array(DataType::Int64),
            &[ints(&[1, 2]), ints(&[3])],
        )
        .unwrap();
        let rows = RowSet::try_new(schema, vec![k, a]).unwrap();
        let ctx = EvalContext::new(rows, &config);
        let body = Expr::arithmetic(x(), ArithmeticOp::Add, Expr::column("k", DataType::Int64))
            .unwrap();
        let call = Expr::call(
            Arc::new(MapFunction),
            vec![
                Expr::column("a", DataType::array(DataType::Int64)),
                Expr::lambda(X, DataType::Int64, body),
            ],
        )
        .unwrap();
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(
            to_values(result.as_ref()),
            vec![ints(&[101, 102]), ints(&[203])]
        );
    }

    #[test]
    fn test_map_table_rows_as_objects() {
        let config = EvalConfig::default();
        let schema = Arc::new(Schema::new(vec![ColumnDef::new("v", DataType::Int64)]));
        let v = from_values(&DataType::Int64, &[1, 2, 3].map(Value::Int64)).unwrap();
        let rows = RowSet::try_new(schema.clone(), vec![v]).unwrap();
        let groups: VectorRef = Arc::new(TableVector::from_groups(&rows, &[vec![0, 2], vec![1]]));
        let ctx = EvalContext::without_columns(2, &config).bind(0, groups);
        let member = Expr::param(X, DataType::Object(schema.clone()));
        let body = Expr::field(member, "v").unwrap();
        let call = Expr::call(
            Arc::new(MapFunction),
            vec![
                Expr::param(0, DataType::Table(schema.clone())),
                Expr::lambda(X, DataType::Object(schema), body),
            ],
        )
        .unwrap();
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(to_values(result.as_ref()), vec![ints(&[1, 3]), ints(&[2])]);
    }

    #[test]
    fn test_map_scalar_argument() {
        let config = EvalConfig::default();
        let argument = from_values(&DataType::Int64, &[Value::Int64(4), Value::Null]).unwrap();
        let ctx = EvalContext::without_columns(2, &config).bind(0, argument);
        let body = Expr::arithmetic(x(), ArithmeticOp::Mul, x()).unwrap();
        let call = Expr::call(
            Arc::new(MapFunction),
            vec![
                Expr::param(0, DataType::Int64),
                Expr::lambda(X, DataType::Int64, body),
            ],
        )
        .unwrap();
        assert_eq!(call.data_type(), &DataType::Int64);
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(to_values(result.as_ref()), vec![Value::Int64(16), Value::Null]);
    }

    #[test]
    fn test_flat_map_unrolls_arrays() {
        let config = EvalConfig::default();
        let ctx = array_ctx(&config, &[ints(&[1, 2]), Value::Null]);
        let body = Expr::make_array(vec![x(), x()]);
        let call = Expr::call(
            Arc::new(FlatMapFunction),
            vec![source(), Expr::lambda(X, DataType::Int64, body)],
        )
        .unwrap();
        assert_eq!(call.data_type(), &DataType::array(DataType::Int64));
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(
            to_values(result.as_ref()),
            vec![ints(&[1, 1, 2, 2]), Value::Null]
        );
    }

    #[test]
    fn test_flat_map_scalar_results_are_elements() {
        let config = EvalConfig::default();
        let ctx = array_ctx(&config, &[ints(&[5, 6])]);
        let call = Expr::call(
            Arc::new(FlatMapFunction),
            vec![source(), Expr::lambda(X, DataType::Int64, x())],
        )
        .unwrap();
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(to_values(result.as_ref()), vec![ints(&[5, 6])]);
    }

    #[test]
    fn test_flat_map_any_checks_each_value() {
        let config = EvalConfig::default();
        let argument = from_values(
            &DataType::array(DataType::Any),
            &[Value::List(vec![
                ints(&[1, 2]),
                Value::Int64(3),
                Value::List(vec![]),
            ])],
        )
        .unwrap();
        let ctx = EvalContext::without_columns(1, &config).bind(0, argument);
        let call = Expr::call(
            Arc::new(FlatMapFunction),
            vec![
                Expr::param(0, DataType::array(DataType::Any)),
                Expr::lambda(X, DataType::Any, Expr::param(X, DataType::Any)),
            ],
        )
        .unwrap();
        assert_eq!(call.data_type(), &DataType::array(DataType::Any));
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(to_values(result.as_ref()), vec![ints(&[1, 2, 3])]);
    }
}
