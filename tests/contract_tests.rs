//! Contract tests for the aggregation engine, DISTINCT and the lambda
//! functions, driven through the public API.

use std::sync::Arc;

use colvex::aggregate::AggregateMode;
use colvex::types::{ColumnDef, DataType, Schema, Value};
use colvex::vector::{from_values, to_values, RowSet, TableVector, VectorRef};
use colvex::{ColvexError, EvalConfig, EvalContext, Evaluator, Expr, FunctionRegistry};
use rust_decimal::Decimal;

/// Single-column row-set `v` of `data_type`.
fn column_rows(data_type: &DataType, values: &[Value]) -> RowSet {
    let schema = Arc::new(Schema::new(vec![ColumnDef::new("v", data_type.clone())]));
    let column = from_values(data_type, values).expect("column");
    RowSet::try_new(schema, vec![column]).expect("row-set")
}

/// Groups over a single-column row-set.
fn grouped(data_type: &DataType, values: &[Value], members: &[Vec<usize>]) -> TableVector {
    TableVector::from_groups(&column_rows(data_type, values), members)
}

fn list(items: &[Value]) -> Value {
    Value::List(items.to_vec())
}

fn int32s(items: &[Option<i32>]) -> Value {
    Value::List(items.iter().copied().map(Value::from).collect())
}

// =============================================================================
// Numeric Aggregation Contracts
// =============================================================================

mod numeric_aggregation_contracts {
    use super::*;

    fn scalar(name: &str, data_type: &DataType, rows: &[Value]) -> colvex::Result<Vec<Value>> {
        let config = EvalConfig::default();
        let ctx = EvalContext::new(column_rows(data_type, rows), &config);
        let registry = FunctionRegistry::with_builtins();
        let call = registry.call(name, vec![Expr::column("v", data_type.clone())])?;
        Ok(to_values(ctx.evaluate(&call)?.as_ref()))
    }

    fn grouped_result(
        name: &str,
        data_type: &DataType,
        values: &[Value],
        members: &[Vec<usize>],
    ) -> colvex::Result<VectorRef> {
        let config = EvalConfig::default();
        let ctx = EvalContext::without_columns(0, &config);
        let registry = FunctionRegistry::with_builtins();
        let call = registry.aggregate_call(
            name,
            vec![Expr::column("v", data_type.clone())],
            AggregateMode::All,
        )?;
        Evaluator::evaluate_grouped(&call, &grouped(data_type, values, members), &ctx)
    }

    #[test]
    fn test_sum_avg_example() {
        let dt = DataType::array(DataType::Int32);
        let rows = [
            int32s(&[Some(1), Some(2), Some(3)]),
            int32s(&[Some(4), None, Some(6)]),
        ];
        assert_eq!(
            scalar("SUM", &dt, &rows).unwrap(),
            vec![Value::Int32(6), Value::Int32(10)]
        );
        assert_eq!(
            scalar("AVG", &dt, &rows).unwrap(),
            vec![Value::Int32(2), Value::Int32(5)]
        );
    }

    #[test]
    fn test_reducer_freshness_across_groups() {
        let values = [1, 2, 3, 10, 20].map(Value::Int32);
        let avg = grouped_result(
            "AVG",
            &DataType::Int32,
            &values,
            &[vec![0, 1, 2], vec![3, 4]],
        )
        .unwrap();
        assert_eq!(to_values(avg.as_ref()), vec![Value::Int32(2), Value::Int32(15)]);
    }

    #[test]
    fn test_integer_overflow_is_fatal() {
        let dt = DataType::array(DataType::Int32);
        let err = scalar("SUM", &dt, &[int32s(&[Some(i32::MAX), Some(1)])]).unwrap_err();
        assert!(matches!(err, ColvexError::ArithmeticOverflow(_)));

        let values = [Value::Int32(i32::MAX), Value::Int32(1)];
        let err = grouped_result("SUM", &DataType::Int32, &values, &[vec![0, 1]]).unwrap_err();
        assert!(matches!(err, ColvexError::ArithmeticOverflow(_)));
    }

    #[test]
    fn test_null_window_is_null_in_every_lane() {
        let lanes = [
            DataType::Int32,
            DataType::Int64,
            DataType::Float32,
            DataType::Float64,
            DataType::Decimal,
            DataType::Any,
        ];
        for element in lanes {
            for name in ["SUM", "AVG"] {
                let dt = DataType::array(element.clone());
                let scalar_result =
                    scalar(name, &dt, &[list(&[Value::Null, Value::Null]), list(&[])]).unwrap();
                assert_eq!(scalar_result, vec![Value::Null, Value::Null], "{name} {element}");

                let values = [Value::Null, Value::Null];
                let grouped_result =
                    grouped_result(name, &element, &values, &[vec![0, 1], vec![]]).unwrap();
                assert_eq!(
                    to_values(grouped_result.as_ref()),
                    vec![Value::Null, Value::Null],
                    "{name} {element}"
                );
            }
        }
    }

    #[test]
    fn test_lenient_null_windows_yield_identity() {
        let config = EvalConfig::default().with_strict_null_windows(false);
        let dt = DataType::array(DataType::Int64);
        let ctx = EvalContext::new(column_rows(&dt, &[list(&[Value::Null])]), &config);
        let call = FunctionRegistry::with_builtins()
            .call("sum", vec![Expr::column("v", dt)])
            .unwrap();
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(to_values(result.as_ref()), vec![Value::Int64(0)]);
    }

    #[test]
    fn test_decimal_lane() {
        let dec = |s: &str| Value::Decimal(s.parse::<Decimal>().unwrap());
        let dt = DataType::array(DataType::Decimal);
        let rows = [list(&[dec("1.10"), dec("2.25"), Value::Null])];
        assert_eq!(scalar("SUM", &dt, &rows).unwrap(), vec![dec("3.35")]);
    }

    #[test]
    fn test_object_lane_dispatches_per_value() {
        let dt = DataType::array(DataType::Any);
        let rows = [list(&[Value::Int32(1), Value::Int64(2), Value::Float64(0.5)])];
        assert_eq!(scalar("SUM", &dt, &rows).unwrap(), vec![Value::Float64(3.5)]);
    }

    #[test]
    fn test_non_array_argument_is_identity() {
        let rows = [Value::Int64(7), Value::Null];
        assert_eq!(
            scalar("AVG", &DataType::Int64, &rows).unwrap(),
            vec![Value::Int64(7), Value::Null]
        );
    }

    #[test]
    fn test_non_numeric_rejected_at_binding() {
        let registry = FunctionRegistry::with_builtins();
        let err = registry
            .call("sum", vec![Expr::column("v", DataType::array(DataType::String))])
            .unwrap_err();
        assert!(matches!(err, ColvexError::TypeError { .. }));
    }

    #[test]
    fn test_grouped_requires_table_vector() {
        let config = EvalConfig::default();
        let ctx = EvalContext::without_columns(0, &config);
        let registry = FunctionRegistry::with_builtins();
        let call = registry
            .aggregate_call(
                "SUM",
                vec![Expr::column("v", DataType::Int32)],
                AggregateMode::All,
            )
            .unwrap();
        let flat = from_values(&DataType::Int32, &[Value::Int32(1)]).unwrap();
        let err = Evaluator::evaluate_grouped(&call, flat.as_ref(), &ctx).unwrap_err();
        assert!(matches!(err, ColvexError::ShapeError(_)));
    }

    #[test]
    fn test_distinct_mode_is_unsupported() {
        let config = EvalConfig::default();
        let ctx = EvalContext::without_columns(0, &config);
        let registry = FunctionRegistry::with_builtins();
        for name in ["SUM", "AVG", "COUNT", "MIN", "MAX"] {
            let call = registry
                .aggregate_call(
                    name,
                    vec![Expr::column("v", DataType::Int32)],
                    AggregateMode::Distinct,
                )
                .unwrap();
            let groups = grouped(&DataType::Int32, &[Value::Int32(1)], &[vec![0]]);
            let err = Evaluator::evaluate_grouped(&call, &groups, &ctx).unwrap_err();
            assert!(matches!(err, ColvexError::UnsupportedOperation(_)), "{name}");
        }
    }

    #[test]
    fn test_count_never_null() {
        let values = [Value::Null, Value::Int32(4), Value::Null];
        let count =
            grouped_result("COUNT", &DataType::Int32, &values, &[vec![0, 2], vec![0, 1]])
                .unwrap();
        assert_eq!(to_values(count.as_ref()), vec![Value::Int64(0), Value::Int64(1)]);
    }
}

// =============================================================================
// Min/Max Contracts
// =============================================================================

mod min_max_contracts {
    use super::*;
    use colvex::aggregate::{select_index, Extreme};
    use colvex::types::Category;

    #[test]
    fn test_max_tie_break_keeps_first_index() {
        let v = from_values(&DataType::Int32, &[5, 5, 3].map(Value::Int32)).unwrap();
        assert_eq!(
            select_index(v.as_ref(), 0..3, Category::Int32, Extreme::Max),
            Some(0)
        );
    }

    #[test]
    fn test_all_null_window_has_no_winner() {
        let v = from_values(&DataType::String, &[Value::Null, Value::Null]).unwrap();
        assert_eq!(
            select_index(v.as_ref(), 0..2, Category::String, Extreme::Min),
            None
        );
    }

    #[test]
    fn test_scalar_min_max() {
        let config = EvalConfig::default();
        let dt = DataType::array(DataType::Float64);
        let rows = [
            list(&[Value::Null, Value::Float64(2.5), Value::Float64(-1.0)]),
            list(&[Value::Null]),
        ];
        let ctx = EvalContext::new(column_rows(&dt, &rows), &config);
        let registry = FunctionRegistry::with_builtins();
        let min = registry.call("MIN", vec![Expr::column("v", dt.clone())]).unwrap();
        let max = registry.call("MAX", vec![Expr::column("v", dt)]).unwrap();
        assert_eq!(
            to_values(ctx.evaluate(&min).unwrap().as_ref()),
            vec![Value::Float64(-1.0), Value::Null]
        );
        assert_eq!(
            to_values(ctx.evaluate(&max).unwrap().as_ref()),
            vec![Value::Float64(2.5), Value::Null]
        );
    }

    #[test]
    fn test_grouped_min_over_strings() {
        let config = EvalConfig::default();
        let ctx = EvalContext::without_columns(0, &config);
        let values = ["pear", "fig", "apple"].map(Value::from);
        let groups = grouped(&DataType::String, &values, &[vec![0, 1], vec![2]]);
        let call = FunctionRegistry::with_builtins()
            .aggregate_call(
                "min",
                vec![Expr::column("v", DataType::String)],
                AggregateMode::All,
            )
            .unwrap();
        let result = Evaluator::evaluate_grouped(&call, &groups, &ctx).unwrap();
        assert_eq!(
            to_values(result.as_ref()),
            vec![Value::from("fig"), Value::from("apple")]
        );
    }
}

// =============================================================================
// Distinct Contracts
// =============================================================================

mod distinct_contracts {
    use super::*;

    fn distinct_of(expr: Expr) -> Expr {
        FunctionRegistry::with_builtins()
            .call("DISTINCT", vec![expr])
            .unwrap()
    }

    #[test]
    fn test_distinct_idempotent() {
        for cache in [true, false] {
            let config = EvalConfig::default().with_distinct_cache(cache);
            let dt = DataType::array(DataType::String);
            let rows = [
                list(&["b", "a", "b", "c", "a"].map(Value::from)),
                Value::Null,
                list(&[Value::Null, Value::Null, Value::from("x")]),
            ];
            let ctx = EvalContext::new(column_rows(&dt, &rows), &config);
            let once = distinct_of(Expr::column("v", dt));
            let twice = distinct_of(once.clone());
            let once = to_values(ctx.evaluate(&once).unwrap().as_ref());
            let twice = to_values(ctx.evaluate(&twice).unwrap().as_ref());
            assert_eq!(once, twice);
            assert_eq!(
                once,
                vec![
                    list(&["b", "a", "c"].map(Value::from)),
                    Value::Null,
                    list(&[Value::Null, Value::from("x")]),
                ]
            );
        }
    }

    #[test]
    fn test_distinct_compares_numerically_within_a_type() {
        let config = EvalConfig::default();
        let dt = DataType::array(DataType::Float64);
        let rows = [list(&[1.0, 1.0, 2.0].map(Value::Float64))];
        let ctx = EvalContext::new(column_rows(&dt, &rows), &config);
        let result = ctx.evaluate(&distinct_of(Expr::column("v", dt))).unwrap();
        assert_eq!(result.get_array(0).len(), 2);
    }
}

// =============================================================================
// Lambda Contracts
// =============================================================================

mod lambda_contracts {
    use super::*;
    use colvex::expr::ComparisonOp;

    const X: u32 = 7;

    fn bools(items: &[Option<bool>]) -> Value {
        Value::List(items.iter().copied().map(Value::from).collect())
    }

    /// Evaluates `name(v, x -> x)` over arrays of booleans.
    fn match_identity(name: &str, rows: &[Value]) -> Vec<Value> {
        let config = EvalConfig::default();
        let dt = DataType::array(DataType::Boolean);
        let ctx = EvalContext::new(column_rows(&dt, rows), &config);
        let lambda = Expr::lambda(X, DataType::Boolean, Expr::param(X, DataType::Boolean));
        let call = FunctionRegistry::with_builtins()
            .call(name, vec![Expr::column("v", dt), lambda])
            .unwrap();
        to_values(ctx.evaluate(&call).unwrap().as_ref())
    }

    #[test]
    fn test_match_monoid_examples() {
        let rows = [bools(&[None, None]), bools(&[None, Some(true)])];
        assert_eq!(
            match_identity("ANY_MATCH", &rows),
            vec![Value::Null, Value::Bool(true)]
        );
        let rows = [bools(&[None, Some(false)]), bools(&[None, Some(true)])];
        assert_eq!(
            match_identity("ALL_MATCH", &rows),
            vec![Value::Bool(false), Value::Null]
        );
        let rows = [bools(&[Some(false), None]), bools(&[])];
        assert_eq!(
            match_identity("none_match", &rows),
            vec![Value::Null, Value::Bool(true)]
        );
    }

    #[test]
    fn test_flat_map_flattening_example() {
        let config = EvalConfig::default();
        let dt = DataType::array(DataType::Int64);
        let rows = [
            list(&[1, 2].map(Value::Int64)),
            list(&[3].map(Value::Int64)),
        ];
        let ctx = EvalContext::new(column_rows(&dt, &rows), &config);
        let x = Expr::param(X, DataType::Int64);
        let lambda = Expr::lambda(X, DataType::Int64, Expr::make_array(vec![x.clone(), x]));
        let call = FunctionRegistry::with_builtins()
            .call("FLAT_MAP", vec![Expr::column("v", dt), lambda])
            .unwrap();
        let result = ctx.evaluate(&call).unwrap();
        assert_eq!(
            to_values(result.as_ref()),
            vec![
                list(&[1, 1, 2, 2].map(Value::Int64)),
                list(&[3, 3].map(Value::Int64)),
            ]
        );
    }

    #[test]
    fn test_filter_then_sum() {
        let config = EvalConfig::default();
        let dt = DataType::array(DataType::Int32);
        let rows = [int32s(&[Some(1), Some(10), None, Some(20)]), int32s(&[Some(1)])];
        let ctx = EvalContext::new(column_rows(&dt, &rows), &config);
        let registry = FunctionRegistry::with_builtins();
        let predicate = Expr::comparison(
            Expr::param(X, DataType::Int32),
            ComparisonOp::Gte,
            Expr::literal(10),
        );
        let filtered = registry
            .call(
                "filter",
                vec![
                    Expr::column("v", dt),
                    Expr::lambda(X, DataType::Int32, predicate),
                ],
            )
            .unwrap();
        let sum = registry.call("sum", vec![filtered]).unwrap();
        assert_eq!(
            to_values(ctx.evaluate(&sum).unwrap().as_ref()),
            vec![Value::Int32(30), Value::Null]
        );
    }

    #[test]
    fn test_lambda_position_must_hold_a_lambda() {
        let dt = DataType::array(DataType::Int32);
        let err = FunctionRegistry::with_builtins()
            .call("MAP", vec![Expr::column("v", dt), Expr::literal(1)])
            .unwrap_err();
        assert!(matches!(err, ColvexError::FunctionError(_)));
    }
}
