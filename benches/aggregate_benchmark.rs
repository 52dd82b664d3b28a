//! Aggregate and lambda evaluation benchmarks.
//!
//! Benchmarks:
//! - SUM / AVG / MIN over array rows (scalar mode)
//! - SUM over grouped row-sets
//! - FILTER followed by SUM over array rows

use std::sync::Arc;

use colvex::aggregate::AggregateMode;
use colvex::expr::ComparisonOp;
use colvex::types::{ColumnDef, DataType, Schema, Value};
use colvex::vector::{from_values, RowSet, TableVector};
use colvex::{EvalConfig, EvalContext, Evaluator, Expr, FunctionRegistry};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const ROW_WIDTH: usize = 16;

/// Helper: `rows` array rows of `ROW_WIDTH` Int64 elements, every seventh null.
fn array_rows(rows: usize) -> RowSet {
    let dt = DataType::array(DataType::Int64);
    let schema = Arc::new(Schema::new(vec![ColumnDef::new("xs", dt.clone())]));
    let values: Vec<Value> = (0..rows)
        .map(|r| {
            Value::List(
                (0..ROW_WIDTH)
                    .map(|i| {
                        let n = (r * ROW_WIDTH + i) as i64;
                        if n % 7 == 0 {
                            Value::Null
                        } else {
                            Value::Int64(n)
                        }
                    })
                    .collect(),
            )
        })
        .collect();
    let xs = from_values(&dt, &values).unwrap();
    RowSet::try_new(schema, vec![xs]).unwrap()
}

/// Helper: `rows` Int64 rows split into groups of `ROW_WIDTH`.
fn grouped_rows(rows: usize) -> TableVector {
    let schema = Arc::new(Schema::new(vec![ColumnDef::new("v", DataType::Int64)]));
    let values: Vec<Value> = (0..rows as i64).map(Value::Int64).collect();
    let v = from_values(&DataType::Int64, &values).unwrap();
    let table = RowSet::try_new(schema, vec![v]).unwrap();
    let groups: Vec<Vec<usize>> = (0..rows)
        .step_by(ROW_WIDTH)
        .map(|start| (start..rows.min(start + ROW_WIDTH)).collect())
        .collect();
    TableVector::from_groups(&table, &groups)
}

fn bench_scalar_aggregates(c: &mut Criterion) {
    let registry = FunctionRegistry::with_builtins();
    let config = EvalConfig::default();
    let xs = Expr::column("xs", DataType::array(DataType::Int64));

    for name in ["SUM", "AVG", "MIN"] {
        let call = registry.call(name, vec![xs.clone()]).unwrap();
        let mut group = c.benchmark_group(format!("scalar_{}", name.to_lowercase()));
        for size in &[100usize, 1000, 10000] {
            let rows = array_rows(*size);
            group.throughput(Throughput::Elements((*size * ROW_WIDTH) as u64));
            group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
                let ctx = EvalContext::new(rows.clone(), &config);
                b.iter(|| black_box(ctx.evaluate(&call).unwrap()));
            });
        }
        group.finish();
    }
}

fn bench_grouped_sum(c: &mut Criterion) {
    let config = EvalConfig::default();
    let call = FunctionRegistry::with_builtins()
        .aggregate_call(
            "SUM",
            vec![Expr::column("v", DataType::Int64)],
            AggregateMode::All,
        )
        .unwrap();
    let mut group = c.benchmark_group("grouped_sum");
    for size in &[1000usize, 10000, 100_000] {
        let groups = grouped_rows(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let ctx = EvalContext::without_columns(0, &config);
            b.iter(|| black_box(Evaluator::evaluate_grouped(&call, &groups, &ctx).unwrap()));
        });
    }
    group.finish();
}

fn bench_filter_then_sum(c: &mut Criterion) {
    let registry = FunctionRegistry::with_builtins();
    let config = EvalConfig::default();
    let dt = DataType::array(DataType::Int64);
    let predicate = Expr::comparison(
        Expr::param(1, DataType::Int64),
        ComparisonOp::Gt,
        Expr::literal(100i64),
    );
    let filtered = registry
        .call(
            "FILTER",
            vec![
                Expr::column("xs", dt),
                Expr::lambda(1, DataType::Int64, predicate),
            ],
        )
        .unwrap();
    let call = registry.call("SUM", vec![filtered]).unwrap();

    let mut group = c.benchmark_group("filter_then_sum");
    for size in &[100usize, 1000] {
        let rows = array_rows(*size);
        group.throughput(Throughput::Elements((*size * ROW_WIDTH) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            let ctx = EvalContext::new(rows.clone(), &config);
            b.iter(|| black_box(ctx.evaluate(&call).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_scalar_aggregates,
    bench_grouped_sum,
    bench_filter_then_sum
);
criterion_main!(benches);
