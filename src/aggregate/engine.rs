//! Lane-dispatching numeric aggregation (SUM, AVG).

use rust_decimal::Decimal;

use crate::config::EvalConfig;
use crate::error::{ColvexError, Result};
use crate::expr::{EvalContext, Expr};
use crate::types::{DataType, Value};
use crate::vector::{ValueVector, VectorBuilder, VectorRef};

use super::lane::{Lane, LaneValue};
use super::reducer::ReducerKind;
use super::window::{evaluate_groups, group_window, row_window, unify_numeric, Window};

/// Runs one reducer kind over scalar-mode rows or grouped-mode groups.
#[derive(Debug, Clone, Copy)]
pub struct NumericAggregator {
    kind: ReducerKind,
}

impl NumericAggregator {
    #[must_use]
    pub fn new(kind: ReducerKind) -> Self {
        NumericAggregator { kind }
    }

    /// Aggregates each row of `arg`: the elements of an array row, or the
    /// single value of a non-array row.
    ///
    /// # Errors
    ///
    /// Returns a type error for non-numeric arguments and an overflow error
    /// when exact addition overflows.
    pub fn evaluate_scalar(&self, arg: &VectorRef, config: &EvalConfig) -> Result<VectorRef> {
        let lane = Lane::for_type(arg.data_type().aggregation_element())?;
        log::debug!(
            "{} over {} rows using the {lane} lane",
            self.kind.name(),
            arg.len()
        );
        let windows: Vec<Window> = (0..arg.len()).map(|row| row_window(arg, row)).collect();
        self.run(lane, &windows, config.strict_null_windows)
    }

    /// Aggregates `arg` once per group of the table-typed `groups`.
    ///
    /// The result type is the promotion of every group's element type.
    ///
    /// # Errors
    ///
    /// Returns a shape error if `groups` is not table-typed, a type error for
    /// non-numeric groups, and an overflow error when exact addition
    /// overflows.
    pub fn evaluate_grouped(
        &self,
        arg: &Expr,
        groups: &dyn ValueVector,
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef> {
        let name = self.kind.name();
        let vectors = evaluate_groups(name, arg, groups, ctx)?;
        let result_type = unify_numeric(name, &vectors, arg.data_type())?;
        let lane = Lane::for_type(&result_type)?;
        log::debug!("{name} over {} groups using the {lane} lane", vectors.len());
        let windows: Vec<Window> = vectors
            .iter()
            .map(|vector| vector.as_ref().map(group_window))
            .collect();
        self.run(lane, &windows, ctx.config().strict_null_windows)
    }

    fn run(&self, lane: Lane, windows: &[Window], strict: bool) -> Result<VectorRef> {
        match lane {
            Lane::Int32 => accumulate::<i32>(self.kind, windows, strict),
            Lane::Int64 => accumulate::<i64>(self.kind, windows, strict),
            Lane::Float32 => accumulate::<f32>(self.kind, windows, strict),
            Lane::Float64 => accumulate::<f64>(self.kind, windows, strict),
            Lane::Decimal => accumulate::<Decimal>(self.kind, windows, strict),
            Lane::Object => accumulate::<Value>(self.kind, windows, strict),
        }
    }
}

/// Folds every window with a fresh reducer, skipping nulls.
///
/// A window without non-null elements produces null unless `strict` is off,
/// in which case it produces the finalized identity.
fn accumulate<T: LaneValue>(
    kind: ReducerKind,
    windows: &[Window],
    strict: bool,
) -> Result<VectorRef> {
    let mut builder = VectorBuilder::new(T::LANE.data_type(), windows.len());
    for (row, window) in windows.iter().enumerate() {
        let Some(segments) = window else {
            builder.set_null(row);
            continue;
        };
        let mut reducer = kind.create::<T>();
        let mut acc = reducer.identity();
        let mut seen = false;
        for segment in segments {
            let vector = segment.vector.as_ref();
            let read = T::reader(vector.data_type().category())?;
            for i in segment.range.clone() {
                if vector.is_null(i) {
                    continue;
                }
                acc = reducer.aggregate(acc, read(vector, i)?)?;
                seen = true;
            }
        }
        if seen || !strict {
            reducer.combine(acc)?.write(&mut builder, row);
        } else {
            builder.set_null(row);
        }
    }
    builder.build()
}

/// Static result type of SUM/AVG over an argument of `arg`.
pub(crate) fn numeric_result_type(name: &str, arg: &DataType) -> Result<DataType> {
    let element = arg.aggregation_element();
    if !element.is_numeric_or_any() {
        return Err(ColvexError::type_error(
            format!("numeric or ANY argument to {name}"),
            element,
        ));
    }
    Ok(element.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{from_values, to_values};

    fn int_lists(rows: Vec<Option<Vec<Option<i32>>>>) -> VectorRef {
        let values: Vec<Value> = rows
            .into_iter()
            .map(|row| match row {
                Some(items) => Value::List(items.into_iter().map(Value::from).collect()),
                None => Value::Null,
            })
            .collect();
        from_values(&DataType::array(DataType::Int32), &values).unwrap()
    }

    #[test]
    fn test_scalar_sum_and_avg() {
        let arg = int_lists(vec![
            Some(vec![Some(1), Some(2), Some(3)]),
            Some(vec![Some(4), None, Some(6)]),
        ]);
        let config = EvalConfig::default();
        let sum = NumericAggregator::new(ReducerKind::Sum)
            .evaluate_scalar(&arg, &config)
            .unwrap();
        assert_eq!(to_values(sum.as_ref()), vec![Value::Int32(6), Value::Int32(10)]);
        let avg = NumericAggregator::new(ReducerKind::Avg)
            .evaluate_scalar(&arg, &config)
            .unwrap();
        assert_eq!(to_values(avg.as_ref()), vec![Value::Int32(2), Value::Int32(5)]);
    }

    #[test]
    fn test_scalar_all_null_window_is_null() {
        let arg = int_lists(vec![Some(vec![None, None]), None, Some(vec![])]);
        let config = EvalConfig::default();
        let sum = NumericAggregator::new(ReducerKind::Sum)
            .evaluate_scalar(&arg, &config)
            .unwrap();
        assert_eq!(to_values(sum.as_ref()), vec![Value::Null; 3]);
    }

    #[test]
    fn test_lenient_null_window_yields_identity() {
        let arg = int_lists(vec![Some(vec![None]), None]);
        let config = EvalConfig::default().with_strict_null_windows(false);
        let sum = NumericAggregator::new(ReducerKind::Sum)
            .evaluate_scalar(&arg, &config)
            .unwrap();
        assert_eq!(to_values(sum.as_ref()), vec![Value::Int32(0), Value::Null]);
    }

    #[test]
    fn test_scalar_non_array_is_identity() {
        let arg = from_values(&DataType::Float64, &[Value::Float64(1.5), Value::Null]).unwrap();
        let sum = NumericAggregator::new(ReducerKind::Sum)
            .evaluate_scalar(&arg, &EvalConfig::default())
            .unwrap();
        assert_eq!(to_values(sum.as_ref()), vec![Value::Float64(1.5), Value::Null]);
    }

    #[test]
    fn test_scalar_overflow() {
        let arg = int_lists(vec![Some(vec![Some(i32::MAX), Some(1)])]);
        let err = NumericAggregator::new(ReducerKind::Sum)
            .evaluate_scalar(&arg, &EvalConfig::default())
            .unwrap_err();
        assert!(matches!(err, ColvexError::ArithmeticOverflow(_)));
    }

    #[test]
    fn test_object_lane() {
        let arg = from_values(
            &DataType::array(DataType::Any),
            &[Value::List(vec![Value::Int32(1), Value::Float64(0.5), Value::Null])],
        )
        .unwrap();
        let avg = NumericAggregator::new(ReducerKind::Avg)
            .evaluate_scalar(&arg, &EvalConfig::default())
            .unwrap();
        assert_eq!(avg.data_type(), &DataType::Any);
        assert_eq!(avg.value(0), Value::Float64(0.75));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let arg = from_values(&DataType::String, &[Value::from("a")]).unwrap();
        let err = NumericAggregator::new(ReducerKind::Sum)
            .evaluate_scalar(&arg, &EvalConfig::default())
            .unwrap_err();
        assert!(matches!(err, ColvexError::TypeError { .. }));
        assert!(numeric_result_type("SUM", &DataType::Boolean).is_err());
    }
}
