//! Array DISTINCT.
//!
//! Each array row is deduplicated into a selection view over its own
//! elements, keeping the first occurrence of every value. Equality and
//! hashing go through the typed getters of the nested vector.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::expr::{EvalContext, Expr};
use crate::function::{single_arg, Arity, ScalarFunction};
use crate::types::{Category, DataType};
use crate::vector::{hash_row, rows_equal, Selection, SelectionView, ValueVector, VectorRef};

/// Ordinals of the first occurrence of every distinct element.
#[must_use]
pub fn unique_indices(vector: &dyn ValueVector) -> Vec<usize> {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut unique = Vec::new();
    for i in 0..vector.len() {
        let bucket = buckets.entry(hash_row(vector, i)).or_default();
        if bucket.iter().any(|&j| rows_equal(vector, vector, i, j)) {
            continue;
        }
        bucket.push(i);
        unique.push(i);
    }
    unique
}

/// Array vector whose rows are deduplicated on access.
#[derive(Debug)]
pub struct DistinctVector {
    inner: VectorRef,
    cache: Option<Mutex<HashMap<usize, VectorRef>>>,
}

impl DistinctVector {
    /// Wraps an array-typed vector. With `cache` set, each row is
    /// deduplicated at most once.
    #[must_use]
    pub fn new(inner: VectorRef, cache: bool) -> Self {
        DistinctVector {
            inner,
            cache: cache.then(|| Mutex::new(HashMap::new())),
        }
    }

    fn dedupe(&self, row: usize) -> VectorRef {
        let nested = self.inner.get_array(row);
        let unique = unique_indices(nested.as_ref());
        if unique.len() == nested.len() {
            return nested;
        }
        log::trace!("DISTINCT row {row}: {} of {} elements", unique.len(), nested.len());
        Arc::new(SelectionView::new(nested, Selection::indices(unique)))
    }
}

impl ValueVector for DistinctVector {
    fn data_type(&self) -> &DataType {
        self.inner.data_type()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_nullable(&self) -> bool {
        self.inner.is_nullable()
    }

    fn is_null(&self, row: usize) -> bool {
        self.inner.is_null(row)
    }

    fn get_array(&self, row: usize) -> VectorRef {
        let Some(cache) = &self.cache else {
            return self.dedupe(row);
        };
        if let Some(hit) = cache.lock().get(&row) {
            return hit.clone();
        }
        let result = self.dedupe(row);
        cache.lock().insert(row, result.clone());
        result
    }
}

/// `DISTINCT(array)`: removes repeated elements from every array row.
///
/// Non-array arguments are returned unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistinctFunction;

impl ScalarFunction for DistinctFunction {
    fn name(&self) -> &str {
        "DISTINCT"
    }

    fn arity(&self) -> Arity {
        Arity::Fixed(1)
    }

    fn resolve_scalar_type(&self, args: &[DataType]) -> Result<DataType> {
        single_arg(self.name(), args).cloned()
    }

    fn evaluate(&self, args: &[Expr], ctx: &EvalContext<'_>) -> Result<VectorRef> {
        let vector = ctx.evaluate(single_arg(self.name(), args)?)?;
        if vector.data_type().category() != Category::Array {
            return Ok(vector);
        }
        Ok(Arc::new(DistinctVector::new(
            vector,
            ctx.config().cache_distinct_rows,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvalConfig;
    use crate::types::Value;
    use crate::vector::{from_values, to_values};

    fn int_list(items: &[i64]) -> Value {
        Value::List(items.iter().copied().map(Value::Int64).collect())
    }

    fn arrays() -> VectorRef {
        from_values(
            &DataType::array(DataType::Int64),
            &[int_list(&[3, 1, 3, 2, 1]), Value::Null, int_list(&[4, 5])],
        )
        .unwrap()
    }

    #[test]
    fn test_unique_indices_keep_first() {
        let v = from_values(
            &DataType::String,
            &[
                Value::from("a"),
                Value::Null,
                Value::from("b"),
                Value::from("a"),
                Value::Null,
            ],
        )
        .unwrap();
        assert_eq!(unique_indices(v.as_ref()), vec![0, 1, 2]);
    }

    #[test]
    fn test_signed_zeros_agree_across_lanes() {
        let zeros = [0.0, -0.0, 0.0].map(Value::Float64).to_vec();
        let typed = from_values(&DataType::Float64, &zeros).unwrap();
        let dynamic = from_values(&DataType::Any, &zeros).unwrap();
        for v in [&typed, &dynamic] {
            for i in 0..3 {
                for j in 0..3 {
                    let equal = rows_equal(v.as_ref(), v.as_ref(), i, j);
                    let same_hash = hash_row(v.as_ref(), i) == hash_row(v.as_ref(), j);
                    assert!(!equal || same_hash, "rows {i} and {j} equal but hashed apart");
                }
            }
        }
        assert_eq!(unique_indices(typed.as_ref()), vec![0, 1]);
        assert_eq!(unique_indices(dynamic.as_ref()), vec![0, 1]);
    }

    #[test]
    fn test_distinct_dynamic_elements() {
        let row = Value::List(vec![
            Value::Float64(0.0),
            Value::Float64(-0.0),
            Value::Float64(0.0),
            Value::Int64(1),
            Value::Int64(1),
        ]);
        let arg = from_values(&DataType::array(DataType::Any), &[row]).unwrap();
        let v = DistinctVector::new(arg, true);
        assert_eq!(
            to_values(&v),
            vec![Value::List(vec![
                Value::Float64(0.0),
                Value::Float64(-0.0),
                Value::Int64(1),
            ])]
        );
    }

    #[test]
    fn test_distinct_rows() {
        let v = DistinctVector::new(arrays(), true);
        assert_eq!(
            to_values(&v),
            vec![int_list(&[3, 1, 2]), Value::Null, int_list(&[4, 5])]
        );
    }

    #[test]
    fn test_cached_row_is_shared() {
        let v = DistinctVector::new(arrays(), true);
        assert!(Arc::ptr_eq(&v.get_array(0), &v.get_array(0)));
        let uncached = DistinctVector::new(arrays(), false);
        assert_eq!(uncached.value(0), int_list(&[3, 1, 2]));
    }

    #[test]
    fn test_distinct_is_idempotent() {
        let config = EvalConfig::default();
        let ctx = EvalContext::without_columns(3, &config);
        let ctx = ctx.bind(0, arrays());
        let dt = DataType::array(DataType::Int64);
        let once = Expr::call(Arc::new(DistinctFunction), vec![Expr::param(0, dt)]).unwrap();
        let twice = Expr::call(Arc::new(DistinctFunction), vec![once.clone()]).unwrap();
        let a = ctx.evaluate(&once).unwrap();
        let b = ctx.evaluate(&twice).unwrap();
        assert_eq!(to_values(a.as_ref()), to_values(b.as_ref()));
    }

    #[test]
    fn test_non_array_passes_through() {
        let config = EvalConfig::default();
        let scalars = from_values(&DataType::Int32, &[Value::Int32(1), Value::Int32(1)]).unwrap();
        let ctx = EvalContext::without_columns(2, &config).bind(0, scalars.clone());
        let call =
            Expr::call(Arc::new(DistinctFunction), vec![Expr::param(0, DataType::Int32)]).unwrap();
        let result = ctx.evaluate(&call).unwrap();
        assert!(Arc::ptr_eq(&result, &scalars));
    }
}
