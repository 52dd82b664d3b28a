//! Typed row comparison, equality and hashing over vectors.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::{Category, Value};

use super::ValueVector;

fn read_i64(v: &dyn ValueVector, row: usize) -> i64 {
    match v.data_type().category() {
        Category::Int32 => i64::from(v.get_int32(row)),
        _ => v.get_int64(row),
    }
}

fn read_f64(v: &dyn ValueVector, row: usize) -> f64 {
    match v.data_type().category() {
        Category::Int32 => f64::from(v.get_int32(row)),
        Category::Int64 => v.get_int64(row) as f64,
        Category::Float32 => f64::from(v.get_float32(row)),
        Category::Decimal => v.get_decimal(row).to_f64().unwrap_or(f64::NAN),
        _ => v.get_float64(row),
    }
}

/// Reads a row as a decimal. Non-finite floats have no decimal form.
fn read_decimal(v: &dyn ValueVector, row: usize) -> Option<Decimal> {
    match v.data_type().category() {
        Category::Decimal => Some(v.get_decimal(row)),
        _ => v.value(row).as_decimal(),
    }
}

/// Compares `a[row_a]` with `b[row_b]` as values of `category`.
///
/// Numeric categories compare numerically (either side may be a narrower
/// numeric category); floats use IEEE total ordering, also when a
/// non-finite float meets the decimal category. Nulls sort first.
/// Categories without a natural order compare their boxed values and treat
/// unrelated values as equal.
#[must_use]
pub fn compare(
    a: &dyn ValueVector,
    b: &dyn ValueVector,
    category: Category,
    row_a: usize,
    row_b: usize,
) -> Ordering {
    match (a.is_null(row_a), b.is_null(row_b)) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }
    match category {
        Category::Int32 | Category::Int64 => read_i64(a, row_a).cmp(&read_i64(b, row_b)),
        Category::Float32 | Category::Float64 => {
            read_f64(a, row_a).total_cmp(&read_f64(b, row_b))
        }
        Category::Decimal => match (read_decimal(a, row_a), read_decimal(b, row_b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => read_f64(a, row_a).total_cmp(&read_f64(b, row_b)),
        },
        Category::Boolean => a.get_bool(row_a).cmp(&b.get_bool(row_b)),
        Category::String => a.get_string(row_a).cmp(b.get_string(row_b)),
        Category::DateTime => a.get_datetime(row_a).cmp(&b.get_datetime(row_b)),
        Category::DateTimeOffset => a
            .get_datetime_offset(row_a)
            .cmp(&b.get_datetime_offset(row_b)),
        Category::Array | Category::Table | Category::Object | Category::Any => a
            .value(row_a)
            .compare(&b.value(row_b))
            .unwrap_or(Ordering::Equal),
    }
}

/// Returns true if `a[row_a]` and `b[row_b]` hold the same value.
///
/// Both vectors must share a category. Two nulls are equal. Consistent with
/// [`hash_row`].
#[must_use]
pub fn rows_equal(a: &dyn ValueVector, b: &dyn ValueVector, row_a: usize, row_b: usize) -> bool {
    match (a.is_null(row_a), b.is_null(row_b)) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }
    match a.data_type().category() {
        Category::Array => {
            let (x, y) = (a.get_array(row_a), b.get_array(row_b));
            x.len() == y.len()
                && (0..x.len()).all(|i| rows_equal(x.as_ref(), y.as_ref(), i, i))
        }
        Category::Table | Category::Object | Category::Any => a.value(row_a) == b.value(row_b),
        category => compare(a, b, category, row_a, row_b) == Ordering::Equal,
    }
}

/// Hashes `v[row]` through the vector's typed getters.
#[must_use]
pub fn hash_row(v: &dyn ValueVector, row: usize) -> u64 {
    let mut state = DefaultHasher::new();
    hash_into(v, row, &mut state);
    state.finish()
}

fn hash_into(v: &dyn ValueVector, row: usize, state: &mut DefaultHasher) {
    if v.is_null(row) {
        state.write_u8(0);
        return;
    }
    state.write_u8(1);
    match v.data_type().category() {
        Category::Int32 => v.get_int32(row).hash(state),
        Category::Int64 => v.get_int64(row).hash(state),
        Category::Float32 => v.get_float32(row).to_bits().hash(state),
        Category::Float64 => v.get_float64(row).to_bits().hash(state),
        Category::Decimal => v.get_decimal(row).normalize().hash(state),
        Category::Boolean => v.get_bool(row).hash(state),
        Category::String => v.get_string(row).hash(state),
        Category::DateTime => v.get_datetime(row).hash(state),
        Category::DateTimeOffset => v.get_datetime_offset(row).hash(state),
        Category::Array => {
            let nested = v.get_array(row);
            nested.len().hash(state);
            for i in 0..nested.len() {
                hash_into(nested.as_ref(), i, state);
            }
        }
        Category::Table | Category::Object | Category::Any => {
            let value: Value = v.value(row);
            value.hash(state);
        }
    }
}
