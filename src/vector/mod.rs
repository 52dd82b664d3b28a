//! Columnar value vectors.
//!
//! Every evaluated expression produces a [`ValueVector`]: a read-only,
//! row-indexed view of one resolved [`DataType`]. Primitive categories are
//! backed by Apache Arrow arrays; the remaining categories hold boxed values
//! or nested vectors. Vectors are immutable once built and are shared as
//! [`VectorRef`]; zero-copy adapters (selection, broadcast) delegate storage
//! to the vector they wrap.

mod arrow_vector;
mod builder;
mod compare;
mod list_vector;
mod row_set;
mod table_vector;
mod value_list;
mod views;

use std::fmt;
use std::sync::Arc;

use arrow::array::ArrayRef;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::types::{Category, DataType, Value};

pub use arrow_vector::ArrowVector;
pub use builder::{build_list, VectorBuilder};
pub use compare::{compare, hash_row, rows_equal};
pub use list_vector::{ListVector, NestedVector};
pub use row_set::{RowSet, DEFAULT_BATCH_SIZE};
pub use table_vector::{RowSetObjects, TableVector};
pub use value_list::ValueListVector;
pub use views::{ConstantVector, Selection, SelectionView};

/// Shared handle to an immutable vector.
pub type VectorRef = Arc<dyn ValueVector>;

/// Read-only columnar view over `len()` logical rows of one type.
///
/// Exactly one getter family matches the vector's declared category.
/// Calling a getter for another category is a caller bug and panics.
pub trait ValueVector: fmt::Debug + Send + Sync {
    /// Declared type of every row.
    fn data_type(&self) -> &DataType;

    /// Number of logical rows.
    fn len(&self) -> usize;

    /// Returns true if the vector has no rows.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if any row may be null.
    fn is_nullable(&self) -> bool;

    /// Returns true if `row` holds null.
    fn is_null(&self, row: usize) -> bool;

    fn get_int32(&self, _row: usize) -> i32 {
        getter_mismatch(self.data_type(), "get_int32")
    }

    fn get_int64(&self, _row: usize) -> i64 {
        getter_mismatch(self.data_type(), "get_int64")
    }

    fn get_float32(&self, _row: usize) -> f32 {
        getter_mismatch(self.data_type(), "get_float32")
    }

    fn get_float64(&self, _row: usize) -> f64 {
        getter_mismatch(self.data_type(), "get_float64")
    }

    fn get_decimal(&self, _row: usize) -> Decimal {
        getter_mismatch(self.data_type(), "get_decimal")
    }

    fn get_bool(&self, _row: usize) -> bool {
        getter_mismatch(self.data_type(), "get_bool")
    }

    fn get_string(&self, _row: usize) -> &str {
        getter_mismatch(self.data_type(), "get_string")
    }

    fn get_datetime(&self, _row: usize) -> NaiveDateTime {
        getter_mismatch(self.data_type(), "get_datetime")
    }

    fn get_datetime_offset(&self, _row: usize) -> DateTime<FixedOffset> {
        getter_mismatch(self.data_type(), "get_datetime_offset")
    }

    /// Elements of an array row as a nested vector.
    fn get_array(&self, _row: usize) -> VectorRef {
        getter_mismatch(self.data_type(), "get_array")
    }

    /// Member rows of a table row.
    fn get_table(&self, _row: usize) -> RowSet {
        getter_mismatch(self.data_type(), "get_table")
    }

    /// Boxed value of an `Object` or `Any` row.
    fn get_object(&self, _row: usize) -> Value {
        getter_mismatch(self.data_type(), "get_object")
    }

    /// Boxes the value at `row`, whatever the category.
    fn value(&self, row: usize) -> Value {
        if self.is_null(row) {
            return Value::Null;
        }
        match self.data_type().category() {
            Category::Int32 => Value::Int32(self.get_int32(row)),
            Category::Int64 => Value::Int64(self.get_int64(row)),
            Category::Float32 => Value::Float32(self.get_float32(row)),
            Category::Float64 => Value::Float64(self.get_float64(row)),
            Category::Decimal => Value::Decimal(self.get_decimal(row)),
            Category::Boolean => Value::Bool(self.get_bool(row)),
            Category::String => Value::String(self.get_string(row).to_string()),
            Category::DateTime => Value::DateTime(self.get_datetime(row)),
            Category::DateTimeOffset => Value::DateTimeOffset(self.get_datetime_offset(row)),
            Category::Array => {
                let nested = self.get_array(row);
                Value::List((0..nested.len()).map(|i| nested.value(i)).collect())
            }
            Category::Table => {
                let rows = self.get_table(row);
                Value::List((0..rows.num_rows()).map(|i| rows.row_value(i)).collect())
            }
            Category::Object | Category::Any => self.get_object(row),
        }
    }

    /// Materializes this vector as an Arrow array when its category is
    /// Arrow-backed.
    fn to_arrow(&self) -> Option<ArrayRef> {
        None
    }

    /// Returns the row-set this vector exposes row-by-row, if any.
    fn as_row_set(&self) -> Option<&RowSet> {
        None
    }
}

#[cold]
#[track_caller]
fn getter_mismatch(data_type: &DataType, getter: &str) -> ! {
    panic!("{getter} called on a {data_type} vector")
}

/// Builds a vector of `data_type` from boxed values.
///
/// # Errors
///
/// Returns a type error if a value cannot be stored in `data_type`.
pub fn from_values(data_type: &DataType, values: &[Value]) -> Result<VectorRef> {
    let mut builder = VectorBuilder::new(data_type.clone(), values.len());
    for (row, value) in values.iter().enumerate() {
        builder.set_value(row, value)?;
    }
    builder.build()
}

/// Broadcasts a single value to `len` rows.
///
/// # Errors
///
/// Returns a type error if `value` cannot be stored in `data_type`.
pub fn constant(data_type: &DataType, value: &Value, len: usize) -> Result<VectorRef> {
    let single = from_values(data_type, std::slice::from_ref(value))?;
    Ok(Arc::new(ConstantVector::new(single, 0, len)))
}

/// Collects every row of `vector` as boxed values.
#[must_use]
pub fn to_values(vector: &dyn ValueVector) -> Vec<Value> {
    (0..vector.len()).map(|row| vector.value(row)).collect()
}
