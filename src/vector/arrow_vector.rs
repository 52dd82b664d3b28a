//! Vectors backed by Arrow arrays.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{Float32Type, Float64Type, Int32Type, Int64Type, TimestampMicrosecondType};
use chrono::{DateTime, NaiveDateTime};

use crate::error::{ColvexError, Result};
use crate::types::DataType;

use super::ValueVector;

/// Primitive-category vector wrapping an Arrow array.
///
/// Covers INT32, INT64, FLOAT32, FLOAT64, BOOLEAN, STRING and DATETIME
/// (microseconds since the Unix epoch, no time zone).
#[derive(Debug, Clone)]
pub struct ArrowVector {
    data_type: DataType,
    array: ArrayRef,
}

impl ArrowVector {
    /// Wraps an Arrow array.
    ///
    /// # Errors
    ///
    /// Returns a type error if the Arrow type has no counterpart.
    pub fn try_new(array: ArrayRef) -> Result<Self> {
        let data_type = DataType::from_arrow(array.data_type()).ok_or_else(|| {
            ColvexError::type_error("Arrow primitive array", array.data_type())
        })?;
        Ok(ArrowVector { data_type, array })
    }

    /// Returns the wrapped Arrow array.
    #[must_use]
    pub fn array(&self) -> &ArrayRef {
        &self.array
    }
}

impl ValueVector for ArrowVector {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.array.len()
    }

    fn is_nullable(&self) -> bool {
        self.array.nulls().is_some()
    }

    fn is_null(&self, row: usize) -> bool {
        self.array.is_null(row)
    }

    fn get_int32(&self, row: usize) -> i32 {
        self.array.as_primitive::<Int32Type>().value(row)
    }

    fn get_int64(&self, row: usize) -> i64 {
        self.array.as_primitive::<Int64Type>().value(row)
    }

    fn get_float32(&self, row: usize) -> f32 {
        self.array.as_primitive::<Float32Type>().value(row)
    }

    fn get_float64(&self, row: usize) -> f64 {
        self.array.as_primitive::<Float64Type>().value(row)
    }

    fn get_bool(&self, row: usize) -> bool {
        self.array.as_boolean().value(row)
    }

    fn get_string(&self, row: usize) -> &str {
        self.array.as_string::<i32>().value(row)
    }

    fn get_datetime(&self, row: usize) -> NaiveDateTime {
        let micros = self
            .array
            .as_primitive::<TimestampMicrosecondType>()
            .value(row);
        DateTime::from_timestamp_micros(micros)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }

    fn to_arrow(&self) -> Option<ArrayRef> {
        Some(self.array.clone())
    }
}
