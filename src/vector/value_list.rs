//! Vectors backed by boxed values.

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use crate::types::{DataType, Value};

use super::{getter_mismatch, ValueVector};

/// Vector storing one [`Value`] per row.
///
/// Used for DECIMAL, DATETIMEOFFSET, OBJECT and ANY, which have no Arrow
/// representation here.
#[derive(Debug, Clone)]
pub struct ValueListVector {
    data_type: DataType,
    values: Vec<Value>,
    nullable: bool,
}

impl ValueListVector {
    /// Creates a vector of `data_type` over `values`.
    #[must_use]
    pub fn new(data_type: DataType, values: Vec<Value>) -> Self {
        let nullable = values.iter().any(Value::is_null);
        ValueListVector {
            data_type,
            values,
            nullable,
        }
    }

    /// Returns the backing values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl ValueVector for ValueListVector {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn is_null(&self, row: usize) -> bool {
        self.values[row].is_null()
    }

    fn get_int32(&self, row: usize) -> i32 {
        match &self.values[row] {
            Value::Int32(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_int32"),
        }
    }

    fn get_int64(&self, row: usize) -> i64 {
        match &self.values[row] {
            Value::Int64(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_int64"),
        }
    }

    fn get_float32(&self, row: usize) -> f32 {
        match &self.values[row] {
            Value::Float32(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_float32"),
        }
    }

    fn get_float64(&self, row: usize) -> f64 {
        match &self.values[row] {
            Value::Float64(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_float64"),
        }
    }

    fn get_decimal(&self, row: usize) -> Decimal {
        match &self.values[row] {
            Value::Decimal(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_decimal"),
        }
    }

    fn get_bool(&self, row: usize) -> bool {
        match &self.values[row] {
            Value::Bool(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_bool"),
        }
    }

    fn get_string(&self, row: usize) -> &str {
        match &self.values[row] {
            Value::String(v) => v,
            _ => getter_mismatch(&self.data_type, "get_string"),
        }
    }

    fn get_datetime_offset(&self, row: usize) -> DateTime<FixedOffset> {
        match &self.values[row] {
            Value::DateTimeOffset(v) => *v,
            _ => getter_mismatch(&self.data_type, "get_datetime_offset"),
        }
    }

    fn get_object(&self, row: usize) -> Value {
        self.values[row].clone()
    }

    fn value(&self, row: usize) -> Value {
        self.values[row].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_decimal_values() {
        let d = Decimal::from_str("12.50").unwrap();
        let v = ValueListVector::new(DataType::Decimal, vec![Value::Decimal(d), Value::Null]);
        assert_eq!(v.get_decimal(0), d);
        assert!(v.is_nullable());
        assert!(v.is_null(1));
    }

    #[test]
    fn test_any_values_are_boxed() {
        let v = ValueListVector::new(
            DataType::Any,
            vec![Value::Int32(1), Value::from("two")],
        );
        assert!(!v.is_nullable());
        assert_eq!(v.get_object(1), Value::from("two"));
        assert_eq!(v.value(0), Value::Int32(1));
    }
}
