//! Boxed scalar values.
//!
//! [`Value`] is the representation used by literals and by the dynamic
//! (`Any`) aggregation lane. It is a closed set of scalar wrappers; the
//! arithmetic helpers below dispatch on that set only.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{ColvexError, Result};

use super::{Category, ColumnDef, DataType, Schema};

/// Runtime value container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// 32-bit signed integer value.
    Int32(i32),
    /// 64-bit signed integer value.
    Int64(i64),
    /// 32-bit floating point value.
    Float32(f32),
    /// 64-bit floating point value.
    Float64(f64),
    /// Arbitrary precision decimal value.
    Decimal(Decimal),
    /// Boolean value.
    Bool(bool),
    /// String value.
    String(String),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
    /// Date and time with a fixed offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// List of values (one array row, materialized).
    List(Vec<Value>),
    /// Named fields (one object or table row, materialized).
    Object(Vec<(String, Value)>),
    /// Null value.
    Null,
}

// Manual Hash implementation because f32/f64 doesn't implement Hash
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float32(v) => v.to_bits().hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Decimal(v) => v.normalize().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::DateTime(v) => v.hash(state),
            Value::DateTimeOffset(v) => v.hash(state),
            Value::List(v) => v.hash(state),
            Value::Object(v) => v.hash(state),
            Value::Null => {}
        }
    }
}

// Floats compare by bit pattern so equality agrees with Hash: 0.0 and -0.0
// differ, NaN equals itself.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Value {
    /// Returns true if this value is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the category of this value, or None for Null.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        match self {
            Value::Int32(_) => Some(Category::Int32),
            Value::Int64(_) => Some(Category::Int64),
            Value::Float32(_) => Some(Category::Float32),
            Value::Float64(_) => Some(Category::Float64),
            Value::Decimal(_) => Some(Category::Decimal),
            Value::Bool(_) => Some(Category::Boolean),
            Value::String(_) => Some(Category::String),
            Value::DateTime(_) => Some(Category::DateTime),
            Value::DateTimeOffset(_) => Some(Category::DateTimeOffset),
            Value::List(_) => Some(Category::Array),
            Value::Object(_) => Some(Category::Object),
            Value::Null => None,
        }
    }

    /// Returns the data type of this value, or None for Null.
    ///
    /// Lists take the type of their first non-null element (or `Any`).
    #[must_use]
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float32(_) => Some(DataType::Float32),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::Bool(_) => Some(DataType::Boolean),
            Value::String(_) => Some(DataType::String),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::DateTimeOffset(_) => Some(DataType::DateTimeOffset),
            Value::List(items) => {
                let element = items
                    .iter()
                    .find_map(Value::data_type)
                    .unwrap_or(DataType::Any);
                Some(DataType::array(element))
            }
            Value::Object(fields) => {
                let columns = fields
                    .iter()
                    .map(|(name, v)| {
                        ColumnDef::new(name.clone(), v.data_type().unwrap_or(DataType::Any))
                    })
                    .collect();
                Some(DataType::Object(Arc::new(Schema::new(columns))))
            }
            Value::Null => None,
        }
    }

    /// Attempts to extract an i32 value.
    #[must_use]
    pub fn as_int32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract an i64 value, widening 32-bit integers.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract an f32 value, converting integers.
    #[must_use]
    pub fn as_float32(&self) -> Option<f32> {
        match self {
            Value::Int32(i) => Some(*i as f32),
            Value::Int64(i) => Some(*i as f32),
            Value::Float32(f) => Some(*f),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value, converting any numeric category.
    #[must_use]
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Int32(i) => Some(f64::from(*i)),
            Value::Int64(i) => Some(*i as f64),
            Value::Float32(f) => Some(f64::from(*f)),
            Value::Float64(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Attempts to extract a decimal value, converting any numeric category.
    #[must_use]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int32(i) => Some(Decimal::from(*i)),
            Value::Int64(i) => Some(Decimal::from(*i)),
            Value::Float32(f) => Decimal::from_f32_retain(*f),
            Value::Float64(f) => Decimal::from_f64_retain(*f),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Attempts to extract a bool value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to extract a string reference.
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Attempts to extract list items.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Looks up a field of an object value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Compares two values using SQL null semantics.
    ///
    /// Numeric categories compare numerically across widths; lists compare
    /// lexicographically. Returns None if either value is null or the
    /// categories are unrelated.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::DateTimeOffset(a), Value::DateTimeOffset(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => self.compare_numeric(other),
        }
    }

    fn compare_numeric(&self, other: &Value) -> Option<Ordering> {
        let left = self.category().filter(|c| c.is_numeric())?;
        let right = other.category().filter(|c| c.is_numeric())?;
        let integral = |c: Category| matches!(c, Category::Int32 | Category::Int64);
        if integral(left) && integral(right) {
            return Some(self.as_int64()?.cmp(&other.as_int64()?));
        }
        let exact = |c: Category| integral(c) || c == Category::Decimal;
        if exact(left) && exact(right) {
            return Some(self.as_decimal()?.cmp(&other.as_decimal()?));
        }
        self.as_float64()?.partial_cmp(&other.as_float64()?)
    }

    /// Adds two numeric values, promoting to the higher-ranked category.
    ///
    /// # Errors
    ///
    /// Returns a type error for non-numeric operands and an overflow error
    /// when exact integer or decimal addition overflows.
    pub fn checked_add(&self, other: &Value) -> Result<Value> {
        let overflow = || ColvexError::ArithmeticOverflow(format!("{self:?} + {other:?}"));
        match promoted_category(self, other)? {
            Category::Int32 => {
                let (a, b) = (self.as_int32(), other.as_int32());
                a.zip(b)
                    .and_then(|(a, b)| a.checked_add(b))
                    .map(Value::Int32)
                    .ok_or_else(overflow)
            }
            Category::Int64 => {
                let (a, b) = (self.as_int64(), other.as_int64());
                a.zip(b)
                    .and_then(|(a, b)| a.checked_add(b))
                    .map(Value::Int64)
                    .ok_or_else(overflow)
            }
            Category::Float32 => {
                let (a, b) = (self.as_float32(), other.as_float32());
                a.zip(b).map(|(a, b)| Value::Float32(a + b)).ok_or_else(overflow)
            }
            Category::Float64 => {
                let (a, b) = (self.as_float64(), other.as_float64());
                a.zip(b).map(|(a, b)| Value::Float64(a + b)).ok_or_else(overflow)
            }
            _ => {
                let (a, b) = (self.as_decimal(), other.as_decimal());
                a.zip(b)
                    .and_then(|(a, b)| a.checked_add(b))
                    .map(Value::Decimal)
                    .ok_or_else(overflow)
            }
        }
    }

    /// Divides a numeric value by an element count, keeping its category.
    ///
    /// # Errors
    ///
    /// Returns a type error for non-numeric values and an overflow error
    /// when `count` does not fit the integer width.
    pub fn div_count(&self, count: u64) -> Result<Value> {
        let overflow =
            || ColvexError::ArithmeticOverflow(format!("element count {count} exceeds lane range"));
        match self {
            Value::Int32(v) => Ok(Value::Int32(v / i32::try_from(count).map_err(|_| overflow())?)),
            Value::Int64(v) => Ok(Value::Int64(v / i64::try_from(count).map_err(|_| overflow())?)),
            Value::Float32(v) => Ok(Value::Float32(v / count as f32)),
            Value::Float64(v) => Ok(Value::Float64(v / count as f64)),
            Value::Decimal(v) => Ok(Value::Decimal(v / Decimal::from(count))),
            other => Err(ColvexError::type_error("numeric", format!("{other:?}"))),
        }
    }
}

/// Category two numeric values promote to.
fn promoted_category(left: &Value, right: &Value) -> Result<Category> {
    let numeric = |v: &Value| {
        v.category()
            .filter(|c| c.is_numeric())
            .ok_or_else(|| ColvexError::type_error("numeric", format!("{v:?}")))
    };
    let (l, r) = (numeric(left)?, numeric(right)?);
    Ok(if r.precedence() > l.precedence() { r } else { l })
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
