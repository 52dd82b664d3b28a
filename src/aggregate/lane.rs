//! Storage lanes the numeric engine accumulates in.

use std::fmt;

use rust_decimal::Decimal;

use crate::error::{ColvexError, Result};
use crate::types::{Category, DataType, Value};
use crate::vector::{ValueVector, VectorBuilder};

/// Primitive representation one aggregation runs in.
///
/// Chosen once per invocation from the resolved element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    /// Boxed values, dispatched on their runtime category.
    Object,
}

impl Lane {
    /// Selects the lane for a numeric (or `Any`) element type.
    ///
    /// # Errors
    ///
    /// Returns a type error for any other type.
    pub fn for_type(data_type: &DataType) -> Result<Lane> {
        match data_type.category() {
            Category::Int32 => Ok(Lane::Int32),
            Category::Int64 => Ok(Lane::Int64),
            Category::Float32 => Ok(Lane::Float32),
            Category::Float64 => Ok(Lane::Float64),
            Category::Decimal => Ok(Lane::Decimal),
            Category::Any => Ok(Lane::Object),
            _ => Err(ColvexError::type_error("numeric or ANY", data_type)),
        }
    }

    /// Lane family: integer, floating, decimal or object.
    #[must_use]
    pub fn family(self) -> &'static str {
        match self {
            Lane::Int32 | Lane::Int64 => "integer",
            Lane::Float32 | Lane::Float64 => "floating",
            Lane::Decimal => "decimal",
            Lane::Object => "object",
        }
    }

    /// Type of the vectors this lane produces.
    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            Lane::Int32 => DataType::Int32,
            Lane::Int64 => DataType::Int64,
            Lane::Float32 => DataType::Float32,
            Lane::Float64 => DataType::Float64,
            Lane::Decimal => DataType::Decimal,
            Lane::Object => DataType::Any,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.family(), self.data_type())
    }
}

/// Reads one non-null element of a vector into a lane value.
pub type Reader<T> = fn(&dyn ValueVector, usize) -> Result<T>;

/// A value the numeric engine can accumulate.
pub trait LaneValue: Sized + fmt::Debug + 'static {
    const LANE: Lane;

    /// Additive identity.
    fn zero() -> Self;

    /// Exact (or IEEE) addition.
    ///
    /// # Errors
    ///
    /// Returns an overflow error when exact addition overflows.
    fn checked_add(self, other: Self) -> Result<Self>;

    /// Divides by a positive element count.
    ///
    /// # Errors
    ///
    /// Returns an error if the count cannot be represented in the lane.
    fn div_count(self, count: u64) -> Result<Self>;

    /// Picks the reader for elements of `category`, once per input vector.
    ///
    /// # Errors
    ///
    /// Returns a type error if the category does not widen into this lane.
    fn reader(category: Category) -> Result<Reader<Self>>;

    /// Stores the value at `row`.
    fn write(self, builder: &mut VectorBuilder, row: usize);
}

fn lane_mismatch<T: LaneValue>(category: Category) -> ColvexError {
    ColvexError::type_error(format!("{} lane input", T::LANE), format!("{category:?}"))
}

fn overflow(lhs: impl fmt::Debug, rhs: impl fmt::Debug) -> ColvexError {
    ColvexError::ArithmeticOverflow(format!("{lhs:?} + {rhs:?}"))
}

fn count_overflow(count: u64) -> ColvexError {
    ColvexError::ArithmeticOverflow(format!("element count {count} exceeds lane range"))
}

impl LaneValue for i32 {
    const LANE: Lane = Lane::Int32;

    fn zero() -> Self {
        0
    }

    fn checked_add(self, other: Self) -> Result<Self> {
        i32::checked_add(self, other).ok_or_else(|| overflow(self, other))
    }

    fn div_count(self, count: u64) -> Result<Self> {
        let count = i32::try_from(count).map_err(|_| count_overflow(count))?;
        Ok(self / count)
    }

    fn reader(category: Category) -> Result<Reader<Self>> {
        let read: Reader<Self> = match category {
            Category::Int32 => |v, row| Ok(v.get_int32(row)),
            other => return Err(lane_mismatch::<Self>(other)),
        };
        Ok(read)
    }

    fn write(self, builder: &mut VectorBuilder, row: usize) {
        builder.set_int32(row, self);
    }
}

impl LaneValue for i64 {
    const LANE: Lane = Lane::Int64;

    fn zero() -> Self {
        0
    }

    fn checked_add(self, other: Self) -> Result<Self> {
        i64::checked_add(self, other).ok_or_else(|| overflow(self, other))
    }

    fn div_count(self, count: u64) -> Result<Self> {
        let count = i64::try_from(count).map_err(|_| count_overflow(count))?;
        Ok(self / count)
    }

    fn reader(category: Category) -> Result<Reader<Self>> {
        let read: Reader<Self> = match category {
            Category::Int32 => |v, row| Ok(i64::from(v.get_int32(row))),
            Category::Int64 => |v, row| Ok(v.get_int64(row)),
            other => return Err(lane_mismatch::<Self>(other)),
        };
        Ok(read)
    }

    fn write(self, builder: &mut VectorBuilder, row: usize) {
        builder.set_int64(row, self);
    }
}

impl LaneValue for f32 {
    const LANE: Lane = Lane::Float32;

    fn zero() -> Self {
        0.0
    }

    fn checked_add(self, other: Self) -> Result<Self> {
        Ok(self + other)
    }

    fn div_count(self, count: u64) -> Result<Self> {
        Ok(self / count as f32)
    }

    fn reader(category: Category) -> Result<Reader<Self>> {
        let read: Reader<Self> = match category {
            Category::Int32 => |v, row| Ok(v.get_int32(row) as f32),
            Category::Int64 => |v, row| Ok(v.get_int64(row) as f32),
            Category::Float32 => |v, row| Ok(v.get_float32(row)),
            other => return Err(lane_mismatch::<Self>(other)),
        };
        Ok(read)
    }

    fn write(self, builder: &mut VectorBuilder, row: usize) {
        builder.set_float32(row, self);
    }
}

impl LaneValue for f64 {
    const LANE: Lane = Lane::Float64;

    fn zero() -> Self {
        0.0
    }

    fn checked_add(self, other: Self) -> Result<Self> {
        Ok(self + other)
    }

    fn div_count(self, count: u64) -> Result<Self> {
        Ok(self / count as f64)
    }

    fn reader(category: Category) -> Result<Reader<Self>> {
        let read: Reader<Self> = match category {
            Category::Int32 => |v, row| Ok(f64::from(v.get_int32(row))),
            Category::Int64 => |v, row| Ok(v.get_int64(row) as f64),
            Category::Float32 => |v, row| Ok(f64::from(v.get_float32(row))),
            Category::Float64 => |v, row| Ok(v.get_float64(row)),
            other => return Err(lane_mismatch::<Self>(other)),
        };
        Ok(read)
    }

    fn write(self, builder: &mut VectorBuilder, row: usize) {
        builder.set_float64(row, self);
    }
}

impl LaneValue for Decimal {
    const LANE: Lane = Lane::Decimal;

    fn zero() -> Self {
        Decimal::ZERO
    }

    fn checked_add(self, other: Self) -> Result<Self> {
        Decimal::checked_add(self, other).ok_or_else(|| overflow(self, other))
    }

    fn div_count(self, count: u64) -> Result<Self> {
        Ok(self / Decimal::from(count))
    }

    fn reader(category: Category) -> Result<Reader<Self>> {
        let read: Reader<Self> = match category {
            Category::Int32 => |v, row| Ok(Decimal::from(v.get_int32(row))),
            Category::Int64 => |v, row| Ok(Decimal::from(v.get_int64(row))),
            Category::Float32 => |v, row| {
                let f = v.get_float32(row);
                Decimal::from_f32_retain(f).ok_or_else(|| ColvexError::type_error("DECIMAL", f))
            },
            Category::Float64 => |v, row| {
                let f = v.get_float64(row);
                Decimal::from_f64_retain(f).ok_or_else(|| ColvexError::type_error("DECIMAL", f))
            },
            Category::Decimal => |v, row| Ok(v.get_decimal(row)),
            other => return Err(lane_mismatch::<Self>(other)),
        };
        Ok(read)
    }

    fn write(self, builder: &mut VectorBuilder, row: usize) {
        builder.set_decimal(row, self);
    }
}

impl LaneValue for Value {
    const LANE: Lane = Lane::Object;

    fn zero() -> Self {
        Value::Int32(0)
    }

    fn checked_add(self, other: Self) -> Result<Self> {
        Value::checked_add(&self, &other)
    }

    fn div_count(self, count: u64) -> Result<Self> {
        Value::div_count(&self, count)
    }

    fn reader(_category: Category) -> Result<Reader<Self>> {
        let read: Reader<Self> = |v, row| Ok(v.value(row));
        Ok(read)
    }

    fn write(self, builder: &mut VectorBuilder, row: usize) {
        builder.set_object(row, self);
    }
}
