//! Write-once vector builder.

use std::sync::Arc;

use arrow::array::{
    BooleanArray, BooleanBufferBuilder, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, TimestampMicrosecondArray,
};
use arrow::buffer::NullBuffer;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;

use crate::error::{ColvexError, Result};
use crate::types::{Category, DataType, Value};

use super::{
    ArrowVector, ListVector, NestedVector, RowSet, TableVector, ValueListVector, ValueVector,
    VectorRef,
};

/// Typed backing storage, pre-sized to the declared row count.
#[derive(Debug)]
enum Storage {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Boolean(Vec<bool>),
    String(Vec<String>),
    /// Microseconds since the Unix epoch.
    DateTime(Vec<i64>),
    Values(Vec<Value>),
    Arrays(Vec<Option<VectorRef>>),
    Tables(Vec<Option<RowSet>>),
}

/// Single-writer accumulator producing an immutable vector.
///
/// Every row in `0..len` must be written (as a value or null) before
/// [`build`](Self::build). Primitive categories keep a flat value array and
/// allocate the null bitmap only when the first null is written.
#[derive(Debug)]
pub struct VectorBuilder {
    data_type: DataType,
    len: usize,
    storage: Storage,
    nulls: Option<BooleanBufferBuilder>,
    written: BooleanBufferBuilder,
    remaining: usize,
}

impl VectorBuilder {
    /// Creates a builder for `len` rows of `data_type`.
    #[must_use]
    pub fn new(data_type: DataType, len: usize) -> Self {
        let storage = match data_type.category() {
            Category::Int32 => Storage::Int32(vec![0; len]),
            Category::Int64 => Storage::Int64(vec![0; len]),
            Category::Float32 => Storage::Float32(vec![0.0; len]),
            Category::Float64 => Storage::Float64(vec![0.0; len]),
            Category::Boolean => Storage::Boolean(vec![false; len]),
            Category::String => Storage::String(vec![String::new(); len]),
            Category::DateTime => Storage::DateTime(vec![0; len]),
            Category::Decimal | Category::DateTimeOffset | Category::Object | Category::Any => {
                Storage::Values(vec![Value::Null; len])
            }
            Category::Array => Storage::Arrays(vec![None; len]),
            Category::Table => Storage::Tables(vec![None; len]),
        };
        let mut written = BooleanBufferBuilder::new(len);
        written.append_n(len, false);
        VectorBuilder {
            data_type,
            len,
            storage,
            nulls: None,
            written,
            remaining: len,
        }
    }

    /// Declared type of the vector being built.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Declared row count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the builder has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn mark_written(&mut self, row: usize) {
        assert!(row < self.len, "row {row} out of range for {} rows", self.len);
        if !self.written.get_bit(row) {
            self.written.set_bit(row, true);
            self.remaining -= 1;
        }
    }

    fn mark_valid(&mut self, row: usize) {
        self.mark_written(row);
        if let Some(nulls) = self.nulls.as_mut() {
            nulls.set_bit(row, true);
        }
    }

    fn setter_mismatch(&self, setter: &str) -> ! {
        panic!("{setter} called on a {} builder", self.data_type)
    }

    /// Stores a boxed value when the builder is `Any` or of `category`.
    fn set_boxed(&mut self, row: usize, value: Value, category: Category, setter: &str) {
        let target = self.data_type.category();
        if target != Category::Any && target != category {
            self.setter_mismatch(setter);
        }
        match &mut self.storage {
            Storage::Values(values) => values[row] = value,
            _ => self.setter_mismatch(setter),
        }
        self.mark_valid(row);
    }

    /// Writes null at `row`.
    pub fn set_null(&mut self, row: usize) {
        self.mark_written(row);
        match &mut self.storage {
            Storage::Values(values) => values[row] = Value::Null,
            Storage::Arrays(rows) => rows[row] = None,
            Storage::Tables(rows) => rows[row] = None,
            _ => {
                let len = self.len;
                self.nulls
                    .get_or_insert_with(|| {
                        let mut nulls = BooleanBufferBuilder::new(len);
                        nulls.append_n(len, true);
                        nulls
                    })
                    .set_bit(row, false);
            }
        }
    }

    pub fn set_int32(&mut self, row: usize, value: i32) {
        match &mut self.storage {
            Storage::Int32(values) => values[row] = value,
            Storage::Values(_) => {
                return self.set_boxed(row, Value::Int32(value), Category::Int32, "set_int32")
            }
            _ => self.setter_mismatch("set_int32"),
        }
        self.mark_valid(row);
    }

    pub fn set_int64(&mut self, row: usize, value: i64) {
        match &mut self.storage {
            Storage::Int64(values) => values[row] = value,
            Storage::Values(_) => {
                return self.set_boxed(row, Value::Int64(value), Category::Int64, "set_int64")
            }
            _ => self.setter_mismatch("set_int64"),
        }
        self.mark_valid(row);
    }

    pub fn set_float32(&mut self, row: usize, value: f32) {
        match &mut self.storage {
            Storage::Float32(values) => values[row] = value,
            Storage::Values(_) => {
                return self.set_boxed(row, Value::Float32(value), Category::Float32, "set_float32")
            }
            _ => self.setter_mismatch("set_float32"),
        }
        self.mark_valid(row);
    }

    pub fn set_float64(&mut self, row: usize, value: f64) {
        match &mut self.storage {
            Storage::Float64(values) => values[row] = value,
            Storage::Values(_) => {
                return self.set_boxed(row, Value::Float64(value), Category::Float64, "set_float64")
            }
            _ => self.setter_mismatch("set_float64"),
        }
        self.mark_valid(row);
    }

    pub fn set_decimal(&mut self, row: usize, value: Decimal) {
        self.set_boxed(row, Value::Decimal(value), Category::Decimal, "set_decimal");
    }

    pub fn set_bool(&mut self, row: usize, value: bool) {
        match &mut self.storage {
            Storage::Boolean(values) => values[row] = value,
            Storage::Values(_) => {
                return self.set_boxed(row, Value::Bool(value), Category::Boolean, "set_bool")
            }
            _ => self.setter_mismatch("set_bool"),
        }
        self.mark_valid(row);
    }

    pub fn set_string(&mut self, row: usize, value: &str) {
        match &mut self.storage {
            Storage::String(values) => value.clone_into(&mut values[row]),
            Storage::Values(_) => {
                return self.set_boxed(
                    row,
                    Value::String(value.to_string()),
                    Category::String,
                    "set_string",
                );
            }
            _ => self.setter_mismatch("set_string"),
        }
        self.mark_valid(row);
    }

    pub fn set_datetime(&mut self, row: usize, value: NaiveDateTime) {
        match &mut self.storage {
            Storage::DateTime(values) => values[row] = value.and_utc().timestamp_micros(),
            Storage::Values(_) => {
                let value = Value::DateTime(value);
                return self.set_boxed(row, value, Category::DateTime, "set_datetime");
            }
            _ => self.setter_mismatch("set_datetime"),
        }
        self.mark_valid(row);
    }

    pub fn set_datetime_offset(&mut self, row: usize, value: DateTime<FixedOffset>) {
        self.set_boxed(
            row,
            Value::DateTimeOffset(value),
            Category::DateTimeOffset,
            "set_datetime_offset",
        );
    }

    /// Stores a nested vector as the elements of array row `row`.
    pub fn set_array(&mut self, row: usize, value: VectorRef) {
        match &mut self.storage {
            Storage::Arrays(rows) => rows[row] = Some(value),
            _ => self.setter_mismatch("set_array"),
        }
        self.mark_valid(row);
    }

    /// Stores a row-set as table row `row`.
    pub fn set_table(&mut self, row: usize, value: RowSet) {
        match &mut self.storage {
            Storage::Tables(rows) => rows[row] = Some(value),
            _ => self.setter_mismatch("set_table"),
        }
        self.mark_valid(row);
    }

    /// Stores a boxed value in an `Object` or `Any` builder.
    pub fn set_object(&mut self, row: usize, value: Value) {
        if value.is_null() {
            self.set_null(row);
        } else {
            self.set_boxed(row, value, Category::Object, "set_object");
        }
    }

    /// Copies one logical value from `src[src_row]` into `dst_row`,
    /// transcoding between compatible representations (e.g. INT32 into an
    /// INT64 builder).
    ///
    /// # Errors
    ///
    /// Returns a type error if the source category cannot be stored in this
    /// builder.
    pub fn copy(&mut self, dst_row: usize, src: &dyn ValueVector, src_row: usize) -> Result<()> {
        if src.is_null(src_row) {
            self.set_null(dst_row);
            return Ok(());
        }
        let source = src.data_type().category();
        match (self.data_type.category(), source) {
            (Category::Int32, Category::Int32) => self.set_int32(dst_row, src.get_int32(src_row)),
            (Category::Int64, Category::Int32) => {
                self.set_int64(dst_row, i64::from(src.get_int32(src_row)));
            }
            (Category::Int64, Category::Int64) => self.set_int64(dst_row, src.get_int64(src_row)),
            (Category::Float32, Category::Int32) => {
                self.set_float32(dst_row, src.get_int32(src_row) as f32);
            }
            (Category::Float32, Category::Float32) => {
                self.set_float32(dst_row, src.get_float32(src_row));
            }
            (Category::Float64, Category::Int32) => {
                self.set_float64(dst_row, f64::from(src.get_int32(src_row)));
            }
            (Category::Float64, Category::Int64) => {
                self.set_float64(dst_row, src.get_int64(src_row) as f64);
            }
            (Category::Float64, Category::Float32) => {
                self.set_float64(dst_row, f64::from(src.get_float32(src_row)));
            }
            (Category::Float64, Category::Float64) => {
                self.set_float64(dst_row, src.get_float64(src_row));
            }
            (Category::Decimal, Category::Decimal) => {
                self.set_decimal(dst_row, src.get_decimal(src_row));
            }
            (Category::Boolean, Category::Boolean) => self.set_bool(dst_row, src.get_bool(src_row)),
            (Category::String, Category::String) => {
                self.set_string(dst_row, src.get_string(src_row));
            }
            (Category::DateTime, Category::DateTime) => {
                self.set_datetime(dst_row, src.get_datetime(src_row));
            }
            (Category::DateTimeOffset, Category::DateTimeOffset) => {
                self.set_datetime_offset(dst_row, src.get_datetime_offset(src_row));
            }
            (Category::Array, Category::Array) => self.set_array(dst_row, src.get_array(src_row)),
            (Category::Table, Category::Table) => self.set_table(dst_row, src.get_table(src_row)),
            (Category::Object, Category::Object) => {
                self.set_object(dst_row, src.get_object(src_row));
            }
            (Category::Any, _) => self.set_object(dst_row, src.value(src_row)),
            // Remaining pairs (decimal targets, boxed sources) go through the
            // boxed conversion rules.
            _ => self.set_value(dst_row, &src.value(src_row))?,
        }
        Ok(())
    }

    /// Stores a boxed value, converting it to the builder's category.
    ///
    /// # Errors
    ///
    /// Returns a type error if the value cannot be represented.
    pub fn set_value(&mut self, row: usize, value: &Value) -> Result<()> {
        let type_name = self.data_type.name();
        let mismatch = || ColvexError::type_error(type_name.clone(), format!("{value:?}"));
        if value.is_null() {
            self.set_null(row);
            return Ok(());
        }
        match self.data_type.category() {
            Category::Any => self.set_object(row, value.clone()),
            Category::Int32 => self.set_int32(row, value.as_int32().ok_or_else(mismatch)?),
            Category::Int64 => self.set_int64(row, value.as_int64().ok_or_else(mismatch)?),
            Category::Float32 => self.set_float32(row, value.as_float32().ok_or_else(mismatch)?),
            Category::Float64 => self.set_float64(row, value.as_float64().ok_or_else(mismatch)?),
            Category::Decimal => self.set_decimal(row, value.as_decimal().ok_or_else(mismatch)?),
            Category::Boolean => self.set_bool(row, value.as_bool().ok_or_else(mismatch)?),
            Category::String => {
                let s = value.as_string().ok_or_else(mismatch)?;
                self.set_string(row, s);
            }
            Category::DateTime => match value {
                Value::DateTime(v) => self.set_datetime(row, *v),
                _ => return Err(mismatch()),
            },
            Category::DateTimeOffset => match value {
                Value::DateTimeOffset(v) => self.set_datetime_offset(row, *v),
                _ => return Err(mismatch()),
            },
            Category::Array => {
                let items = value.as_list().ok_or_else(mismatch)?;
                let element = self.data_type.element_type().cloned().unwrap_or(DataType::Any);
                let nested = super::from_values(&element, items)?;
                self.set_array(row, nested);
            }
            Category::Table => {
                let items = value.as_list().ok_or_else(mismatch)?;
                let schema = self.data_type.schema().cloned().ok_or_else(mismatch)?;
                let rows = RowSet::from_objects(schema, items)?;
                self.set_table(row, rows);
            }
            Category::Object => match value {
                Value::Object(_) => self.set_object(row, value.clone()),
                _ => return Err(mismatch()),
            },
        }
        Ok(())
    }

    /// Freezes the builder into an immutable vector.
    ///
    /// # Errors
    ///
    /// Returns a shape error if any row was never written.
    pub fn build(self) -> Result<VectorRef> {
        if self.remaining > 0 {
            let first = (0..self.len)
                .find(|&row| !self.written.get_bit(row))
                .unwrap_or_default();
            return Err(ColvexError::ShapeError(format!(
                "{} of {} rows were never written (first unwritten row {first})",
                self.remaining, self.len
            )));
        }
        let VectorBuilder {
            data_type,
            storage,
            nulls,
            ..
        } = self;
        let nulls = nulls.map(|mut b| NullBuffer::new(b.finish()));
        let vector: VectorRef = match storage {
            Storage::Int32(values) => arrow_vector(Int32Array::new(values.into(), nulls))?,
            Storage::Int64(values) => arrow_vector(Int64Array::new(values.into(), nulls))?,
            Storage::Float32(values) => arrow_vector(Float32Array::new(values.into(), nulls))?,
            Storage::Float64(values) => arrow_vector(Float64Array::new(values.into(), nulls))?,
            Storage::Boolean(values) => {
                let mut bits = BooleanBufferBuilder::new(values.len());
                for v in values {
                    bits.append(v);
                }
                arrow_vector(BooleanArray::new(bits.finish(), nulls))?
            }
            Storage::String(values) => {
                let array: StringArray = values
                    .iter()
                    .enumerate()
                    .map(|(row, s)| {
                        let valid = nulls.as_ref().map_or(true, |n| n.is_valid(row));
                        valid.then_some(s.as_str())
                    })
                    .collect();
                arrow_vector(array)?
            }
            Storage::DateTime(values) => {
                arrow_vector(TimestampMicrosecondArray::new(values.into(), nulls))?
            }
            Storage::Values(values) => Arc::new(ValueListVector::new(data_type, values)),
            Storage::Arrays(rows) => Arc::new(NestedVector::new(data_type, rows)),
            Storage::Tables(rows) => {
                let schema = data_type
                    .schema()
                    .cloned()
                    .ok_or_else(|| ColvexError::type_error("TABLE", &data_type))?;
                Arc::new(TableVector::new(schema, rows))
            }
        };
        Ok(vector)
    }
}

fn arrow_vector(array: impl arrow::array::Array + 'static) -> Result<VectorRef> {
    Ok(Arc::new(ArrowVector::try_new(Arc::new(array))?))
}

/// Builds an array vector from a flat element builder and per-row lengths.
///
/// `lengths[i] == None` marks a null row.
///
/// # Errors
///
/// Propagates build failures of the element vector.
pub fn build_list(elements: VectorBuilder, lengths: &[Option<usize>]) -> Result<VectorRef> {
    let values = elements.build()?;
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    offsets.push(0);
    let mut validity = BooleanBufferBuilder::new(lengths.len());
    let mut end = 0;
    for len in lengths {
        end += len.unwrap_or(0);
        offsets.push(end);
        validity.append(len.is_some());
    }
    let nulls = lengths
        .iter()
        .any(Option::is_none)
        .then(|| NullBuffer::new(validity.finish()));
    Ok(Arc::new(ListVector::try_new(values, offsets, nulls)?))
}
