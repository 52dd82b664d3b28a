//! Zero-copy vector adapters.
//!
//! Both adapters hold a shared handle to the backing vector and remap row
//! indices; neither duplicates storage.

use std::sync::Arc;

use arrow::array::{ArrayRef, UInt32Array};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;

use crate::types::{DataType, Value};

use super::{RowSet, ValueVector, VectorRef};

/// Row remapping used by [`SelectionView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Contiguous rows `start..start + len`.
    Range { start: usize, len: usize },
    /// Arbitrary rows, in the given order.
    Indices(Arc<[usize]>),
}

impl Selection {
    /// Creates a contiguous selection.
    #[must_use]
    pub fn range(start: usize, len: usize) -> Self {
        Selection::Range { start, len }
    }

    /// Creates a selection of explicit indices.
    #[must_use]
    pub fn indices(indices: Vec<usize>) -> Self {
        Selection::Indices(indices.into())
    }

    /// Creates a selection of all rows up to count.
    #[must_use]
    pub fn all(count: usize) -> Self {
        Selection::Range {
            start: 0,
            len: count,
        }
    }

    /// Returns the number of selected rows.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Selection::Range { len, .. } => *len,
            Selection::Indices(indices) => indices.len(),
        }
    }

    /// Returns true if no rows are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maps a position in the selection to a row of the backing vector.
    #[must_use]
    pub fn get(&self, pos: usize) -> usize {
        match self {
            Selection::Range { start, len } => {
                assert!(pos < *len, "selection position {pos} out of range {len}");
                start + pos
            }
            Selection::Indices(indices) => indices[pos],
        }
    }

    /// Returns the backing rows in selection order.
    #[must_use]
    pub fn to_indices(&self) -> Vec<usize> {
        (0..self.len()).map(|pos| self.get(pos)).collect()
    }

    fn materialize(&self, array: &ArrayRef) -> Option<ArrayRef> {
        match self {
            Selection::Range { start, len } => Some(array.slice(*start, *len)),
            Selection::Indices(indices) => {
                let indices =
                    UInt32Array::from(indices.iter().map(|&i| i as u32).collect::<Vec<_>>());
                arrow::compute::take(array, &indices, None).ok()
            }
        }
    }
}

/// Vector exposing selected rows of another vector.
#[derive(Debug, Clone)]
pub struct SelectionView {
    inner: VectorRef,
    selection: Selection,
}

impl SelectionView {
    /// Creates a view of `inner` restricted to `selection`.
    #[must_use]
    pub fn new(inner: VectorRef, selection: Selection) -> Self {
        SelectionView { inner, selection }
    }

    /// Returns the selection applied to the backing vector.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Returns the backing vector.
    #[must_use]
    pub fn inner(&self) -> &VectorRef {
        &self.inner
    }

    fn map(&self, row: usize) -> usize {
        self.selection.get(row)
    }
}

impl ValueVector for SelectionView {
    fn data_type(&self) -> &DataType {
        self.inner.data_type()
    }

    fn len(&self) -> usize {
        self.selection.len()
    }

    fn is_nullable(&self) -> bool {
        self.inner.is_nullable()
    }

    fn is_null(&self, row: usize) -> bool {
        self.inner.is_null(self.map(row))
    }

    fn get_int32(&self, row: usize) -> i32 {
        self.inner.get_int32(self.map(row))
    }

    fn get_int64(&self, row: usize) -> i64 {
        self.inner.get_int64(self.map(row))
    }

    fn get_float32(&self, row: usize) -> f32 {
        self.inner.get_float32(self.map(row))
    }

    fn get_float64(&self, row: usize) -> f64 {
        self.inner.get_float64(self.map(row))
    }

    fn get_decimal(&self, row: usize) -> Decimal {
        self.inner.get_decimal(self.map(row))
    }

    fn get_bool(&self, row: usize) -> bool {
        self.inner.get_bool(self.map(row))
    }

    fn get_string(&self, row: usize) -> &str {
        self.inner.get_string(self.map(row))
    }

    fn get_datetime(&self, row: usize) -> NaiveDateTime {
        self.inner.get_datetime(self.map(row))
    }

    fn get_datetime_offset(&self, row: usize) -> DateTime<FixedOffset> {
        self.inner.get_datetime_offset(self.map(row))
    }

    fn get_array(&self, row: usize) -> VectorRef {
        self.inner.get_array(self.map(row))
    }

    fn get_table(&self, row: usize) -> RowSet {
        self.inner.get_table(self.map(row))
    }

    fn get_object(&self, row: usize) -> Value {
        self.inner.get_object(self.map(row))
    }

    fn value(&self, row: usize) -> Value {
        self.inner.value(self.map(row))
    }

    fn to_arrow(&self) -> Option<ArrayRef> {
        self.selection.materialize(&self.inner.to_arrow()?)
    }
}

/// Vector repeating one row of another vector `len` times.
#[derive(Debug, Clone)]
pub struct ConstantVector {
    inner: VectorRef,
    row: usize,
    len: usize,
}

impl ConstantVector {
    /// Broadcasts `inner[row]` to `len` rows.
    #[must_use]
    pub fn new(inner: VectorRef, row: usize, len: usize) -> Self {
        assert!(row < inner.len(), "broadcast row {row} out of range");
        ConstantVector { inner, row, len }
    }
}

impl ValueVector for ConstantVector {
    fn data_type(&self) -> &DataType {
        self.inner.data_type()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn is_nullable(&self) -> bool {
        self.inner.is_null(self.row)
    }

    fn is_null(&self, _row: usize) -> bool {
        self.inner.is_null(self.row)
    }

    fn get_int32(&self, _row: usize) -> i32 {
        self.inner.get_int32(self.row)
    }

    fn get_int64(&self, _row: usize) -> i64 {
        self.inner.get_int64(self.row)
    }

    fn get_float32(&self, _row: usize) -> f32 {
        self.inner.get_float32(self.row)
    }

    fn get_float64(&self, _row: usize) -> f64 {
        self.inner.get_float64(self.row)
    }

    fn get_decimal(&self, _row: usize) -> Decimal {
        self.inner.get_decimal(self.row)
    }

    fn get_bool(&self, _row: usize) -> bool {
        self.inner.get_bool(self.row)
    }

    fn get_string(&self, _row: usize) -> &str {
        self.inner.get_string(self.row)
    }

    fn get_datetime(&self, _row: usize) -> NaiveDateTime {
        self.inner.get_datetime(self.row)
    }

    fn get_datetime_offset(&self, _row: usize) -> DateTime<FixedOffset> {
        self.inner.get_datetime_offset(self.row)
    }

    fn get_array(&self, _row: usize) -> VectorRef {
        self.inner.get_array(self.row)
    }

    fn get_table(&self, _row: usize) -> RowSet {
        self.inner.get_table(self.row)
    }

    fn get_object(&self, _row: usize) -> Value {
        self.inner.get_object(self.row)
    }

    fn value(&self, _row: usize) -> Value {
        self.inner.value(self.row)
    }

    fn to_arrow(&self) -> Option<ArrayRef> {
        let indices = UInt32Array::from(vec![self.row as u32; self.len]);
        arrow::compute::take(&self.inner.to_arrow()?, &indices, None).ok()
    }
}
