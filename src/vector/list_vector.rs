//! Array-typed vectors.

use std::sync::Arc;

use arrow::buffer::NullBuffer;

use crate::error::{ColvexError, Result};
use crate::types::DataType;

use super::{Selection, SelectionView, ValueVector, VectorRef};

/// Array vector over one flat child vector partitioned by offsets.
///
/// Row `i` holds child rows `offsets[i]..offsets[i + 1]`; `get_array`
/// returns a zero-copy range view of the child.
#[derive(Debug, Clone)]
pub struct ListVector {
    data_type: DataType,
    offsets: Vec<usize>,
    values: VectorRef,
    nulls: Option<NullBuffer>,
}

impl ListVector {
    /// Creates an array vector.
    ///
    /// # Errors
    ///
    /// Returns a shape error if the offsets are empty, not monotonic, exceed
    /// the child length, or disagree with the null buffer length.
    pub fn try_new(
        values: VectorRef,
        offsets: Vec<usize>,
        nulls: Option<NullBuffer>,
    ) -> Result<Self> {
        let Some(&last) = offsets.last() else {
            return Err(ColvexError::ShapeError(
                "Array offsets must contain at least one entry".into(),
            ));
        };
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(ColvexError::ShapeError(
                "Array offsets must be non-decreasing".into(),
            ));
        }
        if last > values.len() {
            return Err(ColvexError::ShapeError(format!(
                "Array offset {last} exceeds child length {}",
                values.len()
            )));
        }
        if let Some(nulls) = &nulls {
            if nulls.len() != offsets.len() - 1 {
                return Err(ColvexError::ShapeError(format!(
                    "Null buffer length {} does not match {} array rows",
                    nulls.len(),
                    offsets.len() - 1
                )));
            }
        }
        let data_type = DataType::array(values.data_type().clone());
        Ok(ListVector {
            data_type,
            offsets,
            values,
            nulls,
        })
    }

    /// Returns the flat child vector.
    #[must_use]
    pub fn values(&self) -> &VectorRef {
        &self.values
    }

    /// Returns the element range of `row`.
    #[must_use]
    pub fn value_range(&self, row: usize) -> std::ops::Range<usize> {
        self.offsets[row]..self.offsets[row + 1]
    }
}

impl ValueVector for ListVector {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn is_nullable(&self) -> bool {
        self.nulls.is_some()
    }

    fn is_null(&self, row: usize) -> bool {
        self.nulls.as_ref().is_some_and(|n| n.is_null(row))
    }

    fn get_array(&self, row: usize) -> VectorRef {
        let range = self.value_range(row);
        Arc::new(SelectionView::new(
            self.values.clone(),
            Selection::range(range.start, range.len()),
        ))
    }
}

/// Array vector holding one independently built nested vector per row.
///
/// Produced by [`VectorBuilder`](super::VectorBuilder) when results are
/// composed from per-row vectors (lambda outputs, distinct views).
#[derive(Debug, Clone)]
pub struct NestedVector {
    data_type: DataType,
    rows: Vec<Option<VectorRef>>,
    nullable: bool,
}

impl NestedVector {
    /// Creates an array vector of `data_type` from per-row vectors.
    #[must_use]
    pub fn new(data_type: DataType, rows: Vec<Option<VectorRef>>) -> Self {
        let nullable = rows.iter().any(Option::is_none);
        NestedVector {
            data_type,
            rows,
            nullable,
        }
    }
}

impl ValueVector for NestedVector {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn is_nullable(&self) -> bool {
        self.nullable
    }

    fn is_null(&self, row: usize) -> bool {
        self.rows[row].is_none()
    }

    fn get_array(&self, row: usize) -> VectorRef {
        match &self.rows[row] {
            Some(nested) => nested.clone(),
            None => panic!("get_array called on null row {row}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use crate::vector::{from_values, to_values};

    fn child() -> VectorRef {
        let values: Vec<Value> = (1..=5).map(Value::Int32).collect();
        from_values(&DataType::Int32, &values).unwrap()
    }

    #[test]
    fn test_list_vector_rows() {
        let list = ListVector::try_new(child(), vec![0, 2, 2, 5], None).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.data_type(), &DataType::array(DataType::Int32));
        assert_eq!(list.get_array(0).len(), 2);
        assert!(list.get_array(1).is_empty());
        assert_eq!(
            to_values(list.get_array(2).as_ref()),
            vec![Value::Int32(3), Value::Int32(4), Value::Int32(5)]
        );
    }

    #[test]
    fn test_list_vector_nulls() {
        let nulls = NullBuffer::from(vec![true, false]);
        let list = ListVector::try_new(child(), vec![0, 1, 1], Some(nulls)).unwrap();
        assert!(list.is_nullable());
        assert!(!list.is_null(0));
        assert!(list.is_null(1));
    }

    #[test]
    fn test_list_vector_rejects_bad_offsets() {
        assert!(ListVector::try_new(child(), vec![], None).is_err());
        assert!(ListVector::try_new(child(), vec![0, 3, 2], None).is_err());
        assert!(ListVector::try_new(child(), vec![0, 9], None).is_err());
    }

    #[test]
    fn test_nested_vector() {
        let nested = NestedVector::new(
            DataType::array(DataType::Int32),
            vec![Some(child()), None],
        );
        assert!(nested.is_nullable());
        assert!(nested.is_null(1));
        assert_eq!(nested.get_array(0).len(), 5);
    }
}
