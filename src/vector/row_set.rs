//! Row-sets: schema plus one vector per column.

use std::sync::Arc;

use crate::error::{ColvexError, Result};
use crate::types::{Schema, SchemaRef, Value};

use super::{from_values, ConstantVector, Selection, SelectionView, VectorRef};

/// Default batch size for vectorized execution (rows per batch).
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Rectangular batch of rows sharing one schema.
///
/// Used both for engine-level row batches and, in grouped aggregation, for
/// the member rows of one group.
#[derive(Debug, Clone)]
pub struct RowSet {
    schema: SchemaRef,
    columns: Vec<VectorRef>,
    num_rows: usize,
}

impl RowSet {
    /// Creates a row-set from columns of equal length.
    ///
    /// # Errors
    ///
    /// Returns a shape error if the column count differs from the schema or
    /// the columns differ in length.
    pub fn try_new(schema: SchemaRef, columns: Vec<VectorRef>) -> Result<Self> {
        let num_rows = columns.first().map_or(0, |c| c.len());
        Self::try_new_with_rows(schema, columns, num_rows)
    }

    /// Creates a row-set with an explicit row count, which also covers
    /// schemas without columns.
    ///
    /// # Errors
    ///
    /// Returns a shape error if any column length differs from `num_rows`.
    pub fn try_new_with_rows(
        schema: SchemaRef,
        columns: Vec<VectorRef>,
        num_rows: usize,
    ) -> Result<Self> {
        if columns.len() != schema.len() {
            return Err(ColvexError::ShapeError(format!(
                "Schema has {} columns but {} vectors were supplied",
                schema.len(),
                columns.len()
            )));
        }
        for (def, col) in schema.columns.iter().zip(&columns) {
            if col.len() != num_rows {
                return Err(ColvexError::ShapeError(format!(
                    "Column '{}' has {} rows, expected {num_rows}",
                    def.name,
                    col.len()
                )));
            }
            if col.data_type() != &def.data_type {
                return Err(ColvexError::type_error(
                    def.data_type.name(),
                    format!("column '{}' of type {}", def.name, col.data_type()),
                ));
            }
        }
        Ok(RowSet {
            schema,
            columns,
            num_rows,
        })
    }

    /// Creates a row-set of `num_rows` rows without columns.
    #[must_use]
    pub fn without_columns(num_rows: usize) -> Self {
        RowSet {
            schema: Arc::new(Schema::new(Vec::new())),
            columns: Vec::new(),
            num_rows,
        }
    }

    /// Builds a row-set from object values, one per row.
    ///
    /// Missing fields are stored as null.
    ///
    /// # Errors
    ///
    /// Returns a type error if a row is not an object or a field value does
    /// not fit its column type.
    pub fn from_objects(schema: SchemaRef, rows: &[Value]) -> Result<Self> {
        let mut columns = Vec::with_capacity(schema.len());
        for def in &schema.columns {
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Value::Object(_) => {
                        values.push(row.field(&def.name).cloned().unwrap_or(Value::Null));
                    }
                    other => {
                        return Err(ColvexError::type_error("OBJECT row", format!("{other:?}")))
                    }
                }
            }
            columns.push(from_values(&def.data_type, &values)?);
        }
        Self::try_new_with_rows(schema, columns, rows.len())
    }

    /// Returns the schema of this row-set.
    #[must_use]
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Returns all columns.
    #[must_use]
    pub fn columns(&self) -> &[VectorRef] {
        &self.columns
    }

    /// Returns a column by index.
    #[must_use]
    pub fn column(&self, index: usize) -> &VectorRef {
        &self.columns[index]
    }

    /// Returns a column by name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&VectorRef> {
        self.schema
            .get_column_index(name)
            .map(|i| &self.columns[i])
    }

    /// Restricts every column to `selection` without copying.
    #[must_use]
    pub fn select(&self, selection: &Selection) -> RowSet {
        let columns = self
            .columns
            .iter()
            .map(|col| Arc::new(SelectionView::new(col.clone(), selection.clone())) as VectorRef)
            .collect();
        RowSet {
            schema: self.schema.clone(),
            columns,
            num_rows: selection.len(),
        }
    }

    /// Repeats row `row` of every column `len` times without copying.
    #[must_use]
    pub fn broadcast_row(&self, row: usize, len: usize) -> RowSet {
        let columns = self
            .columns
            .iter()
            .map(|col| Arc::new(ConstantVector::new(col.clone(), row, len)) as VectorRef)
            .collect();
        RowSet {
            schema: self.schema.clone(),
            columns,
            num_rows: len,
        }
    }

    /// Splits the row-set into consecutive views of at most `batch_size` rows.
    #[must_use]
    pub fn chunks(&self, batch_size: usize) -> Vec<RowSet> {
        let batch_size = batch_size.max(1);
        (0..self.num_rows)
            .step_by(batch_size)
            .map(|start| {
                let len = batch_size.min(self.num_rows - start);
                self.select(&Selection::range(start, len))
            })
            .collect()
    }

    /// Boxes one row as an object value.
    #[must_use]
    pub fn row_value(&self, row: usize) -> Value {
        Value::Object(
            self.schema
                .columns
                .iter()
                .zip(&self.columns)
                .map(|(def, col)| (def.name.clone(), col.value(row)))
                .collect(),
        )
    }
}
