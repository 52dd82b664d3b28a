//! Table-typed vectors and the row-set object view.

use crate::types::{DataType, SchemaRef, Value};

use super::{RowSet, Selection, ValueVector};

/// Vector whose rows are row-sets sharing one schema.
///
/// In grouped aggregation each row holds the member rows of one group.
#[derive(Debug, Clone)]
pub struct TableVector {
    data_type: DataType,
    rows: Vec<Option<RowSet>>,
    nullable: bool,
}

impl TableVector {
    /// Creates a table vector; every present row-set must use `schema`.
    #[must_use]
    pub fn new(schema: SchemaRef, rows: Vec<Option<RowSet>>) -> Self {
        let nullable = rows.iter().any(Option::is_none);
        TableVector {
            data_type: DataType::Table(schema),
            rows,
            nullable,
        }
    }

    /// Partitions `rows` into groups of row indices, one table row per group.
    ///
    /// Each group is a zero-copy selection over `rows`.
    #[must_use]
    pub fn from_groups(rows: &RowSet, groups: &[Vec<usize>]) -> Self {
        let groups = groups
            .iter()
            .map(|members| Some(rows.select(&Selection::indices(members.clone()))))
            .collect();
        Self::new(rows.schema().clone(), groups)
    }
}

impl ValueVector for TableVector {
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

    fn get_table(&self, row: usize) -> RowSet {
        match &self.rows[row] {
            Some(rows) => rows.clone(),
            None => panic!("get_table called on null row {row}"),
        }
    }
}

/// Presents each row of a row-set as an `Object` value.
///
/// Lambdas over table-typed arguments bind their parameter to this view, so
/// field access can resolve straight to the underlying column.
#[derive(Debug, Clone)]
pub struct RowSetObjects {
    data_type: DataType,
    rows: RowSet,
}

impl RowSetObjects {
    /// Wraps `rows`.
    #[must_use]
    pub fn new(rows: RowSet) -> Self {
        RowSetObjects {
            data_type: DataType::Object(rows.schema().clone()),
            rows,
        }
    }
}

impl ValueVector for RowSetObjects {
    fn data_type(&self) -> &DataType {
        &self.data_type
    }

    fn len(&self) -> usize {
        self.rows.num_rows()
    }

    fn is_nullable(&self) -> bool {
        false
    }

    fn is_null(&self, _row: usize) -> bool {
        false
    }

    fn get_object(&self, row: usize) -> Value {
        self.rows.row_value(row)
    }

    fn as_row_set(&self) -> Option<&RowSet> {
        Some(&self.rows)
    }
}
