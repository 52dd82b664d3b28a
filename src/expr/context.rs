//! Evaluation context: the current row-set plus lambda parameter bindings.

use std::sync::Arc;

use crate::config::EvalConfig;
use crate::error::Result;
use crate::vector::{ConstantVector, RowSet, Selection, SelectionView, VectorRef};

use super::{Evaluator, Expr, ParamId};

/// Everything an expression sees while being evaluated.
///
/// Every bound parameter vector is row-aligned with `rows`.
#[derive(Debug, Clone)]
pub struct EvalContext<'a> {
    rows: RowSet,
    params: Vec<(ParamId, VectorRef)>,
    config: &'a EvalConfig,
}

impl<'a> EvalContext<'a> {
    /// Creates a context over `rows`.
    #[must_use]
    pub fn new(rows: RowSet, config: &'a EvalConfig) -> Self {
        EvalContext {
            rows,
            params: Vec::new(),
            config,
        }
    }

    /// Creates a context over `num_rows` rows without columns.
    ///
    /// Useful when every input arrives through parameter bindings.
    #[must_use]
    pub fn without_columns(num_rows: usize, config: &'a EvalConfig) -> Self {
        Self::new(RowSet::without_columns(num_rows), config)
    }

    /// Returns the current row-set.
    #[must_use]
    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    /// Returns the number of rows expressions evaluate over.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.rows.num_rows()
    }

    /// Returns the evaluation configuration.
    #[must_use]
    pub fn config(&self) -> &'a EvalConfig {
        self.config
    }

    /// Looks up a parameter binding; inner bindings shadow outer ones.
    #[must_use]
    pub fn param(&self, id: ParamId) -> Option<&VectorRef> {
        self.params
            .iter()
            .rev()
            .find(|(bound, _)| *bound == id)
            .map(|(_, vector)| vector)
    }

    /// Returns a context with `id` bound to a vector aligned with the
    /// current rows.
    #[must_use]
    pub fn bind(&self, id: ParamId, vector: VectorRef) -> Self {
        debug_assert_eq!(vector.len(), self.num_rows());
        let mut params = self.params.clone();
        params.push((id, vector));
        EvalContext {
            rows: self.rows.clone(),
            params,
            config: self.config,
        }
    }

    /// Returns a context for evaluating a lambda body over the nested
    /// elements of outer row `row`.
    ///
    /// Outer columns and outer parameters are broadcast from `row` to the
    /// nested length; `id` is bound to `vector`.
    #[must_use]
    pub fn nested(&self, row: usize, id: ParamId, vector: VectorRef) -> Self {
        let len = vector.len();
        let mut params: Vec<(ParamId, VectorRef)> = self
            .params
            .iter()
            .map(|(bound, outer)| {
                let broadcast: VectorRef = Arc::new(ConstantVector::new(outer.clone(), row, len));
                (*bound, broadcast)
            })
            .collect();
        params.push((id, vector));
        EvalContext {
            rows: self.rows.broadcast_row(row, len),
            params,
            config: self.config,
        }
    }

    /// Returns a context over a different row-set without parameter
    /// bindings (grouped aggregation evaluates per group this way).
    #[must_use]
    pub fn with_rows(&self, rows: RowSet) -> Self {
        EvalContext::new(rows, self.config)
    }

    /// Evaluates `expr` over the current rows.
    ///
    /// # Errors
    ///
    /// Propagates evaluation errors.
    pub fn evaluate(&self, expr: &Expr) -> Result<VectorRef> {
        Evaluator::evaluate(expr, self)
    }

    /// Splits the current rows into batches of the configured size.
    ///
    /// Parameter bindings are sliced along with the rows.
    #[must_use]
    pub fn batches(&self) -> Vec<EvalContext<'a>> {
        let batch_size = self.config.batch_size.max(1);
        let total = self.num_rows();
        (0..total)
            .step_by(batch_size)
            .map(|start| {
                let selection = Selection::range(start, batch_size.min(total - start));
                let params = self
                    .params
                    .iter()
                    .map(|(id, v)| {
                        let view: VectorRef =
                            Arc::new(SelectionView::new(v.clone(), selection.clone()));
                        (*id, view)
                    })
                    .collect();
                EvalContext {
                    rows: self.rows.select(&selection),
                    params,
                    config: self.config,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, DataType, Schema, Value};
    use crate::vector::from_values;

    fn rows() -> RowSet {
        let schema = Arc::new(Schema::new(vec![ColumnDef::new("a", DataType::Int64)]));
        let values: Vec<Value> = (0..5).map(Value::Int64).collect();
        RowSet::try_new(schema, vec![from_values(&DataType::Int64, &values).unwrap()]).unwrap()
    }

    #[test]
    fn test_param_shadowing() {
        let config = EvalConfig::default();
        let ctx = EvalContext::without_columns(1, &config);
        let outer = from_values(&DataType::Int32, &[Value::Int32(1)]).unwrap();
        let inner = from_values(&DataType::Int32, &[Value::Int32(2)]).unwrap();
        let ctx = ctx.bind(0, outer).bind(0, inner);
        assert_eq!(ctx.param(0).unwrap().get_int32(0), 2);
        assert!(ctx.param(1).is_none());
    }

    #[test]
    fn test_nested_broadcasts_outer_row() {
        let config = EvalConfig::default();
        let ctx = EvalContext::new(rows(), &config);
        let elements = from_values(&DataType::Int32, &[Value::Int32(7), Value::Int32(8)]).unwrap();
        let nested = ctx.nested(3, 1, elements);
        assert_eq!(nested.num_rows(), 2);
        let a = nested.rows().column_by_name("a").unwrap();
        assert_eq!(a.get_int64(0), 3);
        assert_eq!(a.get_int64(1), 3);
        assert_eq!(nested.param(1).unwrap().len(), 2);
    }

    #[test]
    fn test_batches_follow_config() {
        let config = EvalConfig::default().with_batch_size(2);
        let ctx = EvalContext::new(rows(), &config);
        let batches = ctx.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].num_rows(), 1);
        assert_eq!(batches[2].rows().column(0).get_int64(0), 4);
    }
}
