//! Aggregation windows and per-group argument evaluation.

use std::ops::Range;

use crate::error::{ColvexError, Result};
use crate::expr::{EvalContext, Expr};
use crate::types::{Category, DataType};
use crate::vector::{ValueVector, VectorRef};

/// A contiguous run of elements of one vector.
#[derive(Debug, Clone)]
pub(crate) struct Segment {
    pub vector: VectorRef,
    pub range: Range<usize>,
}

impl Segment {
    fn whole(vector: VectorRef) -> Self {
        let range = 0..vector.len();
        Segment { vector, range }
    }
}

/// Elements aggregated into one output row; `None` for a null row.
pub(crate) type Window = Option<Vec<Segment>>;

/// Scalar-mode window of `row`: the row's array elements, or the single
/// element at `row` when `vector` is not array-typed.
pub(crate) fn row_window(vector: &VectorRef, row: usize) -> Window {
    if vector.data_type().category() == Category::Array {
        if vector.is_null(row) {
            return None;
        }
        return Some(vec![Segment::whole(vector.get_array(row))]);
    }
    Some(vec![Segment {
        vector: vector.clone(),
        range: row..row + 1,
    }])
}

/// Grouped-mode window: every element of a group's evaluated vector, with
/// array rows concatenated.
pub(crate) fn group_window(vector: &VectorRef) -> Vec<Segment> {
    if vector.data_type().category() == Category::Array {
        (0..vector.len())
            .filter(|&row| !vector.is_null(row))
            .map(|row| Segment::whole(vector.get_array(row)))
            .collect()
    } else {
        vec![Segment::whole(vector.clone())]
    }
}

/// Checks that `groups` is the table-typed input of grouped mode.
pub(crate) fn ensure_groups(name: &str, groups: &dyn ValueVector) -> Result<()> {
    if groups.data_type().category() != Category::Table {
        return Err(ColvexError::ShapeError(format!(
            "{name} in grouped mode requires a TABLE vector, got {}",
            groups.data_type()
        )));
    }
    Ok(())
}

/// Evaluates `arg` once against each group of a table-typed vector.
///
/// Null groups yield `None`.
pub(crate) fn evaluate_groups(
    name: &str,
    arg: &Expr,
    groups: &dyn ValueVector,
    ctx: &EvalContext<'_>,
) -> Result<Vec<Option<VectorRef>>> {
    ensure_groups(name, groups)?;
    (0..groups.len())
        .map(|group| {
            if groups.is_null(group) {
                return Ok(None);
            }
            let rows = groups.get_table(group);
            log::trace!("{name}: evaluating group {group} over {} rows", rows.num_rows());
            ctx.with_rows(rows).evaluate(arg).map(Some)
        })
        .collect()
}

/// Unifies the element types of evaluated groups through numeric promotion.
///
/// Falls back to `declared` when there are no non-null groups.
pub(crate) fn unify_numeric(
    name: &str,
    vectors: &[Option<VectorRef>],
    declared: &DataType,
) -> Result<DataType> {
    let mut unified: Option<DataType> = None;
    for vector in vectors.iter().flatten() {
        let element = vector.data_type().aggregation_element();
        if !element.is_numeric_or_any() {
            return Err(ColvexError::type_error(
                format!("numeric or ANY argument to {name}"),
                element,
            ));
        }
        unified = Some(match unified {
            None => element.clone(),
            Some(current) => current.promote(element)?,
        });
    }
    let unified = unified.unwrap_or_else(|| declared.aggregation_element().clone());
    log::debug!("{name}: unified result type {unified}");
    Ok(unified)
}
