//! MIN/MAX by index selection.
//!
//! The winning element is located by index through the typed comparator and
//! copied once into the output; losing candidates are never boxed or copied.

use std::cmp::Ordering;
use std::ops::Range;

use crate::error::{ColvexError, Result};
use crate::expr::{EvalContext, Expr};
use crate::types::{Category, DataType};
use crate::vector::{compare, ValueVector, VectorBuilder, VectorRef};

use super::window::{evaluate_groups, group_window, row_window, Segment, Window};

/// Which end of the ordering wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

impl Extreme {
    /// Function name of the aggregate.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Extreme::Min => "MIN",
            Extreme::Max => "MAX",
        }
    }

    /// Returns true if a candidate ordered `ordering` against the current
    /// winner replaces it. Ties never replace.
    fn replaces(self, ordering: Ordering) -> bool {
        match self {
            Extreme::Min => ordering == Ordering::Less,
            Extreme::Max => ordering == Ordering::Greater,
        }
    }
}

/// Returns the index of the winning non-null element of `vector[range]`.
///
/// Leading nulls are skipped, the first non-null element is the initial
/// candidate, and equal elements keep the earlier index. Returns `None` if
/// every element is null.
#[must_use]
pub fn select_index(
    vector: &dyn ValueVector,
    range: Range<usize>,
    category: Category,
    extreme: Extreme,
) -> Option<usize> {
    let mut current: Option<usize> = None;
    for i in range {
        if vector.is_null(i) {
            continue;
        }
        match current {
            None => current = Some(i),
            Some(best) => {
                if extreme.replaces(compare(vector, vector, category, i, best)) {
                    current = Some(i);
                }
            }
        }
    }
    current
}

/// Winner across the concatenated segments of one window, as
/// `(segment, index)`.
fn select_in_window(
    segments: &[Segment],
    category: Category,
    extreme: Extreme,
) -> Option<(usize, usize)> {
    let mut current: Option<(usize, usize)> = None;
    for (s, segment) in segments.iter().enumerate() {
        let vector = segment.vector.as_ref();
        let Some(i) = select_index(vector, segment.range.clone(), category, extreme) else {
            continue;
        };
        match current {
            None => current = Some((s, i)),
            Some((bs, bi)) => {
                let best = segments[bs].vector.as_ref();
                if extreme.replaces(compare(vector, best, category, i, bi)) {
                    current = Some((s, i));
                }
            }
        }
    }
    current
}

/// Runs MIN or MAX over scalar-mode rows or grouped-mode groups.
#[derive(Debug, Clone, Copy)]
pub struct MinMaxAggregator {
    extreme: Extreme,
}

impl MinMaxAggregator {
    #[must_use]
    pub fn new(extreme: Extreme) -> Self {
        MinMaxAggregator { extreme }
    }

    /// Selects the extreme element of each row of `arg`.
    ///
    /// # Errors
    ///
    /// Propagates builder errors.
    pub fn evaluate_scalar(&self, arg: &VectorRef) -> Result<VectorRef> {
        let result_type = arg.data_type().aggregation_element().clone();
        let windows: Vec<Window> = (0..arg.len()).map(|row| row_window(arg, row)).collect();
        self.materialize(result_type, &windows)
    }

    /// Selects the extreme element of each group of the table-typed
    /// `groups`.
    ///
    /// # Errors
    ///
    /// Returns a shape error if `groups` is not table-typed and a type error
    /// if the groups' element types cannot be reconciled.
    pub fn evaluate_grouped(
        &self,
        arg: &Expr,
        groups: &dyn ValueVector,
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef> {
        let name = self.extreme.name();
        let vectors = evaluate_groups(name, arg, groups, ctx)?;
        let result_type = unify_comparable(name, &vectors, arg.data_type())?;
        let windows: Vec<Window> = vectors
            .iter()
            .map(|vector| vector.as_ref().map(group_window))
            .collect();
        self.materialize(result_type, &windows)
    }

    fn materialize(&self, result_type: DataType, windows: &[Window]) -> Result<VectorRef> {
        let category = result_type.category();
        log::debug!(
            "{} over {} windows comparing as {category:?}",
            self.extreme.name(),
            windows.len()
        );
        let mut builder = VectorBuilder::new(result_type, windows.len());
        for (row, window) in windows.iter().enumerate() {
            let winner = window
                .as_deref()
                .and_then(|segments| {
                    select_in_window(segments, category, self.extreme)
                        .map(|(s, i)| (&segments[s], i))
                });
            match winner {
                Some((segment, i)) => builder.copy(row, segment.vector.as_ref(), i)?,
                None => builder.set_null(row),
            }
        }
        builder.build()
    }
}

/// Static result type of MIN/MAX over an argument of `arg`.
pub(crate) fn comparable_result_type(name: &str, arg: &DataType) -> Result<DataType> {
    let element = arg.aggregation_element();
    if element.category() == Category::Table {
        return Err(ColvexError::type_error(
            format!("comparable argument to {name}"),
            element,
        ));
    }
    Ok(element.clone())
}

/// Reconciles group element types: numeric types promote, anything else
/// must match exactly.
fn unify_comparable(
    name: &str,
    vectors: &[Option<VectorRef>],
    declared: &DataType,
) -> Result<DataType> {
    let mut unified: Option<DataType> = None;
    for vector in vectors.iter().flatten() {
        let element = comparable_result_type(name, vector.data_type())?;
        unified = Some(match unified {
            None => element,
            Some(current) if current == element => current,
            Some(current) if current.is_numeric_or_any() && element.is_numeric_or_any() => {
                current.promote(&element)?
            }
            Some(current) => {
                return Err(ColvexError::type_error(
                    format!("{current} argument to {name}"),
                    element,
                ))
            }
        });
    }
    unified.map_or_else(|| comparable_result_type(name, declared), Ok)
}
