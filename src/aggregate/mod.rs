//! Aggregation engine.
//!
//! SUM and AVG accumulate in a primitive lane chosen once per invocation
//! from the resolved element type, through a fresh [`Reducer`] per window.
//! MIN and MAX select the winning element by index. COUNT counts non-null
//! elements. Every aggregate runs in two modes:
//!
//! - scalar mode: one output row per input row, aggregating the elements of
//!   an array row (a non-array row is a window of one element);
//! - grouped mode: one output row per group of a table-typed vector, the
//!   argument evaluated against each group's member rows.

mod engine;
mod functions;
mod lane;
mod minmax;
mod reducer;
mod window;

use serde::{Deserialize, Serialize};

use crate::error::{ColvexError, Result};

pub use engine::NumericAggregator;
pub use functions::{AvgFunction, CountFunction, MaxFunction, MinFunction, SumFunction};
pub use lane::{Lane, LaneValue, Reader};
pub use minmax::{select_index, Extreme, MinMaxAggregator};
pub use reducer::{AvgReducer, Reducer, ReducerKind, SumReducer};

/// How an aggregate treats repeated values within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AggregateMode {
    /// Every non-null value contributes.
    #[default]
    All,
    /// Each distinct value contributes once.
    Distinct,
}

/// Rejects modes the built-in aggregates do not implement.
pub(crate) fn ensure_all(name: &str, mode: AggregateMode) -> Result<()> {
    match mode {
        AggregateMode::All => Ok(()),
        AggregateMode::Distinct => Err(ColvexError::UnsupportedOperation(format!(
            "{name}(DISTINCT ...) is not supported"
        ))),
    }
}
