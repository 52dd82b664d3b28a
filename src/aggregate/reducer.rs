//! Per-window reduction strategies.

use crate::error::Result;

use super::lane::LaneValue;

/// Folds one window of lane values.
///
/// Implementations may keep state across `aggregate` calls, so a fresh
/// reducer is created for every window and never reused.
pub trait Reducer<T> {
    /// Starting value of the fold.
    fn identity(&self) -> T;

    /// Folds `next` into `current`.
    ///
    /// # Errors
    ///
    /// Returns an overflow error when exact addition overflows.
    fn aggregate(&mut self, current: T, next: T) -> Result<T>;

    /// Finalizes the folded value.
    ///
    /// # Errors
    ///
    /// Propagates lane arithmetic errors.
    fn combine(&self, result: T) -> Result<T> {
        Ok(result)
    }
}

/// Overflow-checked sum.
#[derive(Debug, Default)]
pub struct SumReducer;

impl<T: LaneValue> Reducer<T> for SumReducer {
    fn identity(&self) -> T {
        T::zero()
    }

    fn aggregate(&mut self, current: T, next: T) -> Result<T> {
        current.checked_add(next)
    }
}

/// Sum divided by the number of folded elements.
#[derive(Debug, Default)]
pub struct AvgReducer {
    count: u64,
}

impl AvgReducer {
    /// Number of elements folded so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl<T: LaneValue> Reducer<T> for AvgReducer {
    fn identity(&self) -> T {
        T::zero()
    }

    fn aggregate(&mut self, current: T, next: T) -> Result<T> {
        self.count += 1;
        current.checked_add(next)
    }

    fn combine(&self, result: T) -> Result<T> {
        if self.count == 0 {
            return Ok(result);
        }
        result.div_count(self.count)
    }
}

/// Which reducer a numeric aggregate creates per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerKind {
    Sum,
    Avg,
}

impl ReducerKind {
    /// Function name of the aggregate.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ReducerKind::Sum => "SUM",
            ReducerKind::Avg => "AVG",
        }
    }

    /// Creates a fresh reducer.
    #[must_use]
    pub fn create<T: LaneValue>(self) -> Box<dyn Reducer<T>> {
        match self {
            ReducerKind::Sum => Box::new(SumReducer),
            ReducerKind::Avg => Box::new(AvgReducer::default()),
        }
    }
}
