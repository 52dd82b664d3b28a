//! Evaluation configuration.

use crate::vector::DEFAULT_BATCH_SIZE;

/// Configuration for expression, aggregate and lambda evaluation.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Number of rows per batch when a row-set is split for evaluation.
    pub batch_size: usize,
    /// Cache per-row results of array DISTINCT within one evaluation pass.
    pub cache_distinct_rows: bool,
    /// Numeric aggregates return null for windows without non-null values.
    /// When disabled they return the finalized identity instead.
    pub strict_null_windows: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cache_distinct_rows: true,
            strict_null_windows: true,
        }
    }
}

impl EvalConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enables or disables the per-row DISTINCT cache.
    #[must_use]
    pub fn with_distinct_cache(mut self, enabled: bool) -> Self {
        self.cache_distinct_rows = enabled;
        self
    }

    /// Sets whether all-null aggregation windows produce null.
    #[must_use]
    pub fn with_strict_null_windows(mut self, strict: bool) -> Self {
        self.strict_null_windows = strict;
        self
    }
}
