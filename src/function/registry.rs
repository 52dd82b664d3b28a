//! Function registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::aggregate::{
    AggregateMode, AvgFunction, CountFunction, MaxFunction, MinFunction, SumFunction,
};
use crate::distinct::DistinctFunction;
use crate::error::{ColvexError, Result};
use crate::expr::Expr;
use crate::lambda::{FilterFunction, FlatMapFunction, MapFunction, MatchFunction, MatchKind};

use super::{AggregateFunction, ScalarFunction};

/// Registry of scalar and aggregate functions, keyed by upper-case name.
///
/// Constructed once and passed to whoever binds calls; there is no global
/// registry.
#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    scalars: HashMap<String, Arc<dyn ScalarFunction>>,
    aggregates: HashMap<String, Arc<dyn AggregateFunction>>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in function.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        let sum = Arc::new(SumFunction);
        let avg = Arc::new(AvgFunction);
        let count = Arc::new(CountFunction);
        let min = Arc::new(MinFunction);
        let max = Arc::new(MaxFunction);

        let scalars: Vec<Arc<dyn ScalarFunction>> = vec![
            sum.clone(),
            avg.clone(),
            count.clone(),
            min.clone(),
            max.clone(),
            Arc::new(DistinctFunction),
            Arc::new(MapFunction),
            Arc::new(FilterFunction),
            Arc::new(FlatMapFunction),
            Arc::new(MatchFunction::new(MatchKind::Any)),
            Arc::new(MatchFunction::new(MatchKind::All)),
            Arc::new(MatchFunction::new(MatchKind::None)),
        ];
        let aggregates: Vec<Arc<dyn AggregateFunction>> = vec![sum, avg, count, min, max];

        for function in scalars {
            self.scalars.insert(function.name().to_uppercase(), function);
        }
        for function in aggregates {
            self.aggregates
                .insert(function.name().to_uppercase(), function);
        }
    }

    /// Registers a scalar function.
    ///
    /// # Errors
    ///
    /// Returns a function error if the name is already registered.
    pub fn register_scalar(&mut self, function: Arc<dyn ScalarFunction>) -> Result<()> {
        let key = function.name().to_uppercase();
        if self.scalars.contains_key(&key) {
            return Err(ColvexError::FunctionError(format!(
                "Scalar function {key} is already registered"
            )));
        }
        log::debug!("registering scalar function {key}");
        self.scalars.insert(key, function);
        Ok(())
    }

    /// Registers an aggregate function.
    ///
    /// # Errors
    ///
    /// Returns a function error if the name is already registered.
    pub fn register_aggregate(&mut self, function: Arc<dyn AggregateFunction>) -> Result<()> {
        let key = function.name().to_uppercase();
        if self.aggregates.contains_key(&key) {
            return Err(ColvexError::FunctionError(format!(
                "Aggregate function {key} is already registered"
            )));
        }
        log::debug!("registering aggregate function {key}");
        self.aggregates.insert(key, function);
        Ok(())
    }

    /// Looks up a scalar function (case-insensitive).
    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<Arc<dyn ScalarFunction>> {
        self.scalars.get(&name.to_uppercase()).cloned()
    }

    /// Looks up an aggregate function (case-insensitive).
    #[must_use]
    pub fn aggregate(&self, name: &str) -> Option<Arc<dyn AggregateFunction>> {
        self.aggregates.get(&name.to_uppercase()).cloned()
    }

    /// Returns the registered scalar function names, sorted.
    #[must_use]
    pub fn scalar_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scalars.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Binds a scalar call by name.
    ///
    /// # Errors
    ///
    /// Returns a function error for unknown names or arity mismatches and
    /// propagates type resolution failures.
    pub fn call(&self, name: &str, args: Vec<Expr>) -> Result<Expr> {
        let function = self
            .scalar(name)
            .ok_or_else(|| ColvexError::FunctionError(format!("Unknown function: {name}")))?;
        Expr::call(function, args)
    }

    /// Binds an aggregate call by name.
    ///
    /// # Errors
    ///
    /// Returns a function error for unknown names or arity mismatches and
    /// propagates type resolution failures.
    pub fn aggregate_call(&self, name: &str, args: Vec<Expr>, mode: AggregateMode) -> Result<Expr> {
        let function = self.aggregate(name).ok_or_else(|| {
            ColvexError::FunctionError(format!("Unknown aggregate function: {name}"))
        })?;
        Expr::aggregate(function, args, mode)
    }
}
