//! colvex - vectorized expression and aggregation evaluation.
//!
//! Columnar [`ValueVector`]s (Arrow-backed where the type allows), bound
//! [`Expr`] trees evaluated batch at a time, and the built-in functions a
//! query engine needs on top of them: lane-dispatched numeric aggregates,
//! index-selecting MIN/MAX, array DISTINCT and lambda-driven MAP, FILTER,
//! FLAT_MAP and ANY/ALL/NONE_MATCH.
//!
//! ```
//! use std::sync::Arc;
//!
//! use colvex::types::{ColumnDef, DataType, Schema, Value};
//! use colvex::vector::{from_values, to_values, RowSet};
//! use colvex::{EvalConfig, EvalContext, Expr, FunctionRegistry};
//!
//! let dt = DataType::array(DataType::Int32);
//! let schema = Arc::new(Schema::new(vec![ColumnDef::new("xs", dt.clone())]));
//! let xs = from_values(
//!     &dt,
//!     &[
//!         Value::List(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]),
//!         Value::List(vec![Value::Int32(4), Value::Null, Value::Int32(6)]),
//!     ],
//! )?;
//! let rows = RowSet::try_new(schema, vec![xs])?;
//!
//! let registry = FunctionRegistry::with_builtins();
//! let avg = registry.call("avg", vec![Expr::column("xs", dt)])?;
//!
//! let config = EvalConfig::default();
//! let result = EvalContext::new(rows, &config).evaluate(&avg)?;
//! assert_eq!(to_values(result.as_ref()), vec![Value::Int32(2), Value::Int32(5)]);
//! # Ok::<(), colvex::ColvexError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod distinct;
pub mod error;
pub mod expr;
pub mod function;
pub mod lambda;
pub mod types;
pub mod vector;

pub use aggregate::AggregateMode;
pub use config::EvalConfig;
pub use error::{ColvexError, Result};
pub use expr::{EvalContext, Evaluator, Expr};
pub use function::FunctionRegistry;
pub use types::{DataType, Value};
pub use vector::{ValueVector, VectorRef};
