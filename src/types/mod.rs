//! Type descriptors, schemas and boxed values.

mod data_type;
mod schema;
mod value;

pub use data_type::{Category, DataType};
pub use schema::{ColumnDef, Schema, SchemaRef};
pub use value::Value;
