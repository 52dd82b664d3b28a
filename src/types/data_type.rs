//! Type descriptors and numeric promotion.

use std::fmt;

use arrow::datatypes::{DataType as ArrowDataType, TimeUnit};
use serde::{Deserialize, Serialize};

use crate::error::{ColvexError, Result};

use super::schema::SchemaRef;

/// Value category without nested descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Boolean,
    String,
    DateTime,
    DateTimeOffset,
    Array,
    Table,
    Object,
    Any,
}

impl Category {
    /// Promotion rank of this category.
    ///
    /// Only numeric categories and `Any` are ranked; everything else returns
    /// `None` because promotion between unrelated categories is undefined.
    #[must_use]
    pub fn precedence(self) -> Option<u8> {
        match self {
            Category::Int32 => Some(0),
            Category::Int64 => Some(1),
            Category::Float32 => Some(2),
            Category::Float64 => Some(3),
            Category::Decimal => Some(4),
            Category::Any => Some(5),
            _ => None,
        }
    }

    /// Returns whether this category is numeric.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Category::Int32
                | Category::Int64
                | Category::Float32
                | Category::Float64
                | Category::Decimal
        )
    }

    /// Returns whether rows of this category expand into nested vectors.
    #[must_use]
    pub fn is_list_like(self) -> bool {
        matches!(self, Category::Array | Category::Table)
    }
}

/// Resolved type of a vector, expression or function result.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Arbitrary precision decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// UTF-8 string.
    String,
    /// Date and time without offset (microsecond precision).
    DateTime,
    /// Date and time with a fixed UTC offset.
    DateTimeOffset,
    /// Array of the element type.
    Array(Box<DataType>),
    /// Row-set per row, with the given schema.
    Table(SchemaRef),
    /// Structured value with the given schema.
    Object(SchemaRef),
    /// Dynamically typed value.
    Any,
}

impl DataType {
    /// Creates an array type over `element`.
    #[must_use]
    pub fn array(element: DataType) -> Self {
        DataType::Array(Box::new(element))
    }

    /// Returns the category tag of this type.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            DataType::Int32 => Category::Int32,
            DataType::Int64 => Category::Int64,
            DataType::Float32 => Category::Float32,
            DataType::Float64 => Category::Float64,
            DataType::Decimal => Category::Decimal,
            DataType::Boolean => Category::Boolean,
            DataType::String => Category::String,
            DataType::DateTime => Category::DateTime,
            DataType::DateTimeOffset => Category::DateTimeOffset,
            DataType::Array(_) => Category::Array,
            DataType::Table(_) => Category::Table,
            DataType::Object(_) => Category::Object,
            DataType::Any => Category::Any,
        }
    }

    /// Returns the name of the type as shown in error messages.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            DataType::Int32 => "INT32".into(),
            DataType::Int64 => "INT64".into(),
            DataType::Float32 => "FLOAT32".into(),
            DataType::Float64 => "FLOAT64".into(),
            DataType::Decimal => "DECIMAL".into(),
            DataType::Boolean => "BOOLEAN".into(),
            DataType::String => "STRING".into(),
            DataType::DateTime => "DATETIME".into(),
            DataType::DateTimeOffset => "DATETIMEOFFSET".into(),
            DataType::Array(element) => format!("ARRAY<{}>", element.name()),
            DataType::Table(schema) => format!("TABLE{schema}"),
            DataType::Object(schema) => format!("OBJECT{schema}"),
            DataType::Any => "ANY".into(),
        }
    }

    /// Returns whether this type is numeric.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.category().is_numeric()
    }

    /// Returns whether this type is numeric or `Any`.
    #[must_use]
    pub fn is_numeric_or_any(&self) -> bool {
        self.is_numeric() || matches!(self, DataType::Any)
    }

    /// Returns whether rows of this type expand into nested vectors.
    #[must_use]
    pub fn is_list_like(&self) -> bool {
        self.category().is_list_like()
    }

    /// Returns the element type for arrays.
    #[must_use]
    pub fn element_type(&self) -> Option<&DataType> {
        match self {
            DataType::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Returns the schema for tables and objects.
    #[must_use]
    pub fn schema(&self) -> Option<&SchemaRef> {
        match self {
            DataType::Table(schema) | DataType::Object(schema) => Some(schema),
            _ => None,
        }
    }

    /// Returns the type an aggregate sees: the element type for arrays,
    /// otherwise the type itself.
    #[must_use]
    pub fn aggregation_element(&self) -> &DataType {
        self.element_type().unwrap_or(self)
    }

    /// Picks the higher-ranked of two numeric (or `Any`) types.
    ///
    /// # Errors
    ///
    /// Returns a type error if either side is neither numeric nor `Any`.
    pub fn promote(&self, other: &DataType) -> Result<DataType> {
        let left = self
            .category()
            .precedence()
            .ok_or_else(|| ColvexError::type_error("numeric or ANY", self.name()))?;
        let right = other
            .category()
            .precedence()
            .ok_or_else(|| ColvexError::type_error("numeric or ANY", other.name()))?;
        Ok(if right > left {
            other.clone()
        } else {
            self.clone()
        })
    }

    /// Converts to an Arrow data type for categories backed by Arrow arrays.
    #[must_use]
    pub fn to_arrow(&self) -> Option<ArrowDataType> {
        match self {
            DataType::Int32 => Some(ArrowDataType::Int32),
            DataType::Int64 => Some(ArrowDataType::Int64),
            DataType::Float32 => Some(ArrowDataType::Float32),
            DataType::Float64 => Some(ArrowDataType::Float64),
            DataType::Boolean => Some(ArrowDataType::Boolean),
            DataType::String => Some(ArrowDataType::Utf8),
            DataType::DateTime => Some(ArrowDataType::Timestamp(TimeUnit::Microsecond, None)),
            _ => None,
        }
    }

    /// Converts from an Arrow data type.
    ///
    /// Returns None for Arrow types without a counterpart.
    #[must_use]
    pub fn from_arrow(arrow_type: &ArrowDataType) -> Option<Self> {
        match arrow_type {
            ArrowDataType::Int32 => Some(DataType::Int32),
            ArrowDataType::Int64 => Some(DataType::Int64),
            ArrowDataType::Float32 => Some(DataType::Float32),
            ArrowDataType::Float64 => Some(DataType::Float64),
            ArrowDataType::Boolean => Some(DataType::Boolean),
            ArrowDataType::Utf8 => Some(DataType::String),
            ArrowDataType::Timestamp(TimeUnit::Microsecond, None) => Some(DataType::DateTime),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
