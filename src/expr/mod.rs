//! Bound expressions and their vectorized evaluation.

mod context;
mod evaluator;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateMode;
use crate::error::{ColvexError, Result};
use crate::function::{AggregateFunction, ScalarFunction};
use crate::types::{Category, DataType, Value};

pub use context::EvalContext;
pub use evaluator::Evaluator;

/// Identifier of a lambda parameter.
pub type ParamId = u32;

/// Bound expression carrying its static result type.
#[derive(Clone)]
pub enum Expr {
    /// Literal value (constant).
    Literal { value: Value, data_type: DataType },

    /// Reference to a column of the current row-set.
    Column { name: String, data_type: DataType },

    /// Reference to a lambda parameter.
    Parameter { id: ParamId, data_type: DataType },

    /// Field of an object-typed value.
    Field {
        base: Box<Expr>,
        name: String,
        data_type: DataType,
    },

    /// Binary comparison.
    Comparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
        data_type: DataType, // Always Boolean
    },

    /// Arithmetic operations.
    Arithmetic {
        left: Box<Expr>,
        op: ArithmeticOp,
        right: Box<Expr>,
        data_type: DataType,
    },

    /// Logical AND/OR/NOT.
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
        data_type: DataType, // Always Boolean
    },

    /// IS NULL / IS NOT NULL.
    IsNull {
        operand: Box<Expr>,
        negated: bool,
        data_type: DataType, // Always Boolean
    },

    /// Array constructor `[a, b, ...]`.
    MakeArray {
        elements: Vec<Expr>,
        data_type: DataType,
    },

    /// Scalar function call.
    Call {
        function: Arc<dyn ScalarFunction>,
        args: Vec<Expr>,
        data_type: DataType,
    },

    /// Lambda `param -> body`; only valid as a function argument.
    Lambda {
        param: ParamId,
        param_type: DataType,
        body: Box<Expr>,
        data_type: DataType, // Type of the body
    },

    /// Aggregate function call, evaluated per group.
    Aggregate {
        function: Arc<dyn AggregateFunction>,
        args: Vec<Expr>,
        mode: AggregateMode,
        data_type: DataType,
    },
}

impl Expr {
    /// Returns the static type of this expression.
    #[must_use]
    pub fn data_type(&self) -> &DataType {
        match self {
            Expr::Literal { data_type, .. }
            | Expr::Column { data_type, .. }
            | Expr::Parameter { data_type, .. }
            | Expr::Field { data_type, .. }
            | Expr::Comparison { data_type, .. }
            | Expr::Arithmetic { data_type, .. }
            | Expr::Logical { data_type, .. }
            | Expr::IsNull { data_type, .. }
            | Expr::MakeArray { data_type, .. }
            | Expr::Call { data_type, .. }
            | Expr::Lambda { data_type, .. }
            | Expr::Aggregate { data_type, .. } => data_type,
        }
    }

    /// Returns true for a literal (constant) expression.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal { .. })
    }

    /// Creates a literal expression typed after its value.
    ///
    /// A null literal is typed `Any`.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        let value = value.into();
        let data_type = value.data_type().unwrap_or(DataType::Any);
        Expr::Literal { value, data_type }
    }

    /// Creates a literal expression with an explicit type.
    #[must_use]
    pub fn typed_literal(value: Value, data_type: DataType) -> Self {
        Expr::Literal { value, data_type }
    }

    /// Creates a column reference.
    #[must_use]
    pub fn column(name: impl Into<String>, data_type: DataType) -> Self {
        Expr::Column {
            name: name.into(),
            data_type,
        }
    }

    /// Creates a lambda parameter reference.
    #[must_use]
    pub fn param(id: ParamId, data_type: DataType) -> Self {
        Expr::Parameter { id, data_type }
    }

    /// Creates a field access on an object-typed (or `Any`) expression.
    ///
    /// # Errors
    ///
    /// Returns an invalid-expression error if the object schema has no such
    /// field, and a type error if `base` is not object-typed.
    pub fn field(base: Expr, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let data_type = match base.data_type() {
            DataType::Object(schema) => schema
                .get_column(&name)
                .map(|c| c.data_type.clone())
                .ok_or_else(|| {
                    ColvexError::InvalidExpression(format!("Field not found: {name}"))
                })?,
            DataType::Any => DataType::Any,
            other => return Err(ColvexError::type_error("OBJECT", other)),
        };
        Ok(Expr::Field {
            base: Box::new(base),
            name,
            data_type,
        })
    }

    /// Creates a comparison expression.
    #[must_use]
    pub fn comparison(left: Expr, op: ComparisonOp, right: Expr) -> Self {
        Expr::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
            data_type: DataType::Boolean,
        }
    }

    /// Creates an arithmetic expression typed after the promoted operands.
    ///
    /// # Errors
    ///
    /// Returns a type error if either operand is neither numeric nor `Any`.
    pub fn arithmetic(left: Expr, op: ArithmeticOp, right: Expr) -> Result<Self> {
        let data_type = left.data_type().promote(right.data_type())?;
        Ok(Expr::Arithmetic {
            left: Box::new(left),
            op,
            right: Box::new(right),
            data_type,
        })
    }

    /// Creates a logical AND expression.
    #[must_use]
    pub fn and(operands: Vec<Expr>) -> Self {
        Expr::Logical {
            op: LogicalOp::And,
            operands,
            data_type: DataType::Boolean,
        }
    }

    /// Creates a logical OR expression.
    #[must_use]
    pub fn or(operands: Vec<Expr>) -> Self {
        Expr::Logical {
            op: LogicalOp::Or,
            operands,
            data_type: DataType::Boolean,
        }
    }

    /// Creates a logical NOT expression.
    #[must_use]
    pub fn not(operand: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::Not,
            operands: vec![operand],
            data_type: DataType::Boolean,
        }
    }

    /// Creates an IS NULL (or IS NOT NULL) test.
    #[must_use]
    pub fn is_null(operand: Expr, negated: bool) -> Self {
        Expr::IsNull {
            operand: Box::new(operand),
            negated,
            data_type: DataType::Boolean,
        }
    }

    /// Creates an array constructor.
    ///
    /// Numeric elements are promoted to a common type; otherwise every
    /// element must share one type, or the element type becomes `Any`.
    #[must_use]
    pub fn make_array(elements: Vec<Expr>) -> Self {
        let element = common_element_type(&elements);
        Expr::MakeArray {
            elements,
            data_type: DataType::array(element),
        }
    }

    /// Creates a lambda `param -> body` whose parameter has `param_type`.
    #[must_use]
    pub fn lambda(param: ParamId, param_type: DataType, body: Expr) -> Self {
        let data_type = body.data_type().clone();
        Expr::Lambda {
            param,
            param_type,
            body: Box::new(body),
            data_type,
        }
    }

    /// Creates a scalar function call, validating arity and lambda positions.
    ///
    /// # Errors
    ///
    /// Returns a function error on arity mismatch or a missing lambda
    /// argument, and propagates type resolution failures.
    pub fn call(function: Arc<dyn ScalarFunction>, args: Vec<Expr>) -> Result<Self> {
        if !function.arity().accepts(args.len()) {
            return Err(ColvexError::FunctionError(format!(
                "{} expects {} arguments, got {}",
                function.name(),
                function.arity(),
                args.len()
            )));
        }
        for binding in function.lambda_bindings() {
            if !matches!(args.get(binding.lambda), Some(Expr::Lambda { .. })) {
                return Err(ColvexError::FunctionError(format!(
                    "{} expects a lambda at argument {}",
                    function.name(),
                    binding.lambda
                )));
            }
        }
        let arg_types: Vec<DataType> = args.iter().map(|a| a.data_type().clone()).collect();
        let data_type = function.resolve_scalar_type(&arg_types)?;
        Ok(Expr::Call {
            function,
            args,
            data_type,
        })
    }

    /// Creates an aggregate call.
    ///
    /// # Errors
    ///
    /// Returns a function error on arity mismatch and propagates type
    /// resolution failures.
    pub fn aggregate(
        function: Arc<dyn AggregateFunction>,
        args: Vec<Expr>,
        mode: AggregateMode,
    ) -> Result<Self> {
        if !function.arity().accepts(args.len()) {
            return Err(ColvexError::FunctionError(format!(
                "{} expects {} arguments, got {}",
                function.name(),
                function.arity(),
                args.len()
            )));
        }
        let arg_types: Vec<DataType> = args.iter().map(|a| a.data_type().clone()).collect();
        let data_type = function.resolve_aggregate_type(&arg_types)?;
        Ok(Expr::Aggregate {
            function,
            args,
            mode,
            data_type,
        })
    }
}

fn common_element_type(elements: &[Expr]) -> DataType {
    let mut types = elements
        .iter()
        .filter(|e| !matches!(e, Expr::Literal { value: Value::Null, .. }))
        .map(Expr::data_type);
    let Some(first) = types.next() else {
        return DataType::Any;
    };
    types.try_fold(first.clone(), |acc, next| {
        if &acc == next {
            Some(acc)
        } else if acc.category().precedence().is_some() && next.category().precedence().is_some() {
            acc.promote(next).ok()
        } else {
            None
        }
    })
    .unwrap_or(DataType::Any)
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{value:?}"),
            Expr::Column { name, .. } => f.write_str(name),
            Expr::Parameter { id, .. } => write!(f, "${id}"),
            Expr::Field { base, name, .. } => write!(f, "{base:?}.{name}"),
            Expr::Comparison {
                left, op, right, ..
            } => write!(f, "({left:?} {} {right:?})", op.as_str()),
            Expr::Arithmetic {
                left, op, right, ..
            } => write!(f, "({left:?} {} {right:?})", op.as_str()),
            Expr::Logical { op, operands, .. } => write!(f, "{op:?}{operands:?}"),
            Expr::IsNull {
                operand, negated, ..
            } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "({operand:?} IS{not} NULL)")
            }
            Expr::MakeArray { elements, .. } => write!(f, "{elements:?}"),
            Expr::Call { function, args, .. } => write!(f, "{}{args:?}", function.name()),
            Expr::Lambda { param, body, .. } => write!(f, "${param} -> {body:?}"),
            Expr::Aggregate {
                function,
                args,
                mode,
                ..
            } => write!(f, "{}({mode:?}){args:?}", function.name()),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// Equal (=).
    Eq,
    /// Not equal (<>).
    Neq,
    /// Less than (<).
    Lt,
    /// Less than or equal (<=).
    Lte,
    /// Greater than (>).
    Gt,
    /// Greater than or equal (>=).
    Gte,
}

impl ComparisonOp {
    /// Returns the string representation of this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Neq => "<>",
            ComparisonOp::Lt => "<",
            ComparisonOp::Lte => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Gte => ">=",
        }
    }

    /// Returns true if `ordering` satisfies this operator.
    #[must_use]
    pub fn matches(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            ComparisonOp::Eq => ordering == Equal,
            ComparisonOp::Neq => ordering != Equal,
            ComparisonOp::Lt => ordering == Less,
            ComparisonOp::Lte => ordering != Greater,
            ComparisonOp::Gt => ordering == Greater,
            ComparisonOp::Gte => ordering != Less,
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Not,
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOp {
    /// Returns the string representation of this operator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mul => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

/// Type a lambda parameter takes when bound to an argument of `argument`.
///
/// Array arguments bind element by element, table arguments bind one row
/// (as an object) at a time, anything else binds the value itself.
#[must_use]
pub fn lambda_param_type(argument: &DataType) -> DataType {
    match argument {
        DataType::Array(element) => (**element).clone(),
        DataType::Table(schema) => DataType::Object(schema.clone()),
        other => other.clone(),
    }
}

/// Returns true if values of `data_type` can feed a boolean predicate.
pub(crate) fn is_predicate_type(data_type: &DataType) -> bool {
    matches!(data_type.category(), Category::Boolean | Category::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnDef, Schema};

    #[test]
    fn test_literal_types() {
        assert_eq!(Expr::literal(1i64).data_type(), &DataType::Int64);
        assert_eq!(Expr::literal(Value::Null).data_type(), &DataType::Any);
    }

    #[test]
    fn test_arithmetic_promotes() {
        let e = Expr::arithmetic(
            Expr::column("a", DataType::Int32),
            ArithmeticOp::Add,
            Expr::column("b", DataType::Float64),
        )
        .unwrap();
        assert_eq!(e.data_type(), &DataType::Float64);
    }

    #[test]
    fn test_arithmetic_rejects_strings() {
        let result = Expr::arithmetic(
            Expr::column("a", DataType::String),
            ArithmeticOp::Add,
            Expr::literal(1),
        );
        assert!(matches!(result, Err(ColvexError::TypeError { .. })));
    }

    #[test]
    fn test_field_resolves_schema_type() {
        let schema = Arc::new(Schema::new(vec![ColumnDef::new("x", DataType::Int64)]));
        let base = Expr::param(0, DataType::Object(schema));
        let field = Expr::field(base.clone(), "x").unwrap();
        assert_eq!(field.data_type(), &DataType::Int64);
        assert!(Expr::field(base, "y").is_err());
    }

    #[test]
    fn test_make_array_element_type() {
        let e = Expr::make_array(vec![Expr::literal(1), Expr::literal(2i64)]);
        assert_eq!(e.data_type(), &DataType::array(DataType::Int64));
        let e = Expr::make_array(vec![Expr::literal(1), Expr::literal("x")]);
        assert_eq!(e.data_type(), &DataType::array(DataType::Any));
        let e = Expr::make_array(vec![Expr::literal("x"), Expr::literal(Value::Null)]);
        assert_eq!(e.data_type(), &DataType::array(DataType::String));
    }

    #[test]
    fn test_lambda_param_type() {
        assert_eq!(
            lambda_param_type(&DataType::array(DataType::Int32)),
            DataType::Int32
        );
        assert_eq!(lambda_param_type(&DataType::Float64), DataType::Float64);
    }

    #[test]
    fn test_comparison_op_matches() {
        use std::cmp::Ordering;
        assert!(ComparisonOp::Lte.matches(Ordering::Equal));
        assert!(!ComparisonOp::Lt.matches(Ordering::Equal));
        assert!(ComparisonOp::Neq.matches(Ordering::Greater));
    }
}
