//! Vectorized expression evaluator.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, BooleanArray};
use arrow::compute::cast;
use arrow::compute::is_null;
use arrow::compute::kernels::boolean::{and_kleene, not, or_kleene};
use arrow::compute::kernels::cmp::{eq, gt, gt_eq, lt, lt_eq, neq};
use arrow::compute::kernels::numeric::{add, div, mul, rem, sub};
use arrow::error::ArrowError;

use crate::error::{ColvexError, Result};
use crate::types::{Category, DataType, Value};
use crate::vector::{build_list, constant, ArrowVector, ValueVector, VectorBuilder, VectorRef};

use super::{ArithmeticOp, ComparisonOp, EvalContext, Expr, LogicalOp};

/// Vectorized expression evaluator.
///
/// Evaluates expressions over whole vectors. Operands that are backed by
/// Arrow arrays go through Arrow compute kernels; everything else is
/// evaluated row by row over boxed values.
pub struct Evaluator;

impl Evaluator {
    /// Evaluates a bound expression against the rows of `ctx`.
    ///
    /// Returns a vector with one entry per row.
    ///
    /// # Errors
    ///
    /// Returns an invalid-expression error for missing columns, unbound
    /// parameters and bare lambdas; propagates arithmetic and function errors.
    pub fn evaluate(expr: &Expr, ctx: &EvalContext<'_>) -> Result<VectorRef> {
        match expr {
            Expr::Literal { value, data_type } => constant(data_type, value, ctx.num_rows()),
            Expr::Column { name, .. } => ctx
                .rows()
                .column_by_name(name)
                .cloned()
                .ok_or_else(|| ColvexError::InvalidExpression(format!("Column not found: {name}"))),
            Expr::Parameter { id, .. } => ctx.param(*id).cloned().ok_or_else(|| {
                ColvexError::InvalidExpression(format!("Unbound lambda parameter ${id}"))
            }),
            Expr::Field {
                base,
                name,
                data_type,
            } => {
                let base = Self::evaluate(base, ctx)?;
                Self::field(&base, name, data_type)
            }
            Expr::Comparison {
                left, op, right, ..
            } => {
                let left = Self::evaluate(left, ctx)?;
                let right = Self::evaluate(right, ctx)?;
                Self::compare(&left, *op, &right)
            }
            Expr::Arithmetic {
                left,
                op,
                right,
                data_type,
            } => {
                let left = Self::evaluate(left, ctx)?;
                let right = Self::evaluate(right, ctx)?;
                Self::arithmetic(&left, *op, &right, data_type)
            }
            Expr::Logical { op, operands, .. } => Self::evaluate_logical(*op, operands, ctx),
            Expr::IsNull {
                operand, negated, ..
            } => {
                let operand = Self::evaluate(operand, ctx)?;
                let nulls = match operand.to_arrow() {
                    Some(array) => is_null(&array)?,
                    None => BooleanArray::from(
                        (0..operand.len())
                            .map(|row| operand.is_null(row))
                            .collect::<Vec<bool>>(),
                    ),
                };
                let result = if *negated { not(&nulls)? } else { nulls };
                arrow_result(Arc::new(result))
            }
            Expr::MakeArray {
                elements,
                data_type,
            } => Self::make_array(elements, data_type, ctx),
            Expr::Call { function, args, .. } => function.evaluate(args, ctx),
            Expr::Lambda { .. } => Err(ColvexError::InvalidExpression(
                "Lambda expressions are only valid as function arguments".to_string(),
            )),
            Expr::Aggregate { .. } => Err(ColvexError::UnsupportedOperation(
                "Aggregates should be evaluated per group".to_string(),
            )),
        }
    }

    /// Evaluates an aggregate expression once per group of `groups`.
    ///
    /// `groups` must be table-typed; each row holds one group's member rows.
    ///
    /// # Errors
    ///
    /// Returns an invalid-expression error if `expr` is not an aggregate call
    /// and propagates the aggregate's own errors.
    pub fn evaluate_grouped(
        expr: &Expr,
        groups: &dyn ValueVector,
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef> {
        match expr {
            Expr::Aggregate {
                function,
                args,
                mode,
                ..
            } => function.evaluate_grouped(args, *mode, groups, ctx),
            other => Err(ColvexError::InvalidExpression(format!(
                "Expected an aggregate call, got {other:?}"
            ))),
        }
    }

    /// Evaluates `expr` batch by batch, splitting the rows of `ctx` by the
    /// configured batch size.
    ///
    /// # Errors
    ///
    /// Propagates the first failing batch's error.
    pub fn evaluate_batches(expr: &Expr, ctx: &EvalContext<'_>) -> Result<Vec<VectorRef>> {
        let batches = ctx.batches();
        log::trace!("evaluating {expr:?} over {} batches", batches.len());
        batches
            .iter()
            .map(|batch| Self::evaluate(expr, batch))
            .collect()
    }

    /// Extracts one field from every row of an object-typed vector.
    fn field(base: &VectorRef, name: &str, data_type: &DataType) -> Result<VectorRef> {
        if let Some(column) = base.as_row_set().and_then(|rows| rows.column_by_name(name)) {
            return Ok(column.clone());
        }
        let mut builder = VectorBuilder::new(data_type.clone(), base.len());
        for row in 0..base.len() {
            match base.value(row).field(name) {
                Some(value) => builder.set_value(row, value)?,
                None => builder.set_null(row),
            }
        }
        builder.build()
    }

    /// Compares two vectors row by row using the given operator.
    fn compare(left: &VectorRef, op: ComparisonOp, right: &VectorRef) -> Result<VectorRef> {
        if let Some((left, right)) = Self::arrow_operands(left, right)? {
            let result = match op {
                ComparisonOp::Eq => eq(&left, &right)?,
                ComparisonOp::Neq => neq(&left, &right)?,
                ComparisonOp::Lt => lt(&left, &right)?,
                ComparisonOp::Lte => lt_eq(&left, &right)?,
                ComparisonOp::Gt => gt(&left, &right)?,
                ComparisonOp::Gte => gt_eq(&left, &right)?,
            };
            return arrow_result(Arc::new(result));
        }
        let mut builder = VectorBuilder::new(DataType::Boolean, left.len());
        for row in 0..left.len() {
            match left.value(row).compare(&right.value(row)) {
                Some(ordering) => builder.set_bool(row, op.matches(ordering)),
                None => builder.set_null(row),
            }
        }
        builder.build()
    }

    /// Materializes both operands as Arrow arrays of one type, if possible.
    fn arrow_operands(
        left: &VectorRef,
        right: &VectorRef,
    ) -> Result<Option<(ArrayRef, ArrayRef)>> {
        let (Some(l), Some(r)) = (left.to_arrow(), right.to_arrow()) else {
            return Ok(None);
        };
        if l.data_type() == r.data_type() {
            return Ok(Some((l, r)));
        }
        let (left_type, right_type) = (left.data_type(), right.data_type());
        if left_type.is_numeric() && right_type.is_numeric() {
            if let Some(target) = left_type.promote(right_type)?.to_arrow() {
                return Ok(Some((cast(&l, &target)?, cast(&r, &target)?)));
            }
        }
        Ok(None)
    }

    /// Performs arithmetic on two vectors, producing `data_type`.
    fn arithmetic(
        left: &VectorRef,
        op: ArithmeticOp,
        right: &VectorRef,
        data_type: &DataType,
    ) -> Result<VectorRef> {
        if let (Some(target), Some(l), Some(r)) =
            (data_type.to_arrow(), left.to_arrow(), right.to_arrow())
        {
            let (l, r) = (cast(&l, &target)?, cast(&r, &target)?);
            let result = match op {
                ArithmeticOp::Add => add(&l, &r),
                ArithmeticOp::Sub => sub(&l, &r),
                ArithmeticOp::Mul => mul(&l, &r),
                ArithmeticOp::Div => div(&l, &r),
                ArithmeticOp::Mod => rem(&l, &r),
            };
            return arrow_result(result.map_err(kernel_error)?);
        }
        let mut builder = VectorBuilder::new(data_type.clone(), left.len());
        for row in 0..left.len() {
            let value = value_arithmetic(&left.value(row), op, &right.value(row))?;
            builder.set_value(row, &value)?;
        }
        builder.build()
    }

    /// Evaluates a logical operation with three-valued semantics.
    fn evaluate_logical(
        op: LogicalOp,
        operands: &[Expr],
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef> {
        let mut arrays = Vec::with_capacity(operands.len());
        for operand in operands {
            let vector = Self::evaluate(operand, ctx)?;
            arrays.push(boolean_array(vector.as_ref(), op)?);
        }
        let result = match op {
            LogicalOp::And => match arrays.split_first() {
                Some((first, rest)) => rest
                    .iter()
                    .try_fold(first.clone(), |acc, next| and_kleene(&acc, next))?,
                None => BooleanArray::from(vec![true; ctx.num_rows()]),
            },
            LogicalOp::Or => match arrays.split_first() {
                Some((first, rest)) => rest
                    .iter()
                    .try_fold(first.clone(), |acc, next| or_kleene(&acc, next))?,
                None => BooleanArray::from(vec![false; ctx.num_rows()]),
            },
            LogicalOp::Not => match arrays.first() {
                Some(operand) => not(operand)?,
                None => {
                    return Err(ColvexError::InvalidExpression(
                        "NOT requires an operand".to_string(),
                    ))
                }
            },
        };
        arrow_result(Arc::new(result))
    }

    /// Builds one array row per input row from the element expressions.
    fn make_array(
        elements: &[Expr],
        data_type: &DataType,
        ctx: &EvalContext<'_>,
    ) -> Result<VectorRef> {
        let element_type = data_type.element_type().cloned().unwrap_or(DataType::Any);
        let vectors = elements
            .iter()
            .map(|element| Self::evaluate(element, ctx))
            .collect::<Result<Vec<_>>>()?;
        let (rows, width) = (ctx.num_rows(), vectors.len());
        let mut builder = VectorBuilder::new(element_type, rows * width);
        for row in 0..rows {
            for (i, vector) in vectors.iter().enumerate() {
                builder.copy(row * width + i, vector.as_ref(), row)?;
            }
        }
        build_list(builder, &vec![Some(width); rows])
    }
}

fn arrow_result(array: ArrayRef) -> Result<VectorRef> {
    Ok(Arc::new(ArrowVector::try_new(array)?))
}

fn kernel_error(err: ArrowError) -> ColvexError {
    match err {
        ArrowError::ArithmeticOverflow(msg) => ColvexError::ArithmeticOverflow(msg),
        ArrowError::DivideByZero => division_by_zero(),
        other => other.into(),
    }
}

fn division_by_zero() -> ColvexError {
    ColvexError::ExecutionError("Division by zero".to_string())
}

/// Reads a vector as a boolean array for logical operators.
fn boolean_array(vector: &dyn ValueVector, op: LogicalOp) -> Result<BooleanArray> {
    match vector.data_type().category() {
        Category::Boolean => vector
            .to_arrow()
            .map(|array| array.as_boolean().clone())
            .ok_or_else(|| ColvexError::type_error("BOOLEAN", vector.data_type())),
        Category::Any => (0..vector.len())
            .map(|row| match vector.value(row) {
                Value::Null => Ok(None),
                Value::Bool(b) => Ok(Some(b)),
                other => Err(ColvexError::type_error(
                    format!("BOOLEAN operand of {op:?}"),
                    format!("{other:?}"),
                )),
            })
            .collect(),
        _ => Err(ColvexError::type_error(
            format!("BOOLEAN operand of {op:?}"),
            vector.data_type(),
        )),
    }
}

/// Row-wise arithmetic over boxed numeric values.
///
/// Integers stay exact and overflow-checked, any decimal operand makes the
/// operation decimal, the rest is floating point.
fn value_arithmetic(left: &Value, op: ArithmeticOp, right: &Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let overflow =
        || ColvexError::ArithmeticOverflow(format!("{left:?} {} {right:?}", op.as_str()));
    let numeric = |v: &Value| {
        v.category()
            .filter(|c| c.is_numeric())
            .ok_or_else(|| ColvexError::type_error("numeric", format!("{v:?}")))
    };
    let (l, r) = (numeric(left)?, numeric(right)?);
    let divides = matches!(op, ArithmeticOp::Div | ArithmeticOp::Mod);

    if l == Category::Decimal || r == Category::Decimal {
        let (a, b) = left.as_decimal().zip(right.as_decimal()).ok_or_else(overflow)?;
        if divides && b.is_zero() {
            return Err(division_by_zero());
        }
        let result = match op {
            ArithmeticOp::Add => a.checked_add(b),
            ArithmeticOp::Sub => a.checked_sub(b),
            ArithmeticOp::Mul => a.checked_mul(b),
            ArithmeticOp::Div => a.checked_div(b),
            ArithmeticOp::Mod => a.checked_rem(b),
        };
        return result.map(Value::Decimal).ok_or_else(overflow);
    }

    let integral = |c: Category| matches!(c, Category::Int32 | Category::Int64);
    if integral(l) && integral(r) {
        let (a, b) = left.as_int64().zip(right.as_int64()).ok_or_else(overflow)?;
        if divides && b == 0 {
            return Err(division_by_zero());
        }
        let result = match op {
            ArithmeticOp::Add => a.checked_add(b),
            ArithmeticOp::Sub => a.checked_sub(b),
            ArithmeticOp::Mul => a.checked_mul(b),
            ArithmeticOp::Div => a.checked_div(b),
            ArithmeticOp::Mod => a.checked_rem(b),
        }
        .ok_or_else(overflow)?;
        if l == Category::Int32 && r == Category::Int32 {
            return i32::try_from(result).map(Value::Int32).map_err(|_| overflow());
        }
        return Ok(Value::Int64(result));
    }

    let (a, b) = left.as_float64().zip(right.as_float64()).ok_or_else(overflow)?;
    let result = match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Mod => a % b,
    };
    Ok(Value::Float64(result))
}
