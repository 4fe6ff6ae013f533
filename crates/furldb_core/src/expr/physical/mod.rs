pub mod planner;

use std::fmt;

use furldb_error::{DbError, Result};

use crate::arrays::array::null::NullArray;
use crate::arrays::array::primitive::{Float64Array, Int64Array};
use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::compute::take::take;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::expr::arith_expr::{arith_return_type, ArithOperator};

/// A scalar expression with all column references resolved to indexes in the
/// input batch.
#[derive(Debug, Clone)]
pub enum PhysicalScalarExpression {
    Column(PhysicalColumnExpr),
    Literal(PhysicalLiteralExpr),
    Cast(PhysicalCastExpr),
    Arith(PhysicalArithExpr),
    FieldAccess(PhysicalFieldAccessExpr),
}

impl PhysicalScalarExpression {
    /// Evaluate this expression on a batch.
    ///
    /// The resulting array's length equals the batch's row count.
    pub fn eval(&self, batch: &Batch) -> Result<Array> {
        match self {
            Self::Column(expr) => batch
                .column(expr.idx)
                .cloned()
                .ok_or_else(|| {
                    DbError::execution(format!(
                        "Tried to get column at index {} in a batch with {} columns",
                        expr.idx,
                        batch.num_columns()
                    ))
                }),
            Self::Literal(expr) => Array::try_from_scalars(
                &expr.literal.datatype(),
                std::iter::repeat_n(expr.literal.clone(), batch.num_rows()),
            ),
            Self::Cast(expr) => {
                let input = expr.expr.eval(batch)?;
                cast_array(&input, &expr.to)
            }
            Self::Arith(expr) => {
                let left = expr.left.eval(batch)?;
                let right = expr.right.eval(batch)?;
                eval_arith(expr.op, &left, &right)
            }
            Self::FieldAccess(expr) => {
                let input = expr.expr.eval(batch)?;
                let structs = input.try_as_struct()?;
                let field = structs.array_for_key(&expr.field).ok_or_else(|| {
                    DbError::execution(format!("Struct has no field named '{}'", expr.field))
                })?;

                // Rows where the struct itself is null produce null fields.
                let indices: Vec<_> = (0..structs.len())
                    .map(|idx| {
                        if structs.is_valid(idx).unwrap_or(false) {
                            Some(idx)
                        } else {
                            None
                        }
                    })
                    .collect();
                take(field, &indices)
            }
        }
    }
}

impl fmt::Display for PhysicalScalarExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(expr) => write!(f, "#{}", expr.idx),
            Self::Literal(expr) => write!(f, "{}", expr.literal),
            Self::Cast(expr) => write!(f, "CAST({} AS {})", expr.expr, expr.to),
            Self::Arith(expr) => write!(f, "{} {} {}", expr.left, expr.op, expr.right),
            Self::FieldAccess(expr) => write!(f, "{}['{}']", expr.expr, expr.field),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PhysicalColumnExpr {
    /// Index of the column in the input batch.
    pub idx: usize,
}

#[derive(Debug, Clone)]
pub struct PhysicalLiteralExpr {
    pub literal: ScalarValue,
}

#[derive(Debug, Clone)]
pub struct PhysicalCastExpr {
    pub expr: Box<PhysicalScalarExpression>,
    pub to: DataType,
}

#[derive(Debug, Clone)]
pub struct PhysicalArithExpr {
    pub op: ArithOperator,
    pub left: Box<PhysicalScalarExpression>,
    pub right: Box<PhysicalScalarExpression>,
}

#[derive(Debug, Clone)]
pub struct PhysicalFieldAccessExpr {
    pub expr: Box<PhysicalScalarExpression>,
    pub field: String,
}

/// Cast an array to another type.
///
/// Null inputs cast to anything, numerics only widen.
pub fn cast_array(arr: &Array, to: &DataType) -> Result<Array> {
    if &arr.datatype() == to {
        return Ok(arr.clone());
    }

    Ok(match (arr, to) {
        (Array::Null(inner), _) => Array::new_typed_null(to, inner.len())?,
        (Array::Int32(inner), DataType::Int64) => Array::Int64(
            (0..inner.len())
                .map(|idx| {
                    if inner.is_valid(idx).unwrap_or(false) {
                        inner.value(idx).map(|v| *v as i64)
                    } else {
                        None
                    }
                })
                .collect::<Int64Array>(),
        ),
        (Array::Int32(inner), DataType::Float64) => Array::Float64(
            (0..inner.len())
                .map(|idx| {
                    if inner.is_valid(idx).unwrap_or(false) {
                        inner.value(idx).map(|v| *v as f64)
                    } else {
                        None
                    }
                })
                .collect::<Float64Array>(),
        ),
        (Array::Int64(inner), DataType::Float64) => Array::Float64(
            (0..inner.len())
                .map(|idx| {
                    if inner.is_valid(idx).unwrap_or(false) {
                        inner.value(idx).map(|v| *v as f64)
                    } else {
                        None
                    }
                })
                .collect::<Float64Array>(),
        ),
        (arr, to) => {
            return Err(DbError::execution(format!(
                "Unable to cast array of type {} to {to}",
                arr.datatype()
            )))
        }
    })
}

fn eval_arith(op: ArithOperator, left: &Array, right: &Array) -> Result<Array> {
    let ret = arith_return_type(op, &left.datatype(), &right.datatype())?;
    if ret == DataType::Null {
        return Ok(Array::Null(NullArray::new(left.len())));
    }

    let left = cast_array(left, &ret)?;
    let right = cast_array(right, &ret)?;

    Ok(match (&left, &right) {
        (Array::Int32(a), Array::Int32(b)) => {
            Array::Int32(binary_primitive::<i32, _>(a.len(), a, b, |l, r| match op {
                ArithOperator::Add => Some(l.wrapping_add(r)),
                ArithOperator::Sub => Some(l.wrapping_sub(r)),
                ArithOperator::Mul => Some(l.wrapping_mul(r)),
                ArithOperator::Div => l.checked_div(r),
            }))
        }
        (Array::Int64(a), Array::Int64(b)) => {
            Array::Int64(binary_primitive::<i64, _>(a.len(), a, b, |l, r| match op {
                ArithOperator::Add => Some(l.wrapping_add(r)),
                ArithOperator::Sub => Some(l.wrapping_sub(r)),
                ArithOperator::Mul => Some(l.wrapping_mul(r)),
                ArithOperator::Div => l.checked_div(r),
            }))
        }
        (Array::Float64(a), Array::Float64(b)) => {
            Array::Float64(binary_primitive::<f64, _>(a.len(), a, b, |l, r| match op {
                ArithOperator::Add => Some(l + r),
                ArithOperator::Sub => Some(l - r),
                ArithOperator::Mul => Some(l * r),
                ArithOperator::Div => Some(l / r),
            }))
        }
        _ => {
            return Err(DbError::execution(format!(
                "Cannot apply '{op}' to arrays of type {} and {}",
                left.datatype(),
                right.datatype()
            )))
        }
    })
}

fn binary_primitive<T, F>(
    len: usize,
    left: &crate::arrays::array::primitive::PrimitiveArray<T>,
    right: &crate::arrays::array::primitive::PrimitiveArray<T>,
    func: F,
) -> crate::arrays::array::primitive::PrimitiveArray<T>
where
    T: Copy + Default,
    F: Fn(T, T) -> Option<T>,
{
    (0..len)
        .map(|idx| {
            let l_valid = left.is_valid(idx).unwrap_or(false);
            let r_valid = right.is_valid(idx).unwrap_or(false);
            if !l_valid || !r_valid {
                return None;
            }
            func(*left.value(idx)?, *right.value(idx)?)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::primitive::Int32Array;
    use crate::arrays::array::struct_array::StructArray;
    use std::sync::Arc;

    #[test]
    fn eval_arith_with_null_propagation() {
        let batch = Batch::try_new([
            Array::Int32(Int32Array::from_iter([Some(1), None, Some(3)])),
            Array::Int32(Int32Array::from_iter([10, 20, 30])),
        ])
        .unwrap();

        let expr = PhysicalScalarExpression::Arith(PhysicalArithExpr {
            op: ArithOperator::Add,
            left: Box::new(PhysicalScalarExpression::Column(PhysicalColumnExpr { idx: 0 })),
            right: Box::new(PhysicalScalarExpression::Column(PhysicalColumnExpr {
                idx: 1,
            })),
        });

        let out = expr.eval(&batch).unwrap();
        assert_eq!(Some(ScalarValue::Int32(11)), out.scalar(0));
        assert_eq!(Some(ScalarValue::Null), out.scalar(1));
        assert_eq!(Some(ScalarValue::Int32(33)), out.scalar(2));
    }

    #[test]
    fn eval_literal_broadcasts() {
        let batch = Batch::try_new([Array::Int32(Int32Array::from_iter([1, 2, 3]))]).unwrap();

        let expr = PhysicalScalarExpression::Literal(PhysicalLiteralExpr {
            literal: ScalarValue::Utf8("x".to_string()),
        });

        let out = expr.eval(&batch).unwrap();
        assert_eq!(3, out.len());
        assert_eq!(Some(ScalarValue::Utf8("x".to_string())), out.scalar(2));
    }

    #[test]
    fn eval_field_access_null_struct() {
        let x = Arc::new(Array::Int32(Int32Array::from_iter([1, 2])));
        let validity = [true, false].into_iter().collect();
        let structs = StructArray::try_new(vec!["x".to_string()], vec![x], Some(validity))
            .unwrap();
        let batch = Batch::try_new([Array::Struct(structs)]).unwrap();

        let expr = PhysicalScalarExpression::FieldAccess(PhysicalFieldAccessExpr {
            expr: Box::new(PhysicalScalarExpression::Column(PhysicalColumnExpr { idx: 0 })),
            field: "x".to_string(),
        });

        let out = expr.eval(&batch).unwrap();
        assert_eq!(Some(ScalarValue::Int32(1)), out.scalar(0));
        assert_eq!(Some(ScalarValue::Null), out.scalar(1));
    }

    #[test]
    fn cast_null_to_typed_list() {
        let arr = Array::Null(NullArray::new(2));
        let out = cast_array(&arr, &DataType::list(DataType::Int32)).unwrap();

        assert_eq!(2, out.len());
        assert_eq!(DataType::list(DataType::Int32), out.datatype());
        assert_eq!(Some(false), out.is_valid(0));
    }
}
