use std::fmt;

use furldb_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::explain::context_display::{ContextDisplay, ContextDisplayMode, ContextDisplayWrapper};
use crate::logical::binder::bind_context::BindContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for ArithOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Sub => write!(f, "-"),
            Self::Mul => write!(f, "*"),
            Self::Div => write!(f, "/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArithExpr {
    pub op: ArithOperator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

impl ArithExpr {
    pub fn datatype(&self, bind_context: &BindContext) -> Result<DataType> {
        let left = self.left.datatype(bind_context)?;
        let right = self.right.datatype(bind_context)?;
        arith_return_type(self.op, &left, &right)
    }
}

/// Numeric type promotion for binary arithmetic.
pub fn arith_return_type(
    op: ArithOperator,
    left: &DataType,
    right: &DataType,
) -> Result<DataType> {
    match (left, right) {
        (DataType::Null, other) | (other, DataType::Null) if other.is_numeric() => {
            Ok(other.clone())
        }
        (DataType::Null, DataType::Null) => Ok(DataType::Null),
        (a, b) if a.is_numeric() && b.is_numeric() => {
            if a == &DataType::Float64 || b == &DataType::Float64 {
                Ok(DataType::Float64)
            } else if a == &DataType::Int64 || b == &DataType::Int64 {
                Ok(DataType::Int64)
            } else {
                Ok(DataType::Int32)
            }
        }
        (a, b) => Err(DbError::plan(format!(
            "Cannot apply '{op}' to types {a} and {b}"
        ))),
    }
}

impl ContextDisplay for ArithExpr {
    fn fmt_using_context(
        &self,
        mode: ContextDisplayMode,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            ContextDisplayWrapper::with_mode(self.left.as_ref(), mode),
            self.op,
            ContextDisplayWrapper::with_mode(self.right.as_ref(), mode)
        )
    }
}
