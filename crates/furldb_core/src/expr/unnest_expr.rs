use std::fmt;

use furldb_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::explain::context_display::{ContextDisplay, ContextDisplayMode, ContextDisplayWrapper};
use crate::logical::binder::bind_context::BindContext;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnnestExpr {
    /// Expression being unnested.
    pub expr: Box<Expression>,
}

impl UnnestExpr {
    /// Create an unnest expression from call arguments.
    ///
    /// UNNEST in an expression position is unary. The FROM-clause table factor
    /// form goes through the from binder instead.
    pub fn try_new_from_args(mut args: Vec<Expression>) -> Result<Self> {
        if args.len() != 1 {
            return Err(DbError::plan(format!(
                "UNNEST requires exactly one argument, got {}",
                args.len()
            )));
        }
        Ok(UnnestExpr {
            expr: Box::new(args.pop().expect("one argument")),
        })
    }

    /// Datatype produced by unnesting one level.
    ///
    /// Lists produce their element type, structs produce the struct itself
    /// (field expansion happens during the plan rewrite), and null stays null.
    /// Anything else is not a valid unnest input.
    pub fn datatype(&self, bind_context: &BindContext) -> Result<DataType> {
        let child_datatype = self.expr.datatype(bind_context)?;

        match child_datatype {
            DataType::Null => Ok(DataType::Null),
            DataType::List(list) => Ok(list.datatype.as_ref().clone()),
            DataType::Struct(meta) => Ok(DataType::Struct(meta)),
            other => Err(DbError::plan(format!(
                "UNNEST can only be applied to array, struct and null, got {other}"
            ))),
        }
    }
}

impl fmt::Display for UnnestExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_using_context(ContextDisplayMode::Raw, f)
    }
}

impl ContextDisplay for UnnestExpr {
    fn fmt_using_context(
        &self,
        mode: ContextDisplayMode,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "UNNEST({})",
            ContextDisplayWrapper::with_mode(self.expr.as_ref(), mode)
        )
    }
}

#[cfg(test)]
mod tests {
    use furldb_error::DbErrorKind;

    use super::*;
    use crate::expr::{column, lit};

    #[test]
    fn zero_args_rejected() {
        let err = UnnestExpr::try_new_from_args(Vec::new()).unwrap_err();
        assert_eq!(DbErrorKind::Plan, err.kind());
        assert!(err.to_string().contains("requires exactly one argument"));
    }

    #[test]
    fn multiple_args_rejected() {
        let err = UnnestExpr::try_new_from_args(vec![lit(1), lit(2)]).unwrap_err();
        assert!(err.to_string().contains("requires exactly one argument"));
    }

    #[test]
    fn single_arg_accepted() {
        let unnest = UnnestExpr::try_new_from_args(vec![column(0, 0)]).unwrap();
        assert_eq!(column(0, 0), *unnest.expr);
    }
}
