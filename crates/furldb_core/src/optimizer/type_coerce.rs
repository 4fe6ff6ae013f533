use furldb_error::{DbError, Result};
use tracing::error;

use super::OptimizeRule;
use crate::arrays::scalar::ScalarValue;
use crate::expr::arith_expr::arith_return_type;
use crate::expr::literal_expr::LiteralExpr;
use crate::expr::{cast, Expression};
use crate::logical::binder::bind_context::BindContext;
use crate::logical::operator::{LogicalNode, LogicalOperator};

/// Inserts casts so arithmetic runs over matching types.
///
/// A bare unnest value has no defined coercion semantics. Unnest expressions
/// are rewritten into plan nodes strictly before this rule runs, so finding
/// one here is a planner defect rather than a user error.
#[derive(Debug)]
pub struct TypeCoerce;

impl OptimizeRule for TypeCoerce {
    fn optimize(
        &mut self,
        bind_context: &mut BindContext,
        mut plan: LogicalOperator,
    ) -> Result<LogicalOperator> {
        plan.for_each_expr_mut(&mut |expr| coerce(bind_context, expr))?;
        plan.modify_replace_children(&mut |child| self.optimize(bind_context, child))?;
        Ok(plan)
    }
}

fn coerce(bind_context: &BindContext, expr: &mut Expression) -> Result<()> {
    if let Expression::Unnest(_) = expr {
        error!(%expr, "unnest expression survived into type coercion");
        return Err(DbError::internal(
            "Unnest should be rewritten to an Unnest plan node before type coercion",
        ));
    }

    expr.for_each_child_mut(&mut |child| coerce(bind_context, child))?;

    if let Expression::Arith(arith) = expr {
        let left_type = arith.left.datatype(bind_context)?;
        let right_type = arith.right.datatype(bind_context)?;
        let ret = arith_return_type(arith.op, &left_type, &right_type)?;

        if left_type != ret && left_type.is_numeric() {
            let orig = std::mem::replace(
                arith.left.as_mut(),
                Expression::Literal(LiteralExpr {
                    literal: ScalarValue::Null,
                }),
            );
            *arith.left = cast(orig, ret.clone());
        }
        if right_type != ret && right_type.is_numeric() {
            let orig = std::mem::replace(
                arith.right.as_mut(),
                Expression::Literal(LiteralExpr {
                    literal: ScalarValue::Null,
                }),
            );
            *arith.right = cast(orig, ret);
        }
    }

    Ok(())
}
