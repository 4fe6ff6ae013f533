use furldb_error::{DbError, Result};
use indexmap::IndexMap;

use super::{
    PhysicalArithExpr,
    PhysicalCastExpr,
    PhysicalColumnExpr,
    PhysicalFieldAccessExpr,
    PhysicalLiteralExpr,
    PhysicalScalarExpression,
};
use crate::explain::context_display::{ContextDisplayMode, ContextDisplayWrapper};
use crate::expr::Expression;
use crate::logical::binder::bind_context::{BindContext, TableRef};

/// Plans logical scalar expressions into physical expressions with flat
/// column indexes.
///
/// The index layout is derived from the table refs output by the operator's
/// children, concatenated in order. A column reference that resolves to none
/// of those tables is correlated, and there's no execution strategy for that:
/// the logical plan is valid, only physical planning rejects it.
#[derive(Debug)]
pub struct PhysicalExpressionPlanner<'a> {
    bind_context: &'a BindContext,
    /// Start offset of each input table in the flat column layout.
    offsets: IndexMap<TableRef, usize>,
}

impl<'a> PhysicalExpressionPlanner<'a> {
    pub fn try_new(bind_context: &'a BindContext, table_refs: &[TableRef]) -> Result<Self> {
        let mut offsets = IndexMap::new();
        let mut offset = 0;
        for &table_ref in table_refs {
            offsets.insert(table_ref, offset);
            offset += bind_context.get_table(table_ref)?.num_columns();
        }

        Ok(PhysicalExpressionPlanner {
            bind_context,
            offsets,
        })
    }

    pub fn plan_scalars(&self, exprs: &[Expression]) -> Result<Vec<PhysicalScalarExpression>> {
        exprs.iter().map(|expr| self.plan_scalar(expr)).collect()
    }

    pub fn plan_scalar(&self, expr: &Expression) -> Result<PhysicalScalarExpression> {
        match expr {
            Expression::Column(col) => {
                let start = self.offsets.get(&col.table_scope).ok_or_else(|| {
                    DbError::not_implemented(format!(
                        "physical plan does not support this logical expression: {}",
                        ContextDisplayWrapper::with_mode(
                            col,
                            ContextDisplayMode::Enriched(self.bind_context),
                        )
                    ))
                })?;
                Ok(PhysicalScalarExpression::Column(PhysicalColumnExpr {
                    idx: start + col.column,
                }))
            }
            Expression::Literal(expr) => {
                Ok(PhysicalScalarExpression::Literal(PhysicalLiteralExpr {
                    literal: expr.literal.clone(),
                }))
            }
            Expression::Cast(expr) => Ok(PhysicalScalarExpression::Cast(PhysicalCastExpr {
                expr: Box::new(self.plan_scalar(&expr.expr)?),
                to: expr.to.clone(),
            })),
            Expression::Arith(expr) => Ok(PhysicalScalarExpression::Arith(PhysicalArithExpr {
                op: expr.op,
                left: Box::new(self.plan_scalar(&expr.left)?),
                right: Box::new(self.plan_scalar(&expr.right)?),
            })),
            Expression::FieldAccess(expr) => Ok(PhysicalScalarExpression::FieldAccess(
                PhysicalFieldAccessExpr {
                    expr: Box::new(self.plan_scalar(&expr.expr)?),
                    field: expr.field.clone(),
                },
            )),
            Expression::Aggregate(_) => Err(DbError::not_implemented(
                "physical planning for aggregate expressions",
            )),
            Expression::Unnest(_) => Err(DbError::internal(
                "unnest expression must be rewritten to a plan node before physical planning",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use furldb_error::DbErrorKind;

    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::column;

    #[test]
    fn flat_layout_across_tables() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let t1 = ctx
            .push_table(
                scope,
                None,
                vec![DataType::Int32, DataType::Int32],
                vec!["a".to_string(), "b".to_string()],
            )
            .unwrap();
        let t2 = ctx
            .push_table(scope, None, vec![DataType::Int32], vec!["c".to_string()])
            .unwrap();

        let planner = PhysicalExpressionPlanner::try_new(&ctx, &[t1, t2]).unwrap();

        match planner.plan_scalar(&column(t2, 0)).unwrap() {
            PhysicalScalarExpression::Column(col) => assert_eq!(2, col.idx),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unresolvable_column_is_not_implemented() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let t1 = ctx
            .push_table(scope, None, vec![DataType::Int32], vec!["a".to_string()])
            .unwrap();
        let outer = ctx
            .push_table(
                scope,
                None,
                vec![DataType::list(DataType::Int32)],
                vec!["vals".to_string()],
            )
            .unwrap();

        let planner = PhysicalExpressionPlanner::try_new(&ctx, &[t1]).unwrap();
        let err = planner.plan_scalar(&column(outer, 0)).unwrap_err();

        assert_eq!(DbErrorKind::NotImplemented, err.kind());
        assert!(err
            .to_string()
            .contains("physical plan does not support this logical expression"));
        assert!(err.to_string().contains("vals"));
    }
}
