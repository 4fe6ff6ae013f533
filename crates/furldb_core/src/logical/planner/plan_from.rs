use furldb_error::Result;

use super::plan_unnest::UnnestPlanner;
use crate::logical::binder::bind_context::{BindContext, BindScopeRef};
use crate::logical::binder::bind_from::BoundFrom;
use crate::logical::logical_expression_list::LogicalExpressionList;
use crate::logical::logical_join::{LogicalArbitraryJoin, LogicalCrossJoin};
use crate::logical::logical_unnest::UnnestOptions;
use crate::logical::operator::{LogicalOperator, Node};

#[derive(Debug)]
pub struct FromPlanner;

impl FromPlanner {
    pub fn plan(
        &self,
        bind_context: &mut BindContext,
        scope: BindScopeRef,
        from: BoundFrom,
    ) -> Result<LogicalOperator> {
        match from {
            BoundFrom::Empty => Ok(LogicalOperator::SINGLE_ROW),
            BoundFrom::ExpressionList(bound) => Ok(LogicalOperator::ExpressionList(Node::new(
                LogicalExpressionList {
                    table_ref: bound.table_ref,
                    rows: bound.rows,
                },
                Vec::new(),
            ))),
            BoundFrom::Unnest(bound) => UnnestPlanner.plan_unnest_table_factor(
                bind_context,
                scope,
                bound,
                UnnestOptions::default(),
            ),
            BoundFrom::Join(join) => {
                let left = self.plan(bind_context, scope, join.left)?;
                let right = self.plan(bind_context, scope, join.right)?;

                // Separate UNNEST relations combined in a FROM list stay
                // separate plans under a cross join. Alignment by position
                // only happens for unnests extracted from one projection
                // scope, never across relations.
                match join.condition {
                    None => Ok(LogicalOperator::CrossJoin(Node::new(
                        LogicalCrossJoin,
                        vec![left, right],
                    ))),
                    Some(condition) => Ok(LogicalOperator::ArbitraryJoin(Node::new(
                        LogicalArbitraryJoin {
                            join_type: join.join_type,
                            condition,
                        },
                        vec![left, right],
                    ))),
                }
            }
        }
    }
}
