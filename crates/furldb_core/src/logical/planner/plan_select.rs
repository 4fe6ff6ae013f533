use furldb_error::Result;

use super::plan_from::FromPlanner;
use super::plan_unnest::UnnestPlanner;
use crate::logical::binder::bind_context::{BindContext, BindScopeRef};
use crate::logical::binder::bind_select::BoundSelect;
use crate::logical::logical_aggregate::LogicalAggregate;
use crate::logical::logical_project::LogicalProject;
use crate::logical::operator::{LogicalOperator, Node};

#[derive(Debug)]
pub struct SelectPlanner;

impl SelectPlanner {
    pub fn plan(
        &self,
        bind_context: &mut BindContext,
        scope: BindScopeRef,
        select: BoundSelect,
    ) -> Result<LogicalOperator> {
        // Handle FROM
        let mut plan = FromPlanner.plan(bind_context, scope, select.from)?;

        // Handle GROUP BY/aggregates
        if !select.select_list.aggregates.is_empty() || select.group_by.is_some() {
            let (group_exprs, group_table) = match select.group_by {
                Some(group_by) => (group_by.expressions, Some(group_by.group_table)),
                None => (Vec::new(), None),
            };

            plan = LogicalOperator::Aggregate(Node::new(
                LogicalAggregate {
                    aggregates_table: select.select_list.aggregates_table,
                    aggregates: select.select_list.aggregates,
                    group_table,
                    group_exprs,
                },
                vec![plan],
            ));
            plan = UnnestPlanner.plan_unnests(bind_context, scope, plan)?;
        }

        // Handle projections.
        plan = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections: select.select_list.projections,
                projection_table: select.select_list.projections_table,
            },
            vec![plan],
        ));
        // Handle possible UNNESTing from the projection.
        plan = UnnestPlanner.plan_unnests(bind_context, scope, plan)?;

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::arrays::scalar::ScalarValue;
    use crate::expr::{column, unnest};
    use crate::logical::binder::bind_from::{bind_values, BoundFrom};
    use crate::logical::binder::select_list::{
        bind_group_by,
        bind_select_list,
        SelectExprItem,
    };
    use crate::logical::operator::LogicalNode;

    fn count_unnest_nodes(plan: &LogicalOperator) -> usize {
        let mut count = 0;
        plan.walk(&mut |op| {
            if matches!(op, LogicalOperator::Unnest(_)) {
                count += 1;
            }
            Ok(())
        })
        .unwrap();
        count
    }

    #[test]
    fn group_by_unnest_reuses_select_list_expansion() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let values = bind_values(
            &mut ctx,
            scope,
            Some("t".to_string()),
            vec!["vals".to_string()],
            vec![DataType::list(DataType::Int32)],
            vec![vec![ScalarValue::List(vec![
                ScalarValue::Int32(1),
                ScalarValue::Int32(2),
            ])]],
        )
        .unwrap();
        let table = values.table_ref;

        let group_by = bind_group_by(&mut ctx, vec![unnest(column(table, 0))]).unwrap();
        let select_list = bind_select_list(
            &mut ctx,
            vec![SelectExprItem::new(unnest(column(table, 0)))],
            Some(&group_by),
        )
        .unwrap();

        let plan = SelectPlanner
            .plan(
                &mut ctx,
                scope,
                BoundSelect {
                    select_list,
                    from: BoundFrom::ExpressionList(values),
                    group_by: Some(group_by),
                },
            )
            .unwrap();

        // One expansion below the aggregate serves both the group key and
        // the select list.
        assert_eq!(1, count_unnest_nodes(&plan));

        // Aggregate sits above the unnest.
        let mut found_agg_over_unnest = false;
        plan.walk(&mut |op| {
            if let LogicalOperator::Aggregate(agg) = op {
                assert!(!agg.node.group_exprs[0].contains_unnest());
                found_agg_over_unnest = true;
            }
            Ok(())
        })
        .unwrap();
        assert!(found_agg_over_unnest);
    }

    #[test]
    fn select_unnest_builds_project_unnest_project() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let values = bind_values(
            &mut ctx,
            scope,
            Some("t".to_string()),
            vec!["id".to_string(), "tags".to_string()],
            vec![DataType::Int32, DataType::list(DataType::Utf8)],
            vec![vec![
                ScalarValue::Int32(1),
                ScalarValue::List(vec![ScalarValue::from("tag1")]),
            ]],
        )
        .unwrap();
        let table = values.table_ref;

        let select_list = bind_select_list(
            &mut ctx,
            vec![
                SelectExprItem::new(column(table, 0)),
                SelectExprItem::new(unnest(column(table, 1))),
            ],
            None,
        )
        .unwrap();
        let projections_table = select_list.projections_table;

        let plan = SelectPlanner
            .plan(
                &mut ctx,
                scope,
                BoundSelect {
                    select_list,
                    from: BoundFrom::ExpressionList(values),
                    group_by: None,
                },
            )
            .unwrap();

        // Project -> Unnest -> Project -> ExpressionList
        match &plan {
            LogicalOperator::Project(project) => {
                assert_eq!(
                    vec![projections_table],
                    project.get_output_table_refs(&ctx)
                );
                let unnest = project.get_one_child_exact().unwrap();
                assert!(matches!(unnest, LogicalOperator::Unnest(_)));
                let inner_project = match unnest {
                    LogicalOperator::Unnest(node) => node.get_one_child_exact().unwrap(),
                    _ => unreachable!(),
                };
                assert!(inner_project.is_project());
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }
}
