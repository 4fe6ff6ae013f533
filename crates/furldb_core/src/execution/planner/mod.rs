use furldb_error::{not_implemented, DbError, Result, ResultExt};
use tracing::debug;

use super::operators::nested_loop_join::PhysicalNestedLoopJoin;
use super::operators::project::PhysicalProject;
use super::operators::unnest::{PhysicalListUnnest, PhysicalStructUnnest, PhysicalUnnest};
use super::operators::values::PhysicalValues;
use super::operators::{PhysicalOperator, PhysicalPlan};
use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::expr::physical::planner::PhysicalExpressionPlanner;
use crate::logical::binder::bind_context::BindContext;
use crate::logical::logical_expression_list::LogicalExpressionList;
use crate::logical::logical_join::JoinType;
use crate::logical::operator::{LogicalNode, LogicalOperator, Node};

/// Maps a logical plan to a tree of physical operators.
///
/// Column references resolve against the flat concatenation of child output
/// tables. Anything unresolvable at this point is a correlated reference the
/// execution layer has no strategy for, which fails here rather than during
/// logical planning.
#[derive(Debug)]
pub struct PhysicalPlanner;

impl PhysicalPlanner {
    pub fn plan(
        &self,
        bind_context: &BindContext,
        plan: &LogicalOperator,
    ) -> Result<PhysicalPlan> {
        match plan {
            LogicalOperator::SingleRow(_) => Ok(PhysicalPlan::new(
                PhysicalOperator::Values(PhysicalValues::new(Batch::empty_with_num_rows(1))),
                Vec::new(),
            )),
            LogicalOperator::ExpressionList(node) => {
                self.plan_expression_list(bind_context, node)
            }
            LogicalOperator::Project(node) => {
                let child = node.get_one_child_exact()?;
                let child_plan = self.plan(bind_context, child)?;

                let input_refs = child.get_output_table_refs(bind_context);
                let expr_planner =
                    PhysicalExpressionPlanner::try_new(bind_context, &input_refs)?;
                let expressions = expr_planner.plan_scalars(&node.node.projections)?;

                Ok(PhysicalPlan::new(
                    PhysicalOperator::Project(PhysicalProject { expressions }),
                    vec![child_plan],
                ))
            }
            LogicalOperator::Unnest(node) => {
                if node.node.options.preserve_nulls {
                    // The option exists, the row-preserving expansion does
                    // not.
                    not_implemented!("UNNEST with preserve_nulls");
                }

                let child = node.get_one_child_exact()?;
                let child_plan = self.plan(bind_context, child)?;

                let input_refs = child.get_output_table_refs(bind_context);
                let expr_planner =
                    PhysicalExpressionPlanner::try_new(bind_context, &input_refs)?;

                let project_expressions =
                    expr_planner.plan_scalars(&node.node.project_expressions)?;
                let list_expressions = node
                    .node
                    .lists
                    .iter()
                    .map(|list| {
                        Ok(PhysicalListUnnest {
                            expr: expr_planner.plan_scalar(&list.expr)?,
                            depth: list.depth,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let struct_expressions = node
                    .node
                    .structs
                    .iter()
                    .map(|s| {
                        Ok(PhysicalStructUnnest {
                            expr: expr_planner.plan_scalar(&s.expr)?,
                            num_fields: bind_context.get_table(s.output_ref)?.num_columns(),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                debug!(
                    num_lists = list_expressions.len(),
                    num_structs = struct_expressions.len(),
                    "planned physical unnest"
                );

                Ok(PhysicalPlan::new(
                    PhysicalOperator::Unnest(PhysicalUnnest {
                        project_expressions,
                        list_expressions,
                        struct_expressions,
                    }),
                    vec![child_plan],
                ))
            }
            LogicalOperator::CrossJoin(node) => {
                let children = self.plan_children(bind_context, &node.children, 2)?;
                Ok(PhysicalPlan::new(
                    PhysicalOperator::NestedLoopJoin(PhysicalNestedLoopJoin {
                        condition: None,
                    }),
                    children,
                ))
            }
            LogicalOperator::ArbitraryJoin(node) => {
                if node.node.join_type != JoinType::Inner {
                    not_implemented!(
                        "physical plan for {} arbitrary join",
                        node.node.join_type
                    );
                }

                let children = self.plan_children(bind_context, &node.children, 2)?;
                let input_refs = node.get_children_table_refs(bind_context);
                let expr_planner =
                    PhysicalExpressionPlanner::try_new(bind_context, &input_refs)?;
                let condition = expr_planner.plan_scalar(&node.node.condition)?;

                Ok(PhysicalPlan::new(
                    PhysicalOperator::NestedLoopJoin(PhysicalNestedLoopJoin {
                        condition: Some(condition),
                    }),
                    children,
                ))
            }
            LogicalOperator::Aggregate(_) => {
                not_implemented!("physical plan for aggregate node")
            }
        }
    }

    fn plan_children(
        &self,
        bind_context: &BindContext,
        children: &[LogicalOperator],
        expected: usize,
    ) -> Result<Vec<PhysicalPlan>> {
        if children.len() != expected {
            return Err(DbError::new(format!(
                "Expected {expected} children to operator, have {}",
                children.len()
            )));
        }
        children
            .iter()
            .map(|child| self.plan(bind_context, child))
            .collect()
    }

    fn plan_expression_list(
        &self,
        bind_context: &BindContext,
        node: &Node<LogicalExpressionList>,
    ) -> Result<PhysicalPlan> {
        let table = bind_context.get_table(node.node.table_ref)?;
        let num_columns = table.num_columns();
        let column_types = table.column_types.clone();

        // Rows contain constants only, evaluate them against a single
        // placeholder row.
        let expr_planner = PhysicalExpressionPlanner::try_new(bind_context, &[])?;
        let dummy = Batch::empty_with_num_rows(1);

        let mut columns: Vec<Vec<_>> = vec![Vec::with_capacity(node.node.rows.len()); num_columns];
        for row in &node.node.rows {
            if row.len() != num_columns {
                return Err(DbError::new("Row width doesn't match column count")
                    .with_field("expected", num_columns)
                    .with_field("got", row.len()));
            }
            for (col_idx, expr) in row.iter().enumerate() {
                let value = expr_planner
                    .plan_scalar(expr)?
                    .eval(&dummy)
                    .context("failed to evaluate row expression")?
                    .scalar(0)
                    .ok_or_else(|| DbError::internal("expression produced no rows"))?;
                columns[col_idx].push(value);
            }
        }

        let arrays = column_types
            .iter()
            .zip(columns)
            .map(|(datatype, scalars)| Array::try_from_scalars(datatype, scalars))
            .collect::<Result<Vec<_>>>()?;

        let batch = if arrays.is_empty() {
            Batch::empty_with_num_rows(node.node.rows.len())
        } else {
            Batch::try_new(arrays)?
        };

        Ok(PhysicalPlan::new(
            PhysicalOperator::Values(PhysicalValues::new(batch)),
            Vec::new(),
        ))
    }
}
