use furldb_error::Result;

use super::binder::bind_context::{BindContext, TableRef};
use super::operator::{LogicalNode, Node};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
pub struct LogicalAggregate {
    /// Table holding aggregate results.
    pub aggregates_table: TableRef,
    pub aggregates: Vec<Expression>,
    /// Table holding group by results, if any.
    pub group_table: Option<TableRef>,
    pub group_exprs: Vec<Expression>,
}

impl Explainable for LogicalAggregate {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Aggregate")
            .with_values_context("aggregates", conf, &self.aggregates)
            .with_values_context("group_expressions", conf, &self.group_exprs)
    }
}

impl LogicalNode for Node<LogicalAggregate> {
    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn get_output_table_refs(&self, _bind_context: &BindContext) -> Vec<TableRef> {
        let mut refs = vec![self.node.aggregates_table];
        if let Some(group_table) = self.node.group_table {
            refs.push(group_table);
        }
        refs
    }

    fn for_each_expr<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        for expr in &self.node.aggregates {
            func(expr)?;
        }
        for expr in &self.node.group_exprs {
            func(expr)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<'a, F>(&'a mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>,
    {
        for expr in &mut self.node.aggregates {
            func(expr)?;
        }
        for expr in &mut self.node.group_exprs {
            func(expr)?;
        }
        Ok(())
    }
}
