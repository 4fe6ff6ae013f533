use furldb_error::Result;

use super::binder::bind_context::{BindContext, TableRef};
use super::operator::{LogicalNode, Node};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

/// A list of rows, each row a list of expressions (VALUES).
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpressionList {
    pub table_ref: TableRef,
    pub rows: Vec<Vec<Expression>>,
}

impl Explainable for LogicalExpressionList {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("ExpressionList").with_value("num_rows", self.rows.len())
    }
}

impl LogicalNode for Node<LogicalExpressionList> {
    fn name(&self) -> &'static str {
        "ExpressionList"
    }

    fn get_output_table_refs(&self, _bind_context: &BindContext) -> Vec<TableRef> {
        vec![self.node.table_ref]
    }

    fn for_each_expr<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        for row in &self.node.rows {
            for expr in row {
                func(expr)?;
            }
        }
        Ok(())
    }

    fn for_each_expr_mut<'a, F>(&'a mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>,
    {
        for row in &mut self.node.rows {
            for expr in row {
                func(expr)?;
            }
        }
        Ok(())
    }
}
