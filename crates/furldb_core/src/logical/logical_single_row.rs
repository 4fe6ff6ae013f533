use furldb_error::Result;

use super::binder::bind_context::{BindContext, TableRef};
use super::operator::{LogicalNode, Node};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

/// Produces a single row with no columns.
///
/// Input to plans that don't scan anything, e.g. `SELECT UNNEST([1, 2, 3])`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalSingleRow;

impl Explainable for LogicalSingleRow {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("SingleRow")
    }
}

impl LogicalNode for Node<LogicalSingleRow> {
    fn name(&self) -> &'static str {
        "SingleRow"
    }

    fn get_output_table_refs(&self, _bind_context: &BindContext) -> Vec<TableRef> {
        Vec::new()
    }

    fn for_each_expr<'a, F>(&'a self, _func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        Ok(())
    }

    fn for_each_expr_mut<'a, F>(&'a mut self, _func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>,
    {
        Ok(())
    }
}
