use furldb_error::Result;

use super::binder::bind_context::{BindContext, TableRef};
use super::operator::{LogicalNode, Node};
use crate::explain::context_display::ContextDisplayWrapper;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

/// Options controlling list unnest behavior.
///
/// With `preserve_nulls` false (the default), an input row whose list values
/// are all null or empty produces no output rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnnestOptions {
    pub preserve_nulls: bool,
}

/// A list-typed column to row-expand.
#[derive(Debug, Clone, PartialEq)]
pub struct ListUnnest {
    /// Placeholder column holding the list value, materialized by the
    /// projection directly below the unnest.
    pub expr: Expression,
    /// Number of list nesting levels removed in one pass.
    pub depth: usize,
    /// Table holding the single output column.
    pub output_ref: TableRef,
}

/// A struct-typed column whose fields get projected out as sibling columns.
///
/// Always a single level, and never multiplies rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StructUnnest {
    /// Placeholder column holding the struct value.
    pub expr: Expression,
    /// Table holding one output column per struct field.
    pub output_ref: TableRef,
}

/// Unnest list- and struct-typed columns into replicated rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalUnnest {
    /// Table ref for columns passed through unchanged (replicated per
    /// expansion).
    pub projection_ref: TableRef,
    /// Columns to pass through.
    pub project_expressions: Vec<Expression>,
    /// List unnest targets.
    pub lists: Vec<ListUnnest>,
    /// Struct unnest targets.
    pub structs: Vec<StructUnnest>,
    pub options: UnnestOptions,
}

impl Explainable for LogicalUnnest {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("Unnest")
            .with_values_context("project_expressions", conf, &self.project_expressions)
            .with_values(
                "list_expressions",
                self.lists.iter().map(|list| {
                    format!(
                        "{} (depth = {})",
                        ContextDisplayWrapper::with_mode(&list.expr, conf.context_mode),
                        list.depth,
                    )
                }),
            )
            .with_values_context(
                "struct_expressions",
                conf,
                self.structs.iter().map(|s| &s.expr),
            );

        if conf.verbose {
            ent = ent.with_value("projection_ref", self.projection_ref);
        }

        ent
    }
}

impl LogicalNode for Node<LogicalUnnest> {
    fn name(&self) -> &'static str {
        "Unnest"
    }

    fn get_output_table_refs(&self, _bind_context: &BindContext) -> Vec<TableRef> {
        let mut refs = vec![self.node.projection_ref];
        refs.extend(self.node.lists.iter().map(|list| list.output_ref));
        refs.extend(self.node.structs.iter().map(|s| s.output_ref));
        refs
    }

    fn for_each_expr<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        for expr in &self.node.project_expressions {
            func(expr)?;
        }
        for list in &self.node.lists {
            func(&list.expr)?;
        }
        for s in &self.node.structs {
            func(&s.expr)?;
        }
        Ok(())
    }

    fn for_each_expr_mut<'a, F>(&'a mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>,
    {
        for expr in &mut self.node.project_expressions {
            func(expr)?;
        }
        for list in &mut self.node.lists {
            func(&mut list.expr)?;
        }
        for s in &mut self.node.structs {
            func(&mut s.expr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::column;

    #[test]
    fn explain_lists_targets_with_depth() {
        let node = LogicalUnnest {
            projection_ref: 3.into(),
            project_expressions: vec![column(1, 0)],
            lists: vec![ListUnnest {
                expr: column(2, 0),
                depth: 2,
                output_ref: 4.into(),
            }],
            structs: Vec::new(),
            options: UnnestOptions::default(),
        };

        let out = node.explain_entry(ExplainConfig::RAW_VERBOSE).to_string();
        assert_eq!(
            "Unnest (list_expressions = [#2.0 (depth = 2)], project_expressions = [#1.0], \
             projection_ref = #3, struct_expressions = [])",
            out
        );
    }
}
