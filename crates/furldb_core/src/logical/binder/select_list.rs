use furldb_error::Result;

use super::bind_context::{BindContext, TableRef};
use crate::expr::column_expr::ColumnExpr;
use crate::expr::{display_context, Expression};

/// A single item in a select list, prior to binding.
#[derive(Debug, Clone)]
pub struct SelectExprItem {
    pub expr: Expression,
    pub alias: Option<String>,
}

impl SelectExprItem {
    pub fn new(expr: Expression) -> Self {
        SelectExprItem { expr, alias: None }
    }

    pub fn with_alias(expr: Expression, alias: impl Into<String>) -> Self {
        SelectExprItem {
            expr,
            alias: Some(alias.into()),
        }
    }
}

/// Bound GROUP BY list.
///
/// Each group expression gets a column in `group_table`. Select list
/// expressions matching a group expression are rewritten to reference that
/// column, so a grouped unnest is only ever expanded once.
#[derive(Debug)]
pub struct BoundGroupBy {
    pub group_table: TableRef,
    pub expressions: Vec<Expression>,
}

pub fn bind_group_by(
    bind_context: &mut BindContext,
    exprs: Vec<Expression>,
) -> Result<BoundGroupBy> {
    let group_table = bind_context.new_ephemeral_table()?;
    for expr in &exprs {
        let datatype = expr.datatype(bind_context)?;
        let name = display_context(expr, bind_context).to_string();
        bind_context.push_column_for_table(group_table, name, datatype)?;
    }

    Ok(BoundGroupBy {
        group_table,
        expressions: exprs,
    })
}

/// Bound select list.
///
/// Aggregate expressions get extracted into `aggregates` with their call sites
/// replaced by column references into `aggregates_table`. Output names (alias
/// or expression display) become the column names of `projections_table`.
#[derive(Debug)]
pub struct BoundSelectList {
    pub projections_table: TableRef,
    pub projections: Vec<Expression>,
    pub aggregates_table: TableRef,
    pub aggregates: Vec<Expression>,
}

pub fn bind_select_list(
    bind_context: &mut BindContext,
    items: Vec<SelectExprItem>,
    group_by: Option<&BoundGroupBy>,
) -> Result<BoundSelectList> {
    let projections_table = bind_context.new_ephemeral_table()?;
    let aggregates_table = bind_context.new_ephemeral_table()?;

    let mut projections = Vec::with_capacity(items.len());
    let mut aggregates = Vec::new();

    for item in items {
        // Output name derives from the expression as written, not from the
        // rewritten form.
        let name = match item.alias {
            Some(alias) => alias,
            None => display_context(&item.expr, bind_context).to_string(),
        };

        let mut expr = item.expr;
        if let Some(group_by) = group_by {
            replace_group_by_exprs(&mut expr, group_by)?;
        }
        extract_aggregates(bind_context, &mut expr, aggregates_table, &mut aggregates)?;

        let datatype = expr.datatype(bind_context)?;
        bind_context.push_column_for_table(projections_table, name, datatype)?;
        projections.push(expr);
    }

    Ok(BoundSelectList {
        projections_table,
        projections,
        aggregates_table,
        aggregates,
    })
}

/// Replace any subtree structurally equal to a GROUP BY expression with a
/// reference to the group table column.
fn replace_group_by_exprs(expr: &mut Expression, group_by: &BoundGroupBy) -> Result<()> {
    for (idx, group_expr) in group_by.expressions.iter().enumerate() {
        if expr == group_expr {
            *expr = Expression::Column(ColumnExpr::new(group_by.group_table, idx));
            return Ok(());
        }
    }

    expr.for_each_child_mut(&mut |child| replace_group_by_exprs(child, group_by))
}

/// Extract aggregate calls, replacing them with references into the
/// aggregates table. Structurally equal aggregates share a column.
fn extract_aggregates(
    bind_context: &mut BindContext,
    expr: &mut Expression,
    aggregates_table: TableRef,
    aggregates: &mut Vec<Expression>,
) -> Result<()> {
    if let Expression::Aggregate(_) = expr {
        let idx = match aggregates.iter().position(|agg| agg == expr) {
            Some(idx) => idx,
            None => {
                let datatype = expr.datatype(bind_context)?;
                let name = format!("{expr}");
                bind_context.push_column_for_table(aggregates_table, name, datatype)?;
                aggregates.push(expr.clone());
                aggregates.len() - 1
            }
        };
        *expr = Expression::Column(ColumnExpr::new(aggregates_table, idx));
        return Ok(());
    }

    expr.for_each_child_mut(&mut |child| {
        extract_aggregates(bind_context, child, aggregates_table, aggregates)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::{column, sum, unnest};

    #[test]
    fn select_list_names_and_types() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![DataType::Int32, DataType::list(DataType::Utf8)],
                vec!["id".to_string(), "tags".to_string()],
            )
            .unwrap();

        let bound = bind_select_list(
            &mut ctx,
            vec![
                SelectExprItem::new(column(table, 0)),
                SelectExprItem::new(unnest(column(table, 1))),
                SelectExprItem::with_alias(unnest(column(table, 1)), "u1"),
            ],
            None,
        )
        .unwrap();

        let table = ctx.get_table(bound.projections_table).unwrap();
        assert_eq!(
            vec!["id", "UNNEST(tags)", "u1"],
            table.column_names.iter().map(|s| s.as_str()).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![DataType::Int32, DataType::Utf8, DataType::Utf8],
            table.column_types
        );
    }

    #[test]
    fn group_by_expr_replaced_with_group_column() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![DataType::list(DataType::Int32)],
                vec!["vals".to_string()],
            )
            .unwrap();

        let group_by = bind_group_by(&mut ctx, vec![unnest(column(table, 0))]).unwrap();
        let bound = bind_select_list(
            &mut ctx,
            vec![SelectExprItem::new(unnest(column(table, 0)))],
            Some(&group_by),
        )
        .unwrap();

        // Select list references the group table, the unnest only lives in
        // the group expressions.
        assert_eq!(
            vec![Expression::Column(ColumnExpr::new(group_by.group_table, 0))],
            bound.projections
        );
        assert!(!bound.projections[0].contains_unnest());
    }

    #[test]
    fn aggregates_deduped() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![DataType::Int64],
                vec!["v".to_string()],
            )
            .unwrap();

        let bound = bind_select_list(
            &mut ctx,
            vec![
                SelectExprItem::new(sum(column(table, 0))),
                SelectExprItem::with_alias(sum(column(table, 0)), "total"),
            ],
            None,
        )
        .unwrap();

        assert_eq!(1, bound.aggregates.len());
        assert_eq!(bound.projections[0], bound.projections[1]);
    }
}
