use furldb_error::{DbError, Result};

use super::bind_context::{BindContext, BindScopeRef, TableRef};
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::expr::literal_expr::LiteralExpr;
use crate::expr::Expression;
use crate::logical::logical_join::JoinType;

/// A bound FROM clause.
#[derive(Debug)]
pub enum BoundFrom {
    /// No FROM clause. Plans as a single row.
    Empty,
    /// Inline rows (VALUES, or a base table materialized for planning).
    ExpressionList(BoundExpressionList),
    /// An UNNEST table factor.
    Unnest(BoundUnnestTableFactor),
    /// Two factors joined. A comma separated factor list binds as a join
    /// without a condition.
    Join(Box<BoundJoin>),
}

#[derive(Debug)]
pub struct BoundExpressionList {
    pub table_ref: TableRef,
    pub rows: Vec<Vec<Expression>>,
}

#[derive(Debug)]
pub struct BoundUnnestTableFactor {
    /// Table holding the unnest output. One column for a list input, one
    /// column per field for a struct input.
    pub table_ref: TableRef,
    /// The unnest argument.
    pub expr: Expression,
    /// WITH OFFSET was specified. Recognized, but rejected at planning.
    pub with_offset: bool,
}

#[derive(Debug)]
pub struct BoundJoin {
    pub left: BoundFrom,
    pub right: BoundFrom,
    pub join_type: JoinType,
    /// None for cross joins.
    pub condition: Option<Expression>,
}

/// Bind inline rows, pushing a table with the given columns into scope.
pub fn bind_values(
    bind_context: &mut BindContext,
    scope: BindScopeRef,
    alias: Option<String>,
    column_names: Vec<String>,
    column_types: Vec<DataType>,
    rows: Vec<Vec<ScalarValue>>,
) -> Result<BoundExpressionList> {
    for row in &rows {
        if row.len() != column_types.len() {
            return Err(DbError::new("Row width doesn't match column count")
                .with_field("expected", column_types.len())
                .with_field("got", row.len()));
        }
    }

    let table_ref = bind_context.push_table(scope, alias, column_types, column_names)?;

    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|literal| Expression::Literal(LiteralExpr { literal }))
                .collect()
        })
        .collect();

    Ok(BoundExpressionList { table_ref, rows })
}

/// Bind an UNNEST table factor, pushing its output table into scope.
pub fn bind_unnest_table_factor(
    bind_context: &mut BindContext,
    scope: BindScopeRef,
    expr: Expression,
    alias: Option<String>,
    with_offset: bool,
) -> Result<BoundUnnestTableFactor> {
    let source_type = expr.datatype(bind_context)?;

    let (column_types, column_names) = match source_type {
        DataType::List(meta) => {
            let name = alias.unwrap_or_else(|| "unnest".to_string());
            (vec![meta.datatype.as_ref().clone()], vec![name])
        }
        DataType::Struct(meta) => {
            let (names, types) = meta
                .fields
                .iter()
                .map(|(name, typ)| (name.clone(), typ.clone()))
                .unzip();
            (types, names)
        }
        // Untyped null gets rejected during planning, bind it through so the
        // error surfaces from the same place as the expression form.
        DataType::Null => {
            let name = alias.unwrap_or_else(|| "unnest".to_string());
            (vec![DataType::Null], vec![name])
        }
        other => {
            return Err(DbError::plan(format!(
                "UNNEST can only be applied to array, struct and null, got {other}"
            )))
        }
    };

    let table_ref = bind_context.push_table(scope, None, column_types, column_names)?;

    Ok(BoundUnnestTableFactor {
        table_ref,
        expr,
        with_offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{column, lit};

    #[test]
    fn bind_unnest_factor_list_output() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let bound = bind_unnest_table_factor(
            &mut ctx,
            scope,
            lit(ScalarValue::List(vec![
                ScalarValue::Int32(4),
                ScalarValue::Int32(5),
            ])),
            None,
            false,
        )
        .unwrap();

        let table = ctx.get_table(bound.table_ref).unwrap();
        assert_eq!(vec!["unnest".to_string()], table.column_names);
        assert_eq!(vec![DataType::Int32], table.column_types);
    }

    #[test]
    fn bind_unnest_factor_struct_output() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let bound = bind_unnest_table_factor(
            &mut ctx,
            scope,
            lit(ScalarValue::Struct(vec![
                ("c0".to_string(), ScalarValue::Int32(1)),
                ("c1".to_string(), ScalarValue::Int32(2)),
            ])),
            None,
            false,
        )
        .unwrap();

        let table = ctx.get_table(bound.table_ref).unwrap();
        assert_eq!(vec!["c0".to_string(), "c1".to_string()], table.column_names);
    }

    #[test]
    fn bind_unnest_factor_invalid_type() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![DataType::Utf8],
                vec!["s".to_string()],
            )
            .unwrap();

        let err = bind_unnest_table_factor(&mut ctx, scope, column(table, 0), None, false)
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("can only be applied to array, struct and null"));
    }
}
