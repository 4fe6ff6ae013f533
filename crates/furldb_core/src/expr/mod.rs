pub mod aggregate_expr;
pub mod arith_expr;
pub mod cast_expr;
pub mod column_expr;
pub mod field_access_expr;
pub mod literal_expr;
pub mod physical;
pub mod unnest_expr;

use std::fmt;

use furldb_error::Result;

use self::aggregate_expr::{AggregateExpr, AggregateFunction};
use self::arith_expr::{ArithExpr, ArithOperator};
use self::cast_expr::CastExpr;
use self::column_expr::ColumnExpr;
use self::field_access_expr::FieldAccessExpr;
use self::literal_expr::LiteralExpr;
use self::unnest_expr::UnnestExpr;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::explain::context_display::{ContextDisplay, ContextDisplayMode, ContextDisplayWrapper};
use crate::logical::binder::bind_context::{BindContext, TableRef};

/// A logical scalar expression.
///
/// Equality and hashing are structural, scoped to a single query compilation.
/// Two expressions that compare equal denote the same value within one plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    Column(ColumnExpr),
    Literal(LiteralExpr),
    Arith(ArithExpr),
    Cast(CastExpr),
    FieldAccess(FieldAccessExpr),
    Aggregate(AggregateExpr),
    Unnest(UnnestExpr),
}

impl Expression {
    pub fn datatype(&self, bind_context: &BindContext) -> Result<DataType> {
        match self {
            Self::Column(expr) => expr.datatype(bind_context),
            Self::Literal(expr) => Ok(expr.literal.datatype()),
            Self::Arith(expr) => expr.datatype(bind_context),
            Self::Cast(expr) => Ok(expr.to.clone()),
            Self::FieldAccess(expr) => expr.datatype(bind_context),
            Self::Aggregate(expr) => expr.datatype(bind_context),
            Self::Unnest(expr) => expr.datatype(bind_context),
        }
    }

    pub fn for_each_child<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        match self {
            Self::Column(_) | Self::Literal(_) => Ok(()),
            Self::Arith(expr) => {
                func(&expr.left)?;
                func(&expr.right)
            }
            Self::Cast(expr) => func(&expr.expr),
            Self::FieldAccess(expr) => func(&expr.expr),
            Self::Aggregate(expr) => func(&expr.input),
            Self::Unnest(expr) => func(&expr.expr),
        }
    }

    pub fn for_each_child_mut<'a, F>(&'a mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>,
    {
        match self {
            Self::Column(_) | Self::Literal(_) => Ok(()),
            Self::Arith(expr) => {
                func(&mut expr.left)?;
                func(&mut expr.right)
            }
            Self::Cast(expr) => func(&mut expr.expr),
            Self::FieldAccess(expr) => func(&mut expr.expr),
            Self::Aggregate(expr) => func(&mut expr.input),
            Self::Unnest(expr) => func(&mut expr.expr),
        }
    }

    /// Does this expression, or any child, contain an UNNEST call?
    pub fn contains_unnest(&self) -> bool {
        match self {
            Self::Column(_) | Self::Literal(_) => false,
            Self::Arith(expr) => expr.left.contains_unnest() || expr.right.contains_unnest(),
            Self::Cast(expr) => expr.expr.contains_unnest(),
            Self::FieldAccess(expr) => expr.expr.contains_unnest(),
            Self::Aggregate(expr) => expr.input.contains_unnest(),
            Self::Unnest(_) => true,
        }
    }

    /// Does this expression, or any child, reference a table not produced by
    /// `tables`?
    pub fn references_outside_of(&self, tables: &[TableRef]) -> bool {
        match self {
            Self::Column(col) => !tables.contains(&col.table_scope),
            other => {
                let mut outside = false;
                other
                    .for_each_child(&mut |child| {
                        outside = outside || child.references_outside_of(tables);
                        Ok(())
                    })
                    .expect("walk to not fail");
                outside
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_using_context(ContextDisplayMode::Raw, f)
    }
}

impl ContextDisplay for Expression {
    fn fmt_using_context(
        &self,
        mode: ContextDisplayMode,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Column(expr) => expr.fmt_using_context(mode, f),
            Self::Literal(expr) => expr.fmt_using_context(mode, f),
            Self::Arith(expr) => expr.fmt_using_context(mode, f),
            Self::Cast(expr) => expr.fmt_using_context(mode, f),
            Self::FieldAccess(expr) => expr.fmt_using_context(mode, f),
            Self::Aggregate(expr) => expr.fmt_using_context(mode, f),
            Self::Unnest(expr) => expr.fmt_using_context(mode, f),
        }
    }
}

impl From<ColumnExpr> for Expression {
    fn from(expr: ColumnExpr) -> Self {
        Expression::Column(expr)
    }
}

pub fn lit(value: impl Into<ScalarValue>) -> Expression {
    Expression::Literal(LiteralExpr {
        literal: value.into(),
    })
}

pub fn column(table: impl Into<TableRef>, column: usize) -> Expression {
    ColumnExpr::new(table, column).into()
}

pub fn add(left: Expression, right: Expression) -> Expression {
    Expression::Arith(ArithExpr {
        op: ArithOperator::Add,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn cast(expr: Expression, to: DataType) -> Expression {
    Expression::Cast(CastExpr {
        expr: Box::new(expr),
        to,
    })
}

pub fn field_access(expr: Expression, field: impl Into<String>) -> Expression {
    Expression::FieldAccess(FieldAccessExpr {
        expr: Box::new(expr),
        field: field.into(),
    })
}

pub fn unnest(expr: Expression) -> Expression {
    Expression::Unnest(UnnestExpr {
        expr: Box::new(expr),
    })
}

pub fn sum(input: Expression) -> Expression {
    Expression::Aggregate(AggregateExpr {
        agg: AggregateFunction::Sum,
        input: Box::new(input),
    })
}

/// Wrap an expression for display using the given bind context.
pub fn display_context<'a>(
    expr: &'a Expression,
    bind_context: &'a BindContext,
) -> ContextDisplayWrapper<'a, &'a Expression> {
    ContextDisplayWrapper::with_mode(expr, ContextDisplayMode::Enriched(bind_context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_for_dedup() {
        let a = unnest(column(1, 0));
        let b = unnest(column(1, 0));
        let c = unnest(column(1, 1));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn contains_unnest_nested() {
        let expr = add(lit(1), unnest(column(0, 0)));
        assert!(expr.contains_unnest());

        let expr = add(lit(1), column(0, 0));
        assert!(!expr.contains_unnest());
    }

    #[test]
    fn raw_display() {
        let expr = add(unnest(column(0, 1)), lit(4));
        assert_eq!("UNNEST(#0.1) + 4", expr.to_string());

        let expr = field_access(column(2, 0), "x");
        assert_eq!("#2.0['x']", expr.to_string());
    }

    #[test]
    fn references_outside_of() {
        let tables: Vec<TableRef> = vec![0.into(), 1.into()];

        assert!(!column(1, 3).references_outside_of(&tables));
        assert!(column(2, 0).references_outside_of(&tables));
        assert!(add(lit(1), column(2, 0)).references_outside_of(&tables));
    }
}
