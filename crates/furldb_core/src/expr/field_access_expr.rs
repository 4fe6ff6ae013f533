use furldb_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::DataType;
use crate::explain::context_display::{ContextDisplay, ContextDisplayMode, ContextDisplayWrapper};
use crate::logical::binder::bind_context::BindContext;

/// Access a named field of a struct-typed expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldAccessExpr {
    pub expr: Box<Expression>,
    pub field: String,
}

impl FieldAccessExpr {
    pub fn datatype(&self, bind_context: &BindContext) -> Result<DataType> {
        let child = self.expr.datatype(bind_context)?;
        match child {
            DataType::Struct(meta) => meta
                .fields
                .iter()
                .find(|(name, _)| name == &self.field)
                .map(|(_, typ)| typ.clone())
                .ok_or_else(|| {
                    DbError::plan(format!("Struct has no field named '{}'", self.field))
                }),
            other => Err(DbError::plan(format!(
                "Cannot access field '{}' on non-struct type {other}",
                self.field
            ))),
        }
    }
}

impl ContextDisplay for FieldAccessExpr {
    fn fmt_using_context(
        &self,
        mode: ContextDisplayMode,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}['{}']",
            ContextDisplayWrapper::with_mode(self.expr.as_ref(), mode),
            self.field
        )
    }
}
