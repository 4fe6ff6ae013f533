use std::fmt;

use furldb_error::{DbError, Result};

use crate::arrays::datatype::DataType;

/// Reference to a bind scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindScopeRef {
    pub context_idx: usize,
}

/// Reference to a table in a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableRef {
    pub table_idx: usize,
}

impl From<usize> for TableRef {
    fn from(value: usize) -> Self {
        TableRef { table_idx: value }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.table_idx)
    }
}

/// A column in some scope that references a table in an outer scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelatedColumn {
    /// Scope containing the table being referenced.
    pub outer: BindScopeRef,
    pub table: TableRef,
    /// Index of the column in the table.
    pub col_idx: usize,
}

/// A "table" in the context.
///
/// These may have a direct relationship to an underlying base table, but may
/// also be used for ephemeral columns. For example, extracted unnest
/// expressions get materialized into a generated table, and the original
/// expressions are replaced with column references pointing to it.
#[derive(Debug, Clone)]
pub struct Table {
    pub reference: TableRef,
    pub alias: Option<String>,
    pub column_types: Vec<DataType>,
    pub column_names: Vec<String>,
}

impl Table {
    pub fn num_columns(&self) -> usize {
        self.column_types.len()
    }
}

#[derive(Debug, Default)]
struct BindScope {
    /// Index to the parent bind scope.
    ///
    /// Will be None if this is the root scope.
    parent: Option<BindScopeRef>,
    /// Correlated columns in the query at this depth.
    correlated_columns: Vec<CorrelatedColumn>,
    /// Tables currently in scope.
    tables: Vec<TableRef>,
}

#[derive(Debug)]
pub struct BindContext {
    /// All scopes used for binding.
    ///
    /// Initialized with a single root scope.
    scopes: Vec<BindScope>,
    /// All tables in the bind context. Tables may or may not be inside a
    /// scope. Referenced via `TableRef`.
    tables: Vec<Table>,
}

impl Default for BindContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BindContext {
    pub fn new() -> Self {
        BindContext {
            scopes: vec![BindScope::default()],
            tables: Vec::new(),
        }
    }

    pub fn root_scope_ref(&self) -> BindScopeRef {
        BindScopeRef { context_idx: 0 }
    }

    /// Creates a new bind scope, with `current` being the parent scope.
    ///
    /// The resulting scope has visibility into parent scopes for binding
    /// correlated columns.
    pub fn new_child_scope(&mut self, current: BindScopeRef) -> BindScopeRef {
        let idx = self.scopes.len();
        self.scopes.push(BindScope {
            parent: Some(current),
            correlated_columns: Vec::new(),
            tables: Vec::new(),
        });
        BindScopeRef { context_idx: idx }
    }

    pub fn get_parent_ref(&self, bind_ref: BindScopeRef) -> Result<Option<BindScopeRef>> {
        Ok(self.get_scope(bind_ref)?.parent)
    }

    /// Push a table into a scope, making it resolvable from that scope.
    pub fn push_table(
        &mut self,
        scope: BindScopeRef,
        alias: Option<String>,
        column_types: Vec<DataType>,
        column_names: Vec<String>,
    ) -> Result<TableRef> {
        let reference = self.new_ephemeral_table_with_columns(column_types, column_names)?;
        self.tables[reference.table_idx].alias = alias;
        self.append_table_to_scope(scope, reference)?;
        Ok(reference)
    }

    /// Create a new table not visible in any scope.
    ///
    /// Used for generated columns (extracted unnest expressions, aggregate
    /// results, etc).
    pub fn new_ephemeral_table(&mut self) -> Result<TableRef> {
        self.new_ephemeral_table_with_columns(Vec::new(), Vec::new())
    }

    pub fn new_ephemeral_table_with_columns(
        &mut self,
        column_types: Vec<DataType>,
        column_names: Vec<String>,
    ) -> Result<TableRef> {
        if column_types.len() != column_names.len() {
            return Err(
                DbError::new("Column names and types have different lengths")
                    .with_field("types", column_types.len())
                    .with_field("names", column_names.len()),
            );
        }

        let table_idx = self.tables.len();
        let reference = TableRef { table_idx };
        self.tables.push(Table {
            reference,
            alias: None,
            column_types,
            column_names,
        });

        Ok(reference)
    }

    /// Push a column onto an existing table, returning its index.
    pub fn push_column_for_table(
        &mut self,
        table_ref: TableRef,
        name: impl Into<String>,
        datatype: DataType,
    ) -> Result<usize> {
        let table = self.get_table_mut(table_ref)?;
        let idx = table.column_types.len();
        table.column_types.push(datatype);
        table.column_names.push(name.into());
        Ok(idx)
    }

    pub fn get_table(&self, table_ref: TableRef) -> Result<&Table> {
        self.tables
            .get(table_ref.table_idx)
            .ok_or_else(|| DbError::new(format!("Missing table in bind context: {table_ref}")))
    }

    pub fn get_table_mut(&mut self, table_ref: TableRef) -> Result<&mut Table> {
        self.tables
            .get_mut(table_ref.table_idx)
            .ok_or_else(|| DbError::new(format!("Missing table in bind context: {table_ref}")))
    }

    pub fn get_column(&self, table_ref: TableRef, col_idx: usize) -> Result<(&str, &DataType)> {
        let table = self.get_table(table_ref)?;
        let name = table
            .column_names
            .get(col_idx)
            .map(|s| s.as_str())
            .ok_or_else(|| {
                DbError::new(format!("Missing column {col_idx} in table {table_ref}"))
            })?;
        let datatype = &table.column_types[col_idx];
        Ok((name, datatype))
    }

    pub fn append_table_to_scope(
        &mut self,
        scope: BindScopeRef,
        table: TableRef,
    ) -> Result<()> {
        self.get_scope_mut(scope)?.tables.push(table);
        Ok(())
    }

    /// Checks if a table is in the given scope, not looking at parents.
    pub fn table_is_in_scope(&self, scope: BindScopeRef, table_ref: TableRef) -> Result<bool> {
        Ok(self.get_scope(scope)?.tables.contains(&table_ref))
    }

    pub fn push_correlation(
        &mut self,
        scope: BindScopeRef,
        correlated: CorrelatedColumn,
    ) -> Result<()> {
        self.get_scope_mut(scope)?.correlated_columns.push(correlated);
        Ok(())
    }

    pub fn correlated_columns(&self, scope: BindScopeRef) -> Result<&Vec<CorrelatedColumn>> {
        Ok(&self.get_scope(scope)?.correlated_columns)
    }

    fn get_scope(&self, bind_ref: BindScopeRef) -> Result<&BindScope> {
        self.scopes
            .get(bind_ref.context_idx)
            .ok_or_else(|| DbError::new("Missing bind scope"))
    }

    fn get_scope_mut(&mut self, bind_ref: BindScopeRef) -> Result<&mut BindScope> {
        self.scopes
            .get_mut(bind_ref.context_idx)
            .ok_or_else(|| DbError::new("Missing bind scope"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_resolve_tables() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let table = ctx
            .push_table(
                scope,
                Some("t1".to_string()),
                vec![DataType::Int32, DataType::list(DataType::Int32)],
                vec!["id".to_string(), "vals".to_string()],
            )
            .unwrap();

        assert!(ctx.table_is_in_scope(scope, table).unwrap());

        let (name, datatype) = ctx.get_column(table, 1).unwrap();
        assert_eq!("vals", name);
        assert_eq!(&DataType::list(DataType::Int32), datatype);
    }

    #[test]
    fn ephemeral_tables_not_in_scope() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let table = ctx.new_ephemeral_table().unwrap();
        assert!(!ctx.table_is_in_scope(scope, table).unwrap());

        let idx = ctx
            .push_column_for_table(table, "__generated", DataType::Int64)
            .unwrap();
        assert_eq!(0, idx);
        assert_eq!(1, ctx.get_table(table).unwrap().num_columns());
    }

    #[test]
    fn child_scope_sees_own_tables_only() {
        let mut ctx = BindContext::new();
        let root = ctx.root_scope_ref();
        let child = ctx.new_child_scope(root);

        let table = ctx
            .push_table(root, None, vec![DataType::Int32], vec!["a".to_string()])
            .unwrap();

        assert!(ctx.table_is_in_scope(root, table).unwrap());
        assert!(!ctx.table_is_in_scope(child, table).unwrap());
        assert_eq!(Some(root), ctx.get_parent_ref(child).unwrap());
    }
}
