use std::fmt;

use crate::logical::binder::bind_context::BindContext;

/// How to display a value that may reference tables in a bind context.
#[derive(Debug, Clone, Copy)]
pub enum ContextDisplayMode<'a> {
    /// Use the bind context to enrich the output with column names.
    Enriched(&'a BindContext),
    /// Display raw table/column references.
    Raw,
}

/// Trait for displaying a value within the context of a query.
pub trait ContextDisplay {
    fn fmt_using_context(
        &self,
        mode: ContextDisplayMode,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result;
}

/// Wrapper that lets a `ContextDisplay` value be used with normal formatting
/// machinery.
#[derive(Debug)]
pub struct ContextDisplayWrapper<'a, D> {
    mode: ContextDisplayMode<'a>,
    value: D,
}

impl<'a, D: ContextDisplay> ContextDisplayWrapper<'a, D> {
    pub fn with_mode(value: D, mode: ContextDisplayMode<'a>) -> Self {
        ContextDisplayWrapper { mode, value }
    }
}

impl<D: ContextDisplay> fmt::Display for ContextDisplayWrapper<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt_using_context(self.mode, f)
    }
}

impl<D: ContextDisplay + ?Sized> ContextDisplay for &D {
    fn fmt_using_context(
        &self,
        mode: ContextDisplayMode,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        (**self).fmt_using_context(mode, f)
    }
}
