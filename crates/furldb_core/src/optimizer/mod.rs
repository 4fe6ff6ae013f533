pub mod type_coerce;

use furldb_error::Result;

use crate::logical::binder::bind_context::BindContext;
use crate::logical::operator::LogicalOperator;

pub trait OptimizeRule {
    /// Apply an optimization rule to the logical plan.
    fn optimize(
        &mut self,
        bind_context: &mut BindContext,
        plan: LogicalOperator,
    ) -> Result<LogicalOperator>;
}

/// Runs a fixed set of rules over the plan.
///
/// The unnest rewrite runs during planning, strictly before any of these
/// rules. Type coercion in particular must never see a raw unnest expression.
#[derive(Debug, Default)]
pub struct Optimizer;

impl Optimizer {
    pub fn optimize(
        &mut self,
        bind_context: &mut BindContext,
        plan: LogicalOperator,
    ) -> Result<LogicalOperator> {
        let mut rule = type_coerce::TypeCoerce;
        rule.optimize(bind_context, plan)
    }
}
