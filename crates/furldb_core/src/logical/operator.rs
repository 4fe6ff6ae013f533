use std::fmt;

use furldb_error::{DbError, Result};

use super::binder::bind_context::{BindContext, TableRef};
use super::logical_aggregate::LogicalAggregate;
use super::logical_expression_list::LogicalExpressionList;
use super::logical_join::{LogicalArbitraryJoin, LogicalCrossJoin};
use super::logical_project::LogicalProject;
use super::logical_single_row::LogicalSingleRow;
use super::logical_unnest::LogicalUnnest;
use super::statistics::StatisticsValue;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, ExplainValue, Explainable};
use crate::expr::Expression;

/// Requirement for where a node in the plan needs to be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationRequirement {
    /// Required to be executed locally on the client.
    ClientLocal,
    /// Required to be executed remotely.
    Remote,
    /// Can be executed either locally or remote.
    Any,
}

impl fmt::Display for LocationRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientLocal => write!(f, "ClientLocal"),
            Self::Remote => write!(f, "Remote"),
            Self::Any => write!(f, "Any"),
        }
    }
}

/// Common operations across all logical nodes in a plan.
///
/// For individual operators, this should be implemented on `Node<T>` and not
/// `T`. It's implemented on `LogicalOperator` for convenience.
pub trait LogicalNode {
    /// Name of the operator.
    fn name(&self) -> &'static str;

    /// Returns a list of table refs representing the output of this operator.
    ///
    /// After planning, a logical operator should only reference the table refs
    /// of its direct children. If this holds, we can just generate column
    /// indexes when referencing batch columns in physical operators.
    ///
    /// A column reference that resolves to a table ref not produced by any
    /// immediate child is a correlated reference. Logical plans are allowed to
    /// hold those; physical planning is where they get rejected.
    fn get_output_table_refs(&self, bind_context: &BindContext) -> Vec<TableRef>;

    fn for_each_expr<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>;

    fn for_each_expr_mut<'a, F>(&'a mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>;
}

/// Wrapper around nodes in the logical plan to hold additional metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<N> {
    /// Node specific logic.
    pub node: N,
    /// Location where this node should be executed.
    pub location: LocationRequirement,
    /// Inputs to this node.
    pub children: Vec<LogicalOperator>,
    /// Estimated output cardinality of this node.
    pub estimated_cardinality: StatisticsValue<usize>,
}

impl<N> Node<N> {
    pub fn new(node: N, children: Vec<LogicalOperator>) -> Self {
        Node {
            node,
            location: LocationRequirement::Any,
            children,
            estimated_cardinality: StatisticsValue::Unknown,
        }
    }

    pub fn take_one_child_exact(&mut self) -> Result<LogicalOperator> {
        if self.children.len() != 1 {
            return Err(DbError::new(format!(
                "Expected 1 child to operator, have {}",
                self.children.len()
            )));
        }
        Ok(self.children.pop().expect("child to exist"))
    }

    pub fn get_one_child_exact(&self) -> Result<&LogicalOperator> {
        if self.children.len() != 1 {
            return Err(DbError::new(format!(
                "Expected 1 child to operator, have {}",
                self.children.len()
            )));
        }
        Ok(&self.children[0])
    }

    /// Get all table refs from the immediate children of this node.
    pub fn get_children_table_refs(&self, bind_context: &BindContext) -> Vec<TableRef> {
        self.children.iter().fold(Vec::new(), |mut refs, child| {
            refs.append(&mut child.get_output_table_refs(bind_context));
            refs
        })
    }
}

impl<N> Explainable for Node<N>
where
    N: Explainable,
    Node<N>: LogicalNode,
{
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = self.node.explain_entry(conf);

        if conf.verbose {
            ent.items.insert(
                "location".to_string(),
                ExplainValue::Value(self.location.to_string()),
            );
            ent.items.insert(
                "cardinality".to_string(),
                ExplainValue::Value(self.estimated_cardinality.to_string()),
            );
        }

        ent
    }
}

impl<N> AsRef<N> for Node<N> {
    fn as_ref(&self) -> &N {
        &self.node
    }
}

impl<N> AsMut<N> for Node<N> {
    fn as_mut(&mut self) -> &mut N {
        &mut self.node
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    Project(Node<LogicalProject>),
    Aggregate(Node<LogicalAggregate>),
    Unnest(Node<LogicalUnnest>),
    CrossJoin(Node<LogicalCrossJoin>),
    ArbitraryJoin(Node<LogicalArbitraryJoin>),
    ExpressionList(Node<LogicalExpressionList>),
    SingleRow(Node<LogicalSingleRow>),
}

impl LogicalOperator {
    pub(crate) const SINGLE_ROW: LogicalOperator = LogicalOperator::SingleRow(Node {
        node: LogicalSingleRow,
        location: LocationRequirement::Any,
        children: Vec::new(),
        estimated_cardinality: StatisticsValue::Exact(1),
    });

    pub fn is_project(&self) -> bool {
        matches!(self, LogicalOperator::Project(_))
    }

    pub fn children(&self) -> &[LogicalOperator] {
        match self {
            Self::Project(n) => &n.children,
            Self::Aggregate(n) => &n.children,
            Self::Unnest(n) => &n.children,
            Self::CrossJoin(n) => &n.children,
            Self::ArbitraryJoin(n) => &n.children,
            Self::ExpressionList(n) => &n.children,
            Self::SingleRow(n) => &n.children,
        }
    }

    pub fn children_mut(&mut self) -> &mut Vec<LogicalOperator> {
        match self {
            Self::Project(n) => &mut n.children,
            Self::Aggregate(n) => &mut n.children,
            Self::Unnest(n) => &mut n.children,
            Self::CrossJoin(n) => &mut n.children,
            Self::ArbitraryJoin(n) => &mut n.children,
            Self::ExpressionList(n) => &mut n.children,
            Self::SingleRow(n) => &mut n.children,
        }
    }

    /// Replaces the children in the operator by running them through `modify`.
    ///
    /// Children will be left in an undetermined state if `modify` errors.
    pub fn modify_replace_children<F>(&mut self, modify: &mut F) -> Result<()>
    where
        F: FnMut(LogicalOperator) -> Result<LogicalOperator>,
    {
        let children = self.children_mut();
        let mut new_children = Vec::with_capacity(children.len());

        for child in children.drain(..) {
            new_children.push(modify(child)?);
        }

        *children = new_children;

        Ok(())
    }

    /// Walk the plan depth first, calling `func` for every operator.
    pub fn walk<F>(&self, func: &mut F) -> Result<()>
    where
        F: FnMut(&LogicalOperator) -> Result<()>,
    {
        func(self)?;
        for child in self.children() {
            child.walk(func)?;
        }
        Ok(())
    }
}

impl LogicalNode for LogicalOperator {
    fn name(&self) -> &'static str {
        match self {
            Self::Project(n) => n.name(),
            Self::Aggregate(n) => n.name(),
            Self::Unnest(n) => n.name(),
            Self::CrossJoin(n) => n.name(),
            Self::ArbitraryJoin(n) => n.name(),
            Self::ExpressionList(n) => n.name(),
            Self::SingleRow(n) => n.name(),
        }
    }

    fn get_output_table_refs(&self, bind_context: &BindContext) -> Vec<TableRef> {
        match self {
            Self::Project(n) => n.get_output_table_refs(bind_context),
            Self::Aggregate(n) => n.get_output_table_refs(bind_context),
            Self::Unnest(n) => n.get_output_table_refs(bind_context),
            Self::CrossJoin(n) => n.get_output_table_refs(bind_context),
            Self::ArbitraryJoin(n) => n.get_output_table_refs(bind_context),
            Self::ExpressionList(n) => n.get_output_table_refs(bind_context),
            Self::SingleRow(n) => n.get_output_table_refs(bind_context),
        }
    }

    fn for_each_expr<'a, F>(&'a self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a Expression) -> Result<()>,
    {
        match self {
            Self::Project(n) => n.for_each_expr(func),
            Self::Aggregate(n) => n.for_each_expr(func),
            Self::Unnest(n) => n.for_each_expr(func),
            Self::CrossJoin(n) => n.for_each_expr(func),
            Self::ArbitraryJoin(n) => n.for_each_expr(func),
            Self::ExpressionList(n) => n.for_each_expr(func),
            Self::SingleRow(n) => n.for_each_expr(func),
        }
    }

    fn for_each_expr_mut<'a, F>(&'a mut self, func: &mut F) -> Result<()>
    where
        F: FnMut(&'a mut Expression) -> Result<()>,
    {
        match self {
            Self::Project(n) => n.for_each_expr_mut(func),
            Self::Aggregate(n) => n.for_each_expr_mut(func),
            Self::Unnest(n) => n.for_each_expr_mut(func),
            Self::CrossJoin(n) => n.for_each_expr_mut(func),
            Self::ArbitraryJoin(n) => n.for_each_expr_mut(func),
            Self::ExpressionList(n) => n.for_each_expr_mut(func),
            Self::SingleRow(n) => n.for_each_expr_mut(func),
        }
    }
}

impl Explainable for LogicalOperator {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            Self::Project(n) => n.explain_entry(conf),
            Self::Aggregate(n) => n.explain_entry(conf),
            Self::Unnest(n) => n.explain_entry(conf),
            Self::CrossJoin(n) => n.explain_entry(conf),
            Self::ArbitraryJoin(n) => n.explain_entry(conf),
            Self::ExpressionList(n) => n.explain_entry(conf),
            Self::SingleRow(n) => n.explain_entry(conf),
        }
    }
}
