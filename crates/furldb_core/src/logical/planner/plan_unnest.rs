use ahash::RandomState;
use furldb_error::{DbError, Result};
use indexmap::IndexMap;
use tracing::debug;

use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::expr;
use crate::expr::column_expr::ColumnExpr;
use crate::expr::literal_expr::LiteralExpr;
use crate::expr::Expression;
use crate::logical::binder::bind_context::{
    BindContext,
    BindScopeRef,
    CorrelatedColumn,
    TableRef,
};
use crate::logical::binder::bind_from::BoundUnnestTableFactor;
use crate::logical::logical_aggregate::LogicalAggregate;
use crate::logical::logical_project::LogicalProject;
use crate::logical::logical_unnest::{ListUnnest, LogicalUnnest, StructUnnest, UnnestOptions};
use crate::logical::operator::{LogicalNode, LogicalOperator, Node};

/// Rewrites UNNEST expressions into chains of Projection and Unnest operators.
///
/// For a single planning scope (a projection node or an aggregate node), every
/// extracted unnest source gets materialized as a placeholder column by a
/// projection, consumed by an unnest node directly above it. Chained unnests
/// over plain lists collapse into a single node with a recursion depth, while
/// any other operation between unnests splits the rewrite into separate
/// stages.
#[derive(Debug)]
pub struct UnnestPlanner;

impl UnnestPlanner {
    /// Replace all UNNEST expressions in the given operator with references
    /// to generated unnest nodes inserted between the operator and its child.
    ///
    /// Only projection and aggregate nodes hold unnest call sites. Everything
    /// else passes through unchanged.
    pub fn plan_unnests(
        &self,
        bind_context: &mut BindContext,
        scope: BindScopeRef,
        plan: LogicalOperator,
    ) -> Result<LogicalOperator> {
        match plan {
            LogicalOperator::Project(node) => {
                Self::plan_unnests_for_project(bind_context, scope, node)
            }
            LogicalOperator::Aggregate(node) => {
                Self::plan_unnests_for_aggregate(bind_context, scope, node)
            }
            other => Ok(other),
        }
    }

    /// Plan a FROM-clause UNNEST table factor.
    ///
    /// The factor's output table was created during binding. An argument
    /// referencing another relation makes this a lateral unnest: the chain
    /// still builds (the outer reference is passed through as-is), and the
    /// missing execution strategy surfaces during physical planning.
    pub fn plan_unnest_table_factor(
        &self,
        bind_context: &mut BindContext,
        scope: BindScopeRef,
        unnest: BoundUnnestTableFactor,
        options: UnnestOptions,
    ) -> Result<LogicalOperator> {
        if unnest.with_offset {
            return Err(DbError::not_implemented(
                "UNNEST WITH OFFSET is not supported yet",
            ));
        }

        let source_type = unnest.expr.datatype(bind_context)?;

        let mut outer = Vec::new();
        collect_column_refs(&unnest.expr, &mut outer);
        for col in &outer {
            bind_context.push_correlation(
                scope,
                CorrelatedColumn {
                    outer: scope,
                    table: col.table_scope,
                    col_idx: col.column,
                },
            )?;
        }
        if !outer.is_empty() {
            debug!(num_outer_refs = outer.len(), "planning lateral unnest table factor");
        }

        let proj_table = bind_context.new_ephemeral_table()?;
        bind_context.push_column_for_table(
            proj_table,
            format!("__unnest_placeholder({})", unnest.expr),
            source_type.clone(),
        )?;

        let projection = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections: vec![unnest.expr],
                projection_table: proj_table,
            },
            vec![LogicalOperator::SINGLE_ROW],
        ));

        let projection_ref = bind_context.new_ephemeral_table()?;
        let placeholder = expr::column(proj_table, 0);

        let (lists, structs) = match source_type {
            DataType::List(_) => (
                vec![ListUnnest {
                    expr: placeholder,
                    depth: 1,
                    output_ref: unnest.table_ref,
                }],
                Vec::new(),
            ),
            DataType::Struct(_) => (
                Vec::new(),
                vec![StructUnnest {
                    expr: placeholder,
                    output_ref: unnest.table_ref,
                }],
            ),
            DataType::Null => {
                return Err(DbError::not_implemented("UNNEST does not support null yet"))
            }
            other => {
                return Err(DbError::plan(format!(
                    "UNNEST can only be applied to array, struct and null, got {other}"
                )))
            }
        };

        Ok(LogicalOperator::Unnest(Node::new(
            LogicalUnnest {
                projection_ref,
                project_expressions: Vec::new(),
                lists,
                structs,
                options,
            },
            vec![projection],
        )))
    }

    fn plan_unnests_for_project(
        bind_context: &mut BindContext,
        scope: BindScopeRef,
        mut project: Node<LogicalProject>,
    ) -> Result<LogicalOperator> {
        let mut has_unnest = false;
        project.for_each_expr(&mut |expr| {
            has_unnest = has_unnest || expr.contains_unnest();
            Ok(())
        })?;
        if !has_unnest {
            return Ok(LogicalOperator::Project(project));
        }

        debug!(
            projection_table = %project.node.projection_table,
            "planning unnests for projection"
        );

        let child = project.take_one_child_exact()?;
        let child_tables = child.get_output_table_refs(bind_context);

        let projection_table = project.node.projection_table;
        let orig_names = bind_context.get_table(projection_table)?.column_names.clone();
        let projections = std::mem::take(&mut project.node.projections);

        let mut new_projections = Vec::new();
        let mut new_names = Vec::new();
        let mut new_types = Vec::new();

        let mut extractor = UnnestExtractor::new(bind_context);
        for (idx, mut projection) in projections.into_iter().enumerate() {
            if matches!(projection, Expression::Unnest(_)) {
                // Root of a top-level select expression, the only place a
                // struct unnest is legal.
                if let Some(target_idx) =
                    extractor.rewrite_unnest_site(&mut projection, true)?
                {
                    let target = &extractor.extracted[target_idx];
                    let output_ref = target.output_ref;
                    let fields = match &target.kind {
                        ExtractedKind::Struct { fields } => fields.clone(),
                        ExtractedKind::List { .. } => {
                            return Err(DbError::internal(
                                "expected struct target for root expansion",
                            ))
                        }
                    };

                    for (col_idx, (field_name, field_type)) in fields.into_iter().enumerate()
                    {
                        new_projections.push(expr::column(output_ref, col_idx));
                        new_names.push(field_name);
                        new_types.push(field_type);
                    }
                    continue;
                }
            } else {
                extractor.extract(&mut projection)?;
            }

            let datatype = projection.datatype(extractor.bind_context)?;
            new_names.push(
                orig_names
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| projection.to_string()),
            );
            new_types.push(datatype);
            new_projections.push(projection);
        }
        let extracted = extractor.into_extracted();

        // The rewrite is what derives the final output names, so duplicates
        // are only detectable now.
        let mut seen: Vec<&str> = Vec::with_capacity(new_names.len());
        for name in &new_names {
            if seen.contains(&name.as_str()) {
                return Err(DbError::plan(format!(
                    "Duplicate output column name '{name}'. Consider aliasing one of them."
                )));
            }
            seen.push(name);
        }

        let table = bind_context.get_table_mut(projection_table)?;
        table.column_names = new_names;
        table.column_types = new_types;

        let chain = build_unnest_chain(
            bind_context,
            scope,
            child,
            &child_tables,
            extracted,
            UnnestOptions::default(),
        )?;

        for projection in &mut new_projections {
            remap_columns(projection, &chain.remap, &mut Vec::new());
        }

        project.node.projections = new_projections;
        project.children = vec![chain.plan];

        Ok(LogicalOperator::Project(project))
    }

    fn plan_unnests_for_aggregate(
        bind_context: &mut BindContext,
        scope: BindScopeRef,
        mut agg: Node<LogicalAggregate>,
    ) -> Result<LogicalOperator> {
        let mut has_unnest = false;
        agg.for_each_expr(&mut |expr| {
            has_unnest = has_unnest || expr.contains_unnest();
            Ok(())
        })?;
        if !has_unnest {
            return Ok(LogicalOperator::Aggregate(agg));
        }

        debug!("planning unnests for aggregate");

        let child = agg.take_one_child_exact()?;
        let child_tables = child.get_output_table_refs(bind_context);

        let mut extractor = UnnestExtractor::new(bind_context);
        for aggregate in &mut agg.node.aggregates {
            extractor.extract(aggregate)?;
        }
        for group_expr in &mut agg.node.group_exprs {
            extractor.extract(group_expr)?;
        }
        let extracted = extractor.into_extracted();

        let chain = build_unnest_chain(
            bind_context,
            scope,
            child,
            &child_tables,
            extracted,
            UnnestOptions::default(),
        )?;

        agg.for_each_expr_mut(&mut |expr| {
            remap_columns(expr, &chain.remap, &mut Vec::new());
            Ok(())
        })?;
        agg.children = vec![chain.plan];

        Ok(LogicalOperator::Aggregate(agg))
    }
}

/// Number of consecutive list nesting levels in a type.
fn list_levels(datatype: &DataType) -> usize {
    let mut levels = 0;
    let mut current = datatype;
    while let DataType::List(meta) = current {
        levels += 1;
        current = meta.datatype.as_ref();
    }
    levels
}

#[derive(Debug, Clone, PartialEq)]
enum ExtractedKind {
    List { depth: usize },
    Struct { fields: Vec<(String, DataType)> },
}

/// A single unnest target pulled out of the scope's expressions.
#[derive(Debug)]
struct ExtractedUnnest {
    /// Source expression. References the scope's input tables, and the output
    /// tables of targets extracted before this one for staged recursion.
    source: Expression,
    kind: ExtractedKind,
    /// Table holding this target's unnested output columns.
    output_ref: TableRef,
}

/// Walks expressions replacing unnest call sites with references into
/// per-target output tables, interning each distinct (source, depth) pair
/// exactly once.
struct UnnestExtractor<'a> {
    bind_context: &'a mut BindContext,
    /// Placeholder registry keyed by source expression and depth (depth 0 is
    /// used for struct targets). Values index into `extracted`.
    registry: IndexMap<(Expression, usize), usize, RandomState>,
    extracted: Vec<ExtractedUnnest>,
}

impl<'a> UnnestExtractor<'a> {
    fn new(bind_context: &'a mut BindContext) -> Self {
        UnnestExtractor {
            bind_context,
            registry: IndexMap::default(),
            extracted: Vec::new(),
        }
    }

    fn into_extracted(self) -> Vec<ExtractedUnnest> {
        self.extracted
    }

    /// Extract unnest call sites anywhere within the expression.
    ///
    /// Call sites found here are never at the root of a select expression, so
    /// struct unnests get rejected.
    fn extract(&mut self, expr: &mut Expression) -> Result<()> {
        if matches!(expr, Expression::Unnest(_)) {
            let expansion = self.rewrite_unnest_site(expr, false)?;
            debug_assert!(expansion.is_none());
            return Ok(());
        }
        expr.for_each_child_mut(&mut |child| self.extract(child))
    }

    /// Rewrite one unnest call site.
    ///
    /// Directly nested calls over list-typed sub-results compress into a
    /// single target carrying the chain length as its depth. A chain
    /// interrupted by any other operation extracts the inner unnest first and
    /// continues against its placeholder.
    ///
    /// Returns the target index for a root-level struct expansion, in which
    /// case the caller is responsible for splicing the field columns. All
    /// other rewrites mutate the expression in place and return None.
    fn rewrite_unnest_site(
        &mut self,
        expr: &mut Expression,
        root: bool,
    ) -> Result<Option<usize>> {
        let mut depth = 0;
        let mut source = std::mem::replace(
            expr,
            Expression::Literal(LiteralExpr {
                literal: ScalarValue::Null,
            }),
        );
        while let Expression::Unnest(unnest) = source {
            source = *unnest.expr;
            depth += 1;
        }

        // Anything below a non-unnest operation belongs to an earlier stage.
        self.extract(&mut source)?;

        let mut remaining = depth;
        loop {
            let datatype = source.datatype(self.bind_context)?;
            match datatype {
                DataType::List(_) => {
                    let compress = remaining.min(list_levels(&datatype));
                    let column = self.intern_list(source, compress)?;
                    remaining -= compress;
                    if remaining == 0 {
                        *expr = Expression::Column(column);
                        return Ok(None);
                    }
                    source = Expression::Column(column);
                }
                DataType::Struct(_) => {
                    if !root || remaining != 1 {
                        return Err(DbError::plan(
                            "unnest on struct can only be applied at the root level of select expression",
                        ));
                    }
                    return Ok(Some(self.intern_struct(source)?));
                }
                DataType::Null => {
                    return Err(DbError::not_implemented(
                        "UNNEST does not support null yet",
                    ))
                }
                other => {
                    return Err(DbError::plan(format!(
                        "UNNEST can only be applied to array, struct and null, got {other}"
                    )))
                }
            }
        }
    }

    fn intern_list(&mut self, source: Expression, depth: usize) -> Result<ColumnExpr> {
        let key = (source.clone(), depth);
        if let Some(&idx) = self.registry.get(&key) {
            return Ok(ColumnExpr::new(self.extracted[idx].output_ref, 0));
        }

        let source_type = source.datatype(self.bind_context)?;
        let element = source_type.try_unwrap_list_levels(depth)?.clone();

        let output_ref = self.bind_context.new_ephemeral_table()?;
        let name = if depth == 1 {
            format!("__unnest_placeholder({source})")
        } else {
            format!("__unnest_placeholder({source},depth={depth})")
        };
        self.bind_context
            .push_column_for_table(output_ref, name, element)?;

        let idx = self.extracted.len();
        self.extracted.push(ExtractedUnnest {
            source,
            kind: ExtractedKind::List { depth },
            output_ref,
        });
        self.registry.insert(key, idx);

        Ok(ColumnExpr::new(output_ref, 0))
    }

    fn intern_struct(&mut self, source: Expression) -> Result<usize> {
        let key = (source.clone(), 0);
        if let Some(&idx) = self.registry.get(&key) {
            return Ok(idx);
        }

        let fields = match source.datatype(self.bind_context)? {
            DataType::Struct(meta) => meta.fields,
            other => {
                return Err(DbError::internal(format!(
                    "expected struct type for struct unnest target, got {other}"
                )))
            }
        };

        let output_ref = self.bind_context.new_ephemeral_table()?;
        for (field_name, field_type) in &fields {
            self.bind_context.push_column_for_table(
                output_ref,
                format!("__unnest_placeholder({source}).{field_name}"),
                field_type.clone(),
            )?;
        }

        let idx = self.extracted.len();
        self.extracted.push(ExtractedUnnest {
            source,
            kind: ExtractedKind::Struct { fields },
            output_ref,
        });
        self.registry.insert(key, idx);

        Ok(idx)
    }
}

struct UnnestChain {
    plan: LogicalOperator,
    /// Maps (table, column) as referenced by the scope's expressions to the
    /// column's final home in the chain's output.
    remap: IndexMap<(TableRef, usize), (TableRef, usize), RandomState>,
}

/// Fold extracted targets into a bottom-up Projection/Unnest chain over
/// `child`.
///
/// Targets whose sources only reference the scope's input land in stage zero.
/// A target whose source references another target's output runs one stage
/// later than it. Every stage forwards all columns visible below it, so the
/// scope's remaining expressions resolve against the last stage's output via
/// the returned remap.
fn build_unnest_chain(
    bind_context: &mut BindContext,
    scope: BindScopeRef,
    child: LogicalOperator,
    child_tables: &[TableRef],
    extracted: Vec<ExtractedUnnest>,
    options: UnnestOptions,
) -> Result<UnnestChain> {
    // Targets are interned inner-first, so a source can only reference
    // targets at lower indexes.
    let target_stage_lookup: IndexMap<TableRef, usize, RandomState> = extracted
        .iter()
        .enumerate()
        .map(|(idx, target)| (target.output_ref, idx))
        .collect();

    let mut stages = vec![0; extracted.len()];
    for (idx, target) in extracted.iter().enumerate() {
        let mut refs = Vec::new();
        collect_column_refs(&target.source, &mut refs);
        let mut stage = 0;
        for col in refs {
            if let Some(&dep_idx) = target_stage_lookup.get(&col.table_scope) {
                stage = stage.max(stages[dep_idx] + 1);
            }
        }
        stages[idx] = stage;
    }
    let num_stages = stages.iter().map(|s| s + 1).max().unwrap_or(0);

    let mut remap: IndexMap<(TableRef, usize), (TableRef, usize), RandomState> =
        IndexMap::default();
    for &table in child_tables {
        let num_columns = bind_context.get_table(table)?.num_columns();
        for idx in 0..num_columns {
            remap.insert((table, idx), (table, idx));
        }
    }

    let mut plan = child;
    for stage in 0..num_stages {
        debug!(stage, "building unnest stage");

        // Projection materializing pass-through columns and placeholder
        // sources.
        let proj_table = bind_context.new_ephemeral_table()?;
        let mut proj_exprs = Vec::new();

        let passthrough: Vec<((TableRef, usize), (TableRef, usize))> =
            remap.iter().map(|(&orig, &cur)| (orig, cur)).collect();
        let mut passthrough_cols = Vec::with_capacity(passthrough.len());
        for &(_orig, cur) in &passthrough {
            let (name, datatype) = bind_context.get_column(cur.0, cur.1)?;
            passthrough_cols.push((name.to_string(), datatype.clone()));
        }
        for (&(_orig, cur), (name, datatype)) in passthrough.iter().zip(&passthrough_cols) {
            bind_context.push_column_for_table(proj_table, name.clone(), datatype.clone())?;
            proj_exprs.push(expr::column(cur.0, cur.1));
        }

        // Placeholders, deduplicated by source. One source may feed multiple
        // targets (same expression at different depths) but is computed once.
        let mut placeholder_cols: IndexMap<Expression, usize, RandomState> =
            IndexMap::default();
        for (idx, target) in extracted.iter().enumerate() {
            if stages[idx] != stage || placeholder_cols.contains_key(&target.source) {
                continue;
            }

            let mut source = target.source.clone();
            let mut unmapped = Vec::new();
            remap_columns(&mut source, &remap, &mut unmapped);
            // An unmapped reference points at a relation outside this scope's
            // input, making the unnest lateral. Pass it through as-is and
            // record the correlation.
            for col in unmapped {
                bind_context.push_correlation(
                    scope,
                    CorrelatedColumn {
                        outer: scope,
                        table: col.table_scope,
                        col_idx: col.column,
                    },
                )?;
            }

            let datatype = source.datatype(bind_context)?;
            let col_idx = bind_context.push_column_for_table(
                proj_table,
                format!("__unnest_placeholder({})", target.source),
                datatype,
            )?;
            proj_exprs.push(source);
            placeholder_cols.insert(target.source.clone(), col_idx);
        }

        plan = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections: proj_exprs,
                projection_table: proj_table,
            },
            vec![plan],
        ));

        // Unnest consuming the placeholders, forwarding everything else.
        let projection_ref = bind_context.new_ephemeral_table()?;
        let mut project_expressions = Vec::with_capacity(passthrough.len());
        for (pos, (name, datatype)) in passthrough_cols.iter().enumerate() {
            bind_context.push_column_for_table(
                projection_ref,
                name.clone(),
                datatype.clone(),
            )?;
            project_expressions.push(expr::column(proj_table, pos));
        }

        let mut lists = Vec::new();
        let mut structs = Vec::new();
        for (idx, target) in extracted.iter().enumerate() {
            if stages[idx] != stage {
                continue;
            }
            let placeholder = placeholder_cols
                .get(&target.source)
                .copied()
                .ok_or_else(|| DbError::internal("missing placeholder for unnest target"))?;
            let placeholder_expr = expr::column(proj_table, placeholder);

            match &target.kind {
                ExtractedKind::List { depth } => lists.push(ListUnnest {
                    expr: placeholder_expr,
                    depth: *depth,
                    output_ref: target.output_ref,
                }),
                ExtractedKind::Struct { .. } => structs.push(StructUnnest {
                    expr: placeholder_expr,
                    output_ref: target.output_ref,
                }),
            }
        }

        plan = LogicalOperator::Unnest(Node::new(
            LogicalUnnest {
                projection_ref,
                project_expressions,
                lists,
                structs,
                options,
            },
            vec![plan],
        ));

        // Pass-through columns moved into the unnest's projection table, and
        // this stage's target outputs become visible for later stages.
        for (pos, &(orig, _cur)) in passthrough.iter().enumerate() {
            remap.insert(orig, (projection_ref, pos));
        }
        for (idx, target) in extracted.iter().enumerate() {
            if stages[idx] != stage {
                continue;
            }
            let num_columns = bind_context.get_table(target.output_ref)?.num_columns();
            for col in 0..num_columns {
                remap.insert((target.output_ref, col), (target.output_ref, col));
            }
        }
    }

    Ok(UnnestChain { plan, remap })
}

/// Rewrite column references through the remap, collecting references with no
/// mapping.
fn remap_columns(
    expr: &mut Expression,
    remap: &IndexMap<(TableRef, usize), (TableRef, usize), RandomState>,
    unmapped: &mut Vec<ColumnExpr>,
) {
    match expr {
        Expression::Column(col) => {
            match remap.get(&(col.table_scope, col.column)) {
                Some(&(table, column)) => {
                    col.table_scope = table;
                    col.column = column;
                }
                None => unmapped.push(*col),
            }
        }
        other => {
            other
                .for_each_child_mut(&mut |child| {
                    remap_columns(child, remap, unmapped);
                    Ok(())
                })
                .expect("remap walk to not fail");
        }
    }
}

fn collect_column_refs(expr: &Expression, out: &mut Vec<ColumnExpr>) {
    match expr {
        Expression::Column(col) => out.push(*col),
        other => {
            other
                .for_each_child(&mut |child| {
                    collect_column_refs(child, out);
                    Ok(())
                })
                .expect("collect walk to not fail");
        }
    }
}

#[cfg(test)]
mod tests {
    use furldb_error::DbErrorKind;

    use super::*;
    use crate::expr::{add, column, field_access, lit, sum, unnest};
    use crate::logical::binder::bind_from::bind_unnest_table_factor;

    fn count_unnest_nodes(plan: &LogicalOperator) -> usize {
        let mut count = 0;
        plan.walk(&mut |op| {
            if matches!(op, LogicalOperator::Unnest(_)) {
                count += 1;
            }
            Ok(())
        })
        .unwrap();
        count
    }

    fn find_unnest_nodes(plan: &LogicalOperator) -> Vec<LogicalUnnest> {
        let mut nodes = Vec::new();
        plan.walk(&mut |op| {
            if let LogicalOperator::Unnest(node) = op {
                nodes.push(node.node.clone());
            }
            Ok(())
        })
        .unwrap();
        nodes
    }

    /// Sets up a context with a table and wraps projections in a project
    /// node over an expression list.
    fn project_scope(
        ctx: &mut BindContext,
        column_types: Vec<DataType>,
        projections: Vec<Expression>,
    ) -> (TableRef, LogicalOperator) {
        let scope = ctx.root_scope_ref();
        let names = (0..column_types.len())
            .map(|idx| format!("c{idx}"))
            .collect();
        let table = ctx
            .push_table(scope, Some("t".to_string()), column_types, names)
            .unwrap();

        let projection_table = ctx.new_ephemeral_table().unwrap();
        for (idx, expr) in projections.iter().enumerate() {
            // Type errors for invalid unnest arguments surface during
            // planning, use a null type here.
            let datatype = expr.datatype(ctx).unwrap_or(DataType::Null);
            ctx.push_column_for_table(projection_table, format!("out{idx}"), datatype)
                .unwrap();
        }

        let child = LogicalOperator::ExpressionList(Node::new(
            crate::logical::logical_expression_list::LogicalExpressionList {
                table_ref: table,
                rows: Vec::new(),
            },
            Vec::new(),
        ));

        let plan = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections,
                projection_table,
            },
            vec![child],
        ));

        (table, plan)
    }

    #[test]
    fn repeated_unnest_shares_one_target() {
        let mut ctx = BindContext::new();
        let list_type = DataType::list(DataType::Int32);
        let (_, plan) = project_scope(
            &mut ctx,
            vec![list_type],
            vec![unnest(column(0, 0)), unnest(column(0, 0))],
        );

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        let nodes = find_unnest_nodes(&plan);
        assert_eq!(1, nodes.len());
        assert_eq!(1, nodes[0].lists.len());
        assert_eq!(1, nodes[0].lists[0].depth);

        // Both projections resolve to the same output column.
        match &plan {
            LogicalOperator::Project(project) => {
                assert_eq!(project.node.projections[0], project.node.projections[1]);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn recursive_unnest_compresses_to_depth() {
        let mut ctx = BindContext::new();
        let nested = DataType::list(DataType::list(DataType::list(DataType::Int64)));
        let (_, plan) = project_scope(
            &mut ctx,
            vec![nested],
            vec![unnest(unnest(unnest(column(0, 0))))],
        );

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        let nodes = find_unnest_nodes(&plan);
        assert_eq!(1, nodes.len());
        assert_eq!(1, nodes[0].lists.len());
        assert_eq!(3, nodes[0].lists[0].depth);

        // Output column type unwraps all three levels.
        let output_ref = nodes[0].lists[0].output_ref;
        let (_, datatype) = ctx.get_column(output_ref, 0).unwrap();
        assert_eq!(&DataType::Int64, datatype);
    }

    #[test]
    fn field_access_splits_stages() {
        let mut ctx = BindContext::new();
        // List of structs, each with a list-typed field.
        let inner_list = DataType::list(DataType::Int32);
        let struct_type = DataType::struct_type([("vals", inner_list.clone())]);
        let col_type = DataType::list(struct_type);

        let (_, plan) = project_scope(
            &mut ctx,
            vec![col_type],
            vec![unnest(field_access(unnest(column(0, 0)), "vals"))],
        );

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        // Inner unnest over the struct list, then the field access feeds a
        // second unnest stage.
        assert_eq!(2, count_unnest_nodes(&plan));
    }

    #[test]
    fn same_source_different_depths() {
        let mut ctx = BindContext::new();
        let nested = DataType::list(DataType::list(DataType::Int32));
        let (_, plan) = project_scope(
            &mut ctx,
            vec![nested.clone()],
            vec![
                unnest(column(0, 0)),
                unnest(unnest(column(0, 0))),
            ],
        );

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        // Two targets over one shared placeholder, one unnest stage.
        let nodes = find_unnest_nodes(&plan);
        assert_eq!(1, nodes.len());
        assert_eq!(2, nodes[0].lists.len());
        assert_eq!(nodes[0].lists[0].expr, nodes[0].lists[1].expr);
        assert_eq!(1, nodes[0].lists[0].depth);
        assert_eq!(2, nodes[0].lists[1].depth);
    }

    #[test]
    fn struct_unnest_at_root_expands_fields() {
        let mut ctx = BindContext::new();
        let struct_type =
            DataType::struct_type([("x", DataType::Int32), ("y", DataType::Utf8)]);
        let (_, plan) = project_scope(&mut ctx, vec![struct_type], vec![unnest(column(0, 0))]);

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        let nodes = find_unnest_nodes(&plan);
        assert_eq!(1, nodes.len());
        assert!(nodes[0].lists.is_empty());
        assert_eq!(1, nodes[0].structs.len());

        match &plan {
            LogicalOperator::Project(project) => {
                assert_eq!(2, project.node.projections.len());
                let table = ctx.get_table(project.node.projection_table).unwrap();
                assert_eq!(vec!["x".to_string(), "y".to_string()], table.column_names);
                assert_eq!(vec![DataType::Int32, DataType::Utf8], table.column_types);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn list_of_structs_then_struct_expansion_splits_stages() {
        let mut ctx = BindContext::new();
        let struct_type =
            DataType::struct_type([("x", DataType::Int32), ("y", DataType::Int32)]);
        let points = DataType::list(struct_type);

        // UNNEST(UNNEST(points)): one level of list unnest, then a struct
        // expansion over its placeholder.
        let (_, plan) = project_scope(
            &mut ctx,
            vec![points],
            vec![unnest(unnest(column(0, 0)))],
        );

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        let nodes = find_unnest_nodes(&plan);
        assert_eq!(2, nodes.len());

        // Top node carries the struct target, the one below it the list.
        assert_eq!(1, nodes[0].structs.len());
        assert!(nodes[0].lists.is_empty());
        assert_eq!(1, nodes[1].lists.len());

        match &plan {
            LogicalOperator::Project(project) => {
                let table = ctx.get_table(project.node.projection_table).unwrap();
                assert_eq!(vec!["x".to_string(), "y".to_string()], table.column_names);
            }
            other => panic!("unexpected plan: {other:?}"),
        }
    }

    #[test]
    fn struct_unnest_nested_errors() {
        let mut ctx = BindContext::new();
        let struct_type = DataType::struct_type([("x", DataType::Int32)]);
        let (_, plan) = project_scope(
            &mut ctx,
            vec![struct_type],
            vec![field_access(unnest(column(0, 0)), "x")],
        );

        let scope = ctx.root_scope_ref();
        let err = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap_err();
        assert!(err.to_string().contains(
            "unnest on struct can only be applied at the root level of select expression"
        ));
        assert_eq!(DbErrorKind::Plan, err.kind());
    }

    #[test]
    fn struct_unnest_in_aggregate_arg_errors() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let struct_type = DataType::struct_type([("x", DataType::Int32)]);
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![struct_type],
                vec!["s".to_string()],
            )
            .unwrap();

        let aggregates_table = ctx.new_ephemeral_table().unwrap();
        ctx.push_column_for_table(aggregates_table, "SUM(...)", DataType::Int32)
            .unwrap();

        let child = LogicalOperator::ExpressionList(Node::new(
            crate::logical::logical_expression_list::LogicalExpressionList {
                table_ref: table,
                rows: Vec::new(),
            },
            Vec::new(),
        ));
        let plan = LogicalOperator::Aggregate(Node::new(
            LogicalAggregate {
                aggregates_table,
                aggregates: vec![sum(unnest(column(table, 0)))],
                group_table: None,
                group_exprs: Vec::new(),
            },
            vec![child],
        ));

        let err = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap_err();
        assert!(err.to_string().contains("root level of select expression"));
    }

    #[test]
    fn untyped_null_not_implemented() {
        let mut ctx = BindContext::new();
        let (_, plan) = project_scope(
            &mut ctx,
            vec![DataType::Int32],
            vec![unnest(lit(ScalarValue::Null))],
        );

        let scope = ctx.root_scope_ref();
        let err = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap_err();
        assert!(err.to_string().contains("does not support null yet"));
        assert_eq!(DbErrorKind::NotImplemented, err.kind());
    }

    #[test]
    fn invalid_argument_type_errors() {
        let mut ctx = BindContext::new();
        let (_, plan) = project_scope(
            &mut ctx,
            vec![DataType::Utf8],
            vec![unnest(column(0, 0))],
        );

        let scope = ctx.root_scope_ref();
        let err = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap_err();
        assert!(err
            .to_string()
            .contains("can only be applied to array, struct and null"));
        assert!(err.to_string().contains("Utf8"));

        // Scalar literals fail the same way.
        let mut ctx = BindContext::new();
        let (_, plan) = project_scope(&mut ctx, vec![DataType::Int32], vec![unnest(lit(1))]);

        let scope = ctx.root_scope_ref();
        let err = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap_err();
        assert!(err.to_string().contains("Int32"));
        assert_eq!(DbErrorKind::Plan, err.kind());
    }

    #[test]
    fn lateral_select_unnest_builds_and_records_correlation() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let list_type = DataType::list(DataType::Int32);
        let outer = ctx
            .push_table(
                scope,
                Some("t1".to_string()),
                vec![list_type],
                vec!["vals".to_string()],
            )
            .unwrap();
        let inner = ctx
            .push_table(
                scope,
                Some("t2".to_string()),
                vec![DataType::Int32],
                vec!["id".to_string()],
            )
            .unwrap();

        let projection_table = ctx.new_ephemeral_table().unwrap();
        ctx.push_column_for_table(projection_table, "UNNEST(vals)", DataType::Int32)
            .unwrap();

        // The projection's input only produces t2, the unnest argument
        // references t1.
        let child = LogicalOperator::ExpressionList(Node::new(
            crate::logical::logical_expression_list::LogicalExpressionList {
                table_ref: inner,
                rows: Vec::new(),
            },
            Vec::new(),
        ));
        let plan = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections: vec![unnest(column(outer, 0))],
                projection_table,
            },
            vec![child],
        ));

        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        // Logical planning succeeds with the outer reference passed through.
        assert_eq!(1, count_unnest_nodes(&plan));
        let correlated = ctx.correlated_columns(scope).unwrap();
        assert_eq!(1, correlated.len());
        assert_eq!(outer, correlated[0].table);
    }

    #[test]
    fn duplicate_output_names_rejected() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let list_type = DataType::list(DataType::Int32);
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![list_type],
                vec!["vals".to_string()],
            )
            .unwrap();

        // Same derived name for both, as if neither was aliased.
        let projection_table = ctx.new_ephemeral_table().unwrap();
        for _ in 0..2 {
            ctx.push_column_for_table(projection_table, "UNNEST(vals)", DataType::Int32)
                .unwrap();
        }

        let child = LogicalOperator::ExpressionList(Node::new(
            crate::logical::logical_expression_list::LogicalExpressionList {
                table_ref: table,
                rows: Vec::new(),
            },
            Vec::new(),
        ));
        let plan = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections: vec![unnest(column(table, 0)), unnest(column(table, 0))],
                projection_table,
            },
            vec![child],
        ));

        let err = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap_err();
        assert!(err.to_string().contains("Consider aliasing one of them."));
    }

    #[test]
    fn aliased_duplicate_accepted() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let list_type = DataType::list(DataType::Int32);
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![list_type],
                vec!["vals".to_string()],
            )
            .unwrap();

        let projection_table = ctx.new_ephemeral_table().unwrap();
        ctx.push_column_for_table(projection_table, "UNNEST(vals)", DataType::Int32)
            .unwrap();
        ctx.push_column_for_table(projection_table, "u1", DataType::Int32)
            .unwrap();

        let child = LogicalOperator::ExpressionList(Node::new(
            crate::logical::logical_expression_list::LogicalExpressionList {
                table_ref: table,
                rows: Vec::new(),
            },
            Vec::new(),
        ));
        let plan = LogicalOperator::Project(Node::new(
            LogicalProject {
                projections: vec![unnest(column(table, 0)), unnest(column(table, 0))],
                projection_table,
            },
            vec![child],
        ));

        UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();
    }

    #[test]
    fn unnest_inside_arith_extracts() {
        let mut ctx = BindContext::new();
        let list_type = DataType::list(DataType::Int32);
        let (_, plan) = project_scope(
            &mut ctx,
            vec![list_type.clone(), list_type],
            vec![add(unnest(column(0, 0)), unnest(column(0, 1)))],
        );

        let scope = ctx.root_scope_ref();
        let plan = UnnestPlanner.plan_unnests(&mut ctx, scope, plan).unwrap();

        let nodes = find_unnest_nodes(&plan);
        assert_eq!(1, nodes.len());
        assert_eq!(2, nodes[0].lists.len());
    }

    #[test]
    fn lateral_table_factor_records_correlation() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();
        let list_type = DataType::list(DataType::Int32);
        let table = ctx
            .push_table(
                scope,
                Some("t".to_string()),
                vec![list_type],
                vec!["vals".to_string()],
            )
            .unwrap();

        let bound =
            bind_unnest_table_factor(&mut ctx, scope, column(table, 0), None, false).unwrap();
        let plan = UnnestPlanner
            .plan_unnest_table_factor(&mut ctx, scope, bound, UnnestOptions::default())
            .unwrap();

        assert_eq!(1, count_unnest_nodes(&plan));
        assert_eq!(1, ctx.correlated_columns(scope).unwrap().len());
    }

    #[test]
    fn with_offset_not_supported() {
        let mut ctx = BindContext::new();
        let scope = ctx.root_scope_ref();

        let bound = bind_unnest_table_factor(
            &mut ctx,
            scope,
            lit(ScalarValue::List(vec![ScalarValue::Int32(1)])),
            None,
            true,
        )
        .unwrap();

        let err = UnnestPlanner
            .plan_unnest_table_factor(&mut ctx, scope, bound, UnnestOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("not supported yet"));
        assert_eq!(DbErrorKind::NotImplemented, err.kind());
    }
}
