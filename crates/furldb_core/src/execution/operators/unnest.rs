use furldb_error::{DbError, Result};

use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::compute::take::take;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalScalarExpression;

#[derive(Debug)]
pub struct PhysicalListUnnest {
    pub expr: PhysicalScalarExpression,
    /// Number of list nesting levels removed in one pass.
    pub depth: usize,
}

#[derive(Debug)]
pub struct PhysicalStructUnnest {
    pub expr: PhysicalScalarExpression,
    /// Number of output columns this struct flattens into.
    pub num_fields: usize,
}

/// Flattens list and struct values into replicated rows.
///
/// Each input row produces an expansion count of output rows: the max element
/// count across list columns (a null list counts as zero), or one if only
/// struct columns are present. A row whose expansion count is zero produces
/// no output rows at all.
///
/// Sibling list columns are zipped by position. A column shorter than the
/// row's expansion is padded with nulls, never repeated or crossed.
///
/// Stateless between batches, one input batch produces exactly one output
/// batch.
#[derive(Debug)]
pub struct PhysicalUnnest {
    /// Columns passed through, replicated per expansion.
    pub project_expressions: Vec<PhysicalScalarExpression>,
    pub list_expressions: Vec<PhysicalListUnnest>,
    pub struct_expressions: Vec<PhysicalStructUnnest>,
}

impl PhysicalUnnest {
    pub fn execute(&self, batch: &Batch) -> Result<Batch> {
        let project_inputs = self
            .project_expressions
            .iter()
            .map(|expr| expr.eval(batch))
            .collect::<Result<Vec<_>>>()?;
        let list_inputs = self
            .list_expressions
            .iter()
            .map(|list| Ok((list.expr.eval(batch)?, list.depth)))
            .collect::<Result<Vec<_>>>()?;
        let struct_inputs = self
            .struct_expressions
            .iter()
            .map(|s| s.expr.eval(batch))
            .collect::<Result<Vec<_>>>()?;

        let num_rows = batch.num_rows();

        // Expansion count per input row.
        let mut expansions = Vec::with_capacity(num_rows);
        for row in 0..num_rows {
            let count = if list_inputs.is_empty() {
                // Struct flattening never multiplies rows.
                1
            } else {
                let mut longest = 0;
                for (arr, depth) in &list_inputs {
                    longest = longest.max(list_value_count(arr, row, *depth)?);
                }
                longest
            };
            expansions.push(count);
        }
        let total: usize = expansions.iter().sum();

        let mut outputs =
            Vec::with_capacity(project_inputs.len() + list_inputs.len() + struct_inputs.len());

        // Pass-through columns replicate their row value for every expansion
        // index.
        let mut replicate = Vec::with_capacity(total);
        for (row, &count) in expansions.iter().enumerate() {
            replicate.extend(std::iter::repeat_n(Some(row), count));
        }
        for input in &project_inputs {
            outputs.push(take(input, &replicate)?);
        }

        // List columns contribute their i-th element per expansion index,
        // null-padded past their own length.
        for (arr, depth) in &list_inputs {
            let mut indices = Vec::with_capacity(total);
            for (row, &count) in expansions.iter().enumerate() {
                let start = indices.len();
                gather_leaf_indices(arr, row, *depth, &mut indices)?;
                let produced = indices.len() - start;
                debug_assert!(produced <= count);
                indices.extend(std::iter::repeat_n(None, count - produced));
            }

            let leaf = leaf_array(arr, *depth)?;
            outputs.push(take(leaf, &indices)?);
        }

        // Struct columns unpack into one output column per field, identical
        // for every expansion index of a row. A null struct yields all-null
        // fields.
        for (target, arr) in self.struct_expressions.iter().zip(&struct_inputs) {
            match arr {
                Array::Struct(structs) => {
                    let mut indices = Vec::with_capacity(total);
                    for (row, &count) in expansions.iter().enumerate() {
                        let idx = if structs.is_valid(row).unwrap_or(false) {
                            Some(row)
                        } else {
                            None
                        };
                        indices.extend(std::iter::repeat_n(idx, count));
                    }
                    for (_name, field) in structs.fields() {
                        outputs.push(take(field, &indices)?);
                    }
                }
                Array::Null(_) => {
                    for _ in 0..target.num_fields {
                        outputs.push(Array::Null(crate::arrays::array::null::NullArray::new(
                            total,
                        )));
                    }
                }
                other => {
                    return Err(DbError::execution(format!(
                        "Expected struct array for unnest, got {}",
                        other.datatype()
                    )))
                }
            }
        }

        Batch::try_new(outputs)
    }
}

impl Explainable for PhysicalUnnest {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Unnest")
            .with_values("project_expressions", &self.project_expressions)
            .with_values(
                "list_expressions",
                self.list_expressions
                    .iter()
                    .map(|list| format!("{} (depth = {})", list.expr, list.depth)),
            )
            .with_values(
                "struct_expressions",
                self.struct_expressions.iter().map(|s| s.expr.to_string()),
            )
    }
}

/// Number of output rows the list value at `row` produces when unnested
/// `depth` levels.
///
/// A null list value counts as zero at every level.
fn list_value_count(arr: &Array, row: usize, depth: usize) -> Result<usize> {
    match arr {
        Array::Null(_) => Ok(0),
        Array::List(list) => {
            if !list.is_valid(row).unwrap_or(false) {
                return Ok(0);
            }
            let (start, len) = list
                .value_bounds(row)
                .ok_or_else(|| DbError::execution("List row out of bounds"))?;

            if depth == 1 {
                return Ok(len);
            }

            let child = list.child_array();
            let mut count = 0;
            for idx in start..start + len {
                count += list_value_count(child, idx, depth - 1)?;
            }
            Ok(count)
        }
        other => Err(DbError::execution(format!(
            "Expected list array for unnest, got {}",
            other.datatype()
        ))),
    }
}

/// Collect indexes into the depth-level child array for the leaf elements of
/// the list value at `row`.
fn gather_leaf_indices(
    arr: &Array,
    row: usize,
    depth: usize,
    out: &mut Vec<Option<usize>>,
) -> Result<()> {
    match arr {
        Array::Null(_) => Ok(()),
        Array::List(list) => {
            if !list.is_valid(row).unwrap_or(false) {
                return Ok(());
            }
            let (start, len) = list
                .value_bounds(row)
                .ok_or_else(|| DbError::execution("List row out of bounds"))?;

            if depth == 1 {
                out.extend((start..start + len).map(Some));
                return Ok(());
            }

            let child = list.child_array();
            for idx in start..start + len {
                gather_leaf_indices(child, idx, depth - 1, out)?;
            }
            Ok(())
        }
        other => Err(DbError::execution(format!(
            "Expected list array for unnest, got {}",
            other.datatype()
        ))),
    }
}

/// Descend `depth` levels of list nesting to the array leaf values index
/// into.
fn leaf_array(arr: &Array, depth: usize) -> Result<&Array> {
    let mut current = arr;
    for _ in 0..depth {
        match current {
            Array::List(list) => current = list.child_array().as_ref(),
            Array::Null(_) => return Ok(current),
            other => {
                return Err(DbError::execution(format!(
                    "Expected list array for unnest, got {}",
                    other.datatype()
                )))
            }
        }
    }
    Ok(current)
}
