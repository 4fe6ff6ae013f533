use furldb_error::Result;

use crate::arrays::batch::Batch;
use crate::arrays::compute::take::take;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalScalarExpression;

/// Joins two inputs by producing the full cartesian product, optionally
/// filtered by a condition.
#[derive(Debug)]
pub struct PhysicalNestedLoopJoin {
    /// Condition evaluated against the crossed rows. None for a plain cross
    /// join.
    pub condition: Option<PhysicalScalarExpression>,
}

impl PhysicalNestedLoopJoin {
    pub fn execute(&self, left: &Batch, right: &Batch) -> Result<Batch> {
        let total = left.num_rows() * right.num_rows();

        let mut left_indices = Vec::with_capacity(total);
        let mut right_indices = Vec::with_capacity(total);
        for l in 0..left.num_rows() {
            for r in 0..right.num_rows() {
                left_indices.push(Some(l));
                right_indices.push(Some(r));
            }
        }

        let mut cols = Vec::with_capacity(left.num_columns() + right.num_columns());
        for col in left.columns() {
            cols.push(take(col, &left_indices)?);
        }
        for col in right.columns() {
            cols.push(take(col, &right_indices)?);
        }

        let crossed = if cols.is_empty() {
            Batch::empty_with_num_rows(total)
        } else {
            Batch::try_new(cols)?
        };

        match &self.condition {
            None => Ok(crossed),
            Some(condition) => {
                let selection = condition.eval(&crossed)?;
                let selected: Vec<_> = (0..crossed.num_rows())
                    .filter_map(|idx| match selection.scalar(idx) {
                        Some(crate::arrays::scalar::ScalarValue::Boolean(true)) => {
                            Some(Some(idx))
                        }
                        _ => None,
                    })
                    .collect();

                let cols = crossed
                    .columns()
                    .iter()
                    .map(|col| take(col, &selected))
                    .collect::<Result<Vec<_>>>()?;
                if cols.is_empty() {
                    return Ok(Batch::empty_with_num_rows(selected.len()));
                }
                Batch::try_new(cols)
            }
        }
    }
}

impl Explainable for PhysicalNestedLoopJoin {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new("NestedLoopJoin");
        if let Some(condition) = &self.condition {
            ent = ent.with_value("condition", condition);
        }
        ent
    }
}
