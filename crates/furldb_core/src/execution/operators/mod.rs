pub mod nested_loop_join;
pub mod project;
pub mod unnest;
pub mod values;

use furldb_error::{DbError, Result};

use self::nested_loop_join::PhysicalNestedLoopJoin;
use self::project::PhysicalProject;
use self::unnest::PhysicalUnnest;
use self::values::PhysicalValues;
use crate::arrays::batch::Batch;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

#[derive(Debug)]
pub enum PhysicalOperator {
    Values(PhysicalValues),
    Project(PhysicalProject),
    Unnest(PhysicalUnnest),
    NestedLoopJoin(PhysicalNestedLoopJoin),
}

impl Explainable for PhysicalOperator {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            Self::Values(op) => op.explain_entry(conf),
            Self::Project(op) => op.explain_entry(conf),
            Self::Unnest(op) => op.explain_entry(conf),
            Self::NestedLoopJoin(op) => op.explain_entry(conf),
        }
    }
}

/// A tree of physical operators.
///
/// Operators are stateless batch transformers. Partitioning and scheduling
/// batches across threads is the surrounding engine's concern, execution here
/// just pulls child output batch by batch.
#[derive(Debug)]
pub struct PhysicalPlan {
    pub operator: PhysicalOperator,
    pub children: Vec<PhysicalPlan>,
}

impl PhysicalPlan {
    pub fn new(operator: PhysicalOperator, children: Vec<PhysicalPlan>) -> Self {
        PhysicalPlan { operator, children }
    }

    /// Execute the plan, materializing all output batches.
    pub fn execute(&self) -> Result<Vec<Batch>> {
        match &self.operator {
            PhysicalOperator::Values(op) => {
                self.check_children(0)?;
                Ok(vec![op.batch.clone()])
            }
            PhysicalOperator::Project(op) => {
                self.check_children(1)?;
                let inputs = self.children[0].execute()?;
                inputs.iter().map(|batch| op.execute(batch)).collect()
            }
            PhysicalOperator::Unnest(op) => {
                self.check_children(1)?;
                let inputs = self.children[0].execute()?;
                inputs.iter().map(|batch| op.execute(batch)).collect()
            }
            PhysicalOperator::NestedLoopJoin(op) => {
                self.check_children(2)?;
                let left = self.children[0].execute()?;
                let right = self.children[1].execute()?;

                let mut outputs = Vec::new();
                for left_batch in &left {
                    for right_batch in &right {
                        outputs.push(op.execute(left_batch, right_batch)?);
                    }
                }
                Ok(outputs)
            }
        }
    }

    fn check_children(&self, expected: usize) -> Result<()> {
        if self.children.len() != expected {
            return Err(DbError::internal(format!(
                "Expected {expected} children for physical operator, have {}",
                self.children.len()
            )));
        }
        Ok(())
    }
}
