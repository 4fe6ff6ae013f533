use furldb_error::Result;

use crate::arrays::batch::Batch;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::physical::PhysicalScalarExpression;

/// Stateless projection over input batches.
#[derive(Debug)]
pub struct PhysicalProject {
    pub expressions: Vec<PhysicalScalarExpression>,
}

impl PhysicalProject {
    pub fn execute(&self, batch: &Batch) -> Result<Batch> {
        if self.expressions.is_empty() {
            return Ok(Batch::empty_with_num_rows(batch.num_rows()));
        }

        let outputs = self
            .expressions
            .iter()
            .map(|expr| expr.eval(batch))
            .collect::<Result<Vec<_>>>()?;

        Batch::try_new(outputs)
    }
}

impl Explainable for PhysicalProject {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Project").with_values("projections", &self.expressions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::primitive::Int32Array;
    use crate::arrays::array::Array;
    use crate::arrays::scalar::ScalarValue;
    use crate::expr::physical::PhysicalColumnExpr;

    #[test]
    fn project_selects_columns() {
        let batch = Batch::try_new([
            Array::Int32(Int32Array::from_iter([1, 2])),
            Array::Int32(Int32Array::from_iter([10, 20])),
        ])
        .unwrap();

        let project = PhysicalProject {
            expressions: vec![PhysicalScalarExpression::Column(PhysicalColumnExpr {
                idx: 1,
            })],
        };

        let out = project.execute(&batch).unwrap();
        assert_eq!(1, out.num_columns());
        assert_eq!(Some(ScalarValue::Int32(20)), out.column(0).unwrap().scalar(1));
    }
}
