use crate::arrays::batch::Batch;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

/// Produces a fixed set of rows.
///
/// Backs both expression lists and the single-row input for plans that don't
/// scan anything.
#[derive(Debug)]
pub struct PhysicalValues {
    pub batch: Batch,
}

impl PhysicalValues {
    pub fn new(batch: Batch) -> Self {
        PhysicalValues { batch }
    }
}

impl Explainable for PhysicalValues {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("Values").with_value("num_rows", self.batch.num_rows())
    }
}
