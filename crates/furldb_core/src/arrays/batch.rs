use furldb_error::{DbError, Result};

use crate::arrays::array::Array;

/// A batch of same-length arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Columns that make up this batch.
    cols: Vec<Array>,
    /// Number of rows in this batch. Needed to allow for a batch that has no
    /// columns but a non-zero number of rows.
    num_rows: usize,
}

impl Batch {
    pub const fn empty() -> Self {
        Batch {
            cols: Vec::new(),
            num_rows: 0,
        }
    }

    pub fn empty_with_num_rows(num_rows: usize) -> Self {
        Batch {
            cols: Vec::new(),
            num_rows,
        }
    }

    /// Create a new batch from some number of arrays.
    ///
    /// All arrays must have the same length.
    pub fn try_new(cols: impl IntoIterator<Item = Array>) -> Result<Self> {
        let cols: Vec<_> = cols.into_iter().collect();
        let len = match cols.first() {
            Some(arr) => arr.len(),
            None => return Ok(Self::empty()),
        };

        for (idx, col) in cols.iter().enumerate() {
            if col.len() != len {
                return Err(DbError::new(format!(
                    "Expected column length to be {len}, got {}",
                    col.len()
                ))
                .with_field("column_idx", idx));
            }
        }

        Ok(Batch {
            cols,
            num_rows: len,
        })
    }

    pub fn column(&self, idx: usize) -> Option<&Array> {
        self.cols.get(idx)
    }

    pub fn columns(&self) -> &[Array] {
        &self.cols
    }

    pub fn num_columns(&self) -> usize {
        self.cols.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::primitive::Int32Array;

    #[test]
    fn mismatched_lengths_errors() {
        let a = Array::Int32(Int32Array::from_iter([1, 2]));
        let b = Array::Int32(Int32Array::from_iter([1]));

        Batch::try_new([a, b]).unwrap_err();
    }
}
