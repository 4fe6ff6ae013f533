use std::sync::Arc;

use crate::arrays::bitmap::Bitmap;
use crate::arrays::datatype::{DataType, ListTypeMeta};

use super::Array;

/// Array of variable length lists backed by a single child array.
#[derive(Debug, Clone, PartialEq)]
pub struct ListArray {
    /// Value validities.
    validity: Option<Bitmap>,
    /// Offsets into the child array.
    ///
    /// Length is one more than the number of values held in this array.
    offsets: Vec<usize>,
    /// Child array containing the actual data.
    child: Arc<Array>,
}

impl ListArray {
    pub fn new(child: impl Into<Arc<Array>>, offsets: Vec<usize>, validity: Option<Bitmap>) -> Self {
        debug_assert!(!offsets.is_empty());
        debug_assert_eq!(
            offsets.len() - 1,
            validity
                .as_ref()
                .map(|v| v.len())
                .unwrap_or(offsets.len() - 1)
        );

        ListArray {
            validity,
            offsets,
            child: child.into(),
        }
    }

    /// Produce a list array containing `n` rows with each row being an empty
    /// list.
    pub fn new_empty_with_n_rows(element: DataType, n: usize) -> Self {
        let offsets = vec![0; n + 1];
        let child = Array::new_typed_empty(&element);
        Self::new(child, offsets, None)
    }

    pub fn datatype(&self) -> DataType {
        DataType::List(ListTypeMeta::new(self.child.datatype()))
    }

    pub fn child_array(&self) -> &Arc<Array> {
        &self.child
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Start offset and length of the list value at `idx`.
    ///
    /// This does not take validity into account.
    pub fn value_bounds(&self, idx: usize) -> Option<(usize, usize)> {
        if idx >= self.len() {
            return None;
        }
        let start = self.offsets[idx];
        let end = self.offsets[idx + 1];
        Some((start, end - start))
    }

    pub fn is_valid(&self, idx: usize) -> Option<bool> {
        if idx >= self.len() {
            return None;
        }
        Some(super::is_valid(self.validity.as_ref(), idx))
    }

    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::primitive::Int32Array;

    #[test]
    fn value_bounds() {
        // [[1, 2], [], [3]]
        let child = Array::Int32(Int32Array::from_iter([1, 2, 3]));
        let arr = ListArray::new(child, vec![0, 2, 2, 3], None);

        assert_eq!(3, arr.len());
        assert_eq!(Some((0, 2)), arr.value_bounds(0));
        assert_eq!(Some((2, 0)), arr.value_bounds(1));
        assert_eq!(Some((2, 1)), arr.value_bounds(2));
        assert_eq!(None, arr.value_bounds(3));
    }
}
