use std::sync::Arc;

use furldb_error::{DbError, Result};

use crate::arrays::bitmap::Bitmap;
use crate::arrays::datatype::{DataType, StructTypeMeta};

use super::Array;

/// Array of composite values, one child array per field.
#[derive(Debug, Clone, PartialEq)]
pub struct StructArray {
    validity: Option<Bitmap>,
    arrays: Vec<(String, Arc<Array>)>,
}

impl StructArray {
    pub fn try_new(
        keys: Vec<String>,
        values: Vec<Arc<Array>>,
        validity: Option<Bitmap>,
    ) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(DbError::new(format!(
                "Received {} keys for struct, but {} values",
                keys.len(),
                values.len()
            )));
        }
        if values.is_empty() {
            return Err(DbError::new("Struct array requires at least one field"));
        }

        let len = values[0].len();
        for value in &values {
            if value.len() != len {
                return Err(DbError::new("Struct field arrays have different lengths")
                    .with_field("expected", len)
                    .with_field("got", value.len()));
            }
        }

        let arrays = keys.into_iter().zip(values).collect();

        Ok(StructArray { validity, arrays })
    }

    pub fn len(&self) -> usize {
        self.arrays[0].1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_fields(&self) -> usize {
        self.arrays.len()
    }

    pub fn is_valid(&self, idx: usize) -> Option<bool> {
        if idx >= self.len() {
            return None;
        }
        Some(super::is_valid(self.validity.as_ref(), idx))
    }

    pub fn datatype(&self) -> DataType {
        DataType::Struct(StructTypeMeta::new(
            self.arrays
                .iter()
                .map(|(key, arr)| (key.clone(), arr.datatype())),
        ))
    }

    pub fn fields(&self) -> &[(String, Arc<Array>)] {
        &self.arrays
    }

    pub fn array_for_key(&self, key: &str) -> Option<&Arc<Array>> {
        self.arrays
            .iter()
            .find(|(k, _arr)| k == key)
            .map(|(_, arr)| arr)
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
    fn mismatched_lengths_errors() {
        let a = Arc::new(Array::Int32(Int32Array::from_iter([1, 2])));
        let b = Arc::new(Array::Int32(Int32Array::from_iter([1])));

        StructArray::try_new(vec!["a".to_string(), "b".to_string()], vec![a, b], None)
            .unwrap_err();
    }
}
