pub mod list;
pub mod null;
pub mod primitive;
pub mod struct_array;
pub mod varlen;

use std::sync::Arc;

use furldb_error::{DbError, Result};

use crate::arrays::bitmap::Bitmap;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;

use self::list::ListArray;
use self::null::NullArray;
use self::primitive::{BooleanArray, Float64Array, Int32Array, Int64Array};
use self::struct_array::StructArray;
use self::varlen::Utf8Array;

/// Check validity at an index, treating a missing bitmap as all-valid.
pub(crate) fn is_valid(validity: Option<&Bitmap>, idx: usize) -> bool {
    validity.map(|v| v.value(idx)).unwrap_or(true)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Array {
    Null(NullArray),
    Boolean(BooleanArray),
    Int32(Int32Array),
    Int64(Int64Array),
    Float64(Float64Array),
    Utf8(Utf8Array),
    List(ListArray),
    Struct(StructArray),
}

impl Array {
    /// Create a zero-length array of the given type.
    pub fn new_typed_empty(datatype: &DataType) -> Self {
        match datatype {
            DataType::Null => Array::Null(NullArray::new(0)),
            DataType::Boolean => Array::Boolean(BooleanArray::from(Vec::new())),
            DataType::Int32 => Array::Int32(Int32Array::from(Vec::new())),
            DataType::Int64 => Array::Int64(Int64Array::from(Vec::new())),
            DataType::Float64 => Array::Float64(Float64Array::from(Vec::new())),
            DataType::Utf8 => Array::Utf8(Utf8Array::from_iter(std::iter::empty::<&str>())),
            DataType::List(meta) => Array::List(ListArray::new_empty_with_n_rows(
                meta.datatype.as_ref().clone(),
                0,
            )),
            DataType::Struct(meta) => {
                if meta.fields.is_empty() {
                    return Array::Null(NullArray::new(0));
                }
                let keys = meta.fields.iter().map(|(name, _)| name.clone()).collect();
                let values = meta
                    .fields
                    .iter()
                    .map(|(_, typ)| Arc::new(Array::new_typed_empty(typ)))
                    .collect();
                // Lengths are all zero.
                Array::Struct(
                    StructArray::try_new(keys, values, None)
                        .expect("empty struct fields to have equal lengths"),
                )
            }
        }
    }

    /// Create an array of the given type with every value null.
    pub fn new_typed_null(datatype: &DataType, len: usize) -> Result<Self> {
        let nulls = vec![ScalarValue::Null; len];
        Self::try_from_scalars(datatype, nulls)
    }

    /// Build an array of the given type from scalar values.
    ///
    /// Null scalars are accepted for any type and become null slots.
    pub fn try_from_scalars(
        datatype: &DataType,
        scalars: impl IntoIterator<Item = ScalarValue>,
    ) -> Result<Self> {
        let scalars: Vec<_> = scalars.into_iter().collect();

        fn type_err(datatype: &DataType, got: &ScalarValue) -> DbError {
            DbError::new(format!("Unexpected value for datatype {datatype}: {got}"))
        }

        Ok(match datatype {
            DataType::Null => {
                for scalar in &scalars {
                    if !scalar.is_null() {
                        return Err(type_err(datatype, scalar));
                    }
                }
                Array::Null(NullArray::new(scalars.len()))
            }
            DataType::Boolean => Array::Boolean(
                scalars
                    .iter()
                    .map(|s| match s {
                        ScalarValue::Null => Ok(None),
                        ScalarValue::Boolean(v) => Ok(Some(*v)),
                        other => Err(type_err(datatype, other)),
                    })
                    .collect::<Result<BooleanArray>>()?,
            ),
            DataType::Int32 => Array::Int32(
                scalars
                    .iter()
                    .map(|s| match s {
                        ScalarValue::Null => Ok(None),
                        ScalarValue::Int32(v) => Ok(Some(*v)),
                        other => Err(type_err(datatype, other)),
                    })
                    .collect::<Result<Int32Array>>()?,
            ),
            DataType::Int64 => Array::Int64(
                scalars
                    .iter()
                    .map(|s| match s {
                        ScalarValue::Null => Ok(None),
                        ScalarValue::Int64(v) => Ok(Some(*v)),
                        other => Err(type_err(datatype, other)),
                    })
                    .collect::<Result<Int64Array>>()?,
            ),
            DataType::Float64 => Array::Float64(
                scalars
                    .iter()
                    .map(|s| match s {
                        ScalarValue::Null => Ok(None),
                        ScalarValue::Float64(v) => Ok(Some(*v)),
                        other => Err(type_err(datatype, other)),
                    })
                    .collect::<Result<Float64Array>>()?,
            ),
            DataType::Utf8 => {
                let opts = scalars
                    .iter()
                    .map(|s| match s {
                        ScalarValue::Null => Ok(None),
                        ScalarValue::Utf8(v) => Ok(Some(v.as_str())),
                        other => Err(type_err(datatype, other)),
                    })
                    .collect::<Result<Vec<_>>>()?;
                Array::Utf8(Utf8Array::from_iter(opts))
            }
            DataType::List(meta) => {
                let mut validity = Bitmap::with_capacity(scalars.len());
                let mut offsets = vec![0];
                let mut child_scalars = Vec::new();

                for scalar in scalars {
                    match scalar {
                        ScalarValue::Null => validity.push(false),
                        ScalarValue::List(vals) => {
                            validity.push(true);
                            child_scalars.extend(vals);
                        }
                        other => return Err(type_err(datatype, &other)),
                    }
                    offsets.push(child_scalars.len());
                }

                let child = Array::try_from_scalars(meta.datatype.as_ref(), child_scalars)?;
                let validity = if validity.is_all_true() {
                    None
                } else {
                    Some(validity)
                };

                Array::List(ListArray::new(child, offsets, validity))
            }
            DataType::Struct(meta) => {
                let mut validity = Bitmap::with_capacity(scalars.len());
                let mut field_scalars: Vec<Vec<ScalarValue>> =
                    vec![Vec::with_capacity(scalars.len()); meta.fields.len()];

                for scalar in scalars {
                    match scalar {
                        ScalarValue::Null => {
                            validity.push(false);
                            for field in field_scalars.iter_mut() {
                                field.push(ScalarValue::Null);
                            }
                        }
                        ScalarValue::Struct(fields) => {
                            if fields.len() != meta.fields.len() {
                                return Err(DbError::new(
                                    "Struct value has wrong number of fields",
                                )
                                .with_field("expected", meta.fields.len())
                                .with_field("got", fields.len()));
                            }
                            validity.push(true);
                            for (idx, (_name, val)) in fields.into_iter().enumerate() {
                                field_scalars[idx].push(val);
                            }
                        }
                        other => return Err(type_err(datatype, &other)),
                    }
                }

                let keys = meta.fields.iter().map(|(name, _)| name.clone()).collect();
                let values = meta
                    .fields
                    .iter()
                    .zip(field_scalars)
                    .map(|((_, typ), vals)| Ok(Arc::new(Array::try_from_scalars(typ, vals)?)))
                    .collect::<Result<Vec<_>>>()?;
                let validity = if validity.is_all_true() {
                    None
                } else {
                    Some(validity)
                };

                Array::Struct(StructArray::try_new(keys, values, validity)?)
            }
        })
    }

    pub fn datatype(&self) -> DataType {
        match self {
            Self::Null(_) => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::List(arr) => arr.datatype(),
            Self::Struct(arr) => arr.datatype(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Null(arr) => arr.len(),
            Self::Boolean(arr) => arr.len(),
            Self::Int32(arr) => arr.len(),
            Self::Int64(arr) => arr.len(),
            Self::Float64(arr) => arr.len(),
            Self::Utf8(arr) => arr.len(),
            Self::List(arr) => arr.len(),
            Self::Struct(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, idx: usize) -> Option<bool> {
        match self {
            Self::Null(arr) => arr.is_valid(idx),
            Self::Boolean(arr) => arr.is_valid(idx),
            Self::Int32(arr) => arr.is_valid(idx),
            Self::Int64(arr) => arr.is_valid(idx),
            Self::Float64(arr) => arr.is_valid(idx),
            Self::Utf8(arr) => arr.is_valid(idx),
            Self::List(arr) => arr.is_valid(idx),
            Self::Struct(arr) => arr.is_valid(idx),
        }
    }

    /// Get the logical value at an index, taking validity into account.
    ///
    /// Returns None if the index is out of bounds.
    pub fn scalar(&self, idx: usize) -> Option<ScalarValue> {
        if idx >= self.len() {
            return None;
        }
        if !self.is_valid(idx)? {
            return Some(ScalarValue::Null);
        }

        Some(match self {
            Self::Null(_) => ScalarValue::Null,
            Self::Boolean(arr) => ScalarValue::Boolean(*arr.value(idx)?),
            Self::Int32(arr) => ScalarValue::Int32(*arr.value(idx)?),
            Self::Int64(arr) => ScalarValue::Int64(*arr.value(idx)?),
            Self::Float64(arr) => ScalarValue::Float64(*arr.value(idx)?),
            Self::Utf8(arr) => ScalarValue::Utf8(arr.value(idx)?.to_string()),
            Self::List(arr) => {
                let (start, len) = arr.value_bounds(idx)?;
                let vals = (start..start + len)
                    .map(|child_idx| arr.child_array().scalar(child_idx))
                    .collect::<Option<Vec<_>>>()?;
                ScalarValue::List(vals)
            }
            Self::Struct(arr) => {
                let fields = arr
                    .fields()
                    .iter()
                    .map(|(name, field)| Some((name.clone(), field.scalar(idx)?)))
                    .collect::<Option<Vec<_>>>()?;
                ScalarValue::Struct(fields)
            }
        })
    }

    pub fn try_as_list(&self) -> Result<&ListArray> {
        match self {
            Self::List(arr) => Ok(arr),
            other => Err(DbError::new(format!(
                "Expected a list array, got {}",
                other.datatype()
            ))),
        }
    }

    pub fn try_as_struct(&self) -> Result<&StructArray> {
        match self {
            Self::Struct(arr) => Ok(arr),
            other => Err(DbError::new(format!(
                "Expected a struct array, got {}",
                other.datatype()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_scalars_nested_list() {
        // [[1, 2], NULL, []]
        let datatype = DataType::list(DataType::Int32);
        let arr = Array::try_from_scalars(
            &datatype,
            [
                ScalarValue::List(vec![ScalarValue::Int32(1), ScalarValue::Int32(2)]),
                ScalarValue::Null,
                ScalarValue::List(Vec::new()),
            ],
        )
        .unwrap();

        assert_eq!(3, arr.len());
        assert_eq!(datatype, arr.datatype());
        assert_eq!(
            Some(ScalarValue::List(vec![
                ScalarValue::Int32(1),
                ScalarValue::Int32(2)
            ])),
            arr.scalar(0)
        );
        assert_eq!(Some(ScalarValue::Null), arr.scalar(1));
        assert_eq!(Some(ScalarValue::List(Vec::new())), arr.scalar(2));

        let inner = arr.try_as_list().unwrap();
        assert_eq!(&[0, 2, 2, 2], inner.offsets());
        assert_eq!(Some(false), inner.is_valid(1));
    }

    #[test]
    fn from_scalars_struct_with_null_row() {
        let datatype = DataType::struct_type([("x", DataType::Int32), ("y", DataType::Int32)]);
        let arr = Array::try_from_scalars(
            &datatype,
            [
                ScalarValue::Struct(vec![
                    ("x".to_string(), ScalarValue::Int32(4)),
                    ("y".to_string(), ScalarValue::Int32(-7)),
                ]),
                ScalarValue::Null,
            ],
        )
        .unwrap();

        assert_eq!(2, arr.len());
        assert_eq!(Some(false), arr.is_valid(1));

        let inner = arr.try_as_struct().unwrap();
        assert_eq!(2, inner.num_fields());
        assert_eq!(
            Some(ScalarValue::Int32(4)),
            inner.array_for_key("x").unwrap().scalar(0)
        );
    }

    #[test]
    fn typed_null_round_trips() {
        let datatype = DataType::list(DataType::Int32);
        let arr = Array::new_typed_null(&datatype, 2).unwrap();

        assert_eq!(2, arr.len());
        assert_eq!(Some(false), arr.is_valid(0));
        assert_eq!(datatype, arr.datatype());
    }

    #[test]
    fn scalar_type_mismatch_errors() {
        Array::try_from_scalars(&DataType::Int32, [ScalarValue::Utf8("a".to_string())])
            .unwrap_err();
    }
}
