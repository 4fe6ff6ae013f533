use furldb_error::{DbError, Result};

use crate::arrays::array::null::NullArray;
use crate::arrays::array::primitive::PrimitiveArray;
use crate::arrays::array::varlen::Utf8Array;
use crate::arrays::array::Array;

/// Build a new array by taking values from `arr` at the given indices.
///
/// A `None` index produces a null slot. This is the primitive that row
/// replication and positional null padding are built from.
pub fn take(arr: &Array, indices: &[Option<usize>]) -> Result<Array> {
    for idx in indices.iter().flatten() {
        if *idx >= arr.len() {
            return Err(DbError::new("Take index out of bounds")
                .with_field("idx", idx)
                .with_field("len", arr.len()));
        }
    }

    Ok(match arr {
        Array::Null(_) => Array::Null(NullArray::new(indices.len())),
        Array::Boolean(inner) => Array::Boolean(take_primitive(inner, indices)),
        Array::Int32(inner) => Array::Int32(take_primitive(inner, indices)),
        Array::Int64(inner) => Array::Int64(take_primitive(inner, indices)),
        Array::Float64(inner) => Array::Float64(take_primitive(inner, indices)),
        Array::Utf8(inner) => {
            let vals: Vec<Option<&str>> = indices
                .iter()
                .map(|idx| match idx {
                    Some(idx) if inner.is_valid(*idx).unwrap_or(false) => inner.value(*idx),
                    _ => None,
                })
                .collect();
            Array::Utf8(Utf8Array::from_iter(vals))
        }
        // Nested arrays are rebuilt through scalars. Fine for now, unnest
        // outputs are almost always leaf types.
        Array::List(_) | Array::Struct(_) => {
            let datatype = arr.datatype();
            let scalars = indices
                .iter()
                .map(|idx| match idx {
                    Some(idx) => arr
                        .scalar(*idx)
                        .ok_or_else(|| DbError::new("Take index out of bounds")),
                    None => Ok(crate::arrays::scalar::ScalarValue::Null),
                })
                .collect::<Result<Vec<_>>>()?;
            Array::try_from_scalars(&datatype, scalars)?
        }
    })
}

fn take_primitive<T: Copy + Default>(
    arr: &PrimitiveArray<T>,
    indices: &[Option<usize>],
) -> PrimitiveArray<T> {
    indices
        .iter()
        .map(|idx| match idx {
            Some(idx) if arr.is_valid(*idx).unwrap_or(false) => arr.value(*idx).copied(),
            _ => None,
        })
        .collect()
}
