use std::fmt;
use std::hash::{Hash, Hasher};

use crate::arrays::datatype::{DataType, ListTypeMeta, StructTypeMeta};

/// A single scalar value.
#[derive(Debug, Clone)]
pub enum ScalarValue {
    /// Represents `DataType::Null` (castable to/from any other type).
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// A list of values all of the same type.
    List(Vec<ScalarValue>),
    /// Named field values.
    Struct(Vec<(String, ScalarValue)>),
}

impl ScalarValue {
    pub fn datatype(&self) -> DataType {
        match self {
            ScalarValue::Null => DataType::Null,
            ScalarValue::Boolean(_) => DataType::Boolean,
            ScalarValue::Int32(_) => DataType::Int32,
            ScalarValue::Int64(_) => DataType::Int64,
            ScalarValue::Float64(_) => DataType::Float64,
            ScalarValue::Utf8(_) => DataType::Utf8,
            ScalarValue::List(vals) => {
                // Element type from the first non-null value. A list of only
                // nulls (or an empty list) has a null element type.
                let element = vals
                    .iter()
                    .find(|v| !matches!(v, ScalarValue::Null))
                    .map(|v| v.datatype())
                    .unwrap_or(DataType::Null);
                DataType::List(ListTypeMeta::new(element))
            }
            ScalarValue::Struct(fields) => DataType::Struct(StructTypeMeta::new(
                fields
                    .iter()
                    .map(|(name, val)| (name.clone(), val.datatype())),
            )),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            // Bit equality, values used as plan-time keys need to be total.
            (Self::Float64(a), Self::Float64(b)) => a.to_bits() == b.to_bits(),
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Struct(a), Self::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Boolean(v) => v.hash(state),
            Self::Int32(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.to_bits().hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::List(v) => v.hash(state),
            Self::Struct(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "{v}"),
            Self::List(vals) => {
                write!(f, "[")?;
                for (idx, val) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{val}")?;
                }
                write!(f, "]")
            }
            Self::Struct(fields) => {
                write!(f, "{{")?;
                for (idx, (name, val)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {val}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Int32(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => ScalarValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_datatype_from_first_non_null() {
        let val = ScalarValue::List(vec![
            ScalarValue::Null,
            ScalarValue::Int32(2),
            ScalarValue::Int32(3),
        ]);
        assert_eq!(DataType::list(DataType::Int32), val.datatype());

        let empty = ScalarValue::List(Vec::new());
        assert_eq!(DataType::list(DataType::Null), empty.datatype());
    }

    #[test]
    fn struct_datatype_keeps_field_names() {
        let val = ScalarValue::Struct(vec![
            ("x".to_string(), ScalarValue::Int32(4)),
            ("y".to_string(), ScalarValue::Utf8("a".to_string())),
        ]);
        assert_eq!(
            DataType::struct_type([("x", DataType::Int32), ("y", DataType::Utf8)]),
            val.datatype()
        );
    }

    #[test]
    fn display() {
        let val = ScalarValue::List(vec![ScalarValue::Int32(1), ScalarValue::Null]);
        assert_eq!("[1, NULL]", val.to_string());
    }
}
