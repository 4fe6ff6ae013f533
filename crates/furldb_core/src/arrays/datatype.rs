use std::fmt;

use furldb_error::{DbError, Result};

/// Metadata associated with structs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructTypeMeta {
    pub fields: Vec<(String, DataType)>,
}

impl StructTypeMeta {
    pub fn new<S: Into<String>>(fields: impl IntoIterator<Item = (S, DataType)>) -> Self {
        StructTypeMeta {
            fields: fields
                .into_iter()
                .map(|(name, datatype)| (name.into(), datatype))
                .collect(),
        }
    }
}

/// Metadata associated with lists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListTypeMeta {
    pub datatype: Box<DataType>,
}

impl ListTypeMeta {
    pub fn new(element: DataType) -> Self {
        ListTypeMeta {
            datatype: Box::new(element),
        }
    }
}

/// Supported data types.
///
/// Some types include additional metadata which refines the type even further.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Constant null columns.
    Null,
    Boolean,
    Int32,
    Int64,
    Float64,
    Utf8,
    /// A list of values all of the same type.
    List(ListTypeMeta),
    /// A struct of different types.
    Struct(StructTypeMeta),
}

impl DataType {
    /// Create a list datatype with the given element type.
    pub fn list(element: DataType) -> Self {
        DataType::List(ListTypeMeta::new(element))
    }

    /// Create a struct datatype from fields.
    pub fn struct_type<S: Into<String>>(
        fields: impl IntoIterator<Item = (S, DataType)>,
    ) -> Self {
        DataType::Struct(StructTypeMeta::new(fields))
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, DataType::Null)
    }

    pub const fn is_list(&self) -> bool {
        matches!(self, DataType::List(_))
    }

    pub const fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float64
        )
    }

    /// Get the element type of a list.
    pub fn try_list_element_type(&self) -> Result<&DataType> {
        match self {
            DataType::List(meta) => Ok(meta.datatype.as_ref()),
            other => Err(DbError::new(format!(
                "Expected a list datatype, got {other}"
            ))),
        }
    }

    /// Remove `depth` levels of list nesting from this type.
    ///
    /// Errors if the type holds fewer levels of nesting than requested.
    pub fn try_unwrap_list_levels(&self, depth: usize) -> Result<&DataType> {
        let mut current = self;
        for _ in 0..depth {
            current = current.try_list_element_type()?;
        }
        Ok(current)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int32 => write!(f, "Int32"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::List(meta) => write!(f, "List[{}]", meta.datatype),
            Self::Struct(meta) => {
                write!(
                    f,
                    "Struct {{{}}}",
                    meta.fields
                        .iter()
                        .map(|(name, typ)| format!("{name}: {typ}"))
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}
