use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use serde_json::Value as JsonValue;

use crate::ResponseError;

/// Server-declared shape of a feature value.
///
/// The variant set is closed: descriptors outside it fail to parse with
/// [`ResponseError::UnknownType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    Int64,
    Float64,
    Float32,
    String,
    Bool,
    Array(Box<DataType>),
    /// Field order matches the positional order of raw struct values.
    Struct(Vec<StructField>),
}

/// Named member of a [`DataType::Struct`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructField {
    pub name: String,
    pub data_type: DataType,
}

impl StructField {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

impl DataType {
    pub fn array(element: DataType) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn structure<I, N>(fields: I) -> Self
    where
        I: IntoIterator<Item = (N, DataType)>,
        N: Into<String>,
    {
        Self::Struct(
            fields
                .into_iter()
                .map(|(name, data_type)| StructField::new(name, data_type))
                .collect(),
        )
    }

    /// Reconstruct a data type from a `{"type": ...}` descriptor.
    pub fn parse(descriptor: &JsonValue) -> Result<Self, ResponseError> {
        let unknown = || ResponseError::unknown_type(descriptor.to_string());

        let object = descriptor.as_object().ok_or_else(unknown)?;
        let tag = object
            .get("type")
            .and_then(JsonValue::as_str)
            .ok_or_else(unknown)?;

        match tag {
            "int64" => Ok(Self::Int64),
            "float64" => Ok(Self::Float64),
            "float32" => Ok(Self::Float32),
            "string" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Bool),
            "array" => {
                let element = object.get("elementType").ok_or_else(unknown)?;
                Ok(Self::array(Self::parse(element)?))
            }
            "struct" => {
                let fields = object
                    .get("fields")
                    .and_then(JsonValue::as_array)
                    .ok_or_else(unknown)?;
                let fields = fields
                    .iter()
                    .map(|field| parse_struct_field(field).unwrap_or_else(|| Err(unknown())))
                    .collect::<Result<Vec<_>, _>>()?;

                // Values are keyed by field name once decoded.
                let mut seen = HashSet::new();
                let unique = fields.iter().all(|field| seen.insert(field.name.as_str()));
                drop(seen);
                if !unique {
                    return Err(unknown());
                }
                Ok(Self::Struct(fields))
            }
            _ => Err(ResponseError::unknown_type(tag)),
        }
    }

    /// Canonical name used in diagnostics; never sent on the wire.
    pub fn wire_name(&self) -> String {
        self.to_string()
    }
}

// The outer Option flags a structurally malformed field; the inner Result
// carries errors from the nested descriptor.
fn parse_struct_field(field: &JsonValue) -> Option<Result<StructField, ResponseError>> {
    let name = field.get("name")?.as_str()?;
    if name.is_empty() {
        return None;
    }
    let data_type = field.get("dataType")?;
    Some(DataType::parse(data_type).map(|data_type| StructField::new(name, data_type)))
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int64 => f.write_str("int64"),
            Self::Float64 => f.write_str("float64"),
            Self::Float32 => f.write_str("float32"),
            Self::String => f.write_str("string"),
            Self::Bool => f.write_str("boolean"),
            Self::Array(element) => write!(f, "array<{element}>"),
            Self::Struct(fields) => {
                f.write_str("struct<")?;
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                f.write_str(">")
            }
        }
    }
}
