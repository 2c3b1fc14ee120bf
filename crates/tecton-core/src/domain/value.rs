use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};

use crate::{DataType, ResponseError};

/// Decoded feature value, checked against its declared [`DataType`].
///
/// The representation always agrees with the data type; `null` is valid for
/// every data type.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    data_type: DataType,
    repr: Repr,
}

#[derive(Debug, Clone, PartialEq)]
enum Repr {
    Null,
    Int64(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Array(Vec<Value>),
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Decode `raw` strictly against `data_type`.
    ///
    /// The declared type is authoritative: nothing is inferred from the raw
    /// payload, and the first nested failure aborts the whole decode.
    pub fn decode(data_type: &DataType, raw: &JsonValue) -> Result<Self, ResponseError> {
        if raw.is_null() {
            return Ok(Self::null(data_type.clone()));
        }

        let mismatch = || ResponseError::mismatched_type(data_type.wire_name(), raw.to_string());

        let repr = match data_type {
            DataType::Int64 => Repr::Int64(decode_int64(raw).ok_or_else(mismatch)?),
            DataType::Float64 | DataType::Float32 => {
                Repr::Float(decode_float(raw).ok_or_else(mismatch)?)
            }
            DataType::String => Repr::String(raw.as_str().ok_or_else(mismatch)?.to_owned()),
            DataType::Bool => Repr::Bool(raw.as_bool().ok_or_else(mismatch)?),
            DataType::Array(element) => {
                let items = raw.as_array().ok_or_else(mismatch)?;
                Repr::Array(
                    items
                        .iter()
                        .map(|item| Self::decode(element, item))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
            DataType::Struct(fields) => {
                let items = raw.as_array().ok_or_else(mismatch)?;
                if items.len() != fields.len() {
                    return Err(mismatch());
                }
                Repr::Struct(
                    fields
                        .iter()
                        .zip(items)
                        .map(|(field, item)| {
                            Self::decode(&field.data_type, item)
                                .map(|value| (field.name.clone(), value))
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
        };

        Ok(Self {
            data_type: data_type.clone(),
            repr,
        })
    }

    pub fn null(data_type: DataType) -> Self {
        Self {
            data_type,
            repr: Repr::Null,
        }
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn is_null(&self) -> bool {
        matches!(self.repr, Repr::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.repr {
            Repr::Int64(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.repr {
            Repr::Float(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.repr {
            Repr::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.repr {
            Repr::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match &self.repr {
            Repr::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a struct member by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match &self.repr {
            Repr::Struct(fields) => fields
                .iter()
                .find(|(field_name, _)| field_name == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Strip the typed wrappers into plain JSON mirroring the wire shape.
    ///
    /// Struct values become objects in field declaration order. Int64 values
    /// become JSON integers, and non-finite floats become the strings `NaN`,
    /// `Infinity` and `-Infinity`.
    pub fn to_json(&self) -> JsonValue {
        match &self.repr {
            Repr::Null => JsonValue::Null,
            Repr::Int64(value) => JsonValue::from(*value),
            Repr::Float(value) => float_to_json(*value),
            Repr::String(value) => JsonValue::String(value.clone()),
            Repr::Bool(value) => JsonValue::Bool(*value),
            Repr::Array(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Repr::Struct(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

fn decode_int64(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(number) => number.as_i64(),
        JsonValue::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn decode_float(raw: &JsonValue) -> Option<f64> {
    match raw {
        JsonValue::Number(number) => number.as_f64(),
        JsonValue::String(text) => match text.trim() {
            "NaN" | "nan" => Some(f64::NAN),
            "Infinity" | "inf" => Some(f64::INFINITY),
            "-Infinity" | "-inf" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

fn float_to_json(value: f64) -> JsonValue {
    match Number::from_f64(value) {
        Some(number) => JsonValue::Number(number),
        None if value.is_nan() => JsonValue::String(String::from("NaN")),
        None if value.is_sign_positive() => JsonValue::String(String::from("Infinity")),
        None => JsonValue::String(String::from("-Infinity")),
    }
}
