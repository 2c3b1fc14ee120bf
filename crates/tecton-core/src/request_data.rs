//! Validation and normalization of join keys and request context values.
//!
//! Callers hand over loosely-typed JSON values; this module checks them
//! against the types each map accepts and normalizes them into the wire form:
//!
//! | Map | Accepted | Normalized to |
//! |-----|----------|---------------|
//! | Join key map | int, string, null | string or null |
//! | Request context map | int, string, float | string or float |
//!
//! Integers always become their decimal string so int64 values survive the
//! trip through JSON without precision loss.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::ClientError;

/// Identifies which request map a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    JoinKey,
    RequestContext,
}

impl MapKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JoinKey => "join key map",
            Self::RequestContext => "request context map",
        }
    }

    pub const fn allowed_types(self) -> &'static str {
        match self {
            Self::JoinKey => "int, string, null",
            Self::RequestContext => "int, string, float",
        }
    }
}

impl Display for MapKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized request context value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestContextValue {
    String(String),
    Float(f64),
}

/// Validated request parameters for a get-features call.
///
/// At least one of the two maps is non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct GetFeatureRequestData {
    join_key_map: BTreeMap<String, Option<String>>,
    request_context_map: BTreeMap<String, RequestContextValue>,
}

impl GetFeatureRequestData {
    /// Validate and normalize the caller's maps.
    ///
    /// # Errors
    ///
    /// - [`ClientError::EmptyMaps`] when both maps are absent or empty
    /// - [`ClientError::EmptyKey`] for an empty key
    /// - [`ClientError::UnsupportedValueType`] for a value outside the map's accepted types
    /// - [`ClientError::EmptyValue`] for `null` in the request context map, or an
    ///   empty string in either map
    pub fn new(
        join_key_map: Option<Map<String, JsonValue>>,
        request_context_map: Option<Map<String, JsonValue>>,
    ) -> Result<Self, ClientError> {
        let join_key_map = join_key_map.unwrap_or_default();
        let request_context_map = request_context_map.unwrap_or_default();

        if join_key_map.is_empty() && request_context_map.is_empty() {
            return Err(ClientError::EmptyMaps);
        }

        let join_key_map = join_key_map
            .into_iter()
            .map(|(key, value)| {
                let value = normalize_join_key(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<BTreeMap<_, _>, ClientError>>()?;

        let request_context_map = request_context_map
            .into_iter()
            .map(|(key, value)| {
                let value = normalize_request_context(&key, value)?;
                Ok((key, value))
            })
            .collect::<Result<BTreeMap<_, _>, ClientError>>()?;

        Ok(Self {
            join_key_map,
            request_context_map,
        })
    }

    pub fn builder() -> GetFeatureRequestDataBuilder {
        GetFeatureRequestDataBuilder::default()
    }

    pub fn join_key_map(&self) -> &BTreeMap<String, Option<String>> {
        &self.join_key_map
    }

    pub fn request_context_map(&self) -> &BTreeMap<String, RequestContextValue> {
        &self.request_context_map
    }
}

/// Accumulates raw entries and validates them in [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct GetFeatureRequestDataBuilder {
    join_key_map: Option<Map<String, JsonValue>>,
    request_context_map: Option<Map<String, JsonValue>>,
}

impl GetFeatureRequestDataBuilder {
    pub fn join_key(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.join_key_map
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn request_context(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.request_context_map
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<GetFeatureRequestData, ClientError> {
        GetFeatureRequestData::new(self.join_key_map, self.request_context_map)
    }
}

fn normalize_join_key(key: &str, value: JsonValue) -> Result<Option<String>, ClientError> {
    let map = MapKind::JoinKey;
    check_key(map, key, &value)?;

    match value {
        JsonValue::Null => Ok(None),
        // Empty strings are rejected even though null is allowed.
        JsonValue::String(text) => non_empty(map, key, text).map(Some),
        JsonValue::Number(ref number) if is_integer(number) => Ok(Some(number.to_string())),
        other => Err(unsupported(map, key, &other)),
    }
}

fn normalize_request_context(
    key: &str,
    value: JsonValue,
) -> Result<RequestContextValue, ClientError> {
    let map = MapKind::RequestContext;
    check_key(map, key, &value)?;

    match value {
        JsonValue::Null => Err(ClientError::EmptyValue {
            map,
            key: key.to_owned(),
            value: "null",
        }),
        JsonValue::String(text) => non_empty(map, key, text).map(RequestContextValue::String),
        JsonValue::Number(ref number) if is_integer(number) => {
            Ok(RequestContextValue::String(number.to_string()))
        }
        JsonValue::Number(ref number) => number
            .as_f64()
            .map(RequestContextValue::Float)
            .ok_or_else(|| unsupported(map, key, &value)),
        other => Err(unsupported(map, key, &other)),
    }
}

fn check_key(map: MapKind, key: &str, value: &JsonValue) -> Result<(), ClientError> {
    if key.is_empty() {
        return Err(ClientError::EmptyKey {
            map,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn non_empty(map: MapKind, key: &str, text: String) -> Result<String, ClientError> {
    if text.is_empty() {
        return Err(ClientError::EmptyValue {
            map,
            key: key.to_owned(),
            value: "an empty string",
        });
    }
    Ok(text)
}

fn unsupported(map: MapKind, key: &str, value: &JsonValue) -> ClientError {
    ClientError::UnsupportedValueType {
        map,
        allowed: map.allowed_types(),
        key: key.to_owned(),
        value: value.to_string(),
        actual: json_type_name(value),
    }
}

fn is_integer(number: &serde_json::Number) -> bool {
    number.is_i64() || number.is_u64()
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(number) if is_integer(number) => "int",
        JsonValue::Number(_) => "float",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
