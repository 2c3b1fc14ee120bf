//! Response assembly.
//!
//! The server returns feature values as a positional array and describes them
//! in a parallel metadata array. Assembly zips the two, parses every declared
//! [`DataType`], and decodes each raw value against it. A response is either
//! decoded completely or rejected; there is no partial result.

use std::collections::HashSet;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value as JsonValue;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use crate::{DataType, ResponseError, Value};

/// Serving status reported per feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureStatus {
    Present,
    MissingData,
    CachedPresent,
    CachedMissing,
    CachedUnknown,
    /// A status this client does not know, preserved verbatim.
    Other(String),
}

impl FeatureStatus {
    pub fn parse(input: &str) -> Self {
        match input {
            "PRESENT" => Self::Present,
            "MISSING_DATA" => Self::MissingData,
            "CACHED_PRESENT" => Self::CachedPresent,
            "CACHED_MISSING" => Self::CachedMissing,
            "CACHED_UNKNOWN" => Self::CachedUnknown,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Present => "PRESENT",
            Self::MissingData => "MISSING_DATA",
            Self::CachedPresent => "CACHED_PRESENT",
            Self::CachedMissing => "CACHED_MISSING",
            Self::CachedUnknown => "CACHED_UNKNOWN",
            Self::Other(value) => value,
        }
    }
}

impl Serialize for FeatureStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

/// Server timing information, present when `SloInfo` metadata was requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_eligible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slo_server_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_time_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_max_latency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_response_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamodb_response_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slo_ineligibility_reasons: Vec<String>,
}

/// One decoded feature of a get-features response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureValue {
    name: String,
    #[serde(serialize_with = "serialize_data_type")]
    data_type: DataType,
    value: Value,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    effective_time: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<FeatureStatus>,
}

impl FeatureValue {
    /// Full feature name, e.g. `user_transactions.amount_mean_1d`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace part of the name (the feature view), when it has one.
    pub fn namespace(&self) -> Option<&str> {
        self.name.split_once('.').map(|(namespace, _)| namespace)
    }

    /// Name without its namespace.
    pub fn short_name(&self) -> &str {
        self.name
            .split_once('.')
            .map_or(self.name.as_str(), |(_, name)| name)
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn effective_time(&self) -> Option<OffsetDateTime> {
        self.effective_time
    }

    pub fn status(&self) -> Option<&FeatureStatus> {
        self.status.as_ref()
    }
}

/// Decoded get-features response; features keep the server's order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetFeaturesResponse {
    features: Vec<FeatureValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slo_info: Option<SloInfo>,
}

impl GetFeaturesResponse {
    pub fn from_json_str(body: &str) -> Result<Self, ResponseError> {
        let raw: RawGetFeaturesResponse = serde_json::from_str(body)
            .map_err(|error| ResponseError::malformed(format!("get-features response: {error}")))?;

        let features = assemble(&raw.metadata.features, &raw.result.features)?;
        debug!(features = features.len(), "assembled get-features response");
        Ok(Self {
            features,
            slo_info: raw.metadata.slo_info,
        })
    }

    /// Look up a feature by its full name.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.iter().find(|feature| feature.name == name)
    }

    pub fn features(&self) -> &[FeatureValue] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn slo_info(&self) -> Option<&SloInfo> {
        self.slo_info.as_ref()
    }

    /// Plain `{name: value}` object in feature order.
    pub fn to_value_map(&self) -> serde_json::Map<String, JsonValue> {
        self.features
            .iter()
            .map(|feature| (feature.name.clone(), feature.value.to_json()))
            .collect()
    }
}

/// Per-feature metadata as sent by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMetadata {
    pub name: String,
    #[serde(default)]
    pub data_type: JsonValue,
    #[serde(default)]
    pub effective_time: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Zip feature metadata with raw values by position and decode each one.
///
/// # Errors
///
/// - [`ResponseError::MismatchedType`] when the two lists differ in length or a
///   value does not fit its declared type
/// - [`ResponseError::UnknownType`] when a descriptor is outside the supported set
/// - [`ResponseError::Malformed`] when an effective time is not RFC 3339 or a
///   feature name appears more than once
pub fn assemble(
    metadata: &[FeatureMetadata],
    values: &[JsonValue],
) -> Result<Vec<FeatureValue>, ResponseError> {
    if metadata.len() != values.len() {
        return Err(ResponseError::mismatched_type(
            format!("{} declared features", metadata.len()),
            format!("{} feature values", values.len()),
        ));
    }

    let mut seen = HashSet::new();
    if let Some(repeated) = metadata.iter().find(|meta| !seen.insert(meta.name.as_str())) {
        let message = format!("duplicate feature name '{}'", repeated.name);
        return Err(ResponseError::malformed(message));
    }

    metadata
        .iter()
        .zip(values)
        .map(|(meta, raw)| {
            let data_type = DataType::parse(&meta.data_type)?;
            let value = Value::decode(&data_type, raw)?;
            let effective_time = meta
                .effective_time
                .as_deref()
                .map(|input| parse_effective_time(&meta.name, input))
                .transpose()?;

            Ok(FeatureValue {
                name: meta.name.clone(),
                data_type,
                value,
                effective_time,
                status: meta.status.as_deref().map(FeatureStatus::parse),
            })
        })
        .collect()
}

/// Declared name and type of a feature service input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameAndType {
    pub name: String,
    #[serde(serialize_with = "serialize_data_type")]
    pub data_type: DataType,
}

/// Decoded feature service metadata response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GetFeatureServiceMetadataResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_service_type: Option<String>,
    pub input_join_keys: Vec<NameAndType>,
    pub input_request_context_keys: Vec<NameAndType>,
    pub feature_values: Vec<NameAndType>,
}

impl GetFeatureServiceMetadataResponse {
    pub fn from_json_str(body: &str) -> Result<Self, ResponseError> {
        let raw: RawMetadataResponse = serde_json::from_str(body)
            .map_err(|error| ResponseError::malformed(format!("metadata response: {error}")))?;

        Ok(Self {
            feature_service_type: raw.feature_service_type,
            input_join_keys: parse_names_and_types(raw.input_join_keys)?,
            input_request_context_keys: parse_names_and_types(raw.input_request_context_keys)?,
            feature_values: parse_names_and_types(raw.feature_values)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawGetFeaturesResponse {
    result: RawResult,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    features: Vec<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default)]
    features: Vec<FeatureMetadata>,
    #[serde(default)]
    slo_info: Option<SloInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadataResponse {
    #[serde(default)]
    feature_service_type: Option<String>,
    #[serde(default)]
    input_join_keys: Vec<RawNameAndType>,
    #[serde(default)]
    input_request_context_keys: Vec<RawNameAndType>,
    #[serde(default)]
    feature_values: Vec<RawNameAndType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNameAndType {
    name: String,
    #[serde(default)]
    data_type: JsonValue,
}

fn parse_names_and_types(raw: Vec<RawNameAndType>) -> Result<Vec<NameAndType>, ResponseError> {
    raw.into_iter()
        .map(|entry| {
            Ok(NameAndType {
                data_type: DataType::parse(&entry.data_type)?,
                name: entry.name,
            })
        })
        .collect()
}

fn parse_effective_time(name: &str, input: &str) -> Result<OffsetDateTime, ResponseError> {
    OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
        ResponseError::malformed(format!(
            "effective time '{input}' of feature '{name}' is not RFC 3339"
        ))
    })
}

fn serialize_data_type<S>(data_type: &DataType, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&data_type.wire_name())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::ResponseErrorKind;

    fn sample_body() -> String {
        json!({
            "result": { "features": ["42", 0.5, ["a", "b"], ["7", true], null] },
            "metadata": {
                "features": [
                    { "name": "txn.count_7d", "dataType": { "type": "int64" },
                      "effectiveTime": "2024-05-01T12:00:00Z", "status": "PRESENT" },
                    { "name": "txn.amount_mean", "dataType": { "type": "float64" } },
                    { "name": "user.tags", "dataType": {
                        "type": "array", "elementType": { "type": "string" } } },
                    { "name": "user.profile", "dataType": {
                        "type": "struct",
                        "fields": [
                            { "name": "age", "dataType": { "type": "int64" } },
                            { "name": "verified", "dataType": { "type": "boolean" } }
                        ] } },
                    { "name": "score", "dataType": { "type": "float32" },
                      "status": "MISSING_DATA" }
                ],
                "sloInfo": { "sloEligible": true, "serverTimeSeconds": 0.012 }
            }
        })
        .to_string()
    }

    #[test]
    fn assembles_features_in_server_order() {
        let response = GetFeaturesResponse::from_json_str(&sample_body()).expect("decodes");

        let names = response
            .features()
            .iter()
            .map(FeatureValue::name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            ["txn.count_7d", "txn.amount_mean", "user.tags", "user.profile", "score"]
        );
        assert_eq!(
            serde_json::Value::Object(response.to_value_map()),
            json!({
                "txn.count_7d": 42,
                "txn.amount_mean": 0.5,
                "user.tags": ["a", "b"],
                "user.profile": { "age": 7, "verified": true },
                "score": null
            })
        );
    }

    #[test]
    fn carries_per_feature_metadata() {
        let response = GetFeaturesResponse::from_json_str(&sample_body()).expect("decodes");

        let count = response.get("txn.count_7d").expect("feature present");
        assert_eq!(count.namespace(), Some("txn"));
        assert_eq!(count.short_name(), "count_7d");
        assert_eq!(count.status(), Some(&FeatureStatus::Present));
        assert_eq!(
            count.effective_time().map(OffsetDateTime::unix_timestamp),
            Some(1_714_564_800)
        );

        let score = response.get("score").expect("feature present");
        assert_eq!(score.namespace(), None);
        assert_eq!(score.status(), Some(&FeatureStatus::MissingData));
        assert!(score.value().is_null());

        let slo = response.slo_info().expect("slo info present");
        assert_eq!(slo.slo_eligible, Some(true));
        assert_eq!(slo.server_time_seconds, Some(0.012));
    }

    #[test]
    fn unknown_type_rejects_whole_response() {
        let body = json!({
            "result": { "features": ["1", {"k": "v"}] },
            "metadata": { "features": [
                { "name": "a", "dataType": { "type": "int64" } },
                { "name": "b", "dataType": { "type": "map" } }
            ] }
        })
        .to_string();

        let error = GetFeaturesResponse::from_json_str(&body).expect_err("must fail");
        assert_eq!(error.kind(), ResponseErrorKind::UnknownType);
    }

    #[test]
    fn mismatched_value_rejects_whole_response() {
        let body = json!({
            "result": { "features": ["1", "not-a-bool"] },
            "metadata": { "features": [
                { "name": "a", "dataType": { "type": "int64" } },
                { "name": "b", "dataType": { "type": "boolean" } }
            ] }
        })
        .to_string();

        let error = GetFeaturesResponse::from_json_str(&body).expect_err("must fail");
        assert_eq!(error.kind(), ResponseErrorKind::MismatchedType);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let metadata = vec![FeatureMetadata {
            name: String::from("a"),
            data_type: json!({ "type": "int64" }),
            effective_time: None,
            status: None,
        }];

        let error = assemble(&metadata, &[json!("1"), json!("2")]).expect_err("must fail");
        assert_eq!(error.kind(), ResponseErrorKind::MismatchedType);
    }

    #[test]
    fn repeated_feature_name_is_malformed() {
        let feature = |data_type| FeatureMetadata {
            name: String::from("txn.count"),
            data_type,
            effective_time: None,
            status: None,
        };
        let metadata = vec![
            feature(json!({ "type": "int64" })),
            feature(json!({ "type": "string" })),
        ];

        let error = assemble(&metadata, &[json!("1"), json!("x")]).expect_err("must fail");
        assert_eq!(error, ResponseError::malformed("duplicate feature name 'txn.count'"));
    }

    #[test]
    fn missing_data_type_is_unknown() {
        let body = json!({
            "result": { "features": ["1"] },
            "metadata": { "features": [ { "name": "a" } ] }
        })
        .to_string();

        let error = GetFeaturesResponse::from_json_str(&body).expect_err("must fail");
        assert_eq!(error.kind(), ResponseErrorKind::UnknownType);
    }

    #[test]
    fn unparseable_body_is_malformed() {
        let error = GetFeaturesResponse::from_json_str("<html>").expect_err("must fail");
        assert_eq!(error.kind(), ResponseErrorKind::Malformed);
    }

    #[test]
    fn unknown_status_is_preserved() {
        assert_eq!(
            FeatureStatus::parse("EVICTED"),
            FeatureStatus::Other(String::from("EVICTED"))
        );
        assert_eq!(FeatureStatus::parse("EVICTED").as_str(), "EVICTED");
    }

    #[test]
    fn metadata_response_parses_inputs_and_outputs() {
        let body = json!({
            "featureServiceType": "DEFAULT",
            "inputJoinKeys": [ { "name": "user_id", "dataType": { "type": "string" } } ],
            "inputRequestContextKeys": [ { "name": "amount", "dataType": { "type": "float64" } } ],
            "featureValues": [
                { "name": "txn.counts", "dataType": {
                    "type": "array", "elementType": { "type": "int64" } } }
            ]
        })
        .to_string();

        let response = GetFeatureServiceMetadataResponse::from_json_str(&body).expect("decodes");
        assert_eq!(response.feature_service_type.as_deref(), Some("DEFAULT"));
        assert_eq!(response.input_join_keys[0].data_type, DataType::String);
        assert_eq!(response.input_request_context_keys[0].name, "amount");
        assert_eq!(
            response.feature_values[0].data_type,
            DataType::array(DataType::Int64)
        );
    }
}
