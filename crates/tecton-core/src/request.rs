//! Request types and canonical payload construction.
//!
//! Payloads are pure functions of the request: identical requests always
//! serialize to byte-identical JSON (metadata options and map keys are emitted
//! in lexical order).
//!
//! # Endpoints
//!
//! | Request | Endpoint | Response |
//! |---------|----------|----------|
//! | [`GetFeaturesRequest`] | `/api/v1/feature-service/get-features` | [`GetFeaturesResponse`] |
//! | [`GetFeatureServiceMetadataRequest`] | `/api/v1/feature-service/metadata` | [`GetFeatureServiceMetadataResponse`] |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::request_data::{GetFeatureRequestData, RequestContextValue};
use crate::response::{GetFeatureServiceMetadataResponse, GetFeaturesResponse};
use crate::{ClientError, TectonError};

/// Extra metadata the server can return alongside feature values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataOption {
    /// Name of each feature in the vector.
    Name,
    /// Timestamp of the most recent value written to the online store.
    EffectiveTime,
    /// Declared data type of each feature.
    DataType,
    /// Server response time information.
    SloInfo,
    /// Serving status of each feature.
    FeatureStatus,
}

impl MetadataOption {
    pub const ALL: [Self; 5] = [
        Self::Name,
        Self::EffectiveTime,
        Self::DataType,
        Self::SloInfo,
        Self::FeatureStatus,
    ];

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Name => "include_names",
            Self::EffectiveTime => "include_effective_times",
            Self::DataType => "include_data_types",
            Self::SloInfo => "include_slo_info",
            Self::FeatureStatus => "include_serving_status",
        }
    }
}

impl Display for MetadataOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Set of requested metadata options.
///
/// Names and data types are always requested because decoding depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataOptions(BTreeSet<MetadataOption>);

impl MetadataOptions {
    /// A fresh default set: names and data types.
    pub fn defaults() -> Self {
        Self(BTreeSet::from([MetadataOption::Name, MetadataOption::DataType]))
    }

    pub fn all() -> Self {
        Self(MetadataOption::ALL.into_iter().collect())
    }

    pub fn with(mut self, option: MetadataOption) -> Self {
        self.0.insert(option);
        self
    }

    pub fn contains(&self, option: MetadataOption) -> bool {
        self.0.contains(&option)
    }

    pub fn iter(&self) -> impl Iterator<Item = MetadataOption> + '_ {
        self.0.iter().copied()
    }

    /// Wire form: option name to `true`, keyed (and so ordered) by wire name.
    pub fn to_wire(&self) -> BTreeMap<&'static str, bool> {
        self.0
            .iter()
            .map(|option| (option.wire_name(), true))
            .collect()
    }
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self::defaults()
    }
}

impl FromIterator<MetadataOption> for MetadataOptions {
    fn from_iter<I: IntoIterator<Item = MetadataOption>>(iter: I) -> Self {
        let mut options = Self::defaults();
        options.0.extend(iter);
        options
    }
}

/// Server-side behavior switches for a get-features call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_from_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_to_cache: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_extra_request_context_fields: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_budget_ms: Option<u64>,
}

impl RequestOptions {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// How a request names its feature service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureServiceRef {
    Name(String),
    Id(String),
}

impl FeatureServiceRef {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Resolve from optional parts; exactly one must be non-empty.
    pub fn from_parts(name: Option<&str>, id: Option<&str>) -> Result<Self, ClientError> {
        let name = name.filter(|value| !value.is_empty());
        let id = id.filter(|value| !value.is_empty());
        match (name, id) {
            (Some(name), None) => Ok(Self::name(name)),
            (None, Some(id)) => Ok(Self::id(id)),
            (Some(_), Some(_)) => Err(ClientError::AmbiguousFeatureService),
            (None, None) => Err(ClientError::MissingFeatureService),
        }
    }

    fn validate(&self) -> Result<(), ClientError> {
        match self {
            Self::Name(value) | Self::Id(value) if value.is_empty() => {
                Err(ClientError::MissingFeatureService)
            }
            _ => Ok(()),
        }
    }

    fn name_part(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Id(_) => None,
        }
    }

    fn id_part(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Name(_) => None,
        }
    }
}

impl Display for FeatureServiceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "feature service '{name}'"),
            Self::Id(id) => write!(f, "feature service id '{id}'"),
        }
    }
}

/// A request the client knows how to send and decode.
pub trait ApiRequest {
    /// Path appended to the cluster base URL.
    const ENDPOINT: &'static str;

    type Response;

    /// Serialize the canonical JSON body, resolving the workspace against
    /// `default_workspace` when the request does not name one.
    fn to_json_string(&self, default_workspace: Option<&str>) -> Result<String, TectonError>;

    fn parse_response(body: &str) -> Result<Self::Response, TectonError>;
}

/// Request to the get-features endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct GetFeaturesRequest {
    feature_service: FeatureServiceRef,
    workspace_name: Option<String>,
    request_data: GetFeatureRequestData,
    metadata_options: MetadataOptions,
    request_options: RequestOptions,
    allow_partial_results: bool,
}

impl GetFeaturesRequest {
    pub fn new(feature_service: FeatureServiceRef, request_data: GetFeatureRequestData) -> Self {
        Self {
            feature_service,
            workspace_name: None,
            request_data,
            metadata_options: MetadataOptions::defaults(),
            request_options: RequestOptions::default(),
            allow_partial_results: false,
        }
    }

    pub fn with_workspace(mut self, workspace_name: impl Into<String>) -> Self {
        self.workspace_name = Some(workspace_name.into());
        self
    }

    /// Request additional metadata; the defaults are always kept.
    pub fn with_metadata_options(mut self, options: impl IntoIterator<Item = MetadataOption>) -> Self {
        self.metadata_options = options.into_iter().collect();
        self
    }

    pub fn with_request_options(mut self, request_options: RequestOptions) -> Self {
        self.request_options = request_options;
        self
    }

    pub fn with_allow_partial_results(mut self, allow_partial_results: bool) -> Self {
        self.allow_partial_results = allow_partial_results;
        self
    }

    pub fn feature_service(&self) -> &FeatureServiceRef {
        &self.feature_service
    }

    pub fn workspace_name(&self) -> Option<&str> {
        self.workspace_name.as_deref()
    }

    pub fn request_data(&self) -> &GetFeatureRequestData {
        &self.request_data
    }

    pub fn metadata_options(&self) -> &MetadataOptions {
        &self.metadata_options
    }

    /// Build the canonical payload without serializing it.
    pub fn payload<'a>(
        &'a self,
        default_workspace: Option<&'a str>,
    ) -> Result<Payload<GetFeaturesParams<'a>>, ClientError> {
        self.feature_service.validate()?;
        let workspace_name = resolve_workspace(self.workspace_name.as_deref(), default_workspace)?;

        let join_key_map = self.request_data.join_key_map();
        let request_context_map = self.request_data.request_context_map();

        Ok(Payload {
            params: GetFeaturesParams {
                workspace_name,
                feature_service_name: self.feature_service.name_part(),
                feature_service_id: self.feature_service.id_part(),
                join_key_map: (!join_key_map.is_empty()).then_some(join_key_map),
                request_context_map: (!request_context_map.is_empty())
                    .then_some(request_context_map),
                metadata_options: self.metadata_options.to_wire(),
                request_options: (!self.request_options.is_empty())
                    .then_some(&self.request_options),
                allow_partial_results: self.allow_partial_results,
            },
        })
    }
}

impl ApiRequest for GetFeaturesRequest {
    const ENDPOINT: &'static str = "/api/v1/feature-service/get-features";

    type Response = GetFeaturesResponse;

    fn to_json_string(&self, default_workspace: Option<&str>) -> Result<String, TectonError> {
        Ok(serde_json::to_string(&self.payload(default_workspace)?)?)
    }

    fn parse_response(body: &str) -> Result<Self::Response, TectonError> {
        Ok(GetFeaturesResponse::from_json_str(body)?)
    }
}

/// Request to the feature service metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetFeatureServiceMetadataRequest {
    feature_service: FeatureServiceRef,
    workspace_name: Option<String>,
}

impl GetFeatureServiceMetadataRequest {
    pub fn new(feature_service: FeatureServiceRef) -> Self {
        Self {
            feature_service,
            workspace_name: None,
        }
    }

    pub fn with_workspace(mut self, workspace_name: impl Into<String>) -> Self {
        self.workspace_name = Some(workspace_name.into());
        self
    }

    pub fn feature_service(&self) -> &FeatureServiceRef {
        &self.feature_service
    }

    pub fn payload<'a>(
        &'a self,
        default_workspace: Option<&'a str>,
    ) -> Result<Payload<MetadataParams<'a>>, ClientError> {
        self.feature_service.validate()?;
        let workspace_name = resolve_workspace(self.workspace_name.as_deref(), default_workspace)?;

        Ok(Payload {
            params: MetadataParams {
                workspace_name,
                feature_service_name: self.feature_service.name_part(),
                feature_service_id: self.feature_service.id_part(),
            },
        })
    }
}

impl ApiRequest for GetFeatureServiceMetadataRequest {
    const ENDPOINT: &'static str = "/api/v1/feature-service/metadata";

    type Response = GetFeatureServiceMetadataResponse;

    fn to_json_string(&self, default_workspace: Option<&str>) -> Result<String, TectonError> {
        Ok(serde_json::to_string(&self.payload(default_workspace)?)?)
    }

    fn parse_response(body: &str) -> Result<Self::Response, TectonError> {
        Ok(GetFeatureServiceMetadataResponse::from_json_str(body)?)
    }
}

/// Top-level `{"params": ...}` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payload<P> {
    pub params: P,
}

/// Wire parameters of a get-features call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GetFeaturesParams<'a> {
    pub workspace_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_service_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_service_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_key_map: Option<&'a BTreeMap<String, Option<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_context_map: Option<&'a BTreeMap<String, RequestContextValue>>,
    pub metadata_options: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_options: Option<&'a RequestOptions>,
    pub allow_partial_results: bool,
}

/// Wire parameters of a metadata call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataParams<'a> {
    pub workspace_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_service_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_service_id: Option<&'a str>,
}

fn resolve_workspace<'a>(
    workspace_name: Option<&'a str>,
    default_workspace: Option<&'a str>,
) -> Result<&'a str, ClientError> {
    workspace_name
        .filter(|name| !name.is_empty())
        .or(default_workspace)
        .filter(|name| !name.is_empty())
        .ok_or(ClientError::MissingWorkspace)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value as JsonValue};

    use super::*;
    use crate::ClientErrorKind;

    fn request_data() -> GetFeatureRequestData {
        GetFeatureRequestData::builder()
            .join_key("user_id", 42)
            .request_context("amount", 12.5)
            .build()
            .expect("valid request data")
    }

    fn payload_json(request: &GetFeaturesRequest, default_workspace: Option<&str>) -> JsonValue {
        let body = request
            .to_json_string(default_workspace)
            .expect("payload should serialize");
        serde_json::from_str(&body).expect("payload is JSON")
    }

    #[test]
    fn defaults_are_fresh_per_call() {
        let extended = MetadataOptions::defaults().with(MetadataOption::SloInfo);

        assert!(extended.contains(MetadataOption::SloInfo));
        assert!(!MetadataOptions::defaults().contains(MetadataOption::SloInfo));
    }

    #[test]
    fn requested_options_are_unioned_with_defaults() {
        let request = GetFeaturesRequest::new(FeatureServiceRef::name("fraud"), request_data())
            .with_workspace("prod")
            .with_metadata_options([MetadataOption::SloInfo]);

        let payload = payload_json(&request, None);
        assert_eq!(
            payload["params"]["metadata_options"],
            json!({
                "include_data_types": true,
                "include_names": true,
                "include_slo_info": true
            })
        );
    }

    #[test]
    fn metadata_options_serialize_in_lexical_wire_order() {
        let request = GetFeaturesRequest::new(FeatureServiceRef::name("fraud"), request_data())
            .with_workspace("prod")
            .with_metadata_options(MetadataOption::ALL);

        let body = request.to_json_string(None).expect("serializes");
        let expected = concat!(
            r#""metadata_options":{"include_data_types":true,"include_effective_times":true,"#,
            r#""include_names":true,"include_serving_status":true,"include_slo_info":true}"#
        );
        assert!(body.contains(expected), "{body}");
    }

    #[test]
    fn full_payload_has_canonical_shape() {
        let request = GetFeaturesRequest::new(FeatureServiceRef::name("fraud"), request_data())
            .with_workspace("prod")
            .with_request_options(RequestOptions {
                read_from_cache: Some(false),
                ..RequestOptions::default()
            })
            .with_allow_partial_results(true);

        assert_eq!(
            payload_json(&request, None),
            json!({
                "params": {
                    "workspace_name": "prod",
                    "feature_service_name": "fraud",
                    "join_key_map": { "user_id": "42" },
                    "request_context_map": { "amount": 12.5 },
                    "metadata_options": { "include_data_types": true, "include_names": true },
                    "request_options": { "read_from_cache": false },
                    "allow_partial_results": true
                }
            })
        );
    }

    #[test]
    fn empty_maps_and_request_options_are_omitted() {
        let data = GetFeatureRequestData::builder()
            .join_key("user_id", "u-1")
            .build()
            .expect("valid");
        let request = GetFeaturesRequest::new(FeatureServiceRef::id("fs-123"), data);

        let payload = payload_json(&request, Some("staging"));
        let params = payload["params"].as_object().expect("params object");
        assert_eq!(params["workspace_name"], json!("staging"));
        assert_eq!(params["feature_service_id"], json!("fs-123"));
        assert!(!params.contains_key("feature_service_name"));
        assert!(!params.contains_key("request_context_map"));
        assert!(!params.contains_key("request_options"));
        assert_eq!(params["allow_partial_results"], json!(false));
    }

    #[test]
    fn identical_requests_serialize_byte_identically() {
        let build = || {
            GetFeaturesRequest::new(FeatureServiceRef::name("fraud"), request_data())
                .with_workspace("prod")
                .with_metadata_options([MetadataOption::FeatureStatus, MetadataOption::SloInfo])
                .to_json_string(None)
                .expect("serializes")
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn explicit_workspace_wins_over_default() {
        let request = GetFeaturesRequest::new(FeatureServiceRef::name("fraud"), request_data())
            .with_workspace("prod");

        let payload = payload_json(&request, Some("staging"));
        assert_eq!(payload["params"]["workspace_name"], json!("prod"));
    }

    #[test]
    fn missing_workspace_is_invalid_parameter() {
        let request = GetFeaturesRequest::new(FeatureServiceRef::name("fraud"), request_data());

        let error = request.payload(None).expect_err("no workspace anywhere");
        assert_eq!(error, ClientError::MissingWorkspace);

        let error = request.payload(Some("")).expect_err("empty default");
        assert_eq!(error.kind(), ClientErrorKind::InvalidParameter);
    }

    #[test]
    fn feature_service_must_be_identified_exactly_once() {
        assert_eq!(
            FeatureServiceRef::from_parts(None, None),
            Err(ClientError::MissingFeatureService)
        );
        assert_eq!(
            FeatureServiceRef::from_parts(Some(""), Some("")),
            Err(ClientError::MissingFeatureService)
        );
        assert_eq!(
            FeatureServiceRef::from_parts(Some("fraud"), Some("fs-1")),
            Err(ClientError::AmbiguousFeatureService)
        );
        assert_eq!(
            FeatureServiceRef::from_parts(Some("fraud"), Some("")),
            Ok(FeatureServiceRef::name("fraud"))
        );
    }

    #[test]
    fn empty_feature_service_name_is_rejected_at_payload_time() {
        let request = GetFeaturesRequest::new(FeatureServiceRef::name(""), request_data())
            .with_workspace("prod");

        let error = request.payload(None).expect_err("must fail");
        assert_eq!(error, ClientError::MissingFeatureService);
    }

    #[test]
    fn metadata_request_payload() {
        let request = GetFeatureServiceMetadataRequest::new(FeatureServiceRef::name("fraud"))
            .with_workspace("prod");

        let body = request.to_json_string(None).expect("serializes");
        assert_eq!(
            body,
            r#"{"params":{"workspace_name":"prod","feature_service_name":"fraud"}}"#
        );
    }
}
