use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::request::{ApiRequest, GetFeatureServiceMetadataRequest, GetFeaturesRequest};
use crate::response::{GetFeatureServiceMetadataResponse, GetFeaturesResponse};
use crate::{ClientConfig, ClientError, ServerError, TectonError};

const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for the Tecton feature serving API.
///
/// One client holds one connection pool and may be shared across tasks.
/// After [`close`](Self::close) every call fails with
/// [`ClientError::ClientClosed`].
pub struct TectonClient {
    config: ClientConfig,
    auth: HttpAuth,
    transport: RwLock<Option<Arc<dyn HttpClient>>>,
    closed: AtomicBool,
}

impl TectonClient {
    /// Create a client with a pooled reqwest transport tuned by the config's options.
    pub fn new(config: ClientConfig) -> Result<Self, TectonError> {
        let transport = ReqwestHttpClient::from_options(config.options())?;
        Ok(Self::with_http_client(config, Arc::new(transport)))
    }

    /// Create a client from `TECTON_URL`, `TECTON_API_KEY` and `TECTON_WORKSPACE`.
    pub fn from_env() -> Result<Self, TectonError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over a caller-supplied transport.
    pub fn with_http_client(config: ClientConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            auth: HttpAuth::TectonKey(config.api_key().to_owned()),
            config,
            transport: RwLock::new(Some(http_client)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch feature values for one set of join keys and request context.
    pub async fn get_features(
        &self,
        request: &GetFeaturesRequest,
    ) -> Result<GetFeaturesResponse, TectonError> {
        self.execute(request).await
    }

    /// Fetch the declared inputs and outputs of a feature service.
    pub async fn get_feature_service_metadata(
        &self,
        request: &GetFeatureServiceMetadataRequest,
    ) -> Result<GetFeatureServiceMetadataResponse, TectonError> {
        self.execute(request).await
    }

    /// Send any [`ApiRequest`] and decode its response.
    pub async fn execute<R>(&self, request: &R) -> Result<R::Response, TectonError>
    where
        R: ApiRequest + Sync,
    {
        let transport = self.transport()?;
        let body = request.to_json_string(self.config.default_workspace_name())?;
        let url = self.config.endpoint(R::ENDPOINT);

        let http_request = HttpRequest::post(url.as_str())
            .with_auth(&self.auth)
            .with_header("content-type", JSON_CONTENT_TYPE)
            .with_header("accept", JSON_CONTENT_TYPE)
            .with_timeout_ms(timeout_ms(&self.config))
            .with_body(body);

        debug!(endpoint = R::ENDPOINT, %url, "dispatching feature server request");

        let response = transport.execute(http_request).await.map_err(|error| {
            warn!(endpoint = R::ENDPOINT, retryable = error.retryable(), %error, "transport failure");
            TectonError::Transport(error)
        })?;

        if !response.is_success() {
            let error = server_error(&response);
            warn!(
                endpoint = R::ENDPOINT,
                status = error.status(),
                kind = ?error.kind(),
                message = error.message(),
                "feature server returned an error"
            );
            return Err(error.into());
        }

        let decoded = R::parse_response(&response.body)?;
        debug!(
            endpoint = R::ENDPOINT,
            status = response.status,
            bytes = response.body.len(),
            "decoded feature server response"
        );
        Ok(decoded)
    }

    /// Release the connection pool. Closing an already closed client fails.
    pub fn close(&self) -> Result<(), ClientError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(ClientError::ClientClosed);
        }

        self.transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        debug!("tecton client closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn transport(&self) -> Result<Arc<dyn HttpClient>, ClientError> {
        if self.is_closed() {
            return Err(ClientError::ClientClosed);
        }

        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ClientError::ClientClosed)
    }
}

impl Debug for TectonClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TectonClient")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn timeout_ms(config: &ClientConfig) -> u64 {
    u64::try_from(config.options().read_timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Build a [`ServerError`] from a non-2xx response. The message is the body's
/// `message` field when present, otherwise the raw body.
fn server_error(response: &HttpResponse) -> ServerError {
    let message = serde_json::from_str::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| response.body.clone());

    ServerError::new(response.status, response.reason(), message)
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::http_client::HttpError;
    use crate::{
        ClientErrorKind, FeatureServiceRef, GetFeatureRequestData, ResponseErrorKind,
        ServerErrorKind,
    };

    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn returning(response: Result<HttpResponse, HttpError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }
    }

    fn client(transport: Arc<RecordingHttpClient>) -> TectonClient {
        let config = ClientConfig::new("https://acme.tecton.ai", "secret-key")
            .expect("valid config")
            .with_default_workspace("prod");
        TectonClient::with_http_client(config, transport)
    }

    fn features_request() -> GetFeaturesRequest {
        let data = GetFeatureRequestData::builder()
            .join_key("user_id", "u1")
            .build()
            .expect("valid request data");
        GetFeaturesRequest::new(FeatureServiceRef::name("fraud_detection"), data)
    }

    fn features_body() -> String {
        json!({
            "result": { "features": ["3"] },
            "metadata": { "features": [
                { "name": "txn.count", "dataType": { "type": "int64" } }
            ] }
        })
        .to_string()
    }

    #[tokio::test]
    async fn get_features_posts_canonical_request() {
        let transport = RecordingHttpClient::returning(Ok(HttpResponse::ok_json(features_body())));
        let client = client(transport.clone());

        let response = client
            .get_features(&features_request())
            .await
            .expect("request should succeed");
        assert_eq!(
            response.get("txn.count").and_then(|f| f.value().as_i64()),
            Some(3)
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(
            sent.url,
            "https://acme.tecton.ai/api/v1/feature-service/get-features"
        );
        assert_eq!(
            sent.headers.get("authorization").map(String::as_str),
            Some("Tecton-key secret-key")
        );
        assert_eq!(
            sent.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(sent.timeout_ms, 2_000);

        let body: serde_json::Value =
            serde_json::from_str(sent.body.as_deref().expect("body present")).expect("json body");
        assert_eq!(body["params"]["workspace_name"], "prod");
        assert_eq!(body["params"]["feature_service_name"], "fraud_detection");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_server_error_with_body_message() {
        let transport = RecordingHttpClient::returning(Ok(HttpResponse::new(
            404,
            r#"{"error":"not found","code":5,"message":"feature service 'x' not found"}"#,
        )));
        let client = client(transport);

        let error = client
            .get_features(&features_request())
            .await
            .expect_err("404 must fail");
        match error {
            TectonError::Server(error) => {
                assert_eq!(error.kind(), ServerErrorKind::NotFound);
                assert_eq!(
                    error.to_string(),
                    "404 Not Found: feature service 'x' not found"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_error_body_is_used_verbatim() {
        let transport =
            RecordingHttpClient::returning(Ok(HttpResponse::new(502, "upstream unavailable")));
        let client = client(transport);

        let error = client
            .get_features(&features_request())
            .await
            .expect_err("502 must fail");
        assert_eq!(error.to_string(), "502 Bad Gateway: upstream unavailable");
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn undecodable_success_body_is_response_error() {
        let transport = RecordingHttpClient::returning(Ok(HttpResponse::ok_json("not json")));
        let client = client(transport);

        let error = client
            .get_features(&features_request())
            .await
            .expect_err("bad body must fail");
        assert!(matches!(
            error,
            TectonError::Response(ref inner) if inner.kind() == ResponseErrorKind::Malformed
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let transport =
            RecordingHttpClient::returning(Err(HttpError::new("connection failed: refused")));
        let client = client(transport);

        let error = client
            .get_features(&features_request())
            .await
            .expect_err("transport failure");
        assert_eq!(error.code(), "transport.error");
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn validation_failure_sends_nothing() {
        let transport = RecordingHttpClient::returning(Ok(HttpResponse::ok_json("{}")));
        let config = ClientConfig::new("https://acme.tecton.ai", "secret-key").expect("valid");
        let client = TectonClient::with_http_client(config, transport.clone());

        let error = client
            .get_features(&features_request())
            .await
            .expect_err("no workspace anywhere");
        assert_eq!(error.code(), "client.invalid_parameter");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn closed_client_rejects_calls_and_second_close() {
        let transport = RecordingHttpClient::returning(Ok(HttpResponse::ok_json(features_body())));
        let client = client(transport.clone());

        client.close().expect("first close succeeds");
        assert!(client.is_closed());

        let error = client
            .get_features(&features_request())
            .await
            .expect_err("closed client");
        assert!(matches!(
            error,
            TectonError::Client(ref inner) if inner.kind() == ClientErrorKind::ClientClosed
        ));
        assert_eq!(client.close(), Err(ClientError::ClientClosed));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn metadata_request_uses_metadata_endpoint() {
        let body = json!({
            "featureServiceType": "DEFAULT",
            "inputJoinKeys": [ { "name": "user_id", "dataType": { "type": "string" } } ],
            "featureValues": []
        })
        .to_string();
        let transport = RecordingHttpClient::returning(Ok(HttpResponse::ok_json(body)));
        let client = client(transport.clone());

        let request = GetFeatureServiceMetadataRequest::new(FeatureServiceRef::id("fs-123"));
        let response = client
            .get_feature_service_metadata(&request)
            .await
            .expect("metadata decodes");
        assert_eq!(response.input_join_keys.len(), 1);

        let sent = transport.requests();
        assert_eq!(
            sent[0].url,
            "https://acme.tecton.ai/api/v1/feature-service/metadata"
        );
    }
}
