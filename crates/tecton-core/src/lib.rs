//! # Tecton Core
//!
//! Typed async client for the Tecton feature serving HTTP API.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Request validation** for join keys and request context values
//! - **Canonical payloads** that serialize identically for identical requests
//! - **Strict response decoding** against the server-declared data types
//! - **Structured errors** split by where they arise (caller, response, server, transport)
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`TectonClient`] and its request lifecycle |
//! | [`config`] | Cluster URL, API key and connection options |
//! | [`domain`] | Data types and decoded values |
//! | [`error`] | Error taxonomy |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`request`] | Request types and payload construction |
//! | [`request_data`] | Join key and request context validation |
//! | [`response`] | Response assembly |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tecton_core::{
//!     ClientConfig, FeatureServiceRef, GetFeatureRequestData, GetFeaturesRequest, TectonClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://acme.tecton.ai", "my-api-key")?
//!         .with_default_workspace("prod");
//!     let client = TectonClient::new(config)?;
//!
//!     let data = GetFeatureRequestData::builder()
//!         .join_key("user_id", "user_42")
//!         .request_context("amount", 12.5)
//!         .build()?;
//!     let request = GetFeaturesRequest::new(FeatureServiceRef::name("fraud_detection"), data);
//!
//!     let response = client.get_features(&request).await?;
//!     for feature in response.features() {
//!         println!("{} = {}", feature.name(), feature.value().to_json());
//!     }
//!
//!     client.close()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  CLI / Caller   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  TectonClient   │────▶│ Request payload  │
//! │                 │     │ (validated data) │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │  HTTP Client    │────▶│ Feature server   │
//! │ (reqwest/mock)  │     │                  │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ Response        │
//! │ (DataType/Value)│
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use tecton_core::{ServerErrorKind, TectonError};
//!
//! fn handle_error(error: TectonError) {
//!     match error {
//!         TectonError::Client(error) => eprintln!("fix the request: {error}"),
//!         TectonError::Server(error) if error.kind() == ServerErrorKind::ResourceExhausted => {
//!             // Back off before retrying
//!         }
//!         other if other.retryable() => {
//!             // Transient; the client never retries on its own
//!         }
//!         other => eprintln!("{}: {other}", other.code()),
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is sent only in the `Authorization` header and is redacted
//!   from `Debug` output and logs

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod request;
pub mod request_data;
pub mod response;

// Client
pub use client::TectonClient;

// Configuration
pub use config::{ClientConfig, ClientOptions};

// Domain models
pub use domain::{DataType, StructField, Value};

// Error types
pub use error::{
    ClientError, ClientErrorKind, ResponseError, ResponseErrorKind, ServerError, ServerErrorKind,
    TectonError,
};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Requests
pub use request::{
    ApiRequest, FeatureServiceRef, GetFeatureServiceMetadataRequest, GetFeaturesRequest,
    MetadataOption, MetadataOptions, RequestOptions,
};
pub use request_data::{GetFeatureRequestData, MapKind, RequestContextValue};

// Responses
pub use response::{
    FeatureStatus, FeatureValue, GetFeatureServiceMetadataResponse, GetFeaturesResponse,
    NameAndType, SloInfo,
};
