use thiserror::Error;

use crate::http_client::HttpError;
use crate::request_data::MapKind;

/// Coarse classification of client-side errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    InvalidParameter,
    UnsupportedType,
    InvalidUrl,
    ClientClosed,
}

/// Errors raised before any request leaves the process.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error("join key map and request context map cannot both be empty")]
    EmptyMaps,
    #[error("{map} keys cannot be empty (value: {value})")]
    EmptyKey { map: MapKind, value: String },
    #[error("{map} value for key '{key}' cannot be {value}")]
    EmptyValue {
        map: MapKind,
        key: String,
        value: &'static str,
    },
    #[error(
        "{map} values can only be of types ({allowed}); given value for key '{key}' is {value} of type {actual}"
    )]
    UnsupportedValueType {
        map: MapKind,
        allowed: &'static str,
        key: String,
        value: String,
        actual: &'static str,
    },
    #[error("workspace name cannot be empty")]
    MissingWorkspace,
    #[error("either a feature service name or a feature service id must be provided")]
    MissingFeatureService,
    #[error("only one of feature service name and feature service id may be provided")]
    AmbiguousFeatureService,
    #[error("API key cannot be empty")]
    EmptyApiKey,
    #[error("cannot connect to Tecton because the URL is invalid: '{url}'")]
    InvalidUrl { url: String },
    #[error("client has been closed")]
    ClientClosed,
}

impl ClientError {
    pub const fn kind(&self) -> ClientErrorKind {
        match self {
            Self::UnsupportedValueType { .. } => ClientErrorKind::UnsupportedType,
            Self::InvalidUrl { .. } => ClientErrorKind::InvalidUrl,
            Self::ClientClosed => ClientErrorKind::ClientClosed,
            Self::EmptyMaps
            | Self::EmptyKey { .. }
            | Self::EmptyValue { .. }
            | Self::MissingWorkspace
            | Self::MissingFeatureService
            | Self::AmbiguousFeatureService
            | Self::EmptyApiKey => ClientErrorKind::InvalidParameter,
        }
    }
}

/// Coarse classification of errors raised while interpreting a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseErrorKind {
    UnknownType,
    MismatchedType,
    Malformed,
}

/// Errors raised while decoding a server response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResponseError {
    #[error("received unknown data type {descriptor} in the response")]
    UnknownType { descriptor: String },
    #[error("error converting {value} to type {expected}")]
    MismatchedType { expected: String, value: String },
    #[error("malformed response: {message}")]
    Malformed { message: String },
}

impl ResponseError {
    pub fn unknown_type(descriptor: impl Into<String>) -> Self {
        Self::UnknownType {
            descriptor: descriptor.into(),
        }
    }

    pub fn mismatched_type(expected: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MismatchedType {
            expected: expected.into(),
            value: value.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ResponseErrorKind {
        match self {
            Self::UnknownType { .. } => ResponseErrorKind::UnknownType,
            Self::MismatchedType { .. } => ResponseErrorKind::MismatchedType,
            Self::Malformed { .. } => ResponseErrorKind::Malformed,
        }
    }
}

/// Status-keyed family of errors returned by the feature server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    ResourceExhausted,
    Internal,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    Other,
}

impl ServerErrorKind {
    pub const fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            429 => Self::ResourceExhausted,
            500 => Self::Internal,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            504 => Self::GatewayTimeout,
            _ => Self::Other,
        }
    }
}

/// Non-2xx response from the feature server.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{status} {reason}: {message}")]
pub struct ServerError {
    kind: ServerErrorKind,
    status: u16,
    reason: String,
    message: String,
}

impl ServerError {
    pub fn new(status: u16, reason: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ServerErrorKind::from_status(status),
            status,
            reason: reason.into(),
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> ServerErrorKind {
        self.kind
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Top-level error type for client operations.
#[derive(Debug, Error)]
pub enum TectonError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TectonError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Client(error) => match error.kind() {
                ClientErrorKind::InvalidParameter => "client.invalid_parameter",
                ClientErrorKind::UnsupportedType => "client.unsupported_type",
                ClientErrorKind::InvalidUrl => "client.invalid_url",
                ClientErrorKind::ClientClosed => "client.closed",
            },
            Self::Response(error) => match error.kind() {
                ResponseErrorKind::UnknownType => "response.unknown_type",
                ResponseErrorKind::MismatchedType => "response.mismatched_type",
                ResponseErrorKind::Malformed => "response.malformed",
            },
            Self::Server(_) => "server.error",
            Self::Transport(_) => "transport.error",
            Self::Serialization(_) => "serialization.error",
        }
    }

    /// Whether a caller-side retry could plausibly succeed. The client itself never retries.
    pub fn retryable(&self) -> bool {
        match self {
            Self::Transport(error) => error.retryable(),
            Self::Server(error) => matches!(
                error.kind(),
                ServerErrorKind::RequestTimeout
                    | ServerErrorKind::ResourceExhausted
                    | ServerErrorKind::BadGateway
                    | ServerErrorKind::ServiceUnavailable
                    | ServerErrorKind::GatewayTimeout
            ),
            Self::Client(_) | Self::Response(_) | Self::Serialization(_) => false,
        }
    }
}
