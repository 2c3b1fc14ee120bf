//! Client configuration: cluster URL, credentials and connection tuning.

use std::env;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use reqwest::Url;

use crate::ClientError;

pub const URL_ENV: &str = "TECTON_URL";
pub const API_KEY_ENV: &str = "TECTON_API_KEY";
pub const WORKSPACE_ENV: &str = "TECTON_WORKSPACE";

/// Connection tuning applied to the underlying HTTP pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Per-request timeout covering the whole exchange.
    pub read_timeout: Duration,
    /// How long an idle pooled connection is kept alive.
    pub keepalive_expiry: Duration,
    /// Maximum idle connections kept per host. Total open connections are not capped.
    pub max_connections: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(2),
            keepalive_expiry: Duration::from_secs(300),
            max_connections: 10,
        }
    }
}

impl ClientOptions {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_keepalive_expiry(mut self, expiry: Duration) -> Self {
        self.keepalive_expiry = expiry;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Validated settings for a [`TectonClient`](crate::TectonClient).
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    url: Url,
    api_key: String,
    default_workspace_name: Option<String>,
    options: ClientOptions,
}

impl ClientConfig {
    /// Validate the cluster URL and API key.
    ///
    /// The URL must be an absolute `http` or `https` URL with a host.
    pub fn new(url: &str, api_key: impl Into<String>) -> Result<Self, ClientError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ClientError::EmptyApiKey);
        }

        Ok(Self {
            url: parse_base_url(url)?,
            api_key,
            default_workspace_name: None,
            options: ClientOptions::default(),
        })
    }

    /// Build a config from `TECTON_URL`, `TECTON_API_KEY` and the optional
    /// `TECTON_WORKSPACE`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup(URL_ENV).unwrap_or_default();
        let api_key = lookup(API_KEY_ENV).unwrap_or_default();
        let config = Self::new(&url, api_key)?;

        Ok(match lookup(WORKSPACE_ENV).filter(|name| !name.is_empty()) {
            Some(workspace) => config.with_default_workspace(workspace),
            None => config,
        })
    }

    pub fn with_default_workspace(mut self, workspace_name: impl Into<String>) -> Self {
        self.default_workspace_name = Some(workspace_name.into());
        self
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn default_workspace_name(&self) -> Option<&str> {
        self.default_workspace_name.as_deref()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Absolute URL of an API path such as `/api/v1/feature-service/metadata`.
    pub fn endpoint(&self, path: &str) -> String {
        let base = self.url.as_str().trim_end_matches('/');
        format!("{base}{path}")
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"<redacted>")
            .field("default_workspace_name", &self.default_workspace_name)
            .field("options", &self.options)
            .finish()
    }
}

fn parse_base_url(input: &str) -> Result<Url, ClientError> {
    let invalid = || ClientError::InvalidUrl {
        url: input.to_owned(),
    };

    let url = Url::parse(input).map_err(|_| invalid())?;
    let has_host = url.host_str().is_some_and(|host| !host.is_empty());
    if !matches!(url.scheme(), "http" | "https") || !has_host {
        return Err(invalid());
    }
    Ok(url)
}
