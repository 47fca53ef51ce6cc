//! Configuration management for GitLab client

use std::{fmt, path::PathBuf, time::Duration};

use compact_str::{format_compact, CompactString};
use reqwest::Url;

use super::error::{ClientError, Result};

/// Path prefix of the GitLab REST API, relative to the instance URL
const API_PREFIX: &str = "/api/v4";

/// Largest page size the GitLab API accepts
pub const MAX_PER_PAGE: u32 = 100;

/// Main configuration for GitLab client
#[derive(Clone)]
pub struct ClientConfig {
    /// GitLab instance base URL
    pub base_url: CompactString,
    /// Private access token
    pub private_token: CompactString,
    /// Request configuration
    pub request: RequestConfig,
    /// Debug configuration
    pub debug: DebugConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Number of items per page for paginated requests
    pub per_page: u32,
    /// Request timeout
    pub timeout: Duration,
    /// Skip TLS certificate verification (self-signed instances)
    pub accept_invalid_certs: bool,
}

/// Debug and logging configuration
#[derive(Debug, Clone)]
pub struct DebugConfig {
    /// Enable debug logging of HTTP responses
    pub log_responses: bool,
    /// Directory for storing debug logs
    pub log_directory: Option<PathBuf>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            per_page: MAX_PER_PAGE,
            timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_responses: false,
            log_directory: Some(PathBuf::from("gitlab-domains-logs")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("private_token", &"[REDACTED]")
            .field("request", &self.request)
            .field("debug", &self.debug)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(
        base_url: impl Into<CompactString>,
        private_token: impl Into<CompactString>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            private_token: private_token.into(),
            request: RequestConfig::default(),
            debug: DebugConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::config("GitLab URL cannot be empty"));
        }

        if self.private_token.trim().is_empty() {
            return Err(ClientError::config("Private token cannot be empty"));
        }

        let url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::invalid_url(self.base_url.as_str(), e.to_string()))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::invalid_url(
                self.base_url.as_str(),
                "scheme must be http or https",
            ));
        }

        if url.host_str().is_none() {
            return Err(ClientError::invalid_url(self.base_url.as_str(), "missing host"));
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(ClientError::invalid_url(
                self.base_url.as_str(),
                "must not carry a query or fragment",
            ));
        }

        if self.request.per_page == 0 || self.request.per_page > MAX_PER_PAGE {
            return Err(ClientError::config_validation(
                "per_page",
                format!("must be between 1 and {MAX_PER_PAGE}"),
            ));
        }

        if self.request.timeout.is_zero() {
            return Err(ClientError::config_validation(
                "timeout",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Root of the REST API, e.g. `https://gitlab.example.com/api/v4`
    ///
    /// A base URL that already points at the API root is used as is.
    pub fn api_root(&self) -> CompactString {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with(API_PREFIX) {
            base.into()
        } else {
            format_compact!("{base}{API_PREFIX}")
        }
    }
}

impl ClientConfig {
    /// Enable debug logging
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug.log_responses = enabled;
        self
    }

    /// Set items per page
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.request.per_page = per_page;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request.timeout = timeout;
        self
    }

    /// Accept self-signed or otherwise invalid TLS certificates
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.request.accept_invalid_certs = accept;
        self
    }
}
