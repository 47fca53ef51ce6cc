//! Core HTTP client for GitLab API

use std::time::Duration;

use chrono::Local;
use compact_str::{format_compact, CompactString};
use reqwest::{
    header::{HeaderMap, RETRY_AFTER},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
    pages::{Page, UserPages},
};
use crate::domain::{CurrentUserDto, UserDto};

/// Header GitLab uses to announce the following page of a listing
const NEXT_PAGE_HEADER: &str = "x-next-page";

/// Pure HTTP client for GitLab API
#[derive(Debug, Clone)]
pub struct GitlabApi {
    client: Client,
    config: ClientConfig,
}

/// GitLab API error response formats
#[derive(Debug, Deserialize)]
struct GitlabApiError {
    error: CompactString,
    error_description: Option<CompactString>,
}

#[derive(Debug, Deserialize)]
struct GitlabApiError2 {
    message: serde_json::Value,
}

impl GitlabApi {
    /// Create a new GitLab API client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request.timeout)
            .danger_accept_invalid_certs(config.request.accept_invalid_certs)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, config })
    }

    /// Lazily page through every user of the instance
    pub fn users(&self) -> UserPages<'_> {
        UserPages::new(self, self.config.request.per_page)
    }

    /// Get a single page of the users listing
    #[instrument(skip(self))]
    pub async fn get_users_page(&self, page: u32, per_page: u32) -> Result<Page<UserDto>> {
        let url = self.build_users_url(page, per_page);
        let response = self.authenticated_request(&url).send().await?;

        let next_page = next_page_header(response.headers());
        let items: Vec<UserDto> = self.handle_response(response).await?;

        Ok(Page::new(page, items, next_page))
    }

    /// Validate API connection and credentials
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<CurrentUserDto> {
        let url = format_compact!("{}/user", self.config.api_root());
        let response = self.authenticated_request(&url).send().await?;
        let user: CurrentUserDto = self.handle_response(response).await?;

        debug!(username = %user.username, "Connection validation successful");
        Ok(user)
    }

    /// Get current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // Private helper methods

    /// Create authenticated request builder
    fn authenticated_request(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header("PRIVATE-TOKEN", self.config.private_token.as_str())
    }

    /// Handle HTTP response and deserialize JSON
    async fn handle_response<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url_path = response.url().path().to_string();
        let status = response.status();
        let retry_after = retry_after_header(response.headers());
        let body = response.text().await?;

        // Log response if debug is enabled
        if self.config.debug.log_responses {
            self.log_response_to_file(&url_path, &body);
        }

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| ClientError::json_parse(url_path, e))
        } else {
            Err(self.handle_error_response(status, retry_after, &body))
        }
    }

    /// Handle error responses from GitLab API
    fn handle_error_response(
        &self,
        status: StatusCode,
        retry_after: Option<Duration>,
        body: &str,
    ) -> ClientError {
        let api_error = serde_json::from_str::<GitlabApiError>(body).ok();

        match status {
            StatusCode::UNAUTHORIZED => match api_error {
                Some(e) if e.error == "invalid_token" => {
                    let expired = e
                        .error_description
                        .is_some_and(|d| d.to_lowercase().contains("expired"));
                    if expired {
                        ClientError::ExpiredToken
                    } else {
                        ClientError::InvalidToken
                    }
                },
                _ => ClientError::Authentication,
            },
            StatusCode::NOT_FOUND => ClientError::not_found(format!(
                "{} (is the GitLab URL correct?)",
                self.config.api_root()
            )),
            StatusCode::TOO_MANY_REQUESTS => ClientError::rate_limit(retry_after),
            _ => {
                // Try to parse GitLab API error formats
                if let Some(api_error) = api_error {
                    ClientError::gitlab_api(format_compact!(
                        "HTTP {}: {} {}",
                        status.as_u16(),
                        api_error.error,
                        api_error.error_description.unwrap_or_default()
                    ))
                } else if let Ok(api_error2) = serde_json::from_str::<GitlabApiError2>(body) {
                    let message = match api_error2.message {
                        serde_json::Value::String(message) => message,
                        other => other.to_string(),
                    };
                    ClientError::gitlab_api(format_compact!("HTTP {}: {}", status.as_u16(), message))
                } else {
                    ClientError::gitlab_api(format_compact!("HTTP {}: {}", status.as_u16(), body))
                }
            },
        }
    }

    /// Build URL for users endpoint
    fn build_users_url(&self, page: u32, per_page: u32) -> CompactString {
        format_compact!(
            "{}/users?per_page={}&page={}",
            self.config.api_root(),
            per_page,
            page
        )
    }

    /// Log HTTP response to file for debugging
    fn log_response_to_file(&self, path: &str, body: &str) {
        if let Some(log_dir) = &self.config.debug.log_directory {
            if !log_dir.exists() {
                if let Err(e) = std::fs::create_dir_all(log_dir) {
                    warn!("Failed to create log directory: {}", e);
                    return;
                }
            }

            let filename = format!(
                "{}_{}.json",
                Local::now().format("%Y-%m-%d_%H-%M-%S%.3f"),
                path.replace('/', "_")
            );

            let log_path = log_dir.join(filename);

            if let Err(e) = std::fs::write(&log_path, body) {
                warn!("Failed to write response log to {:?}: {}", log_path, e);
            } else {
                debug!("Response logged to {:?}", log_path);
            }
        }
    }
}

/// `Some(None)` when the header is present but empty, which marks the last page
fn next_page_header(headers: &HeaderMap) -> Option<Option<u32>> {
    let value = headers.get(NEXT_PAGE_HEADER)?.to_str().ok()?.trim();
    if value.is_empty() {
        Some(None)
    } else {
        value.parse().ok().map(Some)
    }
}

fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}
