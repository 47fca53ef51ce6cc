//! Test utilities and common test fixtures for client modules

mod integration_tests;

use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::client::config::ClientConfig;

pub const USERS_PATH: &str = "/api/v4/users";
pub const CURRENT_USER_PATH: &str = "/api/v4/user";

/// Create JSON representation of a user as the listing returns it
pub fn user_json(username: &str, email: Option<&str>) -> serde_json::Value {
    let mut user = json!({
        "id": username.len(),
        "username": username,
        "name": username.to_uppercase(),
        "state": "active",
    });

    if let Some(email) = email {
        user["email"] = json!(email);
    }

    user
}

/// Create JSON representation of the authenticated user
pub fn current_user_json(username: &str, is_admin: bool) -> serde_json::Value {
    json!({
        "id": 1,
        "username": username,
        "is_admin": is_admin,
    })
}

/// Create GitLab API error response
pub fn gitlab_error_response(error: &str, description: Option<&str>) -> serde_json::Value {
    let mut json = json!({
        "error": error
    });

    if let Some(desc) = description {
        json["error_description"] = json!(desc);
    }

    json
}

/// Create GitLab API error response (format 2)
pub fn gitlab_error_response_2(message: &str) -> serde_json::Value {
    json!({
        "message": message
    })
}

/// Mock HTTP server for testing
pub struct MockServer {
    pub server: wiremock::MockServer,
}

impl MockServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        let server = wiremock::MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of the mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Create a test config pointing to this mock server
    pub fn test_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url(), "test-token")
    }

    /// Serve `users` as page `page` of the listing, announcing `next_page`
    pub async fn mount_users_page(
        &self,
        page: u32,
        users: serde_json::Value,
        next_page: Option<u32>,
    ) {
        let next = next_page.map(|p| p.to_string()).unwrap_or_default();

        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .and(header("PRIVATE-TOKEN", "test-token"))
            .and(query_param("page", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(users)
                    .insert_header("x-next-page", next.as_str()),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// Answer the connection check for an administrator account
    pub async fn mount_current_user(&self) {
        self.mount_current_user_as("root", true).await;
    }

    /// Answer the connection check for `username`
    pub async fn mount_current_user_as(&self, username: &str, is_admin: bool) {
        Mock::given(method("GET"))
            .and(path(CURRENT_USER_PATH))
            .and(header("PRIVATE-TOKEN", "test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(current_user_json(username, is_admin)),
            )
            .mount(&self.server)
            .await;
    }
}

#[allow(clippy::module_inception)]
mod tests {
    use super::*;

    #[test]
    fn test_user_json() {
        let user = user_json("alice", Some("alice@example.com"));
        assert_eq!(user["username"], "alice");
        assert_eq!(user["email"], "alice@example.com");

        let user = user_json("bob", None);
        assert!(user.get("email").is_none());
    }

    #[test]
    fn test_error_responses() {
        let error1 = gitlab_error_response("invalid_token", Some("Token is invalid"));
        assert_eq!(error1["error"], "invalid_token");
        assert_eq!(error1["error_description"], "Token is invalid");

        let error2 = gitlab_error_response_2("404 Not Found");
        assert_eq!(error2["message"], "404 Not Found");
    }
}
