//! Integration tests for GitLab client modules

use std::time::Duration;

use serde_json::json;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, ResponseTemplate,
};

use crate::client::{api::GitlabApi, config::ClientConfig, error::ClientError};

use super::{
    current_user_json, gitlab_error_response, gitlab_error_response_2, user_json, MockServer,
    CURRENT_USER_PATH, USERS_PATH,
};

#[tokio::test]
async fn test_collect_all_follows_next_page_header() {
    let mock_server = MockServer::start().await;

    mock_server
        .mount_users_page(
            1,
            json!([
                user_json("alice", Some("alice@example.com")),
                user_json("bob", None),
            ]),
            Some(2),
        )
        .await;
    mock_server
        .mount_users_page(2, json!([user_json("carol", Some("carol@corp.io"))]), None)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let users = api.users().collect_all().await.unwrap();

    let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, ["alice", "bob", "carol"]);
    assert_eq!(users[0].email.as_deref(), Some("alice@example.com"));
    assert_eq!(users[1].email, None);
}

#[tokio::test]
async fn test_collect_all_stops_at_empty_page_without_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([user_json("dave", Some("d@x.org"))])),
        )
        .expect(1)
        .mount(&mock_server.server)
        .await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let users = api.users().collect_all().await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].username, "dave");
}

#[tokio::test]
async fn test_pages_are_lazy_and_restartable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user_json("a", None), user_json("b", None)]))
                .insert_header("x-next-page", "2"),
        )
        .expect(2)
        .mount(&mock_server.server)
        .await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user_json("c", None)]))
                .insert_header("x-next-page", ""),
        )
        .expect(1)
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config().with_per_page(2)).unwrap();
    let mut pages = api.users();

    let first = pages.next_page().await.unwrap().unwrap();
    assert_eq!(first.len(), 2);

    pages.restart();
    let all = pages.collect_all().await.unwrap();
    assert_eq!(all.len(), 3);

    // exhausted cursors make no further requests
    assert!(pages.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_users_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .and(header("PRIVATE-TOKEN", "test-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(gitlab_error_response_2(
            "401 Unauthorized",
        )))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let result = api.users().collect_all().await;

    assert!(matches!(result, Err(ClientError::Authentication)));
}

#[tokio::test]
async fn test_users_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let result = api.users().collect_all().await;

    assert!(matches!(result, Err(ClientError::JsonParse { .. })));
}

#[tokio::test]
async fn test_users_rate_limited() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let result = api.users().collect_all().await;

    assert!(matches!(
        result,
        Err(ClientError::RateLimit { retry_after: Some(d) }) if d == Duration::from_secs(30)
    ));
}

#[tokio::test]
async fn test_users_timeout_is_network_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(USERS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server.server)
        .await;

    let config = mock_server.test_config().with_timeout(Duration::from_millis(100));
    let api = GitlabApi::new(config).unwrap();
    let err = api.users().collect_all().await.unwrap_err();

    assert!(err.is_network_error());
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let config = ClientConfig::new("http://127.0.0.1:1", "test-token")
        .with_timeout(Duration::from_secs(2));
    let api = GitlabApi::new(config).unwrap();

    let err = api.users().collect_all().await.unwrap_err();
    assert!(err.is_network_error());
}

#[tokio::test]
async fn test_validate_connection_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .and(header("PRIVATE-TOKEN", "test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_user_json("root", true)))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let user = api.validate_connection().await.unwrap();

    assert_eq!(user.username, "root");
    assert_eq!(user.is_admin, Some(true));
}

#[tokio::test]
async fn test_validate_connection_expired_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(gitlab_error_response(
            "invalid_token",
            Some("Token is expired. You can either do re-authorization or token refresh."),
        )))
        .mount(&mock_server.server)
        .await;

    let api = GitlabApi::new(mock_server.test_config()).unwrap();
    let err = api.validate_connection().await.unwrap_err();

    assert!(matches!(err, ClientError::ExpiredToken));
    assert!(err.is_authentication());
}

#[tokio::test]
async fn test_base_url_with_api_prefix() {
    let mock_server = MockServer::start().await;
    mock_server.mount_current_user().await;

    let config = ClientConfig::new(format!("{}/api/v4/", mock_server.base_url()), "test-token");
    let api = GitlabApi::new(config).unwrap();

    assert!(api.validate_connection().await.is_ok());
}

#[tokio::test]
async fn test_config_validation_in_integration() {
    // Test invalid URL
    let result = GitlabApi::new(ClientConfig::new("not-a-url", "token"));
    assert!(result.is_err());

    // Test empty token
    let result = GitlabApi::new(ClientConfig::new("https://gitlab.com", ""));
    assert!(result.is_err());

    // Test valid config
    let result = GitlabApi::new(ClientConfig::new("https://gitlab.com", "token"));
    assert!(result.is_ok());
}
