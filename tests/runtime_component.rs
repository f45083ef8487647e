mod common;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use google_apiclient::services::Gmail;
use google_apiclient::{
    AccessToken, ApiClientError, GoogleApiClient, GoogleApiClientConfig, Module, ModuleConfig,
    store,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn stored_token(created: i64, refresh_token: Option<&str>) -> AccessToken {
    AccessToken {
        access_token: "ya29.stored".to_string(),
        token_type: Some("Bearer".to_string()),
        expires_in: Some(3599),
        refresh_token: refresh_token.map(str::to_string),
        scope: Some(common::GMAIL_READONLY.to_string()),
        id_token: None,
        created: Some(created),
        extra: HashMap::new(),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn component(dir: &Path, server: &MockServer, token: &AccessToken) -> (GoogleApiClient, PathBuf) {
    let secret = common::write_secret(dir, &format!("{}/token", server.uri()));
    let credentials = dir.join("gmail_6f1c.json");
    store::save(&credentials, token).unwrap();
    let config = GoogleApiClientConfig::new("gmail", &credentials, secret)
        .with_application_name("apiclient-tests");
    (GoogleApiClient::new(config).unwrap(), credentials)
}

#[tokio::test]
async fn expired_token_is_refreshed_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=1%2F%2Fstored"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::token_body("ya29.refreshed", None)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, credentials) = component(dir.path(), &server, &stored_token(now() - 7200, Some("1//stored")));

    let authorized = client.authorized_client().await.unwrap();
    assert_eq!(authorized.access_token().access_token, "ya29.refreshed");

    let saved = store::load(&credentials).unwrap();
    assert_eq!(saved.access_token, "ya29.refreshed");
    assert_eq!(saved.refresh_token.as_deref(), Some("1//stored"));
    assert!(!saved.is_expired());

    // The refreshed token is reused on the next call.
    let again = client.authorized_client().await.unwrap();
    assert_eq!(again.access_token().access_token, "ya29.refreshed");
}

#[tokio::test]
async fn valid_token_is_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token = stored_token(now(), Some("1//stored"));
    let (client, credentials) = component(dir.path(), &server, &token);

    let authorized = client.authorized_client().await.unwrap();
    assert_eq!(authorized.access_token(), &token);
    assert_eq!(store::load(&credentials).unwrap(), token);
}

#[tokio::test]
async fn expired_token_without_refresh_token_fails() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let (client, _) = component(dir.path(), &server, &stored_token(now() - 7200, None));

    let result = client.authorized_client().await;
    assert!(matches!(result, Err(ApiClientError::MissingRefreshToken)));
}

#[tokio::test]
async fn revoked_refresh_token_surfaces_google_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token = stored_token(now() - 7200, Some("1//revoked"));
    let (client, credentials) = component(dir.path(), &server, &token);

    match client.authorized_client().await {
        Err(ApiClientError::Authorization { error, .. }) => assert_eq!(error, "invalid_grant"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(store::load(&credentials).unwrap(), token);
}

#[tokio::test]
async fn typed_service_must_match_configured_api() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let secret = common::write_secret(dir.path(), &format!("{}/token", server.uri()));
    let credentials = dir.path().join("drive_1.json");
    store::save(&credentials, &stored_token(now(), None)).unwrap();

    let client = GoogleApiClient::new(GoogleApiClientConfig::new("drive", credentials, secret)).unwrap();
    let result = client.service::<Gmail>().await;
    assert!(matches!(result, Err(ApiClientError::UnsupportedApi { .. })));
}

#[tokio::test]
async fn gmail_demo_reads_latest_inbox_subject() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("maxResults", "1"))
        .and(query_param("labelIds", "INBOX"))
        .and(header("authorization", "Bearer ya29.stored"))
        .and(header("user-agent", "apiclient-tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "18c2f", "threadId": "18c2f"}],
            "resultSizeEstimate": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/18c2f"))
        .and(query_param("format", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "18c2f",
            "threadId": "18c2f",
            "labelIds": ["INBOX"],
            "payload": {"headers": [
                {"name": "From", "value": "noreply@example.com"},
                {"name": "Subject", "value": "Your weekly digest"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, _) = component(dir.path(), &server, &stored_token(now(), Some("1//r")));

    let gmail = client
        .service::<Gmail>()
        .await
        .unwrap()
        .with_base_url(format!("{}/gmail/v1/", server.uri()));
    let subject = gmail.latest_inbox_subject("me").await.unwrap();
    assert_eq!(subject.as_deref(), Some("Your weekly digest"));
}

#[tokio::test]
async fn gmail_demo_handles_empty_inbox() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"resultSizeEstimate": 0})))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let (client, _) = component(dir.path(), &server, &stored_token(now(), None));

    let gmail = client
        .service::<Gmail>()
        .await
        .unwrap()
        .with_base_url(format!("{}/gmail/v1/", server.uri()));
    assert_eq!(gmail.latest_inbox_subject("me").await.unwrap(), None);
}

#[tokio::test]
async fn module_builds_components_from_runtime_paths() {
    let server = MockServer::start().await;
    let runtime = tempfile::tempdir().unwrap();
    let dir = runtime.path().join("google-apiclient");
    std::fs::create_dir_all(&dir).unwrap();
    common::write_secret(&dir, &format!("{}/token", server.uri()));
    store::save(dir.join("gmail_abc.json"), &stored_token(now(), None)).unwrap();

    let config: ModuleConfig = serde_json::from_value(json!({
        "runtime_dir": runtime.path(),
        "components": {
            "gmail": {
                "application_name": "Inbox Peek",
                "credentials_path": "@runtime/google-apiclient/gmail_abc.json",
                "client_secret_path": "@runtime/google-apiclient/secret.json",
                "api": "gmail"
            }
        }
    }))
    .unwrap();
    let module = Module::new(config);

    let client = module.component("gmail").unwrap();
    assert_eq!(client.config().credentials_path, dir.join("gmail_abc.json"));
    assert_eq!(client.config().application_name, "Inbox Peek");
    assert_eq!(client.access_token().unwrap().access_token, "ya29.stored");
}
