#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};

use google_apiclient::LineConsole;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GMAIL_READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
pub const GMAIL_LABELS: &str = "https://www.googleapis.com/auth/gmail.labels";

pub type ScriptedConsole = LineConsole<Cursor<Vec<u8>>, Vec<u8>, Vec<u8>>;

pub fn console(input: &str) -> ScriptedConsole {
    LineConsole::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), Vec::new())
}

pub fn stdout(console: &ScriptedConsole) -> String {
    String::from_utf8(console.out().clone()).unwrap()
}

pub fn stderr(console: &ScriptedConsole) -> String {
    String::from_utf8(console.err().clone()).unwrap()
}

/// Writes an installed-app client secret whose token endpoint is `token_uri`.
pub fn write_secret(dir: &Path, token_uri: &str) -> PathBuf {
    let path = dir.join("secret.json");
    let secret = json!({
        "installed": {
            "client_id": "1234.apps.googleusercontent.com",
            "project_id": "apiclient-tests",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": token_uri,
            "client_secret": "GOCSPX-test",
            "redirect_uris": ["http://localhost"]
        }
    });
    std::fs::write(&path, serde_json::to_string_pretty(&secret).unwrap()).unwrap();
    path
}

pub fn directory_url(server: &MockServer) -> String {
    format!("{}/discovery/v1/apis", server.uri())
}

/// Serves a two-API directory: drive (v2, v3 preferred) and gmail (v1).
pub async fn mount_discovery(server: &MockServer) {
    let rest = |name: &str, version: &str| {
        format!("{}/discovery/v1/apis/{name}/{version}/rest", server.uri())
    };
    let directory = json!({
        "kind": "discovery#directoryList",
        "discoveryVersion": "v1",
        "items": [
            {"kind": "discovery#directoryItem", "id": "gmail:v1", "name": "gmail", "version": "v1",
             "title": "Gmail API", "description": "The Gmail API", "discoveryRestUrl": rest("gmail", "v1"),
             "preferred": true},
            {"kind": "discovery#directoryItem", "id": "drive:v2", "name": "drive", "version": "v2",
             "title": "Google Drive API", "discoveryRestUrl": rest("drive", "v2"), "preferred": false},
            {"kind": "discovery#directoryItem", "id": "drive:v3", "name": "drive", "version": "v3",
             "title": "Google Drive API", "discoveryRestUrl": rest("drive", "v3"), "preferred": true}
        ]
    });
    Mock::given(method("GET"))
        .and(path("/discovery/v1/apis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(directory))
        .mount(server)
        .await;

    let gmail = json!({
        "name": "gmail", "version": "v1", "title": "Gmail API",
        "rootUrl": "https://gmail.googleapis.com/", "servicePath": "",
        "auth": {"oauth2": {"scopes": {
            GMAIL_READONLY: {"description": "View your email messages and settings"},
            GMAIL_LABELS: {"description": "See and edit your email labels"}
        }}}
    });
    Mock::given(method("GET"))
        .and(path("/discovery/v1/apis/gmail/v1/rest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gmail))
        .mount(server)
        .await;

    for version in ["v2", "v3"] {
        let drive = json!({
            "name": "drive", "version": version, "title": "Google Drive API",
            "auth": {"oauth2": {"scopes": {
                "https://www.googleapis.com/auth/drive": {"description": "See, edit, create, and delete all of your Google Drive files"}
            }}}
        });
        Mock::given(method("GET"))
            .and(path(format!("/discovery/v1/apis/drive/{version}/rest")))
            .respond_with(ResponseTemplate::new(200).set_body_json(drive))
            .mount(server)
            .await;
    }
}

pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "access_token": access_token,
        "expires_in": 3599,
        "scope": GMAIL_READONLY,
        "token_type": "Bearer"
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = json!(refresh_token);
    }
    body
}
