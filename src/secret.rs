//! Google OAuth client secret files.
//!
//! These are the JSON documents downloaded from the Google Cloud console. The
//! interesting fields sit under a single `installed` (desktop clients) or
//! `web` key.

use std::path::Path;

use serde::Deserialize;

use crate::ApiClientError;

pub(crate) const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub(crate) const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_REDIRECT_URI: &str = "http://localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Installed,
    Web,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(skip, default = "default_kind")]
    pub kind: ClientKind,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Some(client_secret.into()),
            auth_uri: default_auth_uri(),
            token_uri: default_token_uri(),
            redirect_uris: Vec::new(),
            project_id: None,
            kind: ClientKind::Installed,
        }
    }

    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ApiClientError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ApiClientError::missing_file("client secret", path));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ApiClientError> {
        let file: ClientSecretFile = serde_json::from_str(raw)
            .map_err(|err| ApiClientError::InvalidClientSecret(err.to_string()))?;

        let secret = match (file.installed, file.web) {
            (Some(secret), _) => secret,
            (None, Some(secret)) => ClientSecret {
                kind: ClientKind::Web,
                ..secret
            },
            (None, None) => {
                return Err(ApiClientError::InvalidClientSecret(
                    "expected an \"installed\" or \"web\" section".to_string(),
                ));
            }
        };

        if secret.client_id.trim().is_empty() {
            return Err(ApiClientError::InvalidClientSecret(
                "client_id is empty".to_string(),
            ));
        }
        Ok(secret)
    }

    /// Redirect URI used when the user pastes the code by hand.
    pub fn default_redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_REDIRECT_URI)
    }
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

fn default_kind() -> ClientKind {
    ClientKind::Installed
}
