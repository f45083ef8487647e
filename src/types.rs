use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ApiClientError;

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorization_url: String,
    pub redirect_uri: String,
    pub pkce: crate::PkcePair,
    pub state: String,
    pub scope: String,
}

#[derive(Debug, Clone)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

impl AuthorizationResponse {
    pub fn from_callback(code: &str, state: Option<&str>) -> Self {
        Self {
            code: code.to_string(),
            state: state.map(str::to_string),
        }
    }

    /// Parses the URL Google redirected the browser to.
    pub fn from_url(callback_url: &str) -> Result<Self, ApiClientError> {
        let url = Url::parse(callback_url)?;
        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.to_string()),
                "state" => state = Some(value.to_string()),
                "error" => error = Some(value.to_string()),
                "error_description" => description = Some(value.to_string()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(ApiClientError::Authorization { error, description });
        }

        let code = code.ok_or(ApiClientError::MissingAuthorizationCode)?;
        Ok(Self::from_callback(&code, state.as_deref()))
    }

    /// Accepts what a user pastes at the prompt: either the bare code or the
    /// whole redirected URL copied from the browser's address bar.
    pub fn from_input(input: &str) -> Result<Self, ApiClientError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ApiClientError::MissingAuthorizationCode);
        }
        if input.starts_with("http://") || input.starts_with("https://") {
            return Self::from_url(input);
        }
        Ok(Self::from_callback(input, None))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub id_token: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Error body returned by Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenErrorResponse {
    pub error: String,
    pub error_description: Option<String>,
}
