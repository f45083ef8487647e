use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::TokenResponse;

/// Seconds before the real expiry at which a token already counts as expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// Access token as persisted in a credential file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Unix timestamp of when the token was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl AccessToken {
    pub fn from_response(response: TokenResponse, now: i64) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            scope: response.scope,
            id_token: response.id_token,
            created: Some(now),
            extra: response.extra,
        }
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        let (Some(created), Some(expires_in)) = (self.created, self.expires_in) else {
            return true;
        };
        let expires_in = i64::try_from(expires_in).unwrap_or(i64::MAX);
        created
            .saturating_add(expires_in)
            .saturating_sub(EXPIRY_LEEWAY_SECS)
            < now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Applies a refresh-grant response on top of this token.
    ///
    /// Google usually omits `refresh_token` from refresh responses; the stored
    /// one stays valid and is carried over.
    pub fn refreshed(&self, response: TokenResponse, now: i64) -> Self {
        let previous_refresh = self.refresh_token.clone();
        let mut token = Self::from_response(response, now);
        if token.refresh_token.is_none() {
            token.refresh_token = previous_refresh;
        }
        token
    }
}
