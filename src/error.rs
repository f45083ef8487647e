use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("os rng error: {message}")]
    OsRng { message: String },

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("The {kind} file \"{}\" does not exist!", path.display())]
    MissingFile { kind: &'static str, path: PathBuf },

    #[error("unknown api: {0}")]
    UnknownApi(String),

    #[error("unsupported api: {api} ({reason})")]
    UnsupportedApi { api: String, reason: String },

    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("invalid path alias: {0}")]
    InvalidAlias(String),

    #[error("invalid client secret: {0}")]
    InvalidClientSecret(String),

    #[error("invalid redirect uri: {0}")]
    InvalidRedirectUri(String),

    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    #[error("access token expired and no refresh token is stored")]
    MissingRefreshToken,

    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid response: {message}")]
    InvalidResponse { message: String, body: String },

    #[error("authorization failed: {error}{}", description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    Authorization {
        error: String,
        description: Option<String>,
    },

    #[error("missing authorization code in callback url")]
    MissingAuthorizationCode,

    #[error("state mismatch (expected={expected}, received={received})")]
    StateMismatch { expected: String, received: String },

    #[error("prompt failed: {0}")]
    Prompt(String),

    #[cfg(feature = "local-server")]
    #[error("local server timed out after {timeout:?}")]
    LocalServerTimeout { timeout: std::time::Duration },
}

impl ApiClientError {
    pub(crate) fn missing_file(kind: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::MissingFile {
            kind,
            path: path.into(),
        }
    }

    /// Whether the user can recover by entering a different authorization code.
    pub fn is_rejected_code(&self) -> bool {
        matches!(
            self,
            Self::Authorization { .. }
                | Self::HttpStatus { .. }
                | Self::MissingAuthorizationCode
                | Self::StateMismatch { .. }
                | Self::Url(_)
        )
    }
}
