//! Runtime component handing out authorized Google API clients.

use std::path::PathBuf;

use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::{AccessToken, ApiClientError, ClientSecret, OAuthClient, OAuthClientConfig, store};

pub const DEFAULT_APPLICATION_NAME: &str = "My Application";

/// A typed wrapper around one Google API.
pub trait GoogleService: Sized {
    /// Discovery name of the API, e.g. `gmail`.
    const API_NAME: &'static str;

    fn from_client(client: AuthorizedClient) -> Self;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleApiClientConfig {
    #[serde(default = "default_application_name")]
    pub application_name: String,
    pub credentials_path: PathBuf,
    pub client_secret_path: PathBuf,
    pub api: String,
}

impl GoogleApiClientConfig {
    pub fn new(
        api: impl Into<String>,
        credentials_path: impl Into<PathBuf>,
        client_secret_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            application_name: default_application_name(),
            credentials_path: credentials_path.into(),
            client_secret_path: client_secret_path.into(),
            api: api.into(),
        }
    }

    pub fn with_application_name(mut self, application_name: impl Into<String>) -> Self {
        self.application_name = application_name.into();
        self
    }
}

fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}

#[derive(Debug, Clone)]
pub struct GoogleApiClient {
    config: GoogleApiClientConfig,
    secret: ClientSecret,
}

impl GoogleApiClient {
    /// Validates the API name and checks that both files exist.
    pub fn new(config: GoogleApiClientConfig) -> Result<Self, ApiClientError> {
        validate_api_name(&config.api)?;

        let secret = ClientSecret::from_file(&config.client_secret_path)?;
        if !config.credentials_path.is_file() {
            return Err(ApiClientError::missing_file(
                "credential",
                &config.credentials_path,
            ));
        }

        Ok(Self { config, secret })
    }

    pub fn config(&self) -> &GoogleApiClientConfig {
        &self.config
    }

    pub fn api(&self) -> &str {
        &self.config.api
    }

    /// The token as currently stored, without refreshing it.
    pub fn access_token(&self) -> Result<AccessToken, ApiClientError> {
        store::load(&self.config.credentials_path)
    }

    /// Loads the stored token, refreshing and persisting it first when it has
    /// expired.
    pub async fn authorized_client(&self) -> Result<AuthorizedClient, ApiClientError> {
        let token = self.access_token()?;
        let token = self.refresh_if_expired(token).await?;
        AuthorizedClient::new(&self.config.application_name, token)
    }

    pub async fn service<S: GoogleService>(&self) -> Result<S, ApiClientError> {
        if S::API_NAME != self.config.api {
            return Err(ApiClientError::UnsupportedApi {
                api: S::API_NAME.to_string(),
                reason: format!("this component is configured for {}", self.config.api),
            });
        }
        Ok(S::from_client(self.authorized_client().await?))
    }

    async fn refresh_if_expired(&self, token: AccessToken) -> Result<AccessToken, ApiClientError> {
        let now = chrono::Utc::now().timestamp();
        if !token.is_expired_at(now) {
            debug!(api = %self.config.api, "stored access token still valid");
            return Ok(token);
        }

        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or(ApiClientError::MissingRefreshToken)?;
        let client = OAuthClient::new(OAuthClientConfig::new(self.secret.clone()))?;
        let response = client.refresh_token(refresh_token).await?;

        let refreshed = token.refreshed(response, now);
        store::save(&self.config.credentials_path, &refreshed)?;
        info!(api = %self.config.api, "access token refreshed");
        Ok(refreshed)
    }
}

/// Discovery names are plain ASCII identifiers such as `gmail` or
/// `youtubeAnalytics`.
fn validate_api_name(api: &str) -> Result<(), ApiClientError> {
    let unsupported = |reason: &str| ApiClientError::UnsupportedApi {
        api: api.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = api.chars();
    match chars.next() {
        None => Err(unsupported("api name is empty")),
        Some(first) if !first.is_ascii_alphabetic() => {
            Err(unsupported("api name must start with a letter"))
        }
        Some(_) if chars.all(|c| c.is_ascii_alphanumeric()) => Ok(()),
        Some(_) => Err(unsupported("api name must be alphanumeric")),
    }
}

/// HTTP client that authenticates every request with the bearer token.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http: Client,
    token: AccessToken,
}

impl AuthorizedClient {
    pub fn new(application_name: &str, token: AccessToken) -> Result<Self, ApiClientError> {
        let http = Client::builder().user_agent(application_name).build()?;
        Ok(Self { http, token })
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.token
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token.access_token)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiClientError> {
        debug!(%url, "google api request");
        let response = self.request(Method::GET, url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|err| ApiClientError::InvalidResponse {
            message: err.to_string(),
            body,
        })
    }
}
