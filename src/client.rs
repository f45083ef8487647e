use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::pkce::generate_state;
use crate::types::TokenErrorResponse;
use crate::{
    ApiClientError, AuthorizationRequest, AuthorizationResponse, ClientSecret, PkcePair,
    TokenResponse,
};
#[cfg(feature = "local-server")]
use crate::{LocalServer, LocalServerConfig};

pub const ACCESS_TYPE_OFFLINE: &str = "offline";

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub secret: ClientSecret,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub access_type: String,
    pub prompt: Option<String>,
    pub authorize_params: Vec<(String, String)>,
    pub token_params: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    #[cfg(feature = "local-server")]
    pub local_server: Option<LocalServerConfig>,
}

impl OAuthClientConfig {
    pub fn new(secret: ClientSecret) -> Self {
        let redirect_uri = secret.default_redirect_uri().to_string();
        Self {
            secret,
            redirect_uri,
            scopes: Vec::new(),
            access_type: ACCESS_TYPE_OFFLINE.to_string(),
            prompt: None,
            authorize_params: Vec::new(),
            token_params: Vec::new(),
            timeout: None,
            #[cfg(feature = "local-server")]
            local_server: None,
        }
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_access_type(mut self, access_type: impl Into<String>) -> Self {
        self.access_type = access_type.into();
        self
    }

    /// `consent` forces Google to issue a new refresh token.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[cfg(feature = "local-server")]
    pub fn with_local_server_config(mut self, local_server: LocalServerConfig) -> Self {
        self.local_server = Some(local_server);
        self
    }

    pub fn with_authorize_param(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.authorize_params.push((key.into(), value.into()));
        self
    }

    pub fn with_token_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.token_params.push((key.into(), value.into()));
        self
    }

    pub fn scope(&self) -> String {
        self.scopes.join(" ")
    }
}

/// OAuth 2.0 client for Google's installed-application flow.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthClientConfig,
    http: Client,
}

impl OAuthClient {
    pub fn new(config: OAuthClientConfig) -> Result<Self, ApiClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    pub fn with_http_client(config: OAuthClientConfig, http: Client) -> Self {
        Self { config, http }
    }

    pub fn config(&self) -> &OAuthClientConfig {
        &self.config
    }

    pub fn authorization_url(&self) -> Result<AuthorizationRequest, ApiClientError> {
        self.authorization_url_for(&self.config.redirect_uri)
    }

    pub fn authorization_url_for(
        &self,
        redirect_uri: &str,
    ) -> Result<AuthorizationRequest, ApiClientError> {
        let pkce = PkcePair::generate()?;
        let state = generate_state()?;
        let scope = self.config.scope();

        let mut params: Vec<(String, String)> = vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), self.config.secret.client_id.clone()),
            ("redirect_uri".to_string(), redirect_uri.to_string()),
            ("scope".to_string(), scope.clone()),
            ("access_type".to_string(), self.config.access_type.clone()),
            ("code_challenge".to_string(), pkce.code_challenge.clone()),
            ("code_challenge_method".to_string(), "S256".to_string()),
            ("state".to_string(), state.clone()),
        ];
        if let Some(prompt) = &self.config.prompt {
            params.push(("prompt".to_string(), prompt.clone()));
        }
        for (key, value) in &self.config.authorize_params {
            set_param(&mut params, key, value.clone());
        }

        let mut url = Url::parse(&self.config.secret.auth_uri)?;
        url.query_pairs_mut().extend_pairs(params);

        Ok(AuthorizationRequest {
            authorization_url: url.to_string(),
            redirect_uri: redirect_uri.to_string(),
            pkce,
            state,
            scope,
        })
    }

    /// Runs the consent flow against a one-shot listener on the loopback
    /// interface. `on_authorize` is called once the listener is ready.
    #[cfg(feature = "local-server")]
    pub async fn run_local_flow<F>(&self, on_authorize: F) -> Result<TokenResponse, ApiClientError>
    where
        F: FnOnce(&AuthorizationRequest) -> Result<(), ApiClientError>,
    {
        let server = LocalServer::from_config(self.config.local_server.clone().unwrap_or_default());
        let listener = server.bind()?;
        let redirect_uri = server.redirect_uri_for(&listener)?;
        let request = self.authorization_url_for(&redirect_uri)?;

        let handle = tokio::spawn(async move { server.listen_with_async(listener).await });

        if let Err(err) = on_authorize(&request) {
            handle.abort();
            return Err(err);
        }

        let response = handle.await.map_err(|err| ApiClientError::InvalidResponse {
            message: err.to_string(),
            body: String::new(),
        })??;

        self.exchange_code(&request, response).await
    }

    pub async fn exchange_code(
        &self,
        request: &AuthorizationRequest,
        response: AuthorizationResponse,
    ) -> Result<TokenResponse, ApiClientError> {
        let AuthorizationResponse { code, state } = response;

        if let Some(returned) = state.as_deref() {
            if returned != request.state {
                return Err(ApiClientError::StateMismatch {
                    expected: request.state.clone(),
                    received: returned.to_string(),
                });
            }
        }

        let mut payload = HashMap::new();
        payload.insert("grant_type".to_string(), "authorization_code".to_string());
        payload.insert("code".to_string(), code);
        payload.insert("redirect_uri".to_string(), request.redirect_uri.clone());
        payload.insert(
            "code_verifier".to_string(),
            request.pkce.code_verifier.clone(),
        );

        self.send_token_request(payload).await
    }

    pub async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenResponse, ApiClientError> {
        let mut payload = HashMap::new();
        payload.insert("grant_type".to_string(), "refresh_token".to_string());
        payload.insert("refresh_token".to_string(), refresh_token.to_string());

        self.send_token_request(payload).await
    }

    async fn send_token_request(
        &self,
        mut payload: HashMap<String, String>,
    ) -> Result<TokenResponse, ApiClientError> {
        let secret = &self.config.secret;
        payload.insert("client_id".to_string(), secret.client_id.clone());
        if let Some(client_secret) = &secret.client_secret {
            payload.insert("client_secret".to_string(), client_secret.clone());
        }
        for (key, value) in &self.config.token_params {
            payload.insert(key.clone(), value.clone());
        }

        debug!(
            token_uri = %secret.token_uri,
            grant_type = payload.get("grant_type").map(String::as_str).unwrap_or_default(),
            "sending token request"
        );

        let response = self
            .http
            .post(&secret.token_uri)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<TokenErrorResponse>(&body) {
                return Err(ApiClientError::Authorization {
                    error: error.error,
                    description: error.error_description,
                });
            }
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

fn set_param(params: &mut Vec<(String, String)>, key: &str, value: String) {
    if let Some((_, existing)) = params.iter_mut().find(|(param, _)| param == key) {
        *existing = value;
    } else {
        params.push((key.to_string(), value));
    }
}
