//! Google API credential setup and token refresh.
//!
//! The console side discovers Google APIs, lets the user pick an API, version
//! and scopes, and stores the resulting OAuth 2.0 token. The runtime side
//! ([`GoogleApiClient`]) reads that token back, refreshes it when it has
//! expired and hands out an authorized HTTP client.

mod client;
mod command;
pub mod console;
pub mod discovery;
mod error;
#[cfg(feature = "local-server")]
mod local_server;
mod module;
mod pkce;
mod secret;
mod service;
pub mod services;
pub mod store;
mod token;
mod types;

pub use client::{ACCESS_TYPE_OFFLINE, OAuthClient, OAuthClientConfig};
pub use command::{AuthorizationMode, ConfigureOutcome, GoogleCommand};
pub use console::{Console, LineConsole};
pub use discovery::{ApiCatalog, DirectoryItem, DiscoveryClient, RestDescription};
pub use error::ApiClientError;
#[cfg(feature = "local-server")]
pub use local_server::{LocalServer, LocalServerConfig};
pub use module::{Module, ModuleConfig};
pub use pkce::PkcePair;
pub use secret::{ClientKind, ClientSecret};
pub use service::{
    AuthorizedClient, DEFAULT_APPLICATION_NAME, GoogleApiClient, GoogleApiClientConfig,
    GoogleService,
};
pub use store::CredentialStore;
pub use token::{AccessToken, EXPIRY_LEEWAY_SECS};
pub use types::{AuthorizationRequest, AuthorizationResponse, TokenResponse};
