//! Google API Discovery Service client.
//!
//! The directory endpoint lists every public API version; each entry points
//! to a REST description whose `auth.oauth2.scopes` map is what the configure
//! command offers to the user.

use std::collections::BTreeMap;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::ApiClientError;

pub const DISCOVERY_URL: &str = "https://www.googleapis.com/discovery/v1/apis";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryItem {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discovery_rest_url: String,
    #[serde(default)]
    pub preferred: bool,
}

#[derive(Debug, Deserialize)]
struct DirectoryList {
    #[serde(default)]
    items: Vec<DirectoryItem>,
}

/// Directory entries grouped by API name.
///
/// Names iterate in ascending order; versions of one API keep the order the
/// directory returned them in.
#[derive(Debug, Clone, Default)]
pub struct ApiCatalog {
    apis: BTreeMap<String, Vec<DirectoryItem>>,
}

impl ApiCatalog {
    pub fn from_items(items: impl IntoIterator<Item = DirectoryItem>) -> Self {
        let mut apis: BTreeMap<String, Vec<DirectoryItem>> = BTreeMap::new();
        for item in items {
            let versions = apis.entry(item.name.clone()).or_default();
            match versions.iter_mut().find(|known| known.version == item.version) {
                Some(known) => *known = item,
                None => versions.push(item),
            }
        }
        Self { apis }
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.apis.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&[DirectoryItem]> {
        self.apis.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.apis.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DirectoryItem])> {
        self.apis
            .iter()
            .map(|(name, versions)| (name.as_str(), versions.as_slice()))
    }

    pub fn first_version(&self, name: &str) -> Option<&DirectoryItem> {
        self.get(name).and_then(<[DirectoryItem]>::first)
    }

    pub fn preferred_version(&self, name: &str) -> Option<&DirectoryItem> {
        self.get(name)?.iter().find(|item| item.preferred)
    }

    pub fn version(&self, name: &str, version: &str) -> Option<&DirectoryItem> {
        self.get(name)?.iter().find(|item| item.version == version)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScopeInfo {
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OAuth2Section {
    #[serde(default)]
    scopes: BTreeMap<String, ScopeInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AuthSection {
    #[serde(default)]
    oauth2: Option<OAuth2Section>,
}

/// The parts of a REST description this crate reads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestDescription {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub root_url: String,
    #[serde(default)]
    pub service_path: String,
    #[serde(default)]
    auth: Option<AuthSection>,
}

impl RestDescription {
    /// OAuth scopes keyed by scope URL, empty when the API needs none.
    pub fn scopes(&self) -> BTreeMap<&str, &str> {
        self.auth
            .as_ref()
            .and_then(|auth| auth.oauth2.as_ref())
            .map(|oauth2| {
                oauth2
                    .scopes
                    .iter()
                    .map(|(scope, info)| (scope.as_str(), info.description.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn base_url(&self) -> String {
        format!("{}{}", self.root_url, self.service_path)
    }
}

#[derive(Debug)]
pub struct DiscoveryClient {
    directory_url: String,
    http: Client,
    catalog: OnceCell<ApiCatalog>,
}

impl Default for DiscoveryClient {
    fn default() -> Self {
        Self::with_http_client(DISCOVERY_URL, Client::new())
    }
}

impl DiscoveryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory_url(directory_url: impl Into<String>) -> Self {
        Self::with_http_client(directory_url, Client::new())
    }

    pub fn with_http_client(directory_url: impl Into<String>, http: Client) -> Self {
        Self {
            directory_url: directory_url.into(),
            http,
            catalog: OnceCell::new(),
        }
    }

    pub fn directory_url(&self) -> &str {
        &self.directory_url
    }

    /// Fetches the directory on first use; later calls reuse the result.
    pub async fn apis(&self) -> Result<&ApiCatalog, ApiClientError> {
        self.catalog
            .get_or_try_init(|| async {
                let list: DirectoryList = self.get_json(&self.directory_url).await?;
                let catalog = ApiCatalog::from_items(list.items);
                debug!(apis = catalog.len(), "discovery directory loaded");
                Ok::<_, ApiClientError>(catalog)
            })
            .await
    }

    pub async fn rest_description(
        &self,
        item: &DirectoryItem,
    ) -> Result<RestDescription, ApiClientError> {
        self.get_json(&item.discovery_rest_url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiClientError> {
        debug!(%url, "fetching discovery document");
        let response = self.http.get(url).send().await?;
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
