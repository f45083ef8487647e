//! Application-level wiring: where credentials live, which runtime
//! components exist, and how `@runtime`-style paths resolve.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::console::Console;
use crate::discovery::{DISCOVERY_URL, DiscoveryClient};
use crate::{ApiClientError, CredentialStore, GoogleApiClient, GoogleApiClientConfig, GoogleCommand};

const RUNTIME_ALIAS: &str = "@runtime";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub id: String,
    pub runtime_dir: PathBuf,
    /// Directory that receives credential files.
    pub config_path: String,
    pub client_secret_path: String,
    pub discovery_url: String,
    pub components: BTreeMap<String, GoogleApiClientConfig>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            id: "google".to_string(),
            runtime_dir: PathBuf::from("runtime"),
            config_path: "@runtime/google-apiclient/".to_string(),
            client_secret_path: "@runtime/google-apiclient/secret.json".to_string(),
            discovery_url: DISCOVERY_URL.to_string(),
            components: BTreeMap::new(),
        }
    }
}

impl ModuleConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ApiClientError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ApiClientError::missing_file("module config", path));
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
pub struct Module {
    config: ModuleConfig,
}

impl Module {
    pub fn new(config: ModuleConfig) -> Self {
        Self { config }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Expands `@runtime` to the runtime directory and a leading `~` to the
    /// home directory. Other paths pass through untouched.
    pub fn resolve_path(&self, raw: impl AsRef<Path>) -> Result<PathBuf, ApiClientError> {
        let raw = raw.as_ref();
        let Some(text) = raw.to_str() else {
            return Ok(raw.to_path_buf());
        };

        if let Some(rest) = text.strip_prefix('@') {
            let (alias, tail) = rest.split_once('/').unwrap_or((rest, ""));
            if format!("@{alias}") != RUNTIME_ALIAS {
                return Err(ApiClientError::InvalidAlias(format!("@{alias}")));
            }
            return Ok(join_tail(&self.config.runtime_dir, tail));
        }

        if text == "~" || text.starts_with("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                ApiClientError::InvalidAlias("~ (home directory unknown)".to_string())
            })?;
            return Ok(join_tail(&home, text.trim_start_matches('~').trim_start_matches('/')));
        }

        Ok(raw.to_path_buf())
    }

    pub fn credentials_dir(&self) -> Result<PathBuf, ApiClientError> {
        self.resolve_path(&self.config.config_path)
    }

    pub fn client_secret_path(&self) -> Result<PathBuf, ApiClientError> {
        self.resolve_path(&self.config.client_secret_path)
    }

    pub fn discovery(&self) -> DiscoveryClient {
        DiscoveryClient::with_directory_url(&self.config.discovery_url)
    }

    /// Console command wired to this module's directories.
    pub fn command<C: Console>(&self, console: C) -> Result<GoogleCommand<C>, ApiClientError> {
        let store = CredentialStore::new(self.credentials_dir()?);
        Ok(GoogleCommand::new(console, self.discovery(), store))
    }

    pub fn component(&self, id: &str) -> Result<GoogleApiClient, ApiClientError> {
        let config = self
            .config
            .components
            .get(id)
            .ok_or_else(|| ApiClientError::UnknownComponent(id.to_string()))?;

        let resolved = GoogleApiClientConfig {
            credentials_path: self.resolve_path(&config.credentials_path)?,
            client_secret_path: self.resolve_path(&config.client_secret_path)?,
            ..config.clone()
        };
        GoogleApiClient::new(resolved)
    }
}

fn join_tail(base: &Path, tail: &str) -> PathBuf {
    if tail.is_empty() {
        base.to_path_buf()
    } else {
        base.join(tail)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{Module, ModuleConfig};
    use crate::ApiClientError;

    fn module() -> Module {
        Module::new(ModuleConfig {
            runtime_dir: PathBuf::from("/srv/app/runtime"),
            ..ModuleConfig::default()
        })
    }

    #[test]
    fn runtime_alias_expands_to_runtime_dir() {
        let module = module();
        assert_eq!(
            module.client_secret_path().unwrap(),
            PathBuf::from("/srv/app/runtime/google-apiclient/secret.json")
        );
        assert_eq!(
            module.resolve_path("@runtime").unwrap(),
            PathBuf::from("/srv/app/runtime")
        );
    }

    #[test]
    fn plain_paths_are_untouched() {
        assert_eq!(
            module().resolve_path("config/secret.json").unwrap(),
            PathBuf::from("config/secret.json")
        );
    }

    #[test]
    fn unknown_alias_is_rejected() {
        let result = module().resolve_path("@webroot/secret.json");
        assert!(matches!(result, Err(ApiClientError::InvalidAlias(alias)) if alias == "@webroot"));
    }

    #[test]
    fn config_fills_defaults_and_components() {
        let config: ModuleConfig = serde_json::from_str(
            r#"{"runtime_dir":"/tmp/rt","components":{"gmail":{
                "credentials_path":"@runtime/google-apiclient/gmail_1.json",
                "client_secret_path":"@runtime/google-apiclient/secret.json",
                "api":"gmail"}}}"#,
        )
        .unwrap();
        assert_eq!(config.id, "google");
        let gmail = &config.components["gmail"];
        assert_eq!(gmail.application_name, "My Application");
        assert_eq!(gmail.api, "gmail");
    }

    #[test]
    fn unknown_component_is_reported() {
        let result = module().component("calendar");
        assert!(matches!(result, Err(ApiClientError::UnknownComponent(id)) if id == "calendar"));
    }
}
