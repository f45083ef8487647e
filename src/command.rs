//! The `configure` / `list` console command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::console::Console;
use crate::discovery::{ApiCatalog, DirectoryItem, DiscoveryClient, RestDescription};
use crate::{
    AccessToken, ApiClientError, AuthorizationResponse, ClientSecret, CredentialStore,
    OAuthClient, OAuthClientConfig, TokenResponse, store,
};
#[cfg(feature = "local-server")]
use crate::LocalServerConfig;

/// How the authorization code gets back to the command.
#[derive(Debug, Clone, Default)]
pub enum AuthorizationMode {
    /// The user pastes the code, or the whole redirected URL, at a prompt.
    #[default]
    Manual,
    /// A loopback listener catches Google's redirect.
    #[cfg(feature = "local-server")]
    LocalServer(LocalServerConfig),
}

#[derive(Debug, Clone)]
pub struct ConfigureOutcome {
    pub api: String,
    pub version: String,
    pub scopes: Vec<String>,
    pub credentials_path: PathBuf,
}

pub struct GoogleCommand<C> {
    console: C,
    discovery: DiscoveryClient,
    store: CredentialStore,
    timeout: Option<Duration>,
}

impl<C: Console> GoogleCommand<C> {
    pub fn new(console: C, discovery: DiscoveryClient, store: CredentialStore) -> Self {
        Self {
            console,
            discovery,
            store,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Walks the user through picking an API, a version and scopes, then runs
    /// the consent flow and writes the resulting credential file.
    pub async fn configure(
        &mut self,
        client_secret_path: impl AsRef<Path>,
        api: Option<&str>,
        mode: &AuthorizationMode,
    ) -> Result<ConfigureOutcome, ApiClientError> {
        let secret = ClientSecret::from_file(client_secret_path)?;

        let catalog = self.discovery.apis().await?;
        let api = pick_api(&mut self.console, catalog, api)?;
        let item = pick_version(&mut self.console, catalog, &api)?.clone();

        let description = self.discovery.rest_description(&item).await?;
        let scopes = prompt_scopes(&mut self.console, &description)?;

        let credentials_path = self
            .generate_credentials_file(&api, secret, &scopes, mode)
            .await?;
        self.console.print(&format!(
            "Credentials saved to {}\n",
            credentials_path.display()
        ))?;

        Ok(ConfigureOutcome {
            api,
            version: item.version,
            scopes,
            credentials_path,
        })
    }

    /// Prints one line per API, or one per API version with `show_all_versions`.
    pub async fn list(&mut self, show_all_versions: bool) -> Result<(), ApiClientError> {
        let catalog = self.discovery.apis().await?;
        for (_, versions) in catalog.iter() {
            if show_all_versions {
                for item in versions {
                    self.console.print(&format!("{} - {}", item.id, item.title))?;
                }
            } else if let Some(item) = versions.first() {
                self.console.print(&format!("{} - {}", item.name, item.title))?;
            }
        }
        Ok(())
    }

    async fn generate_credentials_file(
        &mut self,
        api: &str,
        secret: ClientSecret,
        scopes: &[String],
        mode: &AuthorizationMode,
    ) -> Result<PathBuf, ApiClientError> {
        let mut config = OAuthClientConfig::new(secret).with_scopes(scopes.iter().cloned());
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        let response = match mode {
            AuthorizationMode::Manual => {
                let client = OAuthClient::new(config)?;
                self.authorize_manually(&client).await?
            }
            #[cfg(feature = "local-server")]
            AuthorizationMode::LocalServer(server) => {
                let client = OAuthClient::new(config.with_local_server_config(server.clone()))?;
                self.authorize_on_loopback(&client).await?
            }
        };

        let token = AccessToken::from_response(response, chrono::Utc::now().timestamp());
        let path = self.store.new_credentials_path(api);
        store::save(&path, &token)?;
        info!(api, path = %path.display(), "credentials generated");
        Ok(path)
    }

    /// Each attempt gets a fresh listener, state and PKCE pair.
    #[cfg(feature = "local-server")]
    async fn authorize_on_loopback(
        &mut self,
        client: &OAuthClient,
    ) -> Result<TokenResponse, ApiClientError> {
        loop {
            let console = &mut self.console;
            let result = client
                .run_local_flow(|request| {
                    console.print(&format!(
                        "Open the following link in your browser:\n  {}\n",
                        request.authorization_url
                    ))?;
                    console.open_url(&request.authorization_url)
                })
                .await;
            match result {
                Ok(token) => return Ok(token),
                Err(err) if err.is_rejected_code() => {
                    warn!(%err, "loopback authorization rejected");
                    self.console.print_error(&err.to_string())?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn authorize_manually(
        &mut self,
        client: &OAuthClient,
    ) -> Result<TokenResponse, ApiClientError> {
        let request = client.authorization_url()?;
        self.console.print(&format!(
            "Open the following link in your browser:\n  {}\n",
            request.authorization_url
        ))?;
        self.console.open_url(&request.authorization_url)?;
        self.console.print(
            "After approving, paste the code, or the full address your browser was redirected to.",
        )?;

        loop {
            let input = self.console.prompt("Enter the verification code:")?;
            let result = match AuthorizationResponse::from_input(&input) {
                Ok(response) => client.exchange_code(&request, response).await,
                Err(err) => Err(err),
            };
            match result {
                Ok(token) => return Ok(token),
                Err(err) if err.is_rejected_code() => {
                    warn!(%err, "verification code rejected");
                    self.console.print_error(&err.to_string())?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn pick_api<C: Console>(
    console: &mut C,
    catalog: &ApiCatalog,
    requested: Option<&str>,
) -> Result<String, ApiClientError> {
    let requested = requested.map(str::trim).filter(|api| !api.is_empty());
    if let Some(api) = requested {
        if catalog.contains(api) {
            return Ok(api.to_string());
        }
        console.print_error(&format!(
            "Error: Unknown API requested: {api}, prompting for the correct one.."
        ))?;
    }

    if catalog.is_empty() {
        return Err(ApiClientError::UnknownApi(
            requested.unwrap_or_default().to_string(),
        ));
    }

    let options: Vec<(String, String)> = catalog
        .iter()
        .filter_map(|(name, versions)| {
            versions
                .first()
                .map(|item| (name.to_string(), item.title.clone()))
        })
        .collect();

    console.print("")?;
    console.select("Pick an API to connect to", &options)
}

fn pick_version<'a, C: Console>(
    console: &mut C,
    catalog: &'a ApiCatalog,
    api: &str,
) -> Result<&'a DirectoryItem, ApiClientError> {
    let versions = catalog
        .get(api)
        .ok_or_else(|| ApiClientError::UnknownApi(api.to_string()))?;

    match versions {
        [] => Err(ApiClientError::UnknownApi(api.to_string())),
        [only] => Ok(only),
        _ => {
            console.print("")?;
            let question = format!("The {api} API has several versions. Install preferred version?");
            if console.confirm(&question, true)? {
                if let Some(item) = catalog.preferred_version(api) {
                    return Ok(item);
                }
                console.print_error(&format!("The {api} API has no preferred version."))?;
            }

            let options: Vec<(String, String)> = versions
                .iter()
                .map(|item| (item.version.clone(), item.title.clone()))
                .collect();
            console.print("")?;
            let version = console.select("Pick the desired version number", &options)?;
            catalog
                .version(api, &version)
                .ok_or_else(|| ApiClientError::UnknownApi(format!("{api}:{version}")))
        }
    }
}

fn prompt_scopes<C: Console>(
    console: &mut C,
    description: &RestDescription,
) -> Result<Vec<String>, ApiClientError> {
    let available = description.scopes();
    if available.is_empty() {
        return Ok(Vec::new());
    }

    console.print("\nAvailable scopes :")?;
    for (scope, text) in &available {
        console.print(&format!("  {scope}\t\t{text}"))?;
    }

    loop {
        let input = console.prompt("Please enter the required scopes separated by a comma:")?;
        match parse_scopes(&input, &available) {
            Ok(scopes) if !scopes.is_empty() => return Ok(scopes),
            Ok(_) => continue,
            Err(unknown) => {
                warn!(scope = %unknown, "unknown scope entered");
                console.print_error("Error in the input string, prompting again...\n")?;
            }
        }
    }
}

/// Splits a comma separated scope list. Returns the first entry that is not
/// one of `available` as the error.
fn parse_scopes(input: &str, available: &BTreeMap<&str, &str>) -> Result<Vec<String>, String> {
    let mut scopes: Vec<String> = Vec::new();
    for entry in input.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        if !available.contains_key(entry) {
            return Err(entry.to_string());
        }
        if !scopes.iter().any(|known| known == entry) {
            scopes.push(entry.to_string());
        }
    }
    Ok(scopes)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use super::{parse_scopes, pick_api, pick_version};
    use crate::console::LineConsole;
    use crate::discovery::{ApiCatalog, DirectoryItem};

    const READONLY: &str = "https://www.googleapis.com/auth/gmail.readonly";
    const LABELS: &str = "https://www.googleapis.com/auth/gmail.labels";

    fn available() -> BTreeMap<&'static str, &'static str> {
        BTreeMap::from([(READONLY, "View your email"), (LABELS, "Manage labels")])
    }

    fn item(name: &str, version: &str, preferred: bool) -> DirectoryItem {
        DirectoryItem {
            id: format!("{name}:{version}"),
            name: name.to_string(),
            version: version.to_string(),
            title: format!("{name} {version}"),
            description: String::new(),
            discovery_rest_url: String::new(),
            preferred,
        }
    }

    fn console(input: &str) -> LineConsole<Cursor<Vec<u8>>, Vec<u8>, Vec<u8>> {
        LineConsole::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), Vec::new())
    }

    #[test]
    fn parse_scopes_trims_and_skips_blanks() {
        let scopes = parse_scopes(&format!(" {READONLY} ,, {LABELS},{READONLY}"), &available());
        assert_eq!(scopes, Ok(vec![READONLY.to_string(), LABELS.to_string()]));
    }

    #[test]
    fn parse_scopes_reports_unknown_entry() {
        let scopes = parse_scopes(&format!("{READONLY},drive"), &available());
        assert_eq!(scopes, Err("drive".to_string()));
    }

    #[test]
    fn unknown_api_prompts_for_a_known_one() {
        let catalog = ApiCatalog::from_items([item("drive", "v3", true), item("gmail", "v1", true)]);
        let mut console = console("gmail\n");

        let api = pick_api(&mut console, &catalog, Some("gmial")).unwrap();

        assert_eq!(api, "gmail");
        let err = String::from_utf8(console.err().clone()).unwrap();
        assert!(err.contains("Error: Unknown API requested: gmial, prompting for the correct one.."));
    }

    #[test]
    fn known_api_is_used_without_prompting() {
        let catalog = ApiCatalog::from_items([item("gmail", "v1", true)]);
        let mut console = console("");
        assert_eq!(pick_api(&mut console, &catalog, Some("gmail")).unwrap(), "gmail");
        let picked = pick_version(&mut console, &catalog, "gmail").unwrap();
        assert_eq!(picked.version, "v1");
        assert!(console.out().is_empty());
    }

    #[test]
    fn preferred_version_is_installed_on_confirmation() {
        let catalog =
            ApiCatalog::from_items([item("drive", "v2", false), item("drive", "v3", true)]);
        let mut console = console("yes\n");
        assert_eq!(pick_version(&mut console, &catalog, "drive").unwrap().version, "v3");
    }

    #[test]
    fn declining_preferred_version_prompts_for_one() {
        let catalog =
            ApiCatalog::from_items([item("drive", "v2", false), item("drive", "v3", true)]);
        let mut console = console("no\nv2\n");
        assert_eq!(pick_version(&mut console, &catalog, "drive").unwrap().version, "v2");
        let out = String::from_utf8(console.out().clone()).unwrap();
        assert!(out.contains("Pick the desired version number [v2,v3,?]:"));
    }
}
