use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;

use crate::{AccessToken, ApiClientError};

/// Directory of per-API credential files named `<api>_<uuid>.json`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn new_credentials_path(&self, api: &str) -> PathBuf {
        self.dir.join(format!("{api}_{}.json", Uuid::new_v4()))
    }

    /// Credential files already written for `api`.
    pub fn list(&self, api: &str) -> Result<Vec<PathBuf>, ApiClientError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = format!("{api}_");
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".json"));
            if matches {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Writes `token` to a fresh credential file for `api` and returns its path.
    pub fn create(&self, api: &str, token: &AccessToken) -> Result<PathBuf, ApiClientError> {
        let path = self.new_credentials_path(api);
        save(&path, token)?;
        Ok(path)
    }
}

pub fn load(path: impl AsRef<Path>) -> Result<AccessToken, ApiClientError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ApiClientError::missing_file("credential", path));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save(path: impl AsRef<Path>, token: &AccessToken) -> Result<(), ApiClientError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            create_private_dir(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(token)?;
    write_private(path, json.as_bytes())?;
    info!(path = %path.display(), "credentials written");
    Ok(())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

/// Owner read/write only, including when the file already existed.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    fs::write(path, contents)
}
