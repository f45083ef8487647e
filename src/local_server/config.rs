use std::time::Duration;

use crate::ApiClientError;

use super::target::RedirectTarget;

pub(crate) const DEFAULT_SUCCESS_HTML: &str = include_str!("html/success.html");
pub(crate) const DEFAULT_ERROR_HTML: &str = include_str!("html/error.html");

const LOOPBACK_HOST: &str = "127.0.0.1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Where the loopback listener binds. Port `0` lets the OS pick a free port;
/// Google accepts any port for loopback redirects of desktop clients.
#[derive(Debug, Clone)]
pub struct LocalServerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub timeout: Option<Duration>,
    pub success_html: String,
    pub error_html: String,
}

impl Default for LocalServerConfig {
    fn default() -> Self {
        Self::new(LOOPBACK_HOST, 0, "/").with_timeout(DEFAULT_TIMEOUT)
    }
}

impl LocalServerConfig {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            path: normalize_path(path.into()),
            timeout: None,
            success_html: DEFAULT_SUCCESS_HTML.to_string(),
            error_html: DEFAULT_ERROR_HTML.to_string(),
        }
    }

    pub fn from_redirect_uri(redirect_uri: &str) -> Result<Self, ApiClientError> {
        let target = RedirectTarget::parse(redirect_uri)?;
        Ok(Self::new(target.host, target.port, target.path))
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_success_html(mut self, html: impl Into<String>) -> Self {
        self.success_html = html.into();
        self
    }

    pub fn with_error_html(mut self, html: impl Into<String>) -> Self {
        self.error_html = html.into();
        self
    }

    pub(super) fn target(&self) -> RedirectTarget {
        RedirectTarget::new(&self.host, self.port, &self.path)
    }
}

fn normalize_path(path: String) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}
