use std::net::SocketAddr;

use url::Url;

use crate::ApiClientError;

#[derive(Debug, Clone)]
pub(super) struct RedirectTarget {
    pub(super) host: String,
    pub(super) port: u16,
    pub(super) path: String,
}

impl RedirectTarget {
    pub(super) fn new(host: &str, port: u16, path: &str) -> Self {
        Self {
            host: host.to_string(),
            port,
            path: path.to_string(),
        }
    }

    pub(super) fn parse(redirect_uri: &str) -> Result<Self, ApiClientError> {
        let url = Url::parse(redirect_uri)?;
        if url.scheme() != "http" {
            return Err(ApiClientError::InvalidRedirectUri(
                "loopback redirect uri must use http scheme".to_string(),
            ));
        }

        let host = url.host_str().ok_or_else(|| {
            ApiClientError::InvalidRedirectUri("redirect uri is missing host".to_string())
        })?;

        let port = url.port_or_known_default().ok_or_else(|| {
            ApiClientError::InvalidRedirectUri("redirect uri is missing port".to_string())
        })?;

        Ok(Self::new(host, port, url.path()))
    }

    /// Same target, pinned to the port the OS actually handed out.
    pub(super) fn bound_to(&self, addr: SocketAddr) -> Self {
        Self {
            port: addr.port(),
            ..self.clone()
        }
    }

    pub(super) fn redirect_uri(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }

    pub(super) fn build_callback_url(&self, query: &str) -> Result<String, ApiClientError> {
        let base = self.redirect_uri();

        if query.is_empty() {
            return Ok(base);
        }

        let url = Url::parse(&format!("{base}?{query}"))?;
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::RedirectTarget;

    #[test]
    fn parses_loopback_target() {
        let target = RedirectTarget::parse("http://127.0.0.1:8085/oauth2callback").unwrap();
        assert_eq!(target.host, "127.0.0.1");
        assert_eq!(target.port, 8085);
        assert_eq!(target.path, "/oauth2callback");
    }

    #[test]
    fn rejects_https_redirects() {
        assert!(RedirectTarget::parse("https://example.com/callback").is_err());
    }

    #[test]
    fn bound_target_uses_assigned_port() {
        let target = RedirectTarget::new("127.0.0.1", 0, "/");
        let bound = target.bound_to("127.0.0.1:49152".parse().unwrap());
        assert_eq!(bound.redirect_uri(), "http://127.0.0.1:49152/");
        assert_eq!(
            bound.build_callback_url("code=abc&state=s").unwrap(),
            "http://127.0.0.1:49152/?code=abc&state=s"
        );
    }
}
