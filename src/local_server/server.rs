use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::{ApiClientError, AuthorizationResponse};

use super::config::LocalServerConfig;
use super::http::{CallbackState, Pages, callback_handler, next_outcome, not_found};
use super::target::RedirectTarget;

/// Waits for Google's redirect on a loopback port and hands back the code.
#[derive(Debug, Clone)]
pub struct LocalServer {
    target: RedirectTarget,
    pages: Arc<Pages>,
    timeout: Option<Duration>,
}

impl Default for LocalServer {
    fn default() -> Self {
        Self::from_config(LocalServerConfig::default())
    }
}

impl LocalServer {
    pub fn from_config(config: LocalServerConfig) -> Self {
        Self {
            target: config.target(),
            pages: Arc::new(Pages {
                success: config.success_html,
                error: config.error_html,
            }),
            timeout: config.timeout,
        }
    }

    pub fn from_redirect_uri(redirect_uri: &str) -> Result<Self, ApiClientError> {
        LocalServerConfig::from_redirect_uri(redirect_uri).map(Self::from_config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn bind(&self) -> Result<TcpListener, ApiClientError> {
        let listener = TcpListener::bind((self.target.host.as_str(), self.target.port))?;
        debug!(addr = ?listener.local_addr().ok(), "loopback listener bound");
        Ok(listener)
    }

    /// Redirect URI matching the port `listener` is actually bound to.
    pub fn redirect_uri_for(&self, listener: &TcpListener) -> Result<String, ApiClientError> {
        Ok(self.target.bound_to(listener.local_addr()?).redirect_uri())
    }

    /// Blocking variant of [`LocalServer::listen_with_async`], driven by its
    /// own single-threaded runtime.
    pub fn listen_with(&self, listener: TcpListener) -> Result<AuthorizationResponse, ApiClientError> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(self.listen_with_async(listener))
    }

    pub async fn listen_with_async(
        &self,
        listener: TcpListener,
    ) -> Result<AuthorizationResponse, ApiClientError> {
        let target = self.target.bound_to(listener.local_addr()?);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(1);
        let state = CallbackState {
            target: target.clone(),
            pages: Arc::clone(&self.pages),
            outcome_tx: outcome_tx.clone(),
        };

        let app = Router::new()
            .route(&target.path, get(callback_handler))
            .fallback(not_found)
            .with_state(state);

        listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(listener)?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let serving = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await;
            if let Err(err) = served {
                let _ = outcome_tx.try_send(Err(ApiClientError::Io(err)));
            }
        });

        let outcome = next_outcome(&mut outcome_rx, self.timeout).await;
        let _ = stop_tx.send(());
        let _ = serving.await;
        outcome
    }
}
