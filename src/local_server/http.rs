use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::Html,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{ApiClientError, AuthorizationResponse};

use super::target::RedirectTarget;

pub(super) type Outcome = Result<AuthorizationResponse, ApiClientError>;

/// Pages shown to the browser once the redirect has been handled.
#[derive(Debug)]
pub(super) struct Pages {
    pub(super) success: String,
    pub(super) error: String,
}

#[derive(Clone)]
pub(super) struct CallbackState {
    pub(super) target: RedirectTarget,
    pub(super) pages: Arc<Pages>,
    pub(super) outcome_tx: mpsc::Sender<Outcome>,
}

impl CallbackState {
    /// Only the first outcome is kept; later ones are dropped.
    pub(super) fn finish(&self, outcome: Outcome) {
        if self.outcome_tx.try_send(outcome).is_err() {
            debug!("loopback outcome already delivered");
        }
    }

    fn page(&self, status: StatusCode) -> (StatusCode, Html<String>) {
        let body = if status.is_success() {
            &self.pages.success
        } else {
            &self.pages.error
        };
        (status, Html(body.clone()))
    }
}

pub(super) async fn callback_handler(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, Html<String>) {
    let outcome = state
        .target
        .build_callback_url(query.as_deref().unwrap_or_default())
        .and_then(|url| AuthorizationResponse::from_url(&url));

    match outcome {
        Ok(response) => {
            debug!("authorization code received on loopback listener");
            state.finish(Ok(response));
            state.page(StatusCode::OK)
        }
        // A hit without a code keeps the listener waiting.
        Err(ApiClientError::MissingAuthorizationCode) => state.page(StatusCode::BAD_REQUEST),
        Err(error) => {
            warn!(%error, "google redirected with an error");
            state.finish(Err(error));
            state.page(StatusCode::BAD_REQUEST)
        }
    }
}

pub(super) async fn not_found(State(state): State<CallbackState>) -> (StatusCode, Html<String>) {
    state.page(StatusCode::NOT_FOUND)
}

pub(super) async fn next_outcome(
    outcome_rx: &mut mpsc::Receiver<Outcome>,
    timeout: Option<Duration>,
) -> Outcome {
    let received = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, outcome_rx.recv())
            .await
            .map_err(|_| ApiClientError::LocalServerTimeout { timeout })?,
        None => outcome_rx.recv().await,
    };

    received.unwrap_or_else(|| {
        Err(ApiClientError::InvalidResponse {
            message: "loopback listener stopped before a response arrived".to_string(),
            body: String::new(),
        })
    })
}
