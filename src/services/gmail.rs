use serde::Deserialize;
use url::Url;

use crate::{ApiClientError, AuthorizedClient, GoogleService};

// References:
// - https://developers.google.com/gmail/api/reference/rest/v1/users.messages/list
// - https://developers.google.com/gmail/api/reference/rest/v1/users.messages/get

pub const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/";

const INBOX_LABEL: &str = "INBOX";
const SUBJECT_HEADER: &str = "Subject";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    #[default]
    Full,
    Metadata,
    Minimal,
    Raw,
}

impl MessageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageFormat::Full => "full",
            MessageFormat::Metadata => "metadata",
            MessageFormat::Minimal => "minimal",
            MessageFormat::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListMessagesParams {
    pub max_results: Option<u32>,
    pub label_ids: Vec<String>,
    pub q: Option<String>,
    pub page_token: Option<String>,
}

impl ListMessagesParams {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(max_results) = self.max_results {
            query.push(("maxResults", max_results.to_string()));
        }
        for label in &self.label_ids {
            query.push(("labelIds", label.clone()));
        }
        if let Some(q) = &self.q {
            query.push(("q", q.clone()));
        }
        if let Some(page_token) = &self.page_token {
            query.push(("pageToken", page_token.clone()));
        }
        query
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
    pub next_page_token: Option<String>,
    pub result_size_estimate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<MessageHeader>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: Option<String>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    pub snippet: Option<String>,
    pub payload: Option<MessagePart>,
}

impl Message {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|header| header.name.eq_ignore_ascii_case(name))
            .map(|header| header.value.as_str())
    }
}

/// Minimal Gmail API binding: enough to read the mailbox.
#[derive(Debug, Clone)]
pub struct Gmail {
    client: AuthorizedClient,
    base_url: String,
}

impl GoogleService for Gmail {
    const API_NAME: &'static str = "gmail";

    fn from_client(client: AuthorizedClient) -> Self {
        Self {
            client,
            base_url: GMAIL_BASE_URL.to_string(),
        }
    }
}

impl Gmail {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn client(&self) -> &AuthorizedClient {
        &self.client
    }

    pub async fn list_messages(
        &self,
        user_id: &str,
        params: &ListMessagesParams,
    ) -> Result<ListMessagesResponse, ApiClientError> {
        let url = self.endpoint(&["users", user_id, "messages"])?;
        let query = params.query();
        let query: Vec<(&str, &str)> = query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        self.client.get_json(url.as_str(), &query).await
    }

    pub async fn get_message(
        &self,
        user_id: &str,
        id: &str,
        format: MessageFormat,
    ) -> Result<Message, ApiClientError> {
        let url = self.endpoint(&["users", user_id, "messages", id])?;
        self.client
            .get_json(url.as_str(), &[("format", format.as_str())])
            .await
    }

    /// Subject of the newest inbox message, `None` when the inbox is empty.
    pub async fn latest_inbox_subject(
        &self,
        user_id: &str,
    ) -> Result<Option<String>, ApiClientError> {
        let params = ListMessagesParams {
            max_results: Some(1),
            label_ids: vec![INBOX_LABEL.to_string()],
            ..ListMessagesParams::default()
        };
        let list = self.list_messages(user_id, &params).await?;
        let Some(latest) = list.messages.first() else {
            return Ok(None);
        };

        let message = self
            .get_message(user_id, &latest.id, MessageFormat::Full)
            .await?;
        Ok(Some(
            message.header(SUBJECT_HEADER).unwrap_or_default().to_string(),
        ))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiClientError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| ApiClientError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
