use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

pub const LEGACY_API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCandidatePayload {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A completed legacy call. `body` holds the parsed JSON body when the
/// response was JSON, the raw text as a JSON string otherwise, or `None`
/// for an empty body.
#[derive(Debug, Clone)]
pub struct LegacyResponse {
    pub ok: bool,
    pub status: u16,
    pub body: Option<JsonValue>,
}

impl LegacyResponse {
    /// The `message` field of a structured response body, if any.
    pub fn message(&self) -> Option<String> {
        match &self.body {
            Some(JsonValue::Object(map)) => map.get("message").map(|message| match message {
                JsonValue::String(text) => text.clone(),
                other => other.to_string(),
            }),
            _ => None,
        }
    }
}

/// The request never completed: connect failure, timeout, or a broken body
/// stream. Distinct from a completed non-success response.
#[derive(Debug, thiserror::Error)]
pub enum LegacyError {
    #[error("legacy request failed: {0}")]
    Transport(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LegacySync: Send + Sync {
    async fn notify(
        &self,
        endpoint: &str,
        api_key: &str,
        candidate: &LegacyCandidatePayload,
    ) -> Result<LegacyResponse, LegacyError>;
}

#[derive(Clone)]
pub struct LegacyClient {
    client: Client,
}

impl LegacyClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client for legacy API");
        Self { client }
    }
}

impl Default for LegacyClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LegacySync for LegacyClient {
    async fn notify(
        &self,
        endpoint: &str,
        api_key: &str,
        candidate: &LegacyCandidatePayload,
    ) -> Result<LegacyResponse, LegacyError> {
        let response = self
            .client
            .post(endpoint)
            .header(LEGACY_API_KEY_HEADER, api_key)
            .json(candidate)
            .send()
            .await
            .map_err(|e| LegacyError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let text = response
            .text()
            .await
            .map_err(|e| LegacyError::Transport(e.to_string()))?;

        let body = if text.is_empty() {
            None
        } else {
            match serde_json::from_str::<JsonValue>(&text) {
                Ok(parsed) => Some(parsed),
                Err(_) => Some(JsonValue::String(text)),
            }
        };

        if ok {
            info!(status, email = %candidate.email, "legacy API accepted candidate");
        } else {
            warn!(status, email = %candidate.email, "legacy API rejected candidate");
        }

        Ok(LegacyResponse { ok, status, body })
    }
}
