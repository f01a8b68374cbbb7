//! The remote reply service.
//!
//! Wire format: request `{ "message": ... }`, response `{ "reply": ... }`.
//! A successful response without a `reply` field is not an error; it maps
//! to the literal [`MISSING_REPLY`] text.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use huddle_core::config::AssistantConfig;
use huddle_core::error::HuddleError;

/// Reply text substituted when the service answers without one.
pub const MISSING_REPLY: &str = "No response";

#[derive(Debug, Serialize)]
struct ReplyRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReplyResponse {
    reply: Option<String>,
}

impl ReplyResponse {
    fn into_text(self) -> String {
        self.reply.unwrap_or_else(|| MISSING_REPLY.to_string())
    }
}

/// Produces the assistant reply for one user message.
#[async_trait]
pub trait ReplyService: Send + Sync {
    async fn reply(&self, message: &str) -> Result<String, HuddleError>;
}

/// HTTP-backed reply service.
///
/// The optional bearer token is attached by configuration; request signing
/// beyond that is out of scope here.
pub struct HttpReplyService {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
}

impl HttpReplyService {
    pub fn new(
        url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, HuddleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HuddleError::Reply(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            api_token,
        })
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self, HuddleError> {
        Self::new(
            config.reply_url.clone(),
            config.api_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

impl std::fmt::Debug for HttpReplyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReplyService")
            .field("url", &self.url)
            .field("has_token", &self.api_token.is_some())
            .finish()
    }
}

#[async_trait]
impl ReplyService for HttpReplyService {
    async fn reply(&self, message: &str) -> Result<String, HuddleError> {
        let mut request = self.client.post(&self.url).json(&ReplyRequest { message });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| HuddleError::Reply(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HuddleError::Reply(format!("HTTP {}", status.as_u16())));
        }

        let body: ReplyResponse = response
            .json()
            .await
            .map_err(|e| HuddleError::Reply(format!("malformed response body: {}", e)))?;

        debug!(chars = body.reply.as_deref().map_or(0, str::len), "Reply received");
        Ok(body.into_text())
    }
}

// =============================================================================
// Tests
// =============================================================================
