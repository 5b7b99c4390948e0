//! OpenAI chat-completions provider.
//!
//! Any server speaking the chat-completions interface works by pointing
//! `endpoint` at it:
//!
//! ```yaml
//! models:
//!   - id: openai-default
//!     provider: openai
//!     model: gpt-4
//!     api_key: $OPENAI_API_KEY
//!   - id: local-llama
//!     provider: openai
//!     model: llama3
//!     endpoint: http://localhost:11434/v1/chat/completions
//!     api_key: unused
//! ```

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ChatMessage, ModelProvider};

/// Default endpoint for OpenAI chat completions.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Model requested when the config names none.
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Provider that talks to the OpenAI-compatible chat completions API.
pub struct OpenAIProvider {
    api_key: String,
    endpoint: String,
    client: Client,
    /// Model name sent in the request body (e.g. "gpt-4").
    model: String,
}

impl OpenAIProvider {
    /// Create a provider with explicit configuration.
    pub fn with_config(api_key: String, endpoint: String, model: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client for model provider")?;
        Ok(Self {
            api_key,
            endpoint,
            client,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    async fn send_chat(&self, messages: &[ChatMessage]) -> Result<String, anyhow::Error> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
        };
        debug!(model = %self.model, messages = messages.len(), "sending chat completion");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "OpenAI API returned {status}: {}",
                crate::utils::truncate_str(&text, 2_000)
            );
        }

        let parsed: CompletionResponse = resp
            .json()
            .await
            .context("OpenAI response was not valid JSON")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
