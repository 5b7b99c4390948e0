//! Thin JSON-over-HTTP client for a tool backend.
//!
//! Every tool owns one of these (clients are never shared between
//! tools).  All failures come back as [`ToolError`] so the tool can turn
//! them into a failure envelope.

use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::ToolError;

/// Longest backend error body we keep in a [`ToolError::Backend`].
const MAX_ERROR_BODY: usize = 2_000;

#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    /// Build a client for the backend at `base_url`.
    ///
    /// `timeout` bounds each whole request (connect + response).
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .context("building HTTP client for tool backend")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL for `path` relative to the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        crate::utils::join_url(&self.base_url, path)
    }

    /// POST `body` as JSON to `path` and decode the JSON reply.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, ToolError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path);
        debug!(%url, "calling tool backend");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let body = text.trim();
            let message = if body.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_string()
            } else {
                crate::utils::truncate_str(body, MAX_ERROR_BODY)
            };
            return Err(ToolError::Backend {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| ToolError::MalformedResponse(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout(self.timeout)
        } else if err.is_decode() {
            ToolError::MalformedResponse(err.to_string())
        } else {
            ToolError::Transport(err.to_string())
        }
    }
}
