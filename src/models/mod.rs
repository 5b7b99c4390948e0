//! Model provider abstractions.
//!
//! Defines the [`ModelProvider`] trait, the [`ChatMessage`] type,
//! [`ProviderManager`] for retry/fallback semantics, and the concrete
//! providers ([`OpenAIProvider`], [`StubProvider`]).

pub mod openai;
pub mod stub;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, ModelConfig};

pub use openai::OpenAIProvider;
pub use stub::StubProvider;

// ---------------------------------------------------------------------------
// ChatMessage – shared message representation
// ---------------------------------------------------------------------------

/// A single chat message with a role and content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every LLM backend.
///
/// Each provider knows how to turn a list of chat messages into a
/// single assistant reply string.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send a sequence of chat messages and return the assistant's reply.
    async fn send_chat(&self, messages: &[ChatMessage]) -> Result<String, anyhow::Error>;

    /// Short label used in logs.
    fn name(&self) -> &str {
        "provider"
    }
}

// ---------------------------------------------------------------------------
// ProviderManager
// ---------------------------------------------------------------------------

/// Manages an ordered list of providers with per-provider retry and
/// automatic fallback to the next provider on exhaustion.
///
/// Implements [`ModelProvider`] itself so it can be used transparently
/// anywhere a single provider is expected.
pub struct ProviderManager {
    providers: Vec<Box<dyn ModelProvider>>,
    max_retries: usize,
}

impl ProviderManager {
    /// * `providers` – ordered list (first = preferred).
    /// * `max_retries` – attempts per provider (clamped to ≥ 1).
    pub fn new(providers: Vec<Box<dyn ModelProvider>>, max_retries: usize) -> Self {
        Self {
            providers,
            max_retries: max_retries.max(1),
        }
    }

    /// Number of configured providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Send chat messages with automatic retries and provider fallback.
    ///
    /// For each provider in order, retries up to `max_attempts` times
    /// with exponential backoff (100 ms × 2^attempt).  Falls through to
    /// the next provider when all attempts are exhausted.
    ///
    /// Permanent errors (400, 401, 403, 404, 422) skip remaining retries
    /// for that provider and immediately fall through to the next one.
    pub async fn send_chat_with_retry(
        &self,
        messages: &[ChatMessage],
        max_attempts: usize,
    ) -> Result<String, anyhow::Error> {
        let attempts = max_attempts.max(1);
        let mut last_err = anyhow::anyhow!("no providers configured");

        for (idx, provider) in self.providers.iter().enumerate() {
            for attempt in 0..attempts {
                match provider.send_chat(messages).await {
                    Ok(reply) => return Ok(reply),
                    Err(e) => {
                        let is_permanent = is_permanent_error(&e);
                        warn!(
                            provider = provider.name(),
                            provider_idx = idx,
                            attempt = attempt + 1,
                            max_attempts = attempts,
                            permanent = is_permanent,
                            error = %e,
                            "provider call failed"
                        );
                        last_err = e;

                        if is_permanent {
                            break;
                        }

                        if attempt + 1 < attempts {
                            let delay = Duration::from_millis(100 * 2u64.pow(attempt as u32));
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }
            warn!(provider_idx = idx, "all retries exhausted, trying next provider");
        }

        Err(last_err.context("all providers exhausted"))
    }
}

/// Whether an error is an HTTP failure that retrying cannot fix.
///
/// Providers format status errors as "… returned 401: …".
fn is_permanent_error(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    ["400", "401", "403", "404", "422"]
        .iter()
        .any(|code| msg.contains(&format!("returned {code}")))
}

#[async_trait]
impl ModelProvider for ProviderManager {
    async fn send_chat(&self, messages: &[ChatMessage]) -> Result<String, anyhow::Error> {
        self.send_chat_with_retry(messages, self.max_retries).await
    }

    fn name(&self) -> &str {
        "provider-manager"
    }
}

// ---------------------------------------------------------------------------
// Provider factory
// ---------------------------------------------------------------------------

/// Build one provider from its config entry.
///
/// * `openai` → [`OpenAIProvider`] when an API key resolves (config
///   value, `$ENV` reference, or `OPENAI_API_KEY`), otherwise
///   [`StubProvider`] with a warning.
/// * `stub` → [`StubProvider`].
pub fn build_provider(mc: &ModelConfig) -> anyhow::Result<Box<dyn ModelProvider>> {
    match mc.provider.as_str() {
        "openai" | "openai-compat" => {
            let key = resolve_api_key(mc.api_key.as_deref());
            if key.is_empty() {
                warn!(model = %mc.id, "no API key for openai provider, using stub replies");
                return Ok(Box::new(StubProvider));
            }
            let endpoint = mc
                .endpoint
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_ENDPOINT.to_string());
            let model = mc
                .model
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            Ok(Box::new(OpenAIProvider::with_config(key, endpoint, model)?))
        }
        "stub" => Ok(Box::new(StubProvider)),
        other => anyhow::bail!("model '{}': unknown provider kind '{}'", mc.id, other),
    }
}

/// Build the [`ProviderManager`] for all configured models, in order.
pub fn build_provider_manager(cfg: &Config) -> anyhow::Result<ProviderManager> {
    let providers = cfg
        .models
        .iter()
        .map(build_provider)
        .collect::<anyhow::Result<Vec<_>>>()?;
    info!(
        providers = providers.len(),
        max_retries = cfg.max_retries,
        "model providers ready"
    );
    Ok(ProviderManager::new(providers, cfg.max_retries))
}

/// Config value → `$ENV` reference → `OPENAI_API_KEY` → empty.
fn resolve_api_key(config_key: Option<&str>) -> String {
    if let Some(k) = config_key.filter(|k| !k.is_empty()) {
        return crate::config::resolve_secret(k);
    }
    std::env::var("OPENAI_API_KEY").unwrap_or_default()
}
