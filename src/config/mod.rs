use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::tools::{browser, repository, search};

/// Top-level configuration loaded from `config.yaml`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Model provider definitions, tried in order.
    pub models: Vec<ModelConfig>,
    /// Retries per provider before falling through to the next one.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Replaces the built-in assistant instructions when set.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Messages kept behind the system instructions; older turns are
    /// dropped before each new one.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Tool backends and their routing priority.
    #[serde(default)]
    pub tools: ToolsConfig,
}

fn default_max_retries() -> usize {
    2
}

fn default_max_history() -> usize {
    crate::conversation::DEFAULT_MAX_HISTORY
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    /// Directory served for every path that is not an API route.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Bearer token required on `/api/*` (health excluded).  Plain text
    /// or an env-var reference like `$GATEWAY_TOKEN`.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Live chat sessions kept before the least recently used is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            static_dir: default_static_dir(),
            api_token: None,
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_max_sessions() -> usize {
    crate::session::DEFAULT_MAX_SESSIONS
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

/// A configured LLM provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Unique identifier for this provider entry (e.g. "openai-default").
    pub id: String,
    /// Provider kind: "openai" or "stub".
    pub provider: String,
    /// Model name to request (e.g. "gpt-4").
    #[serde(default)]
    pub model: Option<String>,
    /// Chat-completions URL; the public OpenAI endpoint when absent.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// API key (plain text or env-var reference like `$OPENAI_API_KEY`).
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Tool backend sections.  A tool without a section is not registered.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    /// Registration order of the tools; the first tool that claims a
    /// message handles it.
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,
    #[serde(default)]
    pub github: Option<GithubConfig>,
    #[serde(default)]
    pub brave_search: Option<SearchConfig>,
    #[serde(default)]
    pub puppeteer: Option<BrowserConfig>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            github: None,
            brave_search: None,
            puppeteer: None,
        }
    }
}

fn default_priority() -> Vec<String> {
    vec![
        repository::TOOL_ID.to_string(),
        search::TOOL_ID.to_string(),
        browser::TOOL_ID.to_string(),
    ]
}

/// GitHub MCP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GithubConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Username used when a message names no account.
    #[serde(default)]
    pub default_user: Option<String>,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl GithubConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: String::new(),
            default_user: None,
            timeout_secs: default_backend_timeout(),
        }
    }
}

/// Brave Search MCP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_market")]
    pub market: String,
    #[serde(default = "default_safe_search")]
    pub safe_search: String,
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,
}

impl SearchConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: String::new(),
            count: default_count(),
            market: default_market(),
            safe_search: default_safe_search(),
            timeout_secs: default_backend_timeout(),
        }
    }
}

fn default_count() -> u32 {
    5
}

fn default_market() -> String {
    "en-US".to_string()
}

fn default_safe_search() -> String {
    "Moderate".to_string()
}

/// Puppeteer MCP server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserConfig {
    pub base_url: String,
    #[serde(default = "default_browser_timeout")]
    pub timeout_secs: u64,
    /// How long the backend waits after navigation, in milliseconds.
    #[serde(default = "default_wait_time_ms")]
    pub wait_time_ms: u64,
}

impl BrowserConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_browser_timeout(),
            wait_time_ms: default_wait_time_ms(),
        }
    }
}

fn default_backend_timeout() -> u64 {
    30
}

fn default_browser_timeout() -> u64 {
    60
}

fn default_wait_time_ms() -> u64 {
    5_000
}

impl Config {
    /// Read, parse and validate a YAML configuration file.
    pub async fn load(path: &Path) -> anyhow::Result<Config> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml_str(&contents)?;
        tracing::debug!(
            path = %path.display(),
            models = config.models.len(),
            tools = ?config.tools.priority,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Config> {
        let config: Config =
            serde_yaml_ng::from_str(contents).context("failed to parse config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Default config location: `$MCP_GATEWAY_HOME/config.yaml`.
    pub fn default_path() -> PathBuf {
        crate::gateway_home().join("config.yaml")
    }

    /// Validate semantic constraints that serde cannot enforce.
    pub fn validate(&self) -> anyhow::Result<()> {
        use std::collections::HashSet;

        if self.models.is_empty() {
            anyhow::bail!("config: at least one model must be configured");
        }

        if self.max_history == 0 {
            anyhow::bail!("config: max_history must be at least 1");
        }
        if self.server.max_sessions == 0 {
            anyhow::bail!("config: server.max_sessions must be at least 1");
        }

        let mut model_ids = HashSet::new();
        for model in &self.models {
            if !model_ids.insert(model.id.as_str()) {
                anyhow::bail!("config: duplicate model ID: {}", model.id);
            }
        }

        let known = default_priority();
        let mut seen = HashSet::new();
        for id in &self.tools.priority {
            if !known.contains(id) {
                anyhow::bail!("config: unknown tool '{}' in tools.priority", id);
            }
            if !seen.insert(id.as_str()) {
                anyhow::bail!("config: tool '{}' listed twice in tools.priority", id);
            }
        }

        let backends = [
            (
                repository::TOOL_ID,
                self.tools.github.as_ref().map(|c| (&c.base_url, c.timeout_secs)),
            ),
            (
                search::TOOL_ID,
                self.tools
                    .brave_search
                    .as_ref()
                    .map(|c| (&c.base_url, c.timeout_secs)),
            ),
            (
                browser::TOOL_ID,
                self.tools.puppeteer.as_ref().map(|c| (&c.base_url, c.timeout_secs)),
            ),
        ];
        for (id, backend) in backends {
            let Some((base_url, timeout_secs)) = backend else {
                continue;
            };
            if base_url.trim().is_empty() {
                anyhow::bail!("config: tool '{}' has an empty base_url", id);
            }
            if timeout_secs == 0 {
                anyhow::bail!("config: tool '{}' has timeout_secs=0", id);
            }
        }

        Ok(())
    }
}

/// Resolve a secret value.  `$NAME` reads the environment variable
/// `NAME` (empty when unset); anything else is returned as-is.
pub fn resolve_secret(raw: &str) -> String {
    match raw.strip_prefix('$') {
        Some(var) if !var.is_empty() => std::env::var(var).unwrap_or_else(|_| {
            tracing::warn!(var, "secret references an unset environment variable");
            String::new()
        }),
        _ => raw.to_string(),
    }
}
