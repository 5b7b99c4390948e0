//! Tool layer.
//!
//! A [`Tool`] claims a message through its trigger patterns and executes
//! it against its own MCP backend.  [`ToolRouter`] keeps the tools in
//! registration order and hands each message to the first one that
//! claims it.
//!
//! Three tools ship with the gateway: [`RepositoryTool`] (`github`),
//! [`SearchTool`] (`brave-search`) and [`BrowserTool`] (`puppeteer`).
//! Call [`build_router`] at startup to register the configured ones.

pub mod backend;
pub mod browser;
pub mod patterns;
pub mod repository;
pub mod router;
pub mod search;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ToolsConfig;
use crate::protocol::{ToolIdentity, ToolRequest, ToolResponse};

pub use backend::BackendClient;
pub use browser::BrowserTool;
pub use patterns::{CaptureRules, RuleSet, TriggerPatterns};
pub use repository::RepositoryTool;
pub use router::ToolRouter;
pub use search::SearchTool;

/// A capability the router can hand a message to.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable id, e.g. `"github"`.
    fn id(&self) -> &str;

    /// Actions the backend supports.  Descriptive only.
    fn action_names(&self) -> &'static [&'static str];

    /// Whether this tool wants the query.  Must be pure and cheap.
    fn can_handle(&self, query: &str) -> bool;

    /// Run the request against the backend.  Never fails: every error
    /// comes back as a failure [`ToolResponse`].
    async fn execute(&self, request: ToolRequest) -> ToolResponse;

    fn identity(&self) -> ToolIdentity {
        ToolIdentity {
            id: self.id().to_string(),
            actions: self.action_names().iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Build the router from configuration.
///
/// Tools are registered in `cfg.priority` order; tools with no config
/// section are skipped.
pub fn build_router(cfg: &ToolsConfig) -> anyhow::Result<ToolRouter> {
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    for id in &cfg.priority {
        let tool: Option<Arc<dyn Tool>> = match id.as_str() {
            repository::TOOL_ID => match cfg.github {
                Some(ref c) => Some(Arc::new(RepositoryTool::new(c)?)),
                None => None,
            },
            search::TOOL_ID => match cfg.brave_search {
                Some(ref c) => Some(Arc::new(SearchTool::new(c)?)),
                None => None,
            },
            browser::TOOL_ID => match cfg.puppeteer {
                Some(ref c) => Some(Arc::new(BrowserTool::new(c)?)),
                None => None,
            },
            other => anyhow::bail!("unknown tool id '{other}'"),
        };
        match tool {
            Some(tool) => {
                info!(tool = %id, position = tools.len(), "registered tool");
                tools.push(tool);
            }
            None => warn!(tool = %id, "tool has no config section, skipping"),
        }
    }
    Ok(ToolRouter::new(tools))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrowserConfig, GithubConfig, SearchConfig};

    fn all_configured() -> ToolsConfig {
        ToolsConfig {
            github: Some(GithubConfig::new("http://localhost:3000")),
            brave_search: Some(SearchConfig::new("http://localhost:3001")),
            puppeteer: Some(BrowserConfig::new("http://localhost:3002")),
            ..ToolsConfig::default()
        }
    }

    #[test]
    fn registers_in_priority_order() {
        let mut cfg = all_configured();
        cfg.priority = vec!["puppeteer".into(), "github".into(), "brave-search".into()];
        let router = build_router(&cfg).unwrap();
        let ids: Vec<String> = router.identities().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["puppeteer", "github", "brave-search"]);
    }

    #[test]
    fn skips_unconfigured_tools() {
        let cfg = ToolsConfig {
            brave_search: Some(SearchConfig::new("http://localhost:3001")),
            ..ToolsConfig::default()
        };
        let router = build_router(&cfg).unwrap();
        assert_eq!(router.len(), 1);
        assert!(router.find_tool("show my github repo").is_none());
    }

    #[test]
    fn identity_lists_actions() {
        let router = build_router(&all_configured()).unwrap();
        let github = &router.identities()[0];
        assert_eq!(github.id, "github");
        assert!(github.actions.contains(&"listRepositories".to_string()));
    }

    #[test]
    fn default_priority_puts_github_before_search() {
        let router = build_router(&all_configured()).unwrap();
        // Claimed by both the github and the search triggers.
        let q = "what is my latest repo";
        assert_eq!(router.find_tool(q).map(|t| t.id().to_string()).as_deref(), Some("github"));
    }
}
