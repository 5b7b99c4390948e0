//! Repository tool backed by a GitHub MCP server.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::BackendClient;
use super::patterns::{CaptureRules, RuleSet, TriggerPatterns};
use super::Tool;
use crate::config::GithubConfig;
use crate::error::ToolError;
use crate::protocol::{ToolRequest, ToolResponse};

pub const TOOL_ID: &str = "github";

/// Username sent when the query names no account and none is configured.
pub const DEFAULT_USER: &str = "DEFAULT_USER";

const ACTIONS: &[&str] = &[
    "getRepository",
    "listRepositories",
    "getBranches",
    "getCommits",
];

static TRIGGERS: Lazy<TriggerPatterns> = Lazy::new(|| {
    TriggerPatterns::new(&[
        r"(fetch|get|pull|show|list)\s+.*?(github|repo|repository)",
        r"github\s+.*?(repo|repository)",
        r"my\s+latest\s+(repo|repository|code)",
        r"latest\s+(commit|branch|repo|code)\s+on\s+github",
    ])
});

/// "my repo" means the authenticated user, so it short-circuits the
/// explicit username patterns below it.
static OWN_REPOSITORY: Lazy<RuleSet<()>> =
    Lazy::new(|| RuleSet::new(&[(r"my\s+(repo|repository|code)", ())]));

static USERNAME: Lazy<CaptureRules> = Lazy::new(|| {
    CaptureRules::new(&[
        (r"for\s+user\s+([\w-]+)", 1),
        (r"(user|username|account)\s+([\w-]+)", 2),
    ])
});

static REPOSITORY_NAME: Lazy<CaptureRules> = Lazy::new(|| {
    CaptureRules::new(&[
        (r"(repo|repository)\s+named\s+([\w.-]+)", 2),
        (r"(repo|repository)\s+called\s+([\w.-]+)", 2),
    ])
});

static ACTION_BY_KEYWORD: Lazy<RuleSet<RepositoryAction>> = Lazy::new(|| {
    RuleSet::new(&[
        (r"\b(commits|changes)\b", RepositoryAction::GetCommits),
        (r"\bbranches\b", RepositoryAction::GetBranches),
        (r"latest\s+repo(sitory)?\b", RepositoryAction::ListRepositories),
    ])
});

static LIST_REQUEST: Lazy<RuleSet<RepositoryAction>> = Lazy::new(|| {
    RuleSet::new(&[(
        r"(list|show|fetch|get)\s+.*?(repos?|repositor(y|ies))\b",
        RepositoryAction::ListRepositories,
    )])
});

/// Sub-action sent to the GitHub backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepositoryAction {
    GetRepository,
    ListRepositories,
    GetBranches,
    GetCommits,
}

impl RepositoryAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RepositoryAction::GetRepository => "getRepository",
            RepositoryAction::ListRepositories => "listRepositories",
            RepositoryAction::GetBranches => "getBranches",
            RepositoryAction::GetCommits => "getCommits",
        }
    }
}

/// What the tool derived from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPlan {
    pub action: RepositoryAction,
    pub username: String,
    pub repository: Option<String>,
}

impl RepositoryPlan {
    /// Derive action, username and repository name.  `default_user`
    /// stands in whenever the query does not name an account.
    pub fn from_query(query: &str, default_user: &str) -> Self {
        let repository = REPOSITORY_NAME.first_capture(query);
        let action = ACTION_BY_KEYWORD
            .first(query)
            .or(repository.as_ref().map(|_| RepositoryAction::GetRepository))
            .or_else(|| LIST_REQUEST.first(query))
            .unwrap_or(RepositoryAction::GetRepository);
        let username = if OWN_REPOSITORY.first(query).is_some() {
            None
        } else {
            USERNAME.first_capture(query)
        }
        .unwrap_or_else(|| default_user.to_string());

        Self {
            action,
            username,
            repository,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GithubBody<'a> {
    action: RepositoryAction,
    username: &'a str,
    api_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    repository: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

/// The GitHub server either answers with a ready-made envelope or with
/// raw repository data.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum GithubPayload {
    Envelope {
        response: String,
        #[serde(default)]
        error: Option<String>,
    },
    Repositories(Vec<Repository>),
    Single(Repository),
}

#[derive(Debug, Deserialize)]
pub(crate) struct Repository {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, rename = "stargazers_count")]
    stars: Option<u64>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// GitHub tool.  Answers "show my github repo", "list repos for user x".
pub struct RepositoryTool {
    backend: BackendClient,
    api_key: String,
    default_user: String,
}

impl RepositoryTool {
    pub fn new(cfg: &GithubConfig) -> anyhow::Result<Self> {
        Ok(Self {
            backend: BackendClient::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?,
            api_key: crate::config::resolve_secret(&cfg.api_key),
            default_user: cfg
                .default_user
                .clone()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
        })
    }

    /// Plan a query using this tool's configured default user.
    pub fn plan(&self, query: &str) -> RepositoryPlan {
        RepositoryPlan::from_query(query, &self.default_user)
    }

    async fn run(&self, plan: &RepositoryPlan) -> Result<String, ToolError> {
        let body = GithubBody {
            action: plan.action,
            username: &plan.username,
            api_key: &self.api_key,
            repository: plan.repository.as_deref(),
            branch: None,
        };
        let payload: GithubPayload = self.backend.post_json("github/execute", &body).await?;
        render_payload(payload)
    }
}

#[async_trait]
impl Tool for RepositoryTool {
    fn id(&self) -> &str {
        TOOL_ID
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    fn can_handle(&self, query: &str) -> bool {
        TRIGGERS.matches(query)
    }

    async fn execute(&self, request: ToolRequest) -> ToolResponse {
        let plan = self.plan(&request.query);
        let mut context = request.context;
        context.parameters.insert("action".into(), plan.action.as_str().into());
        context.parameters.insert("username".into(), plan.username.clone());
        if let Some(ref repo) = plan.repository {
            context.parameters.insert("repository".into(), repo.clone());
        }

        info!(
            action = plan.action.as_str(),
            username = %plan.username,
            repository = ?plan.repository,
            "querying github"
        );
        match self.run(&plan).await {
            Ok(text) => ToolResponse::success(text).with_context(context),
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "github call failed");
                let text = match &err {
                    ToolError::MalformedResponse(_) => {
                        "Unable to get data from GitHub.".to_string()
                    }
                    other => format!("Error fetching GitHub data: {other}"),
                };
                ToolResponse::from_error(text, &err).with_context(context)
            }
        }
    }
}

pub(crate) fn render_payload(payload: GithubPayload) -> Result<String, ToolError> {
    match payload {
        GithubPayload::Envelope {
            error: Some(error), ..
        } => Err(ToolError::Rejected(error)),
        GithubPayload::Envelope { response, .. } if response.trim().is_empty() => Err(
            ToolError::MalformedResponse("empty response from GitHub server".into()),
        ),
        GithubPayload::Envelope { response, .. } => Ok(response),
        GithubPayload::Repositories(repos) if repos.is_empty() => {
            Ok("No repositories found.".to_string())
        }
        GithubPayload::Repositories(repos) => {
            let mut out = String::from("Here are the repositories I found:\n");
            for repo in &repos {
                out.push_str(&format_repository(repo));
            }
            Ok(out.trim_end().to_string())
        }
        GithubPayload::Single(repo) => Ok(format_repository(&repo).trim_end().to_string()),
    }
}

fn format_repository(repo: &Repository) -> String {
    let mut line = format!("- {}", repo.name);
    if let Some(ref lang) = repo.language {
        line.push_str(&format!(" [{lang}]"));
    }
    if let Some(stars) = repo.stars {
        line.push_str(&format!(" ({stars} stars)"));
    }
    if let Some(url) = repo.html_url.as_ref().or(repo.url.as_ref()) {
        line.push_str(&format!(": {url}"));
    }
    line.push('\n');
    if let Some(desc) = repo.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!("  {desc}\n"));
    }
    if let Some(ref updated) = repo.updated_at {
        line.push_str(&format!("  Updated: {updated}\n"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> RepositoryTool {
        RepositoryTool::new(&GithubConfig::new("http://localhost:3000/")).unwrap()
    }

    #[test]
    fn show_my_github_repo() {
        let t = tool();
        let q = "show my github repo";
        assert!(t.can_handle(q));
        let plan = t.plan(q);
        assert_eq!(plan.action, RepositoryAction::ListRepositories);
        assert_eq!(plan.username, DEFAULT_USER);
        assert_eq!(plan.repository, None);
    }

    #[test]
    fn explicit_user_is_extracted() {
        let plan = RepositoryPlan::from_query("list repositories for user rust-lang", DEFAULT_USER);
        assert_eq!(plan.username, "rust-lang");
        assert_eq!(plan.action, RepositoryAction::ListRepositories);

        let plan = RepositoryPlan::from_query("get github repos of account Octo-Cat", DEFAULT_USER);
        assert_eq!(plan.username, "Octo-Cat");
    }

    #[test]
    fn my_repo_overrides_explicit_user() {
        let plan = RepositoryPlan::from_query("show my repo for user someone", "me");
        assert_eq!(plan.username, "me");
    }

    #[test]
    fn named_repository_gets_single_repo() {
        let plan = RepositoryPlan::from_query("show the github repo named ripgrep", DEFAULT_USER);
        assert_eq!(plan.repository.as_deref(), Some("ripgrep"));
        assert_eq!(plan.action, RepositoryAction::GetRepository);
    }

    #[test]
    fn commits_and_branches() {
        let commits = RepositoryPlan::from_query("get the latest commits in repo called tokio", DEFAULT_USER);
        assert_eq!(commits.action, RepositoryAction::GetCommits);
        assert_eq!(commits.repository.as_deref(), Some("tokio"));

        let branches = RepositoryPlan::from_query("list branches of github repo named axum", DEFAULT_USER);
        assert_eq!(branches.action, RepositoryAction::GetBranches);
    }

    #[test]
    fn latest_repo_lists() {
        let t = tool();
        assert!(t.can_handle("what is my latest repo"));
        assert_eq!(
            t.plan("what is my latest repo").action,
            RepositoryAction::ListRepositories
        );
    }

    #[test]
    fn configured_default_user_is_used() {
        let mut cfg = GithubConfig::new("http://localhost:3000/");
        cfg.default_user = Some("octocat".into());
        let t = RepositoryTool::new(&cfg).unwrap();
        assert_eq!(t.plan("show my github repo").username, "octocat");
    }

    #[test]
    fn unrelated_queries_are_not_claimed() {
        let t = tool();
        assert!(!t.can_handle("search for rust programming language"));
        assert!(!t.can_handle("visit example.com"));
    }

    #[test]
    fn envelope_error_is_failure() {
        let payload: GithubPayload = serde_json::from_value(serde_json::json!({
            "response": "partial",
            "error": "rate limited"
        }))
        .unwrap();
        let err = render_payload(payload).unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[test]
    fn repository_list_is_rendered() {
        let payload: GithubPayload = serde_json::from_value(serde_json::json!([
            {
                "name": "ripgrep",
                "description": "fast grep",
                "html_url": "https://github.com/BurntSushi/ripgrep",
                "stargazers_count": 40000,
                "language": "Rust",
                "updated_at": "2024-05-01T00:00:00Z"
            },
            {
                "name": "api-only",
                "url": "https://api.github.com/repos/me/api-only",
                "html_url": "https://github.com/me/api-only"
            },
            { "name": "empty" }
        ]))
        .unwrap();
        let text = render_payload(payload).unwrap();
        assert!(text.starts_with("Here are the repositories I found:"));
        assert!(text.contains("- ripgrep [Rust] (40000 stars): https://github.com/BurntSushi/ripgrep"));
        assert!(text.contains("  fast grep"));
        assert!(text.contains("- api-only: https://github.com/me/api-only\n"));
        assert!(text.contains("- empty"));
    }

    #[test]
    fn single_repository_is_rendered() {
        let payload: GithubPayload = serde_json::from_value(serde_json::json!({
            "name": "tokio",
            "description": "async runtime",
            "html_url": "https://github.com/tokio-rs/tokio",
            "stargazers_count": 25000,
            "language": "Rust",
            "updated_at": "2024-06-01T00:00:00Z"
        }))
        .unwrap();
        assert!(matches!(payload, GithubPayload::Single(_)));
        let text = render_payload(payload).unwrap();
        assert_eq!(
            text,
            "- tokio [Rust] (25000 stars): https://github.com/tokio-rs/tokio\n  \
             async runtime\n  \
             Updated: 2024-06-01T00:00:00Z"
        );
    }

    #[test]
    fn body_uses_wire_names() {
        let body = GithubBody {
            action: RepositoryAction::ListRepositories,
            username: DEFAULT_USER,
            api_key: "k",
            repository: None,
            branch: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["action"], "listRepositories");
        assert_eq!(json["apiKey"], "k");
        assert!(json.get("repository").is_none());
    }
}
