//! Browser automation tool backed by a Puppeteer MCP server.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::BackendClient;
use super::patterns::{CaptureRules, RuleSet, TriggerPatterns};
use super::Tool;
use crate::config::BrowserConfig;
use crate::error::ToolError;
use crate::protocol::{ToolRequest, ToolResponse};

pub const TOOL_ID: &str = "puppeteer";

const ACTIONS: &[&str] = &["browse", "screenshot", "extractText", "clickButton", "fillForm"];

/// Extracted page text longer than this many characters is cut for the reply.
const PREVIEW_CHARS: usize = 500;

static TRIGGERS: Lazy<TriggerPatterns> = Lazy::new(|| {
    TriggerPatterns::new(&[
        r"(visit|browse|open|go to)\s+(website|webpage|site|url|page)\s+(.+)",
        r"(visit|browse|open|go to)\s+(.+\.(com|org|net|io|gov))",
        r"(take|get|capture)\s+(a\s+)?(screenshot|image|picture)\s+of\s+(.+)",
        r"(extract|get|read|scrape)\s+(text|content|data)\s+from\s+(.+)",
    ])
});

static URL: Lazy<CaptureRules> = Lazy::new(|| {
    CaptureRules::new(&[
        (
            r"(?:https?://)?(?:www\.)?[a-z0-9][-a-z0-9]*(?:\.[a-z0-9][-a-z0-9]*)+(?:/\S*)?",
            0,
        ),
        (
            r"(?:visit|browse|open|go to)\s+(?:the\s+)?(?:website|webpage|site|url|page)?\s*(?:at\s+|for\s+)?(\S+\.[a-z]{2,}\S*)",
            1,
        ),
    ])
});

static SELECTOR: Lazy<CaptureRules> =
    Lazy::new(|| CaptureRules::new(&[(r#"(?:with|using)\s+selector\s+['"](.+)['"]"#, 1)]));

static ACTION: Lazy<RuleSet<BrowserAction>> = Lazy::new(|| {
    RuleSet::new(&[
        (r"screenshot|image|picture", BrowserAction::Screenshot),
        (r"(extract|get|read|scrape)\s+(text|content|data)", BrowserAction::ExtractText),
        (r"(click|press|push)\s+(button|link)", BrowserAction::ClickButton),
        (r"(fill|complete|input|enter)\s+(form|data)", BrowserAction::FillForm),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BrowserAction {
    Browse,
    Screenshot,
    ExtractText,
    ClickButton,
    FillForm,
}

impl BrowserAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BrowserAction::Browse => "browse",
            BrowserAction::Screenshot => "screenshot",
            BrowserAction::ExtractText => "extractText",
            BrowserAction::ClickButton => "clickButton",
            BrowserAction::FillForm => "fillForm",
        }
    }
}

/// What the tool derived from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserPlan {
    pub action: BrowserAction,
    pub url: String,
    pub selector: Option<String>,
}

impl BrowserPlan {
    /// Fails with [`ToolError::MissingParameter`] when the query holds
    /// nothing that looks like a URL.
    pub fn from_query(query: &str) -> Result<Self, ToolError> {
        let url = URL
            .first_capture(query)
            .map(|u| with_scheme(&u))
            .ok_or_else(|| ToolError::MissingParameter("URL".into()))?;
        Ok(Self {
            action: ACTION.first(query).unwrap_or(BrowserAction::Browse),
            url,
            selector: SELECTOR.first_capture(query),
        })
    }
}

fn with_scheme(url: &str) -> String {
    if url.to_ascii_lowercase().starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrowseBody<'a> {
    action: BrowserAction,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<&'a str>,
    wait_time: u64,
    wait_for_navigation: bool,
    full_page: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageResult {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    screenshot: Option<String>,
    #[serde(default)]
    page_title: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Browser tool.  Answers "visit example.com", "take a screenshot of …".
pub struct BrowserTool {
    backend: BackendClient,
    wait_time_ms: u64,
}

impl BrowserTool {
    pub fn new(cfg: &BrowserConfig) -> anyhow::Result<Self> {
        Ok(Self {
            backend: BackendClient::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?,
            wait_time_ms: cfg.wait_time_ms,
        })
    }

    async fn run(&self, plan: &BrowserPlan) -> Result<String, ToolError> {
        let body = BrowseBody {
            action: plan.action,
            url: &plan.url,
            selector: plan.selector.as_deref(),
            wait_time: self.wait_time_ms,
            wait_for_navigation: true,
            full_page: true,
        };
        let result: PageResult = self.backend.post_json("puppeteer/execute", &body).await?;
        format_page(&result, plan)
    }
}

#[async_trait]
impl Tool for BrowserTool {
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
        let mut context = request.context;
        let plan = match BrowserPlan::from_query(&request.query) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(error = %err, "no URL in browse request");
                return ToolResponse::from_error(
                    "I couldn't determine which website you want me to visit. Please specify a URL.",
                    &err,
                )
                .with_context(context);
            }
        };
        context.parameters.insert("action".into(), plan.action.as_str().into());
        context.parameters.insert("url".into(), plan.url.clone());
        if let Some(ref selector) = plan.selector {
            context.parameters.insert("selector".into(), selector.clone());
        }

        info!(action = plan.action.as_str(), url = %plan.url, "driving browser");
        match self.run(&plan).await {
            Ok(text) => ToolResponse::success(text).with_context(context),
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "browser call failed");
                ToolResponse::from_error(format!("Error browsing '{}': {err}", plan.url), &err)
                    .with_context(context)
            }
        }
    }
}

pub(crate) fn format_page(result: &PageResult, plan: &BrowserPlan) -> Result<String, ToolError> {
    if !result.success {
        let message = result
            .error
            .clone()
            .or_else(|| result.message.clone())
            .unwrap_or_else(|| "page automation failed".to_string());
        return Err(ToolError::Rejected(message));
    }

    let url = &plan.url;
    let note = result.message.as_deref().unwrap_or_default();
    let text = match plan.action {
        BrowserAction::Screenshot => {
            let mut text = format!("I captured a screenshot of {url}. {note}");
            if result.screenshot.as_deref().is_some_and(|s| !s.is_empty()) {
                text = format!("{}\n(screenshot attached)", text.trim_end());
            }
            text
        }
        BrowserAction::ExtractText => {
            let preview = result
                .content
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| crate::utils::truncate_str(c.trim(), PREVIEW_CHARS))
                .unwrap_or_else(|| "No content extracted".to_string());
            format!("Here's the content I extracted from {url}:\n\n{preview}")
        }
        BrowserAction::ClickButton => format!("I clicked the button on {url}. {note}"),
        BrowserAction::FillForm => format!("I filled the form on {url}. {note}"),
        BrowserAction::Browse => match result.page_title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => format!("I browsed {url} (\"{title}\"). {note}"),
            None => format!("I browsed {url}. {note}"),
        },
    };
    Ok(text.trim_end().to_string())
}
