//! Web search tool backed by a Brave Search MCP server.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::backend::BackendClient;
use super::patterns::{CaptureRules, RuleSet, TriggerPatterns};
use super::Tool;
use crate::config::SearchConfig;
use crate::error::ToolError;
use crate::protocol::{ToolRequest, ToolResponse};

pub const TOOL_ID: &str = "brave-search";

const ACTIONS: &[&str] = &["search", "imageSearch", "newsSearch"];

static TRIGGERS: Lazy<TriggerPatterns> = Lazy::new(|| {
    TriggerPatterns::new(&[
        r"(search|find|look up|google|search for)\s+(.+)",
        r"(what is|who is|tell me about)\s+(.+)",
        r"find\s+news\s+about\s+(.+)",
        r"search\s+for\s+images\s+of\s+(.+)",
    ])
});

static SEARCH_TERM: Lazy<CaptureRules> = Lazy::new(|| {
    CaptureRules::new(&[
        (r"search\s+for\s+(.+)", 1),
        (r"search\s+(.+)", 1),
        (r"find\s+(.+)", 1),
        (r"look\s+up\s+(.+)", 1),
        (r"what\s+is\s+(.+)", 1),
        (r"who\s+is\s+(.+)", 1),
        (r"tell\s+me\s+about\s+(.+)", 1),
    ])
});

static SEARCH_KIND: Lazy<RuleSet<SearchKind>> = Lazy::new(|| {
    RuleSet::new(&[
        (r"images?\s+of", SearchKind::Images),
        (r"(news|articles|recent events)\s+about", SearchKind::News),
    ])
});

/// Which search endpoint to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchKind {
    #[serde(rename = "search")]
    Web,
    #[serde(rename = "imageSearch")]
    Images,
    #[serde(rename = "newsSearch")]
    News,
}

impl SearchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchKind::Web => "search",
            SearchKind::Images => "imageSearch",
            SearchKind::News => "newsSearch",
        }
    }
}

/// What the tool derived from a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    pub term: String,
    pub kind: SearchKind,
}

impl SearchPlan {
    pub fn from_query(query: &str) -> Self {
        let term = SEARCH_TERM
            .first_capture(query)
            .unwrap_or_else(|| query.trim().to_string());
        let kind = SEARCH_KIND.first(query).unwrap_or(SearchKind::Web);
        Self { term, kind }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    kind: SearchKind,
    api_key: &'a str,
    count: u32,
    market: &'a str,
    safe_search: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResults {
    #[serde(default)]
    web_pages: Option<Vec<WebPage>>,
    #[serde(default)]
    images: Option<Vec<ImageResult>>,
    #[serde(default)]
    news: Option<Vec<NewsResult>>,
}

#[derive(Debug, Deserialize)]
struct WebPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct ImageResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct NewsResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: String,
    #[serde(default, rename = "datePublished")]
    published: String,
}

/// Search tool.  Answers "search for …", "what is …", "find news about …".
pub struct SearchTool {
    backend: BackendClient,
    api_key: String,
    count: u32,
    market: String,
    safe_search: String,
}

impl SearchTool {
    pub fn new(cfg: &SearchConfig) -> anyhow::Result<Self> {
        Ok(Self {
            backend: BackendClient::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?,
            api_key: crate::config::resolve_secret(&cfg.api_key),
            count: cfg.count,
            market: cfg.market.clone(),
            safe_search: cfg.safe_search.clone(),
        })
    }

    async fn run(&self, plan: &SearchPlan) -> Result<String, ToolError> {
        let body = SearchBody {
            query: &plan.term,
            kind: plan.kind,
            api_key: &self.api_key,
            count: self.count,
            market: &self.market,
            safe_search: &self.safe_search,
        };
        let results: SearchResults = self.backend.post_json("brave-search/execute", &body).await?;
        Ok(format_results(&results, plan))
    }
}

#[async_trait]
impl Tool for SearchTool {
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
        let plan = SearchPlan::from_query(&request.query);
        let mut context = request.context;
        context.parameters.insert("action".into(), plan.kind.as_str().into());
        context.parameters.insert("query".into(), plan.term.clone());

        info!(kind = plan.kind.as_str(), term = %plan.term, "running search");
        match self.run(&plan).await {
            Ok(text) => ToolResponse::success(text).with_context(context),
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "search failed");
                let text = match &err {
                    ToolError::MalformedResponse(_) => format!(
                        "I searched for '{}' but couldn't read the results.",
                        plan.term
                    ),
                    other => format!("Error searching for '{}': {other}", plan.term),
                };
                ToolResponse::from_error(text, &err).with_context(context)
            }
        }
    }
}

/// Render results as a bulleted list; layout depends on the search kind.
pub(crate) fn format_results(results: &SearchResults, plan: &SearchPlan) -> String {
    let mut out = String::new();
    match plan.kind {
        SearchKind::Images => {
            let images = results.images.as_deref().unwrap_or_default();
            if images.is_empty() {
                return no_results(&plan.term);
            }
            out.push_str("Here are some image results:\n");
            for image in images {
                out.push_str(&format!("- {}: {}\n", image.title, image.url));
            }
        }
        SearchKind::News => {
            let news = results.news.as_deref().unwrap_or_default();
            if news.is_empty() {
                return no_results(&plan.term);
            }
            out.push_str("Here are some news results:\n");
            for item in news {
                out.push_str(&format!("- {} ({}): {}\n", item.title, item.source, item.url));
                if !item.published.is_empty() {
                    out.push_str(&format!("  Published: {}\n", item.published));
                }
                out.push_str(&format!("  {}\n\n", item.description));
            }
        }
        SearchKind::Web => {
            let pages = results.web_pages.as_deref().unwrap_or_default();
            if pages.is_empty() {
                return no_results(&plan.term);
            }
            out.push_str("Here are search results:\n");
            for page in pages {
                out.push_str(&format!("- {}\n  {}\n  {}\n\n", page.title, page.url, page.snippet));
            }
        }
    }
    out.trim_end().to_string()
}

fn no_results(term: &str) -> String {
    format!("I searched for '{term}' but didn't find any results.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> SearchTool {
        SearchTool::new(&SearchConfig::new("http://localhost:3001/")).unwrap()
    }

    #[test]
    fn search_for_strips_prefix() {
        let t = tool();
        let q = "search for rust programming language";
        assert!(t.can_handle(q));
        let plan = SearchPlan::from_query(q);
        assert_eq!(plan.term, "rust programming language");
        assert_eq!(plan.kind, SearchKind::Web);
    }

    #[test]
    fn question_forms_are_claimed() {
        let t = tool();
        assert!(t.can_handle("What is a borrow checker?"));
        assert!(t.can_handle("tell me about Ferris"));
        assert_eq!(SearchPlan::from_query("who is Graydon Hoare").term, "Graydon Hoare");
    }

    #[test]
    fn small_talk_is_not_claimed() {
        let t = tool();
        assert!(!t.can_handle("hello there"));
        assert!(!t.can_handle("thanks!"));
    }

    #[test]
    fn image_and_news_kinds() {
        let img = SearchPlan::from_query("search for images of crabs");
        assert_eq!(img.kind, SearchKind::Images);
        assert_eq!(img.term, "images of crabs");

        let news = SearchPlan::from_query("find news about the rust foundation");
        assert_eq!(news.kind, SearchKind::News);
        assert_eq!(news.term, "news about the rust foundation");
    }

    #[test]
    fn unmatched_query_uses_whole_text() {
        assert_eq!(SearchPlan::from_query("  google  ").term, "google");
    }

    #[test]
    fn web_results_are_bulleted() {
        let results: SearchResults = serde_json::from_value(serde_json::json!({
            "_type": "search",
            "webPages": [
                { "title": "Rust", "url": "https://rust-lang.org", "snippet": "A language" }
            ]
        }))
        .unwrap();
        let plan = SearchPlan::from_query("search for rust");
        let text = format_results(&results, &plan);
        assert!(text.starts_with("Here are search results:"));
        assert!(text.contains("- Rust\n  https://rust-lang.org\n  A language"));
    }

    #[test]
    fn news_results_include_source_and_date() {
        let results: SearchResults = serde_json::from_value(serde_json::json!({
            "news": [{
                "title": "Rust 2.0?",
                "url": "https://news.example/r",
                "description": "Not yet.",
                "source": "Example News",
                "datePublished": "2024-01-01"
            }]
        }))
        .unwrap();
        let plan = SearchPlan::from_query("find news about rust");
        let text = format_results(&results, &plan);
        assert!(text.contains("- Rust 2.0? (Example News): https://news.example/r"));
        assert!(text.contains("Published: 2024-01-01"));
    }

    #[test]
    fn image_results_list_title_and_url() {
        let results: SearchResults = serde_json::from_value(serde_json::json!({
            "images": [
                { "title": "Ferris", "url": "https://img.example/ferris.png" },
                { "title": "Crab", "url": "https://img.example/crab.jpg" }
            ]
        }))
        .unwrap();
        let plan = SearchPlan::from_query("search for images of crabs");
        let text = format_results(&results, &plan);
        assert_eq!(
            text,
            "Here are some image results:\n\
             - Ferris: https://img.example/ferris.png\n\
             - Crab: https://img.example/crab.jpg"
        );
    }

    #[test]
    fn empty_results_say_so() {
        let plan = SearchPlan::from_query("search for zzzz");
        let text = format_results(&SearchResults::default(), &plan);
        assert_eq!(text, "I searched for 'zzzz' but didn't find any results.");
    }

    #[test]
    fn body_uses_wire_names() {
        let body = SearchBody {
            query: "rust",
            kind: SearchKind::News,
            api_key: "k",
            count: 5,
            market: "en-US",
            safe_search: "Moderate",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "newsSearch");
        assert_eq!(json["apiKey"], "k");
        assert_eq!(json["safeSearch"], "Moderate");
    }
}
