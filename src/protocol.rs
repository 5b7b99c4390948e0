//! The request/response envelope shared by every tool.
//!
//! Field names on the wire follow the MCP tool protocol
//! (`toolId`, `parameters`, `metadata`, `response`, `error`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Text used when a caller hands us an empty response string.
const FALLBACK_TEXT: &str = "The tool finished without producing any output.";

/// Stable identity of a tool plus the actions it advertises.
///
/// Descriptive only; the router never checks `actions` at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolIdentity {
    pub id: String,
    pub actions: Vec<String>,
}

/// Correlation data attached to a [`ToolRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingContext {
    pub tool_id: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RoutingContext {
    /// Fresh context for `tool_id` with no parameters or metadata.
    pub fn for_tool(tool_id: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper to attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A single tool invocation.  Built fresh per dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub context: RoutingContext,
    pub query: String,
}

impl ToolRequest {
    /// Build a request, rejecting empty or whitespace-only queries.
    pub fn new(context: RoutingContext, query: impl Into<String>) -> Result<Self, ToolError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ToolError::EmptyQuery);
        }
        Ok(Self { context, query })
    }
}

/// What a tool hands back.  `response` is always readable text, even on
/// failure; `error` is present iff the call failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RoutingContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    /// Successful response carrying `text`.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            response: non_empty(text.into()),
            context: None,
            error: None,
        }
    }

    /// Failed response: `text` is what the user sees, `detail` the cause.
    pub fn failure(text: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            response: non_empty(text.into()),
            context: None,
            error: Some(if detail.is_empty() {
                "unknown error".to_string()
            } else {
                detail
            }),
        }
    }

    /// Failure built from a [`ToolError`]; the error's display form
    /// becomes the detail.
    pub fn from_error(text: impl Into<String>, err: &ToolError) -> Self {
        Self::failure(text, err.to_string())
    }

    /// The canned response for a query no tool claims.
    pub fn no_matching_tool() -> Self {
        Self::from_error(
            "I don't have a tool to handle this request.",
            &ToolError::NoMatchingTool,
        )
    }

    /// Echo the request context back to the caller.
    pub fn with_context(mut self, context: RoutingContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

fn non_empty(text: String) -> String {
    if text.trim().is_empty() {
        FALLBACK_TEXT.to_string()
    } else {
        text
    }
}
