//! One chat turn: route the message, fold any tool output into the
//! conversation, and ask the model for the final reply.
//!
//! Tool failures never abort a turn; they reach the model as context
//! like any other tool output.  Only a model failure is an error.

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::conversation::Conversation;
use crate::models::{build_provider_manager, ModelProvider};
use crate::protocol::ToolResponse;
use crate::tools::{build_router, ToolRouter};

/// Reply used when the model answers with nothing.
pub const EMPTY_REPLY: &str = "Sorry, I couldn't generate a response.";

/// Which path a turn took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    NoToolMatched,
    ToolMatched {
        tool_id: String,
        response: ToolResponse,
    },
}

impl Route {
    pub fn tool_id(&self) -> Option<&str> {
        match self {
            Route::NoToolMatched => None,
            Route::ToolMatched { tool_id, .. } => Some(tool_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub route: Route,
}

pub struct Orchestrator {
    router: Arc<ToolRouter>,
    provider: Arc<dyn ModelProvider>,
}

impl Orchestrator {
    pub fn new(router: Arc<ToolRouter>, provider: Arc<dyn ModelProvider>) -> Self {
        Self { router, provider }
    }

    /// Build the router and provider chain from configuration.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let router = build_router(&cfg.tools).context("building tool router")?;
        let provider = build_provider_manager(cfg).context("building model providers")?;
        Ok(Self::new(Arc::new(router), Arc::new(provider)))
    }

    pub fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Handle one user message against `conversation`.
    ///
    /// Old history beyond the conversation's cap is trimmed first.  On
    /// model failure the conversation is rolled back to that point.
    pub async fn handle_message(
        &self,
        conversation: &mut Conversation,
        message: &str,
    ) -> anyhow::Result<TurnOutcome> {
        let message = message.trim();
        if message.is_empty() {
            anyhow::bail!("message must not be empty");
        }

        let dropped = conversation.compact();
        if dropped > 0 {
            debug!(dropped, kept = conversation.len(), "trimmed conversation history");
        }
        let mark = conversation.len();
        conversation.push_user(message);

        let route = match self.router.find_tool(message) {
            Some(tool) => {
                let response = self.router.execute_with(tool.as_ref(), message).await;
                if !response.is_success() {
                    warn!(
                        tool = %tool.id(),
                        error = response.error.as_deref().unwrap_or_default(),
                        "tool reported failure, passing it to the model"
                    );
                }
                conversation.push_context(tool_context(tool.id(), &response));
                Route::ToolMatched {
                    tool_id: tool.id().to_string(),
                    response,
                }
            }
            None => Route::NoToolMatched,
        };

        let reply = match self.provider.send_chat(conversation.messages()).await {
            Ok(reply) => reply,
            Err(e) => {
                conversation.truncate(mark);
                return Err(e.context("model backend failed"));
            }
        };
        let reply = if reply.trim().is_empty() {
            EMPTY_REPLY.to_string()
        } else {
            reply
        };
        conversation.push_assistant(reply.clone());

        info!(
            tool = route.tool_id().unwrap_or("none"),
            history = conversation.len(),
            "turn complete"
        );
        Ok(TurnOutcome { reply, route })
    }

    /// Forget the conversation.  Tools and router are untouched.
    pub fn clear(&self, conversation: &mut Conversation) {
        conversation.reset();
    }
}

/// The single context message a tool turn adds.
fn tool_context(tool_id: &str, response: &ToolResponse) -> String {
    let mut text = format!("Tool response ({tool_id}): {}", response.response);
    if let Some(ref detail) = response.error {
        text.push_str(&format!("\nError: {detail}"));
    }
    text.push_str("\n\nPlease respond to the user based on this tool result.");
    text
}
