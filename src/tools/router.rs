//! Ordered, first-match-wins dispatch over registered tools.

use std::sync::Arc;

use tracing::{debug, info};

use super::Tool;
use crate::protocol::{RoutingContext, ToolIdentity, ToolRequest, ToolResponse};

/// Immutable, ordered list of tools.
///
/// Order is priority: when several tools claim a query the one
/// registered first handles it.
#[derive(Clone, Default)]
pub struct ToolRouter {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRouter {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Identities in registration order.
    pub fn identities(&self) -> Vec<ToolIdentity> {
        self.tools.iter().map(|t| t.identity()).collect()
    }

    /// The first tool whose triggers match `query`.
    pub fn find_tool(&self, query: &str) -> Option<Arc<dyn Tool>> {
        let found = self.tools.iter().find(|t| t.can_handle(query)).cloned();
        match found {
            Some(ref tool) => info!(tool = %tool.id(), "routed message to tool"),
            None => debug!("no tool claimed message"),
        }
        found
    }

    /// Execute `query` on an already selected tool with a fresh request.
    pub async fn execute_with(&self, tool: &dyn Tool, query: &str) -> ToolResponse {
        let context = RoutingContext::for_tool(tool.id())
            .with_metadata("requestId", uuid::Uuid::new_v4().to_string());
        match ToolRequest::new(context.clone(), query) {
            Ok(request) => tool.execute(request).await,
            Err(err) => ToolResponse::from_error("There was nothing to send to the tool.", &err)
                .with_context(context),
        }
    }

    /// Route and execute in one step.  A query no tool claims gets the
    /// canned "no matching tool" response without any network call.
    pub async fn dispatch(&self, query: &str) -> ToolResponse {
        match self.find_tool(query) {
            Some(tool) => self.execute_with(tool.as_ref(), query).await,
            None => ToolResponse::no_matching_tool(),
        }
    }
}

impl std::fmt::Debug for ToolRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.tools.iter().map(|t| t.id().to_string()))
            .finish()
    }
}
