//! Offline provider for development and tests.

use async_trait::async_trait;

use super::{ChatMessage, ModelProvider};

/// Echoes the last user message back.  Never fails.
pub struct StubProvider;

#[async_trait]
impl ModelProvider for StubProvider {
    async fn send_chat(&self, messages: &[ChatMessage]) -> Result<String, anyhow::Error> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("[stub] echo: {last_user}"))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
