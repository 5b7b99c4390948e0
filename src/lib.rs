//! mcp_gateway: chat gateway that routes messages to MCP tool backends
//! (GitHub, web search, browser automation) or a language model.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod config;
pub mod conversation;
pub mod error;
pub mod gateway;
pub mod models;
pub mod orchestrator;
pub mod protocol;
pub mod session;
pub mod tools;
pub mod utils;

/// Return the gateway home directory.
///
/// Resolution order:
/// 1. `MCP_GATEWAY_HOME` environment variable
/// 2. `$HOME/.mcp-gateway`
pub fn gateway_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("MCP_GATEWAY_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".mcp-gateway")
    }
}
