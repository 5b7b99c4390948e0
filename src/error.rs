//! Error taxonomy for the tool layer.
//!
//! Tools work with `Result<_, ToolError>` internally and convert to a
//! [`ToolResponse`](crate::protocol::ToolResponse) exactly once, at the
//! `execute` boundary.  Nothing above the tool layer sees these as `Err`.

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong while routing or executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No registered tool claims the query.  A valid routing outcome.
    #[error("No matching tool found")]
    NoMatchingTool,

    /// A request was built from an empty or whitespace-only query.
    #[error("query must not be empty")]
    EmptyQuery,

    /// A tool matched but a required argument could not be extracted.
    #[error("No {0} specified")]
    MissingParameter(String),

    /// The backend answered with a non-success HTTP status.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend answered 2xx but reported that the operation failed.
    #[error("backend reported failure: {0}")]
    Rejected(String),

    /// The request never produced a response (connect error, reset, …).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend did not answer within the tool's time budget.
    #[error("backend timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The backend answered 2xx with a body we could not interpret.
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

impl ToolError {
    /// Short machine-friendly kind, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NoMatchingTool => "no_matching_tool",
            ToolError::EmptyQuery => "empty_query",
            ToolError::MissingParameter(_) => "missing_parameter",
            ToolError::Backend { .. } => "backend",
            ToolError::Rejected(_) => "rejected",
            ToolError::Transport(_) => "transport",
            ToolError::Timeout(_) => "timeout",
            ToolError::MalformedResponse(_) => "malformed_response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_tool_message_is_stable() {
        assert_eq!(ToolError::NoMatchingTool.to_string(), "No matching tool found");
    }

    #[test]
    fn missing_parameter_names_the_parameter() {
        let err = ToolError::MissingParameter("URL".into());
        assert_eq!(err.to_string(), "No URL specified");
        assert_eq!(err.kind(), "missing_parameter");
    }

    #[test]
    fn backend_error_carries_status() {
        let err = ToolError::Backend {
            status: 502,
            message: "Bad Gateway".into(),
        };
        assert_eq!(err.to_string(), "backend returned 502: Bad Gateway");
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = ToolError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "backend timed out after 30s");
    }
}
