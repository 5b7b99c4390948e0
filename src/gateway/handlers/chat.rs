use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::super::AppState;
use crate::orchestrator::Route;
use crate::session::SessionStore;

/// Body of a 500 from `/api/chat`.
pub(crate) const APOLOGY: &str = "Sorry, I ran into a problem answering that. Please try again.";

#[derive(Debug, Deserialize)]
pub(crate) struct ChatRequest {
    #[serde(default)]
    message: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClearRequest {
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ToolSummary<'a> {
    id: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatReply<'a> {
    response: &'a str,
    session_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool: Option<ToolSummary<'a>>,
}

/// `POST /api/chat`: one orchestrated turn.
pub(crate) async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> impl IntoResponse {
    let message = req.message.trim();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "message must not be empty" })),
        )
            .into_response();
    }

    let session_id = SessionStore::session_key(req.session_id.as_deref());
    let conversation = state.sessions.get_or_create(&session_id).await;
    // Held for the whole turn: one message at a time per session.
    let mut conversation = conversation.lock().await;

    info!(session = %session_id, "chat message received");
    match state
        .orchestrator
        .handle_message(&mut conversation, message)
        .await
    {
        Ok(outcome) => {
            let tool = match outcome.route {
                Route::ToolMatched {
                    ref tool_id,
                    ref response,
                } => Some(ToolSummary {
                    id: tool_id,
                    success: response.is_success(),
                    error: response.error.as_deref(),
                }),
                Route::NoToolMatched => None,
            };
            Json(ChatReply {
                response: &outcome.reply,
                session_id: &session_id,
                tool,
            })
            .into_response()
        }
        Err(e) => {
            error!(session = %session_id, error = %format!("{e:#}"), "chat turn failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "response": APOLOGY,
                    "session_id": session_id,
                    "error": format!("{e:#}"),
                })),
            )
                .into_response()
        }
    }
}

/// `POST /api/clear`: body is optional; `{ "session_id": "…" }`.
pub(crate) async fn api_clear(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        ClearRequest::default()
    } else {
        match serde_json::from_slice::<ClearRequest>(&body) {
            Ok(req) => req,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("invalid body: {e}") })),
                )
                    .into_response()
            }
        }
    };

    let session_id = SessionStore::session_key(req.session_id.as_deref());
    let existed = state.sessions.clear(&session_id).await;
    info!(session = %session_id, existed, "conversation cleared");
    Json(serde_json::json!({ "status": "success" })).into_response()
}
