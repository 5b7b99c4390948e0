use std::sync::OnceLock;
use std::time::Instant;

use axum::{extract::State, response::IntoResponse, Json};
use chrono::{DateTime, Utc};

use super::super::AppState;

pub(crate) struct Startup {
    instant: Instant,
    at: DateTime<Utc>,
}

impl Startup {
    pub(crate) fn now() -> Self {
        Self {
            instant: Instant::now(),
            at: Utc::now(),
        }
    }
}

pub(crate) static STARTUP_TIME: OnceLock<Startup> = OnceLock::new();

/// `GET /api/health`
pub(crate) async fn api_health(State(state): State<AppState>) -> impl IntoResponse {
    let startup = STARTUP_TIME.get();
    let uptime_secs = startup.map(|s| s.instant.elapsed().as_secs()).unwrap_or(0);
    let started_at = startup.map(|s| s.at.to_rfc3339());

    let tools: Vec<String> = state
        .orchestrator
        .router()
        .identities()
        .into_iter()
        .map(|t| t.id)
        .collect();

    Json(serde_json::json!({
        "status": "UP",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime_secs,
        "started_at": started_at,
        "sessions": state.sessions.len().await,
        "tools": tools,
    }))
}
