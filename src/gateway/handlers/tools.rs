use axum::{extract::State, response::IntoResponse, Json};

use super::super::AppState;

/// `GET /api/tools`: tool identities in routing order.
pub(crate) async fn api_tools(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.orchestrator.router().identities())
}
