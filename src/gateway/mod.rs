//! HTTP gateway.  Serves:
//! - `POST /api/chat`:   one chat turn: `{ message, session_id? }`
//! - `POST /api/clear`:  reset a session's conversation
//! - `GET  /api/health`: liveness plus registered tools (no auth)
//! - `GET  /api/tools`:  tool identities in routing order
//!
//! Everything else falls through to the static file directory.

mod auth;
mod handlers;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::orchestrator::Orchestrator;
use crate::session::SessionStore;

/// Handle returned by [`start_gateway`].
pub struct Gateway {
    /// Server task handle.
    pub handle: JoinHandle<()>,
    /// The address the server is actually listening on.
    pub addr: SocketAddr,
}

// ---------------------------------------------------------------------------
// Shared state injected into axum handlers
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub(crate) orchestrator: Arc<Orchestrator>,
    pub(crate) sessions: Arc<SessionStore>,
    pub(crate) api_token: Option<String>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        sessions: Arc<SessionStore>,
        api_token: Option<String>,
    ) -> Self {
        Self {
            orchestrator,
            sessions,
            api_token: api_token.filter(|t| !t.is_empty()),
        }
    }
}

/// Build the axum application.
pub fn build_app(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    let protected = Router::new()
        .route("/chat", post(handlers::chat::api_chat))
        .route("/clear", post(handlers::chat::api_clear))
        .route("/tools", get(handlers::tools::api_tools))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    let api_router = Router::new()
        .route("/health", get(handlers::health::api_health))
        .merge(protected);

    Router::new()
        .nest("/api", api_router)
        .with_state(state)
        .fallback_service(ServeDir::new(static_dir.into()))
        .layer(CorsLayer::permissive())
}

// ---------------------------------------------------------------------------
// Server startup
// ---------------------------------------------------------------------------

/// Start the gateway on `addr`.
///
/// Returns a [`Gateway`] holding the server task handle and the bound
/// address (useful when `addr` has port 0).
pub async fn start_gateway(
    addr: SocketAddr,
    state: AppState,
    static_dir: impl Into<PathBuf>,
) -> std::io::Result<Gateway> {
    if state.api_token.is_some() {
        info!("API authentication enabled");
    } else {
        warn!("API authentication disabled (server.api_token not set)");
    }

    let _ = handlers::health::STARTUP_TIME.set(handlers::health::Startup::now());

    let app = build_app(state, static_dir);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("gateway server error: {e}");
        }
    });

    info!(%bound_addr, "gateway started");

    Ok(Gateway {
        handle,
        addr: bound_addr,
    })
}
