//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::auth::TokenVerifier;
use super::rest::{commands, matches};
use super::sse::match_stream;
use super::websocket::{handler::ws_handler, ChannelHub};
use crate::scoring::ScoringService;

/// Shared state for every route
pub struct AppState {
    pub service: Arc<ScoringService>,
    /// Same hub the service publishes into
    pub hub: Arc<ChannelHub>,
    /// `None` turns the server read-only
    pub auth: Option<Arc<TokenVerifier>>,
}

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration - scoreboards are embedded on third-party pages
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Live feeds
        .route("/ws", get(ws_handler))
        .route("/api/matches/:id/stream", get(match_stream))
        // Health check
        .route("/health", get(health_check))
        // Reads
        .route(
            "/api/matches",
            get(matches::list_matches).post(matches::create_match),
        )
        .route("/api/matches/:id", get(matches::get_match))
        .route("/api/matches/:id/events", get(matches::list_events))
        .route("/api/matches/:id/scorecard", get(matches::get_scorecard))
        // Commands
        .route("/api/matches/:id/toss", post(commands::record_toss))
        .route("/api/matches/:id/start", post(commands::start_match))
        .route("/api/matches/:id/balls", post(commands::submit_ball))
        .route("/api/matches/:id/undo", post(commands::undo_last_ball))
        .route("/api/matches/:id/batters", post(commands::select_batters))
        .route("/api/matches/:id/bowler", post(commands::select_bowler))
        .route("/api/matches/:id/squad", post(commands::set_squad))
        .route("/api/matches/:id/end-innings", post(commands::end_innings))
        .route("/api/matches/:id/start-innings", post(commands::start_second_innings))
        .route("/api/matches/:id/end-match", post(commands::end_match))
        .route("/api/matches/:id/status", post(commands::set_status))
        .route("/api/matches/:id/announce", post(commands::announce))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
