//! Scoring command endpoints
//!
//! All routes here require a bearer token. Each returns the committed match
//! projection plus the ball log entries the command appended.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::{ApiJson, ApiResponse, ApiResult, Authenticated};
use crate::api::http::AppState;
use crate::scoring::{BallInput, Committed};
use crate::types::{BallEvent, MatchProjection, TerminalStatus, TossDecision};

#[derive(Debug, Serialize)]
pub struct CommandResponse<'a> {
    #[serde(rename = "match")]
    pub match_doc: MatchProjection<'a>,
    pub events: &'a [BallEvent],
}

fn respond(state: &AppState, committed: Committed) -> Response {
    let body = CommandResponse {
        match_doc: committed.doc.projection(),
        events: &committed.events,
    };
    ApiResponse::new(body, state.hub.current_sequence_id()).into_response()
}

#[derive(Debug, Deserialize)]
pub struct TossBody {
    pub winner: String,
    pub decision: TossDecision,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattersBody {
    #[serde(default)]
    pub striker: Option<String>,
    #[serde(default)]
    pub non_striker: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BowlerBody {
    pub bowler: String,
}

#[derive(Debug, Deserialize)]
pub struct SquadBody {
    pub team: String,
    pub players: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EndMatchBody {
    pub result: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: TerminalStatus,
    #[serde(default)]
    pub announcement: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnnounceBody {
    pub message: String,
}

/// POST /api/matches/:id/toss
pub async fn record_toss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<TossBody>,
) -> ApiResult<Response> {
    let committed = state
        .service
        .record_toss(&actor, &id, &body.winner, body.decision)
        .await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/start
pub async fn start_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Response> {
    let committed = state.service.start_match(&actor, &id).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/balls
pub async fn submit_ball(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(input): ApiJson<BallInput>,
) -> ApiResult<Response> {
    let committed = state.service.submit_ball(&actor, &id, input).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/undo
pub async fn undo_last_ball(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Response> {
    let committed = state.service.undo_last_ball(&actor, &id).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/batters
pub async fn select_batters(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<BattersBody>,
) -> ApiResult<Response> {
    let committed = state
        .service
        .select_batters(&actor, &id, body.striker, body.non_striker)
        .await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/bowler
pub async fn select_bowler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<BowlerBody>,
) -> ApiResult<Response> {
    let committed = state.service.select_bowler(&actor, &id, &body.bowler).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/squad
pub async fn set_squad(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<SquadBody>,
) -> ApiResult<Response> {
    let committed = state
        .service
        .set_squad(&actor, &id, &body.team, body.players)
        .await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/end-innings
pub async fn end_innings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Response> {
    let committed = state.service.end_innings(&actor, &id).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/start-innings
pub async fn start_second_innings(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
) -> ApiResult<Response> {
    let committed = state.service.start_second_innings(&actor, &id).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/end-match
pub async fn end_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<EndMatchBody>,
) -> ApiResult<Response> {
    let committed = state.service.end_match(&actor, &id, &body.result).await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/status - Administrative cancel or abandon
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<StatusBody>,
) -> ApiResult<Response> {
    let committed = state
        .service
        .set_status(&actor, &id, body.status, body.announcement)
        .await?;
    Ok(respond(&state, committed))
}

/// POST /api/matches/:id/announce
pub async fn announce(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<AnnounceBody>,
) -> ApiResult<Response> {
    let committed = state.service.announce(&actor, &id, &body.message).await?;
    Ok(respond(&state, committed))
}
