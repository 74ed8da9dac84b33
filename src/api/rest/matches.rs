//! Match read endpoints and fixture creation

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::{ApiJson, ApiQuery, ApiResponse, ApiResult, Authenticated};
use crate::api::http::AppState;
use crate::scoring::NewMatch;
use crate::types::{ListingStatus, MatchProjection};

/// Query parameters for the dashboard listing
#[derive(Debug, Deserialize)]
pub struct ListMatchesParams {
    pub status: Option<ListingStatus>,
}

/// Optional innings filter
#[derive(Debug, Deserialize)]
pub struct InningsParams {
    pub innings: Option<u8>,
}

/// GET /api/matches - Dashboard listing
pub async fn list_matches(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ListMatchesParams>,
) -> ApiResult<Response> {
    let matches = state.service.list_matches(params.status)?;
    let projections: Vec<MatchProjection<'_>> = matches.iter().map(|m| m.projection()).collect();
    Ok(ApiResponse::new(projections, state.hub.current_sequence_id()).into_response())
}

/// POST /api/matches - Register a fixture (administrators only)
pub async fn create_match(
    State(state): State<Arc<AppState>>,
    Authenticated(actor): Authenticated,
    ApiJson(body): ApiJson<NewMatch>,
) -> ApiResult<Response> {
    let doc = state.service.create_match(&actor, body).await?;
    let response = ApiResponse::new(doc.projection(), state.hub.current_sequence_id());
    Ok((StatusCode::CREATED, response).into_response())
}

/// GET /api/matches/:id - Match snapshot with derived status
pub async fn get_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    // Read the sequence first so a client never skips an update it missed.
    let sequence_id = state.hub.current_sequence_id();
    let doc = state.service.get_match(&id)?;
    Ok(ApiResponse::new(doc.projection(), sequence_id).into_response())
}

/// GET /api/matches/:id/events - Ball log in sequence order
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<InningsParams>,
) -> ApiResult<Response> {
    let events = state.service.events(&id, params.innings)?;
    Ok(ApiResponse::new(events, state.hub.current_sequence_id()).into_response())
}

/// GET /api/matches/:id/scorecard - Replayed scorecard, current innings by default
pub async fn get_scorecard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<InningsParams>,
) -> ApiResult<Response> {
    let innings = match params.innings {
        Some(innings) => innings,
        None => state.service.get_match(&id)?.current_innings.unwrap_or(1),
    };
    let card = state.service.scorecard(&id, innings)?;
    Ok(ApiResponse::new(card, state.hub.current_sequence_id()).into_response())
}
