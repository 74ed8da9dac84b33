//! REST API module for HTTP endpoints
//!
//! - `matches`: fixture listing, match snapshot, ball log and scorecard reads
//! - `commands`: scorer and administrator write endpoints
//!
//! Every response body is either an [`ApiResponse`] or an [`ApiError`].

pub mod commands;
pub mod matches;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use super::auth::AuthError;
use super::http::AppState;
use crate::error::ScoringError;
use crate::scoring::Actor;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Current feed sequence ID, for lining a snapshot up with the live feed
    pub sequence_id: u64,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T, sequence_id: u64) -> Self {
        Self { data, sequence_id }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    #[serde(skip)]
    pub status: StatusCode,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.to_string(),
            status,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ScoringError> for ApiError {
    fn from(err: ScoringError) -> Self {
        let status = match &err {
            ScoringError::Validation { .. } => StatusCode::BAD_REQUEST,
            ScoringError::StateGuard(_) => StatusCode::CONFLICT,
            ScoringError::Forbidden => StatusCode::FORBIDDEN,
            ScoringError::NotFound(_) => StatusCode::NOT_FOUND,
            ScoringError::Storage(e) => {
                error!(error = %e, "Storage failure");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.code(), "storage failure");
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::unauthorized(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body whose rejections are reported as `VALIDATION` errors
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Query string whose rejections are reported as `VALIDATION` errors
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::validation(rejection.body_text()))?;
        Ok(ApiQuery(value))
    }
}

/// Caller identity from the bearer token
pub struct Authenticated(pub Actor);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let verifier = state.auth.as_ref().ok_or(AuthError::WritesDisabled)?;
        Ok(Authenticated(verifier.actor_from_headers(&parts.headers)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_store::StoreError;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ScoringError::validation("runs", "bad"), StatusCode::BAD_REQUEST, "VALIDATION"),
            (ScoringError::guard("toss already completed"), StatusCode::CONFLICT, "STATE_GUARD"),
            (ScoringError::Forbidden, StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ScoringError::NotFound("m1".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
        ];
        for (err, status, code) in cases {
            let api = ApiError::from(err);
            assert_eq!(api.status, status);
            assert_eq!(api.code, code);
        }
    }

    #[test]
    fn test_storage_errors_do_not_leak_details() {
        let err = ScoringError::Storage(StoreError::Corrupted {
            match_id: "m1".to_string(),
            reason: "/srv/data/matches/m1/events.jsonl line 3".to_string(),
        });
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.code, "STORAGE_ERROR");
        assert_eq!(api.error, "storage failure");
    }

    #[test]
    fn test_error_body_shape() {
        let json = serde_json::to_value(ApiError::validation("invalid runs")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "invalid runs", "code": "VALIDATION" }));
    }
}
