use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, ApiState};
use crate::config::MAX_HISTORY_DAYS;
use crate::error::ValidationError;
use crate::models::{Location, LocationInput, Session};
use crate::sensing::EndOutcome;
use crate::session::SessionStore;

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub current_network: Option<String>,
    pub session_active: bool,
    pub session_start: Option<DateTime<Utc>>,
    pub current_location: Option<Location>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResponse {
    pub network: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndSessionStatus {
    SessionEnded,
    NoActiveSession,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndSessionResponse {
    pub status: EndSessionStatus,
    pub session: Option<Session>,
}

#[derive(Debug, Deserialize)]
pub struct SessionsQuery {
    pub days: Option<i64>,
}

pub async fn health_check() -> Json<ApiResponse<String>> {
    ApiResponse::ok("OK".to_string())
}

pub async fn get_status(State(state): State<ApiState>) -> Json<ApiResponse<StatusResponse>> {
    let snapshot = state.monitor.snapshot().await;
    let session_start = snapshot.active_session.as_ref().map(|s| s.start_time);

    ApiResponse::ok(StatusResponse {
        session_active: snapshot.active_session.is_some(),
        current_location: snapshot.current_location().cloned(),
        current_network: snapshot.current_network,
        session_start,
        timestamp: Utc::now(),
    })
}

pub async fn get_current_network(
    State(state): State<ApiState>,
) -> Json<ApiResponse<NetworkResponse>> {
    let snapshot = state.monitor.snapshot().await;
    ApiResponse::ok(NetworkResponse {
        network: snapshot.current_network,
        timestamp: Utc::now(),
    })
}

pub async fn list_sessions(
    State(state): State<ApiState>,
    Query(query): Query<SessionsQuery>,
) -> ApiResult<Vec<Session>> {
    let days = query.days.unwrap_or(state.history_days);
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(ApiError::bad_request(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }

    let cutoff = Utc::now() - Duration::days(days);
    let sessions = state.db.sessions_since(cutoff).await?;
    Ok(ApiResponse::ok(sessions))
}

pub async fn get_locations(State(state): State<ApiState>) -> Json<ApiResponse<Vec<Location>>> {
    ApiResponse::ok(state.registry.list())
}

pub async fn replace_locations(
    State(state): State<ApiState>,
    payload: Result<Json<Vec<LocationInput>>, JsonRejection>,
) -> ApiResult<Vec<Location>> {
    let Json(inputs) =
        payload.map_err(|rejection| ValidationError::Malformed(rejection.body_text()))?;
    // The file write holds the registry's write lock; keep it off the runtime.
    let registry = state.registry.clone();
    let locations = tokio::task::spawn_blocking(move || registry.replace_all(inputs))
        .await
        .map_err(anyhow::Error::from)??;
    Ok(ApiResponse::ok(locations))
}

pub async fn end_session(State(state): State<ApiState>) -> ApiResult<EndSessionResponse> {
    let response = match state.monitor.end_session().await? {
        EndOutcome::Ended(session) => EndSessionResponse {
            status: EndSessionStatus::SessionEnded,
            session: Some(session),
        },
        EndOutcome::NoActiveSession => EndSessionResponse {
            status: EndSessionStatus::NoActiveSession,
            session: None,
        },
    };
    Ok(ApiResponse::ok(response))
}
