use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use diff_engine::MessageComparison;
use explorer_api::{ConnectionProfile, MessageId, MessageRecord, now_ms};
use mqtt_source::ConnectionStatus;
use pipeline::IngestStats;
use profiles::ProfileUpdate;
use topic_engine::{EngineStats, TreeFilter};

use super::AppState;
use crate::error::ApiError;

// ═══════════════════════════════════════════════════════════════
//  Tree: GET /api/tree?query=&retained_only=&changed_in_minutes=
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_tree(
    State(state): State<AppState>,
    Query(filter): Query<TreeFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.engine.display_list(&filter, now_ms())?;
    Ok(Json(rows))
}

#[derive(Serialize)]
struct ToggleResult {
    id: String,
    expanded: bool,
}

pub(crate) async fn handle_toggle(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.engine.toggle_expanded(&id)? {
        Some(expanded) => Ok(Json(ToggleResult { id, expanded })),
        None => Err(ApiError::NotFound(format!("topic '{id}' not found"))),
    }
}

pub(crate) async fn handle_expand_all(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.engine.expand_all()?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn handle_collapse_all(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.engine.collapse_all()?;
    Ok(StatusCode::NO_CONTENT)
}

// ═══════════════════════════════════════════════════════════════
//  Messages: history, single record, diff
// ═══════════════════════════════════════════════════════════════

#[derive(Deserialize)]
pub(crate) struct HistoryParams {
    #[serde(default, deserialize_with = "topic_engine::filter::lenient_option")]
    limit: Option<usize>,
}

pub(crate) async fn handle_history(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.engine.history(&topic, params.limit)?;
    Ok(Json(records))
}

pub(crate) async fn handle_message(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .engine
        .message(MessageId(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("message {id} not found")))
}

#[derive(Deserialize)]
pub(crate) struct DiffParams {
    old: u64,
    new: u64,
}

pub(crate) async fn handle_diff(
    State(state): State<AppState>,
    Query(params): Query<DiffParams>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = |id: u64| -> Result<Arc<MessageRecord>, ApiError> {
        state
            .engine
            .message(MessageId(id))?
            .ok_or_else(|| ApiError::NotFound(format!("message {id} not found")))
    };
    let old = lookup(params.old)?;
    let new = lookup(params.new)?;
    Ok(Json(MessageComparison::between(&old, &new)))
}

// ═══════════════════════════════════════════════════════════════
//  Ingest controls and stats
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_reset(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.ingest.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn handle_pause(State(state): State<AppState>) -> impl IntoResponse {
    state.ingest.pause();
    Json(state.ingest.stats())
}

pub(crate) async fn handle_resume(State(state): State<AppState>) -> impl IntoResponse {
    state.ingest.resume();
    Json(state.ingest.stats())
}

#[derive(Serialize)]
struct StatsView {
    ingest: IngestStats,
    engine: EngineStats,
    connection: ConnectionStatus,
}

pub(crate) async fn handle_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(StatsView {
        ingest: state.ingest.stats(),
        engine: state.engine.stats()?,
        connection: state.status.borrow().clone(),
    }))
}

// ═══════════════════════════════════════════════════════════════
//  Profiles: /api/profiles[/{id}]
// ═══════════════════════════════════════════════════════════════

pub(crate) async fn handle_list_profiles(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.profiles.list().await?))
}

pub(crate) async fn handle_get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.profiles.get(&id).await?))
}

/// Body carries the same fields as an update; `name` and `url` are required.
pub(crate) async fn handle_create_profile(
    State(state): State<AppState>,
    Json(mut body): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(name), Some(url)) = (body.name.take(), body.url.take()) else {
        return Err(ApiError::BadRequest("name and url are required".into()));
    };
    let mut profile = ConnectionProfile::new(name, url);
    body.apply(&mut profile);
    state.profiles.create(profile.clone()).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub(crate) async fn handle_update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.profiles.update(&id, body).await?))
}

pub(crate) async fn handle_delete_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.profiles.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
