//! Demo and task editing handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use demolot_core::{Demo, DemoId, DemoPatch, TaskId, TaskPatch};
use serde::Serialize;

use super::error::ApiError;
use crate::state::AppState;

/// Response for listing demos
#[derive(Debug, Serialize)]
pub struct ListDemosResponse {
    pub demos: Vec<Demo>,
    pub total: usize,
}

/// List all demos, newest first
pub async fn list_demos(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListDemosResponse>, ApiError> {
    let demos = state.draw().find_all()?;
    Ok(Json(ListDemosResponse {
        total: demos.len(),
        demos,
    }))
}

/// Create a new demo in preparation
pub async fn create_demo(
    State(state): State<Arc<AppState>>,
    Json(patch): Json<DemoPatch>,
) -> Result<(StatusCode, Json<Demo>), ApiError> {
    let demo = state.draw().submit(None, patch)?;
    Ok((StatusCode::CREATED, Json(demo)))
}

pub async fn get_demo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
) -> Result<Json<Demo>, ApiError> {
    Ok(Json(state.draw().get(id)?))
}

/// Replace the metadata of a demo in preparation
pub async fn update_demo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
    Json(patch): Json<DemoPatch>,
) -> Result<Json<Demo>, ApiError> {
    Ok(Json(state.draw().submit(Some(id), patch)?))
}

pub async fn delete_demo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
) -> Result<StatusCode, ApiError> {
    state.draw().delete_demo(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a task, or update it when the body carries its id
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Demo>, ApiError> {
    Ok(Json(state.draw().submit_task(id, patch)?))
}

pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path((id, task_id)): Path<(DemoId, TaskId)>,
) -> Result<Json<Demo>, ApiError> {
    Ok(Json(state.draw().delete_task(id, task_id)?))
}
