//! Draw lifecycle handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use demolot_core::{Demo, DemoId, DrawOutcome, TaskId};
use serde::Deserialize;

use super::error::ApiError;
use crate::state::AppState;

/// Request body for a draw round
#[derive(Debug, Deserialize)]
pub struct DrawBody {
    /// Tasks to draw. All undrawn tasks when omitted.
    pub task_ids: Option<Vec<TaskId>>,
}

pub async fn start_draw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
) -> Result<Json<Demo>, ApiError> {
    Ok(Json(state.draw().start_draw(id)?))
}

/// Run one draw round
pub async fn draw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
    body: Option<Json<DrawBody>>,
) -> Result<Json<DrawOutcome>, ApiError> {
    let task_ids = body.and_then(|Json(b)| b.task_ids);
    let outcome = match task_ids {
        Some(ids) => state.draw().draw_tasks(id, &ids)?,
        None => state.draw().draw_all_undrawn(id)?,
    };
    Ok(Json(outcome))
}

pub async fn draw_task(
    State(state): State<Arc<AppState>>,
    Path((id, task_id)): Path<(DemoId, TaskId)>,
) -> Result<Json<DrawOutcome>, ApiError> {
    Ok(Json(state.draw().draw_task(id, task_id)?))
}

/// Clear every winner and reopen the draw
pub async fn reset_draw(
    State(state): State<Arc<AppState>>,
    Path(id): Path<DemoId>,
) -> Result<Json<Demo>, ApiError> {
    Ok(Json(state.draw().reset_draw(id)?))
}
