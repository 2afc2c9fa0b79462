//! Team member handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use demolot_core::{AuditEvent, Member, MemberId, NewMember};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::state::AppState;

/// Response for listing members
#[derive(Debug, Serialize)]
pub struct ListMembersResponse {
    pub members: Vec<Member>,
}

/// Request body for toggling a member
#[derive(Debug, Deserialize)]
pub struct SetActiveBody {
    pub active: bool,
}

/// List all members, active or not
pub async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListMembersResponse>, ApiError> {
    let members = state.members().list()?;
    Ok(Json(ListMembersResponse { members }))
}

/// Register a new member
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewMember>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let member = state.members().create(body)?;

    state.audit().try_emit(AuditEvent::MemberCreated {
        member_id: member.id,
        name: member.name.clone(),
    });

    Ok((StatusCode::CREATED, Json(member)))
}

/// Activate or deactivate a member
pub async fn set_member_active(
    State(state): State<Arc<AppState>>,
    Path(id): Path<MemberId>,
    Json(body): Json<SetActiveBody>,
) -> Result<Json<Member>, ApiError> {
    let member = state.members().set_active(id, body.active)?;

    state.audit().try_emit(AuditEvent::MemberActiveChanged {
        member_id: member.id,
        active: member.active,
    });

    Ok(Json(member))
}
