//! Read access to the audit trail.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use demolot_core::{AuditFilter, AuditPage, AuditRecord, DemoId};
use serde::{Deserialize, Serialize};

use super::error::ApiError;
use crate::state::AppState;

/// `GET /audit` query string. Every field is optional.
#[derive(Debug, Deserialize)]
pub struct AuditQueryParams {
    pub demo_id: Option<DemoId>,
    /// e.g. "round_drawn"
    pub event_type: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    /// Default 100, clamped to 1..=1000
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditQueryParams {
    fn filter(&self) -> AuditFilter {
        AuditFilter {
            demo_id: self.demo_id,
            event_type: self.event_type.clone(),
            from: self.from,
            to: self.to,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuditQueryResponse {
    pub events: Vec<AuditRecord>,
    /// Matching events across all pages
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Newest-first page of audit events.
pub async fn query_audit(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditQueryResponse>, ApiError> {
    let filter = params.filter();
    let page = AuditPage::clamped(params.limit, params.offset);

    let events = state.audit_store().query(&filter, page)?;
    let total = state.audit_store().count(&filter)?;

    Ok(Json(AuditQueryResponse {
        events,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}
