use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{AuditEventEnvelope, AuditRecord};
use crate::demo::DemoId;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Audit payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Invalid audit timestamp '{0}'")]
    Timestamp(String),

    #[error("Audit store lock poisoned")]
    Poisoned,
}

/// Which part of the trail to read. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub demo_id: Option<DemoId>,
    pub event_type: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    /// Everything recorded about one demo.
    pub fn demo(demo_id: DemoId) -> Self {
        Self {
            demo_id: Some(demo_id),
            ..Self::default()
        }
    }

    /// Keep only events of one type, e.g. `round_drawn`.
    pub fn of_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Both bounds are inclusive and either may be open.
    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }
}

/// A window into the newest-first trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditPage {
    pub limit: i64,
    pub offset: i64,
}

impl AuditPage {
    pub const DEFAULT_LIMIT: i64 = 100;
    pub const MAX_LIMIT: i64 = 1000;

    /// Build a page from caller input, clamped into the allowed range.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for AuditPage {
    fn default() -> Self {
        Self::clamped(None, None)
    }
}

/// Durable storage behind the audit writer.
pub trait AuditStore: Send + Sync {
    /// Store a batch in emission order, all or nothing.
    ///
    /// Returns the number of records written.
    fn append(&self, batch: &[AuditEventEnvelope]) -> Result<usize, AuditError>;

    /// Matching records, newest first.
    fn query(&self, filter: &AuditFilter, page: AuditPage)
        -> Result<Vec<AuditRecord>, AuditError>;

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
