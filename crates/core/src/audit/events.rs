use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::demo::{DemoId, MemberId, TaskId};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Demo preparation
    /// A demo was created or its metadata replaced.
    DemoSubmitted {
        demo_id: DemoId,
        title: String,
        /// False for a newly created demo.
        updated: bool,
    },
    /// A demo was permanently deleted together with its tasks.
    DemoDeleted {
        demo_id: DemoId,
        title: String,
        task_count: usize,
    },
    TaskSubmitted {
        demo_id: DemoId,
        task_id: TaskId,
        key: String,
        owner: MemberId,
        updated: bool,
    },
    TaskDeleted {
        demo_id: DemoId,
        task_id: TaskId,
        key: String,
    },

    // Draw lifecycle
    DrawStarted {
        demo_id: DemoId,
        task_count: usize,
    },
    /// One draw round was persisted.
    RoundDrawn {
        demo_id: DemoId,
        round_id: String,
        /// Tasks that received a winner in this round
        drawn_task_ids: Vec<TaskId>,
        /// Tasks left undrawn because nobody was eligible
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        failed_task_ids: Vec<TaskId>,
        drawn_at: DateTime<Utc>,
        /// Demo status after the round
        status: String,
    },
    DrawReset {
        demo_id: DemoId,
        previous_status: String,
        /// Number of winners that were cleared
        cleared_winners: usize,
    },

    // Roster
    MemberCreated {
        member_id: MemberId,
        name: String,
    },
    MemberActiveChanged {
        member_id: MemberId,
        active: bool,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::DemoSubmitted { .. } => "demo_submitted",
            Self::DemoDeleted { .. } => "demo_deleted",
            Self::TaskSubmitted { .. } => "task_submitted",
            Self::TaskDeleted { .. } => "task_deleted",
            Self::DrawStarted { .. } => "draw_started",
            Self::RoundDrawn { .. } => "round_drawn",
            Self::DrawReset { .. } => "draw_reset",
            Self::MemberCreated { .. } => "member_created",
            Self::MemberActiveChanged { .. } => "member_active_changed",
        }
    }

    /// Extract demo_id if this event is demo-related
    pub fn demo_id(&self) -> Option<DemoId> {
        match self {
            Self::DemoSubmitted { demo_id, .. }
            | Self::DemoDeleted { demo_id, .. }
            | Self::TaskSubmitted { demo_id, .. }
            | Self::TaskDeleted { demo_id, .. }
            | Self::DrawStarted { demo_id, .. }
            | Self::RoundDrawn { demo_id, .. }
            | Self::DrawReset { demo_id, .. } => Some(*demo_id),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub demo_id: Option<DemoId>,
    pub data: AuditEvent,
}
