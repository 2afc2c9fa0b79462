use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::SelectionError;
use crate::demo::{Demo, TaskId};

/// A task that could not get a winner in a round.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DrawFailure {
    pub task_id: TaskId,
    pub reason: SelectionError,
}

/// Result of one draw round.
#[derive(Debug, Clone, Serialize)]
pub struct DrawOutcome {
    /// Correlates the round with its audit record.
    pub round_id: Uuid,
    /// The demo as stored after the round.
    pub demo: Demo,
    /// Tasks that received a winner, in demo order.
    pub drawn: Vec<TaskId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DrawFailure>,
    /// Shared timestamp of the round, absent when the draw was not open.
    pub drawn_at: Option<DateTime<Utc>>,
}

impl DrawOutcome {
    /// A round that did not run because the demo is not in progress.
    pub(crate) fn skipped(demo: Demo) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            demo,
            drawn: Vec::new(),
            failures: Vec::new(),
            drawn_at: None,
        }
    }

    /// True when the round ran.
    pub fn was_drawn(&self) -> bool {
        self.drawn_at.is_some()
    }

    /// True when at least one requested task was left without a winner.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Ids of the tasks that failed.
    pub fn failed_task_ids(&self) -> Vec<TaskId> {
        self.failures.iter().map(|f| f.task_id).collect()
    }
}
