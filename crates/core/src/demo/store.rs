//! Demo storage trait and error type.

use thiserror::Error;

use super::{Demo, DemoId, MemberId, TaskId};
use crate::member::MemberError;

/// Error type for demo operations.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Demo not found.
    #[error("Demo not found: {0}")]
    NotFound(DemoId),

    /// Cannot perform operation due to the current draw status.
    #[error("Cannot {operation} demo {demo_id}: current state is '{current_state}'")]
    InvalidStateTransition {
        demo_id: DemoId,
        current_state: String,
        operation: String,
    },

    /// Task id does not belong to the demo.
    #[error("Task {task_id} not found in demo {demo_id}")]
    TaskNotFound { demo_id: DemoId, task_id: TaskId },

    /// Another task of the demo already uses this key.
    #[error("Task key '{key}' is already used in demo {demo_id}")]
    DuplicateTaskKey { demo_id: DemoId, key: String },

    /// Referenced member does not exist.
    #[error("Member not found: {0}")]
    MemberNotFound(MemberId),

    /// The stored demo changed since it was loaded.
    #[error("Demo {demo_id} was modified concurrently, reload and retry")]
    ConcurrentModification { demo_id: DemoId },

    /// Submitted data is invalid.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Member directory failure.
    #[error("Member directory error: {0}")]
    Members(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<MemberError> for DemoError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::NotFound(id) => DemoError::MemberNotFound(id),
            other => DemoError::Members(other.to_string()),
        }
    }
}

/// Trait for demo storage backends.
///
/// Implementations persist the whole aggregate (demo plus tasks) at once.
/// `save` must reject a demo whose `version` no longer matches the stored
/// one with [`DemoError::ConcurrentModification`].
pub trait DemoStore: Send + Sync {
    /// Returns true if a demo with this id exists.
    fn exists(&self, id: DemoId) -> Result<bool, DemoError>;

    /// Get a demo with its tasks.
    fn get(&self, id: DemoId) -> Result<Option<Demo>, DemoError>;

    /// List all demos, newest (highest id) first.
    fn find_all(&self) -> Result<Vec<Demo>, DemoError>;

    /// Insert or update a demo and its tasks.
    ///
    /// Assigns ids to a new demo and its new tasks, removes tasks that are no
    /// longer part of the aggregate and returns the stored demo with its new
    /// version.
    fn save(&self, demo: &Demo) -> Result<Demo, DemoError>;

    /// Permanently delete a demo and its tasks.
    fn delete(&self, id: DemoId) -> Result<(), DemoError>;
}
