//! Demo aggregate data types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::DemoError;

/// Identifier of a stored demo.
pub type DemoId = i64;

/// Identifier of a stored demo task.
pub type TaskId = i64;

/// Identifier of a team member.
pub type MemberId = i64;

/// Draw lifecycle of a demo.
///
/// State machine flow:
/// ```text
/// Preparation -> InProgress -> Finished
///                    ^            |
///                    +-- reset ---+
/// ```
///
/// `Preparation` is the only state in which the demo and its tasks can be
/// edited. Once a draw starts the status is derived from the tasks: a demo is
/// `Finished` exactly when every task has a winner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum DrawStatus {
    /// Demo and tasks are being prepared; no draw yet.
    #[default]
    Preparation,
    /// Draw started, some tasks may still be waiting for a winner.
    InProgress,
    /// Every task has a winner (terminal, but resettable).
    Finished,
}

impl DrawStatus {
    /// Returns true if demo metadata and tasks may be changed.
    pub fn can_edit(&self) -> bool {
        matches!(self, DrawStatus::Preparation)
    }

    /// Returns true if a draw can be started from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, DrawStatus::Preparation)
    }

    /// Returns true if winners can be drawn in this state.
    pub fn can_draw(&self) -> bool {
        matches!(self, DrawStatus::InProgress)
    }

    /// Returns true if no further winners can be assigned without a reset.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DrawStatus::Finished)
    }

    /// Returns the status as a string (for storage and filtering).
    pub fn as_str(&self) -> &'static str {
        match self {
            DrawStatus::Preparation => "preparation",
            DrawStatus::InProgress => "in_progress",
            DrawStatus::Finished => "finished",
        }
    }

    /// Human readable name used in error messages.
    pub fn description(&self) -> &'static str {
        match self {
            DrawStatus::Preparation => "Preparation",
            DrawStatus::InProgress => "In progress",
            DrawStatus::Finished => "Finished",
        }
    }

    /// Parse a stored status string.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "preparation" => Some(DrawStatus::Preparation),
            "in_progress" => Some(DrawStatus::InProgress),
            "finished" => Some(DrawStatus::Finished),
            _ => None,
        }
    }
}

impl std::fmt::Display for DrawStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A task of a demo that needs a presenter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemoTask {
    /// Assigned by the store on first save.
    pub id: Option<TaskId>,
    /// Short key, unique within the demo (e.g. a ticket number).
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Member who proposed the task.
    pub owner: MemberId,
    /// Member drawn to present the task.
    #[serde(default)]
    pub winner: Option<MemberId>,
    /// Timestamp of the round that assigned the winner.
    #[serde(default)]
    pub draw_date_time: Option<DateTime<Utc>>,
}

impl DemoTask {
    /// Create a new, not yet stored task from a patch.
    pub fn from_patch(patch: TaskPatch) -> Self {
        Self {
            id: None,
            key: patch.key,
            title: patch.title,
            link: patch.link,
            owner: patch.owner,
            winner: None,
            draw_date_time: None,
        }
    }

    pub fn has_winner(&self) -> bool {
        self.winner.is_some()
    }

    /// Record the winner of a draw round.
    pub fn assign_winner(&mut self, winner: MemberId, drawn_at: DateTime<Utc>) {
        self.winner = Some(winner);
        self.draw_date_time = Some(drawn_at);
    }

    /// Forget the draw result.
    pub fn clear_draw(&mut self) {
        self.winner = None;
        self.draw_date_time = None;
    }

    fn apply(&mut self, patch: TaskPatch) {
        self.key = patch.key;
        self.title = patch.title;
        self.link = patch.link;
        self.owner = patch.owner;
    }
}

/// A demo event and its tasks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Demo {
    /// Assigned by the store on first save.
    pub id: Option<DemoId>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub draw_status: DrawStatus,
    #[serde(default)]
    pub tasks: Vec<DemoTask>,
    /// Optimistic lock counter, bumped by every successful save.
    #[serde(default)]
    pub version: i64,
}

impl Demo {
    /// Create a new demo in preparation from a patch.
    pub fn from_patch(patch: DemoPatch) -> Self {
        Self {
            id: None,
            title: patch.title,
            planned_date: patch.planned_date,
            summary: patch.summary,
            link: patch.link,
            draw_status: DrawStatus::Preparation,
            tasks: Vec::new(),
            version: 0,
        }
    }

    /// Replace the demo metadata. Status and tasks are left untouched.
    pub fn apply(&mut self, patch: DemoPatch) {
        self.title = patch.title;
        self.planned_date = patch.planned_date;
        self.summary = patch.summary;
        self.link = patch.link;
    }

    pub fn task(&self, task_id: TaskId) -> Option<&DemoTask> {
        self.tasks.iter().find(|t| t.id == Some(task_id))
    }

    pub fn task_mut(&mut self, task_id: TaskId) -> Option<&mut DemoTask> {
        self.tasks.iter_mut().find(|t| t.id == Some(task_id))
    }

    /// Insert or update a task.
    ///
    /// A patch carrying an id updates the matching task in place; without an
    /// id the task is appended. The id is resolved before the key is checked,
    /// so an id from another demo is always `TaskNotFound`.
    pub fn upsert_task(&mut self, patch: TaskPatch) -> Result<(), DemoError> {
        let demo_id = self.id.unwrap_or_default();
        let position = match patch.id {
            Some(task_id) => Some(
                self.tasks
                    .iter()
                    .position(|t| t.id == Some(task_id))
                    .ok_or(DemoError::TaskNotFound { demo_id, task_id })?,
            ),
            None => None,
        };

        let clashes = self
            .tasks
            .iter()
            .enumerate()
            .any(|(i, t)| t.key == patch.key && Some(i) != position);
        if clashes {
            return Err(DemoError::DuplicateTaskKey {
                demo_id,
                key: patch.key,
            });
        }

        match position {
            Some(i) => self.tasks[i].apply(patch),
            None => self.tasks.push(DemoTask::from_patch(patch)),
        }
        Ok(())
    }

    /// Remove a task by id, returning it.
    pub fn remove_task(&mut self, task_id: TaskId) -> Result<DemoTask, DemoError> {
        let position = self
            .tasks
            .iter()
            .position(|t| t.id == Some(task_id))
            .ok_or(DemoError::TaskNotFound {
                demo_id: self.id.unwrap_or_default(),
                task_id,
            })?;
        Ok(self.tasks.remove(position))
    }

    /// Ids of stored tasks that have no winner yet.
    pub fn undrawn_task_ids(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|t| !t.has_winner())
            .filter_map(|t| t.id)
            .collect()
    }
}

/// Caller supplied demo metadata.
///
/// Deliberately carries no status: the draw status can only be changed
/// through the draw operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DemoPatch {
    pub title: String,
    #[serde(default)]
    pub planned_date: Option<NaiveDate>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl DemoPatch {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_planned_date(mut self, date: NaiveDate) -> Self {
        self.planned_date = Some(date);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn validate(&self) -> Result<(), DemoError> {
        if self.title.trim().is_empty() {
            return Err(DemoError::Validation("demo title cannot be blank".to_string()));
        }
        Ok(())
    }
}

/// Caller supplied task fields. Winner and draw time are never accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPatch {
    /// Present to update an existing task, absent to add a new one.
    #[serde(default)]
    pub id: Option<TaskId>,
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    pub owner: MemberId,
}

impl TaskPatch {
    pub fn new(key: impl Into<String>, title: impl Into<String>, owner: MemberId) -> Self {
        Self {
            id: None,
            key: key.into(),
            title: title.into(),
            link: None,
            owner,
        }
    }

    /// Target an existing task.
    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.id = Some(task_id);
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn validate(&self) -> Result<(), DemoError> {
        if self.key.trim().is_empty() {
            return Err(DemoError::Validation("task key cannot be blank".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(DemoError::Validation("task title cannot be blank".to_string()));
        }
        Ok(())
    }
}
