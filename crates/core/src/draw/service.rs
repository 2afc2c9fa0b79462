//! Draw orchestration over the demo aggregate.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{state, Clock, DrawFailure, DrawOutcome, WinTally, WinnerSelector};
use crate::audit::{AuditEvent, AuditHandle};
use crate::demo::{Demo, DemoError, DemoId, DemoPatch, DemoStore, TaskId, TaskPatch};
use crate::member::MemberDirectory;
use crate::metrics;

/// Coordinates demo editing and draw rounds.
///
/// Every operation loads the demo from the store, mutates it in memory and
/// persists it at most once. A concurrent save surfaces as
/// [`DemoError::ConcurrentModification`]; nothing is retried here.
pub struct DrawService {
    store: Arc<dyn DemoStore>,
    members: Arc<dyn MemberDirectory>,
    selector: Arc<dyn WinnerSelector>,
    clock: Arc<dyn Clock>,
    audit: Option<AuditHandle>,
}

impl DrawService {
    pub fn new(
        store: Arc<dyn DemoStore>,
        members: Arc<dyn MemberDirectory>,
        selector: Arc<dyn WinnerSelector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            members,
            selector,
            clock,
            audit: None,
        }
    }

    /// Attach an audit handle for emitting events.
    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    fn load(&self, demo_id: DemoId) -> Result<Demo, DemoError> {
        self.store
            .get(demo_id)?
            .ok_or(DemoError::NotFound(demo_id))
    }

    fn persist(&self, demo: &Demo, operation: &str) -> Result<Demo, DemoError> {
        match self.store.save(demo) {
            Ok(saved) => {
                metrics::STATE_TRANSITIONS
                    .with_label_values(&[operation])
                    .inc();
                Ok(saved)
            }
            Err(e @ DemoError::ConcurrentModification { .. }) => {
                metrics::CONCURRENT_CONFLICTS.inc();
                warn!("Conflicting {} on demo {:?}: {}", operation, demo.id, e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self, demo_id: DemoId) -> Result<bool, DemoError> {
        self.store.exists(demo_id)
    }

    /// Get a demo, failing with `NotFound` when absent.
    pub fn get(&self, demo_id: DemoId) -> Result<Demo, DemoError> {
        self.load(demo_id)
    }

    /// All demos, newest first.
    pub fn find_all(&self) -> Result<Vec<Demo>, DemoError> {
        self.store.find_all()
    }

    /// Open the draw of a demo in preparation.
    ///
    /// Any other state leaves the demo untouched and unsaved.
    pub fn start_draw(&self, demo_id: DemoId) -> Result<Demo, DemoError> {
        let mut demo = self.load(demo_id)?;
        if !state::start(&mut demo) {
            debug!(
                "Draw of demo {} already started ({})",
                demo_id, demo.draw_status
            );
            return Ok(demo);
        }

        let saved = self.persist(&demo, "start_draw")?;
        info!("Draw started for demo {} ({} tasks)", demo_id, saved.tasks.len());
        self.emit(AuditEvent::DrawStarted {
            demo_id,
            task_count: saved.tasks.len(),
        });
        Ok(saved)
    }

    /// Draw every task of the demo that has no winner yet.
    pub fn draw_all_undrawn(&self, demo_id: DemoId) -> Result<DrawOutcome, DemoError> {
        let demo = self.load(demo_id)?;
        let task_ids = demo.undrawn_task_ids();
        self.draw_round(demo, &task_ids)
    }

    /// Draw a single task.
    pub fn draw_task(&self, demo_id: DemoId, task_id: TaskId) -> Result<DrawOutcome, DemoError> {
        self.draw_tasks(demo_id, &[task_id])
    }

    /// Draw the given tasks in one round.
    ///
    /// Ids that do not belong to the demo are ignored, as are tasks that
    /// already have a winner. Outside of `InProgress` the demo is returned
    /// unchanged.
    pub fn draw_tasks(
        &self,
        demo_id: DemoId,
        task_ids: &[TaskId],
    ) -> Result<DrawOutcome, DemoError> {
        let demo = self.load(demo_id)?;
        self.draw_round(demo, task_ids)
    }

    fn draw_round(&self, mut demo: Demo, task_ids: &[TaskId]) -> Result<DrawOutcome, DemoError> {
        let demo_id = demo.id.unwrap_or_default();
        if !demo.draw_status.can_draw() {
            debug!(
                "Skipping draw of demo {}: status is {}",
                demo_id, demo.draw_status
            );
            metrics::DRAW_ROUNDS.with_label_values(&["skipped"]).inc();
            return Ok(DrawOutcome::skipped(demo));
        }

        let round_id = Uuid::new_v4();
        let drawn_at = self.clock.now();
        let members = self.members.active_members()?;
        let mut tally = WinTally::from_tasks(&demo.tasks);
        let requested: HashSet<TaskId> = task_ids.iter().copied().collect();

        let mut drawn = Vec::new();
        let mut failures = Vec::new();

        for task in demo.tasks.iter_mut() {
            let Some(task_id) = task.id else { continue };
            if !requested.contains(&task_id) {
                continue;
            }
            if task.has_winner() {
                debug!("Task {} of demo {} already has a winner", task_id, demo_id);
                continue;
            }

            match self.selector.select(task, &members, &tally) {
                Ok(winner) => {
                    task.assign_winner(winner, drawn_at);
                    tally.record(winner);
                    drawn.push(task_id);
                }
                Err(reason) => {
                    warn!("Task {} of demo {} left undrawn: {}", task_id, demo_id, reason);
                    metrics::DRAW_FAILURES
                        .with_label_values(&[reason.reason()])
                        .inc();
                    failures.push(DrawFailure { task_id, reason });
                }
            }
        }

        let status = state::recompute_status(&demo.tasks);
        let changed = !drawn.is_empty() || status != demo.draw_status;
        demo.draw_status = status;

        let demo = if changed {
            self.persist(&demo, "draw")?
        } else {
            demo
        };

        let result = if failures.is_empty() {
            "complete"
        } else {
            "partial"
        };
        metrics::DRAW_ROUNDS.with_label_values(&[result]).inc();
        metrics::TASKS_DRAWN.inc_by(drawn.len() as u64);
        if !drawn.is_empty() {
            metrics::ROUND_SIZE
                .with_label_values(&[])
                .observe(drawn.len() as f64);
        }

        info!(
            "Round {} on demo {}: {} drawn, {} failed, status {}",
            round_id,
            demo_id,
            drawn.len(),
            failures.len(),
            demo.draw_status
        );

        let outcome = DrawOutcome {
            round_id,
            demo,
            drawn,
            failures,
            drawn_at: Some(drawn_at),
        };

        if changed || outcome.is_partial() {
            self.emit(AuditEvent::RoundDrawn {
                demo_id,
                round_id: round_id.to_string(),
                drawn_task_ids: outcome.drawn.clone(),
                failed_task_ids: outcome.failed_task_ids(),
                drawn_at,
                status: outcome.demo.draw_status.as_str().to_string(),
            });
        }

        Ok(outcome)
    }

    /// Clear all winners and reopen the draw.
    pub fn reset_draw(&self, demo_id: DemoId) -> Result<Demo, DemoError> {
        let mut demo = self.load(demo_id)?;
        let previous = demo.draw_status;
        let cleared = state::reset(&mut demo);

        if cleared == 0 && previous == demo.draw_status {
            debug!("Reset of demo {} changed nothing", demo_id);
            return Ok(demo);
        }

        let saved = self.persist(&demo, "reset_draw")?;
        info!(
            "Draw of demo {} reset from {} ({} winners cleared)",
            demo_id, previous, cleared
        );
        self.emit(AuditEvent::DrawReset {
            demo_id,
            previous_status: previous.as_str().to_string(),
            cleared_winners: cleared,
        });
        Ok(saved)
    }

    /// Create a demo (no id) or replace the metadata of one in preparation.
    pub fn submit(&self, demo_id: Option<DemoId>, patch: DemoPatch) -> Result<Demo, DemoError> {
        let (demo, updated) = match demo_id {
            None => {
                patch.validate()?;
                (Demo::from_patch(patch), false)
            }
            Some(id) => {
                let mut demo = self.load(id)?;
                state::ensure_editable(&demo, "submit")?;
                patch.validate()?;
                demo.apply(patch);
                (demo, true)
            }
        };

        let saved = self.persist(&demo, "submit")?;
        let saved_id = saved.id.unwrap_or_default();
        if updated {
            info!("Demo {} updated", saved_id);
        } else {
            info!("Demo {} created: {}", saved_id, saved.title);
        }
        self.emit(AuditEvent::DemoSubmitted {
            demo_id: saved_id,
            title: saved.title.clone(),
            updated,
        });
        Ok(saved)
    }

    /// Add a task, or update one in place when the patch carries an id.
    pub fn submit_task(&self, demo_id: DemoId, patch: TaskPatch) -> Result<Demo, DemoError> {
        let mut demo = self.load(demo_id)?;
        state::ensure_editable(&demo, "submit a task to")?;
        patch.validate()?;

        let updated = patch.id.is_some();
        let key = patch.key.clone();
        let owner = patch.owner;
        demo.upsert_task(patch)?;

        // Only checked once the task id is known to belong to this demo
        if self.members.get(owner)?.is_none() {
            return Err(DemoError::MemberNotFound(owner));
        }

        let saved = self.persist(&demo, "submit_task")?;
        let task_id = saved
            .tasks
            .iter()
            .find(|t| t.key == key)
            .and_then(|t| t.id)
            .unwrap_or_default();

        info!("Task {} ({}) submitted to demo {}", task_id, key, demo_id);
        self.emit(AuditEvent::TaskSubmitted {
            demo_id,
            task_id,
            key,
            owner,
            updated,
        });
        Ok(saved)
    }

    /// Remove a task from a demo in preparation.
    pub fn delete_task(&self, demo_id: DemoId, task_id: TaskId) -> Result<Demo, DemoError> {
        let mut demo = self.load(demo_id)?;
        state::ensure_editable(&demo, "delete a task of")?;
        let removed = demo.remove_task(task_id)?;

        let saved = self.persist(&demo, "delete_task")?;
        info!("Task {} ({}) removed from demo {}", task_id, removed.key, demo_id);
        self.emit(AuditEvent::TaskDeleted {
            demo_id,
            task_id,
            key: removed.key,
        });
        Ok(saved)
    }

    /// Delete a demo in preparation together with its tasks.
    pub fn delete_demo(&self, demo_id: DemoId) -> Result<(), DemoError> {
        let demo = self.load(demo_id)?;
        state::ensure_editable(&demo, "delete")?;

        self.store.delete(demo_id)?;
        metrics::STATE_TRANSITIONS
            .with_label_values(&["delete"])
            .inc();
        info!("Demo {} deleted", demo_id);
        self.emit(AuditEvent::DemoDeleted {
            demo_id,
            title: demo.title,
            task_count: demo.tasks.len(),
        });
        Ok(())
    }
}
