//! Guards and transitions of the demo draw lifecycle.

use crate::demo::{Demo, DemoError, DemoTask, DrawStatus};

/// Fail unless the demo is still in preparation.
///
/// Always called on the freshly loaded demo, never on caller input.
pub fn ensure_editable(demo: &Demo, operation: &str) -> Result<(), DemoError> {
    if demo.draw_status.can_edit() {
        return Ok(());
    }
    Err(DemoError::InvalidStateTransition {
        demo_id: demo.id.unwrap_or_default(),
        current_state: demo.draw_status.description().to_string(),
        operation: operation.to_string(),
    })
}

/// Status implied by the tasks once a draw has started.
pub fn recompute_status(tasks: &[DemoTask]) -> DrawStatus {
    if tasks.iter().all(DemoTask::has_winner) {
        DrawStatus::Finished
    } else {
        DrawStatus::InProgress
    }
}

/// Move a demo from preparation to in-progress.
///
/// Returns false, leaving the demo alone, from any other state.
pub fn start(demo: &mut Demo) -> bool {
    if !demo.draw_status.can_start() {
        return false;
    }
    demo.draw_status = DrawStatus::InProgress;
    true
}

/// Clear every draw result and force the demo in progress.
///
/// Returns the number of winners that were cleared.
pub fn reset(demo: &mut Demo) -> usize {
    let cleared = demo.tasks.iter().filter(|t| t.has_winner()).count();
    for task in &mut demo.tasks {
        task.clear_draw();
    }
    demo.draw_status = DrawStatus::InProgress;
    cleared
}
