//! Prometheus metrics for the draw engine.
//!
//! Registered into the server registry through [`all_metrics`].

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Draw rounds
// =============================================================================

/// Draw rounds total by result.
pub static DRAW_ROUNDS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("demolot_draw_rounds_total", "Total draw rounds"),
        &["result"], // "complete", "partial", "skipped"
    )
    .unwrap()
});

/// Tasks that received a winner.
pub static TASKS_DRAWN: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "demolot_tasks_drawn_total",
        "Total tasks that were assigned a winner",
    )
    .unwrap()
});

/// Per-task draw failures by reason.
pub static DRAW_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "demolot_draw_failures_total",
            "Total tasks left undrawn in a round",
        ),
        &["reason"], // "no_eligible_members"
    )
    .unwrap()
});

/// Tasks considered per round.
pub static ROUND_SIZE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "demolot_draw_round_size",
            "Number of tasks drawn per persisted round",
        )
        .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 50.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Demo lifecycle
// =============================================================================

/// Saves rejected by the optimistic version check.
pub static CONCURRENT_CONFLICTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "demolot_concurrent_conflicts_total",
        "Total demo saves rejected because the demo changed concurrently",
    )
    .unwrap()
});

/// Persisted state-changing operations by name.
pub static STATE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "demolot_state_transitions_total",
            "Demo state-changing operations that were persisted",
        ),
        &["operation"], // "start_draw", "draw", "reset_draw", "submit", "delete", ...
    )
    .unwrap()
});

// =============================================================================
// Audit
// =============================================================================

/// Audit events lost before reaching the writer.
pub static AUDIT_EVENTS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "demolot_audit_events_dropped_total",
            "Audit events dropped at the channel",
        ),
        &["reason"], // "full", "closed"
    )
    .unwrap()
});

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(DRAW_ROUNDS.clone()),
        Box::new(TASKS_DRAWN.clone()),
        Box::new(DRAW_FAILURES.clone()),
        Box::new(ROUND_SIZE.clone()),
        Box::new(CONCURRENT_CONFLICTS.clone()),
        Box::new(STATE_TRANSITIONS.clone()),
        Box::new(AUDIT_EVENTS_DROPPED.clone()),
    ]
}
