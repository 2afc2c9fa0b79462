//! Draw lifecycle integration tests.
//!
//! These tests drive a demo through the whole draw lifecycle against the
//! SQLite stores:
//! preparation -> in_progress -> finished -> (reset) -> in_progress

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;

use demolot_core::{
    metrics,
    testing::{fixtures, FixedClock, InMemoryDemoStore, ScriptedSelector, StaticRoster},
    Demo, DemoError, DemoId, DemoStore, DrawService, DrawStatus, FairnessSelector, Member,
    NewMember, SqliteDemoStore, SqliteMemberStore, WinnerSelector,
};

/// Test helper wiring a draw service to file-backed stores.
struct TestHarness {
    demo_store: Arc<SqliteDemoStore>,
    members: Arc<SqliteMemberStore>,
    clock: Arc<FixedClock>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("demolot.db");

        let demo_store =
            Arc::new(SqliteDemoStore::new(&db_path).expect("Failed to create demo store"));
        let members =
            Arc::new(SqliteMemberStore::new(&db_path).expect("Failed to create member store"));

        Self {
            demo_store,
            members,
            clock: Arc::new(FixedClock::default()),
            _temp_dir: temp_dir,
        }
    }

    fn add_member(&self, name: &str) -> Member {
        self.members
            .create(NewMember::new(name))
            .expect("Failed to create member")
    }

    fn service(&self, selector: Arc<dyn WinnerSelector>) -> DrawService {
        DrawService::new(
            self.demo_store.clone(),
            self.members.clone(),
            selector,
            self.clock.clone(),
        )
    }

    fn fair_service(&self) -> DrawService {
        self.service(Arc::new(FairnessSelector::new(true, Some(2024))))
    }
}

#[test]
fn test_two_tasks_two_members_finish() {
    let harness = TestHarness::new();
    let alice = harness.add_member("Alice");
    let bob = harness.add_member("Bob");
    // The other member owns the tasks so both presenters stay eligible
    let carol = harness.add_member("Carol");
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Sprint 1")).unwrap();
    let id = demo.id.unwrap();
    service
        .submit_task(id, fixtures::task_patch("APP-1", carol.id))
        .unwrap();
    service
        .submit_task(id, fixtures::task_patch("APP-2", carol.id))
        .unwrap();
    harness.members.set_active(carol.id, false).unwrap();

    let started = service.start_draw(id).unwrap();
    assert_eq!(started.draw_status, DrawStatus::InProgress);

    let outcome = service.draw_all_undrawn(id).unwrap();
    assert_eq!(outcome.drawn.len(), 2);
    assert!(!outcome.is_partial());
    assert_eq!(outcome.demo.draw_status, DrawStatus::Finished);

    let stored = service.get(id).unwrap();
    assert_eq!(stored.draw_status, DrawStatus::Finished);
    for task in &stored.tasks {
        let winner = task.winner.expect("task should have a winner");
        assert!(winner == alice.id || winner == bob.id);
    }
}

#[test]
fn test_no_eligible_member_is_reported_and_others_drawn() {
    let harness = TestHarness::new();
    let alice = harness.add_member("Alice");
    let bob = harness.add_member("Bob");
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Sprint 2")).unwrap();
    let id = demo.id.unwrap();
    service
        .submit_task(id, fixtures::task_patch("ALONE", alice.id))
        .unwrap();
    let demo = service
        .submit_task(id, fixtures::task_patch("SHARED", bob.id))
        .unwrap();
    let alone = demo.tasks[0].id.unwrap();
    let shared = demo.tasks[1].id.unwrap();
    service.start_draw(id).unwrap();

    // Only Alice stays active and she owns ALONE
    harness.members.set_active(bob.id, false).unwrap();

    let outcome = service.draw_tasks(id, &[alone, shared]).unwrap();
    assert!(outcome.is_partial());
    assert_eq!(outcome.failed_task_ids(), vec![alone]);
    assert_eq!(outcome.drawn, vec![shared]);
    assert_eq!(outcome.demo.draw_status, DrawStatus::InProgress);

    let stored = service.get(id).unwrap();
    assert_eq!(stored.task(alone).unwrap().winner, None);
    assert_eq!(stored.task(shared).unwrap().winner, Some(alice.id));
}

#[test]
fn test_delete_finished_demo_rejected() {
    let harness = TestHarness::new();
    harness.add_member("Alice");
    let bob = harness.add_member("Bob");
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Sprint 3")).unwrap();
    let id = demo.id.unwrap();
    service
        .submit_task(id, fixtures::task_patch("APP-9", bob.id))
        .unwrap();
    service.start_draw(id).unwrap();
    service.draw_all_undrawn(id).unwrap();
    let before = service.get(id).unwrap();
    assert_eq!(before.draw_status, DrawStatus::Finished);

    let err = service.delete_demo(id).unwrap_err();
    assert!(matches!(err, DemoError::InvalidStateTransition { .. }));
    assert!(err.to_string().contains("Finished"));

    assert_eq!(service.get(id).unwrap(), before);
}

#[test]
fn test_submit_task_with_foreign_id() {
    let harness = TestHarness::new();
    let alice = harness.add_member("Alice");
    let service = harness.fair_service();

    let first = service.submit(None, fixtures::demo_patch("First")).unwrap();
    let first = service
        .submit_task(first.id.unwrap(), fixtures::task_patch("A-1", alice.id))
        .unwrap();
    let foreign_task = first.tasks[0].id.unwrap();

    let second = service.submit(None, fixtures::demo_patch("Second")).unwrap();
    let second_id = second.id.unwrap();

    let err = service
        .submit_task(
            second_id,
            fixtures::task_patch("A-1", alice.id).for_task(foreign_task),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        DemoError::TaskNotFound { demo_id, task_id } if demo_id == second_id && task_id == foreign_task
    ));
}

#[test]
fn test_round_shares_one_timestamp() {
    let harness = TestHarness::new();
    let owner = harness.add_member("Owner");
    harness.add_member("Alice");
    harness.add_member("Bob");
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Sprint 4")).unwrap();
    let id = demo.id.unwrap();
    for key in ["K-1", "K-2", "K-3"] {
        service
            .submit_task(id, fixtures::task_patch(key, owner.id))
            .unwrap();
    }
    service.start_draw(id).unwrap();

    let first = service.get(id).unwrap().tasks[0].id.unwrap();
    let round_one = service.draw_task(id, first).unwrap();
    let first_at = round_one.drawn_at.unwrap();

    harness.clock.advance(Duration::minutes(5));
    let round_two = service.draw_all_undrawn(id).unwrap();
    let second_at = round_two.drawn_at.unwrap();
    assert_eq!(second_at - first_at, Duration::minutes(5));

    let stored = service.get(id).unwrap();
    assert_eq!(stored.draw_status, DrawStatus::Finished);
    assert_eq!(stored.tasks[0].draw_date_time, Some(first_at));
    let later: HashSet<_> = stored.tasks[1..]
        .iter()
        .map(|t| t.draw_date_time)
        .collect();
    assert_eq!(later.len(), 1);
    assert!(later.contains(&Some(second_at)));
}

#[test]
fn test_reset_then_redraw() {
    let harness = TestHarness::new();
    let owner = harness.add_member("Owner");
    harness.add_member("Alice");
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Sprint 5")).unwrap();
    let id = demo.id.unwrap();
    service
        .submit_task(id, fixtures::task_patch("R-1", owner.id))
        .unwrap();
    service.start_draw(id).unwrap();
    service.draw_all_undrawn(id).unwrap();

    let reset = service.reset_draw(id).unwrap();
    assert_eq!(reset.draw_status, DrawStatus::InProgress);
    assert!(reset.tasks.iter().all(|t| t.winner.is_none()));
    assert!(reset.tasks.iter().all(|t| t.draw_date_time.is_none()));

    // Edits stay locked after a reset
    assert!(matches!(
        service.submit(Some(id), fixtures::demo_patch("Renamed")),
        Err(DemoError::InvalidStateTransition { .. })
    ));

    let outcome = service.draw_all_undrawn(id).unwrap();
    assert_eq!(outcome.demo.draw_status, DrawStatus::Finished);
}

#[test]
fn test_reset_from_preparation_opens_draw() {
    let harness = TestHarness::new();
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Early")).unwrap();
    let reset = service.reset_draw(demo.id.unwrap()).unwrap();
    assert_eq!(reset.draw_status, DrawStatus::InProgress);
}

#[test]
fn test_empty_demo_finishes_on_draw() {
    let harness = TestHarness::new();
    let service = harness.fair_service();

    let demo = service.submit(None, fixtures::demo_patch("Empty")).unwrap();
    let id = demo.id.unwrap();
    service.start_draw(id).unwrap();

    let outcome = service.draw_all_undrawn(id).unwrap();
    assert!(outcome.drawn.is_empty());
    assert_eq!(outcome.demo.draw_status, DrawStatus::Finished);
}

#[test]
fn test_stale_sqlite_save_is_rejected() {
    let harness = TestHarness::new();
    let service = harness.fair_service();
    let demo = service.submit(None, fixtures::demo_patch("Shared")).unwrap();
    let id = demo.id.unwrap();

    let mut first = harness.demo_store.get(id).unwrap().unwrap();
    let mut second = harness.demo_store.get(id).unwrap().unwrap();

    first.title = "First writer".to_string();
    harness.demo_store.save(&first).unwrap();

    second.title = "Second writer".to_string();
    let err = harness.demo_store.save(&second).unwrap_err();
    assert!(matches!(err, DemoError::ConcurrentModification { demo_id } if demo_id == id));
    assert_eq!(service.get(id).unwrap().title, "First writer");
}

/// Store that lets another writer save right after every load.
struct RacingStore {
    inner: InMemoryDemoStore,
    armed: AtomicBool,
}

impl RacingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryDemoStore::new(),
            armed: AtomicBool::new(false),
        }
    }

    fn arm(&self, armed: bool) {
        self.armed.store(armed, Ordering::SeqCst);
    }
}

impl DemoStore for RacingStore {
    fn exists(&self, id: DemoId) -> Result<bool, DemoError> {
        self.inner.exists(id)
    }

    fn get(&self, id: DemoId) -> Result<Option<Demo>, DemoError> {
        let loaded = self.inner.get(id)?;
        if self.armed.load(Ordering::SeqCst) {
            self.inner.bump_version(id);
        }
        Ok(loaded)
    }

    fn find_all(&self) -> Result<Vec<Demo>, DemoError> {
        self.inner.find_all()
    }

    fn save(&self, demo: &Demo) -> Result<Demo, DemoError> {
        self.inner.save(demo)
    }

    fn delete(&self, id: DemoId) -> Result<(), DemoError> {
        self.inner.delete(id)
    }
}

#[test]
fn test_concurrent_writes_surface_conflict() {
    let store = Arc::new(RacingStore::new());
    let service = DrawService::new(
        store.clone(),
        Arc::new(StaticRoster::new(fixtures::team(&["Alice", "Bob"]))),
        Arc::new(ScriptedSelector::new(vec![2])),
        Arc::new(FixedClock::default()),
    );

    let demo = service.submit(None, fixtures::demo_patch("Race")).unwrap();
    let id = demo.id.unwrap();
    let demo = service
        .submit_task(id, fixtures::task_patch("X-1", 1))
        .unwrap();
    let task_id = demo.tasks[0].id.unwrap();
    let conflicts = metrics::CONCURRENT_CONFLICTS.get();

    // Starting loses the race: the demo stays in preparation
    store.arm(true);
    let err = service.start_draw(id).unwrap_err();
    assert!(matches!(err, DemoError::ConcurrentModification { demo_id } if demo_id == id));
    store.arm(false);
    assert_eq!(service.get(id).unwrap().draw_status, DrawStatus::Preparation);

    service.start_draw(id).unwrap();

    // A round that loses the race assigns nobody
    store.arm(true);
    let err = service.draw_tasks(id, &[task_id]).unwrap_err();
    assert!(matches!(err, DemoError::ConcurrentModification { .. }));
    store.arm(false);
    let stored = service.get(id).unwrap();
    assert_eq!(stored.draw_status, DrawStatus::InProgress);
    assert_eq!(stored.task(task_id).unwrap().winner, None);

    let outcome = service.draw_all_undrawn(id).unwrap();
    assert_eq!(outcome.demo.task(task_id).unwrap().winner, Some(2));
    assert_eq!(outcome.demo.draw_status, DrawStatus::Finished);

    // A reset that loses the race keeps the winners
    store.arm(true);
    let err = service.reset_draw(id).unwrap_err();
    assert!(matches!(err, DemoError::ConcurrentModification { .. }));
    store.arm(false);
    let stored = service.get(id).unwrap();
    assert_eq!(stored.draw_status, DrawStatus::Finished);
    assert_eq!(stored.task(task_id).unwrap().winner, Some(2));

    // Other tests in this binary may add their own conflicts
    assert!(metrics::CONCURRENT_CONFLICTS.get() >= conflicts + 3);
}
