//! Testing utilities and in-memory doubles for the draw engine.
//!
//! These stand in for the SQLite stores, the wall clock and the random
//! selector so draw scenarios can be asserted exactly.
//!
//! # Example
//!
//! ```rust,ignore
//! use demolot_core::testing::{FixedClock, InMemoryDemoStore, ScriptedSelector, StaticRoster};
//!
//! let service = DrawService::new(
//!     Arc::new(InMemoryDemoStore::new()),
//!     Arc::new(StaticRoster::new(fixtures::team(&["Alice", "Bob"]))),
//!     Arc::new(ScriptedSelector::new(vec![2, 1])),
//!     Arc::new(FixedClock::default()),
//! );
//! ```

mod mock_clock;
mod mock_demo_store;
mod mock_roster;
mod mock_selector;

pub use mock_clock::FixedClock;
pub use mock_demo_store::InMemoryDemoStore;
pub use mock_roster::StaticRoster;
pub use mock_selector::ScriptedSelector;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::demo::{DemoPatch, MemberId, TaskPatch};
    use crate::member::Member;

    /// Active members with ids 1..=n in the given order.
    pub fn team(names: &[&str]) -> Vec<Member> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Member::new(i as MemberId + 1, *name))
            .collect()
    }

    /// A demo patch with a planned date.
    pub fn demo_patch(title: &str) -> DemoPatch {
        let patch = DemoPatch::new(title).with_summary(format!("{} summary", title));
        match chrono::NaiveDate::from_ymd_opt(2024, 2, 1) {
            Some(date) => patch.with_planned_date(date),
            None => patch,
        }
    }

    /// A new task keyed `key`, proposed by `owner`.
    pub fn task_patch(key: &str, owner: MemberId) -> TaskPatch {
        TaskPatch::new(key, format!("Work on {}", key), owner)
            .with_link(format!("https://tracker.example/{}", key))
    }
}
