//! Winner selection for a single task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{DrawConfig, SelectionPolicy};
use crate::demo::{DemoTask, MemberId};
use crate::member::Member;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionError {
    #[error("No eligible members to draw task '{task_key}'")]
    NoEligibleMembers { task_key: String },
}

impl SelectionError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            SelectionError::NoEligibleMembers { .. } => "no_eligible_members",
        }
    }
}

/// Running win counts for one demo.
///
/// Seeded from the winners already stored on the demo, then updated after
/// every pick of the current round so later tasks see earlier results.
#[derive(Debug, Clone, Default)]
pub struct WinTally {
    total: HashMap<MemberId, u32>,
}

impl WinTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count the winners already held across the demo.
    pub fn from_tasks(tasks: &[DemoTask]) -> Self {
        let mut tally = Self::new();
        for winner in tasks.iter().filter_map(|t| t.winner) {
            *tally.total.entry(winner).or_insert(0) += 1;
        }
        tally
    }

    /// Record a win assigned in the current round.
    pub fn record(&mut self, member: MemberId) {
        *self.total.entry(member).or_insert(0) += 1;
    }

    /// Wins across the demo, current round included.
    pub fn wins(&self, member: MemberId) -> u32 {
        self.total.get(&member).copied().unwrap_or(0)
    }
}

/// Picks the winner of one task.
pub trait WinnerSelector: Send + Sync {
    /// `members` is the active roster; `tally` the wins assigned so far.
    fn select(
        &self,
        task: &DemoTask,
        members: &[Member],
        tally: &WinTally,
    ) -> Result<MemberId, SelectionError>;
}

/// Members allowed to win `task`, ordered by id.
///
/// Ordering makes seeded draws reproducible whatever order the roster
/// arrives in.
pub fn eligible_candidates<'a>(
    task: &DemoTask,
    members: &'a [Member],
    exclude_owner: bool,
) -> Vec<&'a Member> {
    let mut candidates: Vec<&Member> = members
        .iter()
        .filter(|m| m.active)
        .filter(|m| !(exclude_owner && m.id == task.owner))
        .collect();
    candidates.sort_by_key(|m| m.id);
    candidates.dedup_by_key(|m| m.id);
    candidates
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn lock_rng(rng: &Mutex<StdRng>) -> MutexGuard<'_, StdRng> {
    // The generator holds no invariant a panic could break.
    rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Weighted random selection favouring members with fewer wins.
///
/// Each candidate weighs `1 / (1 + wins)`, so with equal tallies the pick is
/// uniform and every win halves, thirds, ... a member's next chance.
pub struct FairnessSelector {
    exclude_owner: bool,
    rng: Mutex<StdRng>,
}

impl FairnessSelector {
    pub fn new(exclude_owner: bool, seed: Option<u64>) -> Self {
        Self {
            exclude_owner,
            rng: Mutex::new(seeded_rng(seed)),
        }
    }

    fn weight(wins: u32) -> f64 {
        1.0 / (1.0 + f64::from(wins))
    }
}

impl WinnerSelector for FairnessSelector {
    fn select(
        &self,
        task: &DemoTask,
        members: &[Member],
        tally: &WinTally,
    ) -> Result<MemberId, SelectionError> {
        let candidates = eligible_candidates(task, members, self.exclude_owner);
        let Some(last) = candidates.last() else {
            return Err(SelectionError::NoEligibleMembers {
                task_key: task.key.clone(),
            });
        };

        let weights: Vec<f64> = candidates
            .iter()
            .map(|m| Self::weight(tally.wins(m.id)))
            .collect();
        let total_weight: f64 = weights.iter().sum();

        let mut random_value = lock_rng(&self.rng).r#gen::<f64>() * total_weight;
        for (member, weight) in candidates.iter().zip(&weights) {
            if random_value < *weight {
                debug!(
                    "Task '{}' drawn for member {} (weight {:.3} of {:.3})",
                    task.key, member.id, weight, total_weight
                );
                return Ok(member.id);
            }
            random_value -= weight;
        }

        // Float rounding can leave a sliver past the last bucket
        Ok(last.id)
    }
}

/// Plain uniform selection among eligible members, ignoring past wins.
pub struct UniformSelector {
    exclude_owner: bool,
    rng: Mutex<StdRng>,
}

impl UniformSelector {
    pub fn new(exclude_owner: bool, seed: Option<u64>) -> Self {
        Self {
            exclude_owner,
            rng: Mutex::new(seeded_rng(seed)),
        }
    }
}

impl WinnerSelector for UniformSelector {
    fn select(
        &self,
        task: &DemoTask,
        members: &[Member],
        _tally: &WinTally,
    ) -> Result<MemberId, SelectionError> {
        let candidates = eligible_candidates(task, members, self.exclude_owner);
        if candidates.is_empty() {
            return Err(SelectionError::NoEligibleMembers {
                task_key: task.key.clone(),
            });
        }
        let index = lock_rng(&self.rng).gen_range(0..candidates.len());
        Ok(candidates[index].id)
    }
}

/// Create the selector configured for draws.
pub fn create_selector(config: &DrawConfig) -> Arc<dyn WinnerSelector> {
    match config.policy {
        SelectionPolicy::Fair => Arc::new(FairnessSelector::new(config.exclude_owner, config.seed)),
        SelectionPolicy::Uniform => {
            Arc::new(UniformSelector::new(config.exclude_owner, config.seed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::TaskPatch;
    use chrono::Utc;

    fn task(owner: MemberId) -> DemoTask {
        DemoTask::from_patch(TaskPatch::new("APP-1", "Feature", owner))
    }

    fn roster() -> Vec<Member> {
        vec![
            Member::new(1, "Alice"),
            Member::new(2, "Bob"),
            Member::new(3, "Carol"),
        ]
    }

    #[test]
    fn test_tally_from_tasks() {
        let mut won = task(1);
        won.assign_winner(2, Utc::now());
        let mut won_again = task(1);
        won_again.assign_winner(2, Utc::now());
        let open = task(1);

        let mut tally = WinTally::from_tasks(&[won, won_again, open]);
        assert_eq!(tally.wins(2), 2);
        assert_eq!(tally.wins(1), 0);

        tally.record(2);
        assert_eq!(tally.wins(2), 3);
    }

    #[test]
    fn test_candidates_exclude_inactive_and_owner() {
        let members = vec![
            Member::new(3, "Carol"),
            Member::new(1, "Alice"),
            Member::new(2, "Bob").inactive(),
        ];

        let ids: Vec<MemberId> = eligible_candidates(&task(1), &members, true)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![3]);

        let ids: Vec<MemberId> = eligible_candidates(&task(1), &members, false)
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_no_eligible_members() {
        let selector = FairnessSelector::new(true, Some(1));
        let members = vec![Member::new(1, "Alice")];

        let result = selector.select(&task(1), &members, &WinTally::new());
        assert_eq!(
            result,
            Err(SelectionError::NoEligibleMembers {
                task_key: "APP-1".to_string()
            })
        );

        let result = selector.select(&task(1), &[], &WinTally::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_never_selects_owner_when_excluded() {
        let selector = FairnessSelector::new(true, Some(7));
        let members = roster();
        for _ in 0..200 {
            let winner = selector.select(&task(2), &members, &WinTally::new()).unwrap();
            assert_ne!(winner, 2);
        }
    }

    #[test]
    fn test_single_candidate_always_wins() {
        let selector = FairnessSelector::new(false, None);
        let members = vec![Member::new(5, "Eve")];
        let mut tally = WinTally::new();
        for _ in 0..10 {
            tally.record(5);
            assert_eq!(selector.select(&task(1), &members, &tally).unwrap(), 5);
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let members = roster();
        let a = FairnessSelector::new(false, Some(42));
        let b = FairnessSelector::new(false, Some(42));

        let picks_a: Vec<MemberId> = (0..20)
            .map(|_| a.select(&task(1), &members, &WinTally::new()).unwrap())
            .collect();
        let picks_b: Vec<MemberId> = (0..20)
            .map(|_| b.select(&task(1), &members, &WinTally::new()).unwrap())
            .collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_fairness_prefers_members_with_fewer_wins() {
        let selector = FairnessSelector::new(false, Some(3));
        let members = vec![Member::new(1, "Alice"), Member::new(2, "Bob")];

        // Alice already holds 4 wins: weights 1/5 vs 1
        let mut tally = WinTally::new();
        for _ in 0..4 {
            tally.record(1);
        }

        let trials = 6000;
        let alice = (0..trials)
            .filter(|_| selector.select(&task(3), &members, &tally).unwrap() == 1)
            .count();
        let share = alice as f64 / trials as f64;
        // Expected 1/6
        assert!((share - 1.0 / 6.0).abs() < 0.03, "share was {}", share);
    }

    #[test]
    fn test_uniform_ignores_tally() {
        let selector = UniformSelector::new(false, Some(11));
        let members = vec![Member::new(1, "Alice"), Member::new(2, "Bob")];
        let mut tally = WinTally::new();
        for _ in 0..10 {
            tally.record(1);
        }

        let trials = 4000;
        let alice = (0..trials)
            .filter(|_| selector.select(&task(3), &members, &tally).unwrap() == 1)
            .count();
        let share = alice as f64 / trials as f64;
        assert!((share - 0.5).abs() < 0.05, "share was {}", share);
    }

    #[test]
    fn test_create_selector_follows_policy() {
        let config = DrawConfig {
            policy: SelectionPolicy::Uniform,
            exclude_owner: true,
            seed: Some(1),
        };
        let selector = create_selector(&config);
        let members = vec![Member::new(1, "Alice"), Member::new(2, "Bob")];
        assert_eq!(
            selector.select(&task(1), &members, &WinTally::new()).unwrap(),
            2
        );
    }
}
