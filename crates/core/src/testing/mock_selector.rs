//! Scripted winner selector for testing.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::demo::{DemoTask, MemberId};
use crate::draw::{SelectionError, WinTally, WinnerSelector};
use crate::member::Member;

#[derive(Debug, Default)]
struct Script {
    winners: VecDeque<MemberId>,
    calls: usize,
    seen_keys: Vec<String>,
}

/// WinnerSelector that returns a predetermined sequence of winners.
///
/// Once the script runs out every further call fails with
/// `NoEligibleMembers`, which lets tests drive partial rounds.
#[derive(Debug, Default)]
pub struct ScriptedSelector {
    script: Mutex<Script>,
}

impl ScriptedSelector {
    pub fn new(winners: Vec<MemberId>) -> Self {
        Self {
            script: Mutex::new(Script {
                winners: winners.into(),
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("selector lock poisoned")
    }

    /// Number of select calls so far.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    /// Keys of the tasks passed to select, in call order.
    pub fn seen_keys(&self) -> Vec<String> {
        self.lock().seen_keys.clone()
    }
}

impl WinnerSelector for ScriptedSelector {
    fn select(
        &self,
        task: &DemoTask,
        _members: &[Member],
        _tally: &WinTally,
    ) -> Result<MemberId, SelectionError> {
        let mut script = self.lock();
        script.calls += 1;
        script.seen_keys.push(task.key.clone());
        script
            .winners
            .pop_front()
            .ok_or_else(|| SelectionError::NoEligibleMembers {
                task_key: task.key.clone(),
            })
    }
}
