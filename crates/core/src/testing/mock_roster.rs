//! Fixed member roster for testing.

use std::sync::{Mutex, MutexGuard};

use crate::demo::MemberId;
use crate::member::{Member, MemberDirectory, MemberError};

/// MemberDirectory backed by a plain list.
///
/// Inactive members stay known to `get` but are filtered out of
/// `active_members`, like the SQLite store.
#[derive(Debug, Default)]
pub struct StaticRoster {
    members: Mutex<Vec<Member>>,
}

impl StaticRoster {
    pub fn new(members: Vec<Member>) -> Self {
        Self {
            members: Mutex::new(members),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Member>> {
        self.members.lock().expect("roster lock poisoned")
    }

    /// Flip a member's active flag. Unknown ids are ignored.
    pub fn set_active(&self, id: MemberId, active: bool) {
        if let Some(member) = self.lock().iter_mut().find(|m| m.id == id) {
            member.active = active;
        }
    }
}

impl MemberDirectory for StaticRoster {
    fn active_members(&self) -> Result<Vec<Member>, MemberError> {
        Ok(self.lock().iter().filter(|m| m.active).cloned().collect())
    }

    fn get(&self, id: MemberId) -> Result<Option<Member>, MemberError> {
        Ok(self.lock().iter().find(|m| m.id == id).cloned())
    }
}
