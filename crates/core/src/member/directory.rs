use thiserror::Error;

use super::Member;
use crate::demo::MemberId;

#[derive(Debug, Error)]
pub enum MemberError {
    #[error("Member not found: {0}")]
    NotFound(MemberId),

    #[error("Invalid member: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Source of team members for the draw engine.
pub trait MemberDirectory: Send + Sync {
    /// Members currently eligible to be drawn.
    fn active_members(&self) -> Result<Vec<Member>, MemberError>;

    /// Look up any member, active or not.
    fn get(&self, id: MemberId) -> Result<Option<Member>, MemberError>;
}
