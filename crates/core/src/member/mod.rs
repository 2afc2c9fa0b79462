//! Team members and the roster of members eligible for draws.

mod directory;
mod sqlite_store;
mod types;

pub use directory::{MemberDirectory, MemberError};
pub use sqlite_store::SqliteMemberStore;
pub use types::{Member, NewMember};
