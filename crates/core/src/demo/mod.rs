//! Demo aggregate: a demo event, its tasks and their storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteDemoStore;
pub use store::{DemoError, DemoStore};
pub use types::{
    Demo, DemoId, DemoPatch, DemoTask, DrawStatus, MemberId, TaskId, TaskPatch,
};
