//! Append-only audit trail of demo, draw and roster changes.
//!
//! Events flow from [`AuditHandle`] through a bounded channel to the
//! [`AuditWriter`], which stores them in batches.

mod events;
mod handle;
mod sqlite;
mod store;
mod writer;

pub use events::{AuditEvent, AuditRecord};
pub use handle::{AuditEventEnvelope, AuditHandle};
pub use sqlite::SqliteAuditStore;
pub use store::{AuditError, AuditFilter, AuditPage, AuditStore};
pub use writer::{audit_pipeline, AuditWriter, WriterSummary};
