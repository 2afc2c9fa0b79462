pub mod audit;
pub mod config;
mod db;
pub mod demo;
pub mod draw;
pub mod member;
pub mod metrics;
pub mod testing;

pub use audit::{
    audit_pipeline, AuditError, AuditEvent, AuditEventEnvelope, AuditFilter, AuditHandle,
    AuditPage, AuditRecord, AuditStore, AuditWriter, SqliteAuditStore, WriterSummary,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, DatabaseConfig,
    DrawConfig, SanitizedConfig, SelectionPolicy, ServerConfig,
};
pub use demo::{
    Demo, DemoError, DemoId, DemoPatch, DemoStore, DemoTask, DrawStatus, MemberId,
    SqliteDemoStore, TaskId, TaskPatch,
};
pub use draw::{
    create_selector, Clock, DrawFailure, DrawOutcome, DrawService, FairnessSelector,
    SelectionError, SystemClock, UniformSelector, WinTally, WinnerSelector,
};
pub use member::{Member, MemberDirectory, MemberError, NewMember, SqliteMemberStore};
