use std::sync::Arc;

use demolot_core::{AuditHandle, AuditStore, Config, DrawService, SanitizedConfig, SqliteMemberStore};

/// Shared application state
pub struct AppState {
    config: Config,
    draw: Arc<DrawService>,
    members: Arc<SqliteMemberStore>,
    audit: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        draw: Arc<DrawService>,
        members: Arc<SqliteMemberStore>,
        audit: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
    ) -> Self {
        Self {
            config,
            draw,
            members,
            audit,
            audit_store,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn draw(&self) -> &DrawService {
        self.draw.as_ref()
    }

    /// Member registry, also the roster the draw service picks from.
    pub fn members(&self) -> &SqliteMemberStore {
        self.members.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }
}
