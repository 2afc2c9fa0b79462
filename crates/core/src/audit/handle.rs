use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;

use super::AuditEvent;
use crate::metrics;

/// An event stamped with the moment it was emitted.
#[derive(Debug, Clone)]
pub struct AuditEventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

impl AuditEventEnvelope {
    pub fn new(event: AuditEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Sending side of the audit pipeline.
///
/// The draw service runs synchronously and uses [`AuditHandle::try_emit`];
/// an event that does not fit in the channel is dropped and counted so a
/// stalled writer never blocks a draw. Startup and shutdown go through
/// [`AuditHandle::emit`], which waits for room.
#[derive(Debug, Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditEventEnvelope>,
}

impl AuditHandle {
    pub(crate) fn new(tx: mpsc::Sender<AuditEventEnvelope>) -> Self {
        Self { tx }
    }

    pub async fn emit(&self, event: AuditEvent) {
        if let Err(e) = self.tx.send(AuditEventEnvelope::new(event)).await {
            metrics::AUDIT_EVENTS_DROPPED
                .with_label_values(&["closed"])
                .inc();
            warn!(
                "Audit writer gone, dropped {} event",
                e.0.event.event_type()
            );
        }
    }

    /// Queue an event without waiting. Returns false if it was dropped.
    pub fn try_emit(&self, event: AuditEvent) -> bool {
        let (reason, envelope) = match self.tx.try_send(AuditEventEnvelope::new(event)) {
            Ok(()) => return true,
            Err(TrySendError::Full(envelope)) => ("full", envelope),
            Err(TrySendError::Closed(envelope)) => ("closed", envelope),
        };
        metrics::AUDIT_EVENTS_DROPPED
            .with_label_values(&[reason])
            .inc();
        warn!(
            "Audit channel {}, dropped {} event for demo {:?}",
            reason,
            envelope.event.event_type(),
            envelope.event.demo_id()
        );
        false
    }
}
