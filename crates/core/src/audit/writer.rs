use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{AuditEventEnvelope, AuditHandle, AuditStore};

/// Most events written in one transaction.
const MAX_BATCH: usize = 64;

/// What the writer stored before its channel closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub written: usize,
    pub failed: usize,
}

/// Receiving side of the audit pipeline.
///
/// Waits for one event, then drains whatever else is already queued (up to
/// [`MAX_BATCH`]) and appends it in one go. A failed batch is logged and
/// dropped. Returns once every [`AuditHandle`] clone is gone and the queue
/// is empty.
pub struct AuditWriter {
    rx: mpsc::Receiver<AuditEventEnvelope>,
    store: Arc<dyn AuditStore>,
}

impl AuditWriter {
    pub async fn run(mut self) -> WriterSummary {
        info!("Audit writer started");
        let mut summary = WriterSummary::default();
        let mut batch = Vec::with_capacity(MAX_BATCH);

        while let Some(first) = self.rx.recv().await {
            batch.push(first);
            while batch.len() < MAX_BATCH {
                match self.rx.try_recv() {
                    Ok(next) => batch.push(next),
                    Err(_) => break,
                }
            }

            match self.store.append(&batch) {
                Ok(written) => {
                    debug!("Wrote {} audit events", written);
                    summary.written += written;
                }
                Err(e) => {
                    error!("Dropped {} audit events: {}", batch.len(), e);
                    summary.failed += batch.len();
                }
            }
            batch.clear();
        }

        info!(
            "Audit writer stopped ({} written, {} failed)",
            summary.written, summary.failed
        );
        summary
    }
}

/// Wire a handle to a writer over a channel of `capacity` events.
///
/// Spawn the writer with `tokio::spawn(writer.run())` and clone the handle
/// into every producer.
pub fn audit_pipeline(
    store: Arc<dyn AuditStore>,
    capacity: usize,
) -> (AuditHandle, AuditWriter) {
    let (tx, rx) = mpsc::channel(capacity);
    (AuditHandle::new(tx), AuditWriter { rx, store })
}
