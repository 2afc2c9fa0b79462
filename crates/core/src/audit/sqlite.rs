use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};

use super::{AuditError, AuditEventEnvelope, AuditFilter, AuditPage, AuditRecord, AuditStore};
use crate::db;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    event_type TEXT NOT NULL,
    demo_id INTEGER,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_events_demo ON audit_events(demo_id, timestamp);
CREATE INDEX IF NOT EXISTS idx_audit_events_type ON audit_events(event_type, timestamp);
"#;

/// Fixed-width UTC text so string comparison matches time order.
fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Audit trail stored next to the demos.
pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
}

impl SqliteAuditStore {
    pub fn new(path: &Path) -> Result<Self, AuditError> {
        Self::with_connection(db::open(path)?)
    }

    /// Private in-memory trail for tests.
    pub fn in_memory() -> Result<Self, AuditError> {
        Self::with_connection(db::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, AuditError> {
        self.conn.lock().map_err(|_| AuditError::Poisoned)
    }

    fn where_clause(filter: &AuditFilter) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(demo_id) = filter.demo_id {
            clauses.push("demo_id = ?");
            values.push(Value::Integer(demo_id));
        }
        if let Some(event_type) = &filter.event_type {
            clauses.push("event_type = ?");
            values.push(Value::Text(event_type.clone()));
        }
        if let Some(from) = filter.from {
            clauses.push("timestamp >= ?");
            values.push(Value::Text(stamp(from)));
        }
        if let Some(to) = filter.to {
            clauses.push("timestamp <= ?");
            values.push(Value::Text(stamp(to)));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

impl AuditStore for SqliteAuditStore {
    fn append(&self, batch: &[AuditEventEnvelope]) -> Result<usize, AuditError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO audit_events (timestamp, event_type, demo_id, data) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for envelope in batch {
                insert.execute(params![
                    stamp(envelope.timestamp),
                    envelope.event.event_type(),
                    envelope.event.demo_id(),
                    serde_json::to_string(&envelope.event)?,
                ])?;
            }
        }
        tx.commit()?;
        Ok(batch.len())
    }

    fn query(
        &self,
        filter: &AuditFilter,
        page: AuditPage,
    ) -> Result<Vec<AuditRecord>, AuditError> {
        let conn = self.lock()?;
        let (clause, mut values) = Self::where_clause(filter);
        values.push(Value::Integer(page.limit));
        values.push(Value::Integer(page.offset));

        // id orders events that share a timestamp
        let sql = format!(
            "SELECT id, timestamp, event_type, demo_id, data FROM audit_events {} \
             ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
            clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, timestamp, event_type, demo_id, data) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|_| AuditError::Timestamp(timestamp.clone()))?
                .with_timezone(&Utc);
            records.push(AuditRecord {
                id,
                timestamp,
                event_type,
                demo_id,
                data: serde_json::from_str(&data)?,
            });
        }
        Ok(records)
    }

    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError> {
        let conn = self.lock()?;
        let (clause, values) = Self::where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM audit_events {}", clause);
        Ok(conn.query_row(&sql, params_from_iter(values), |row| row.get(0))?)
    }
}
