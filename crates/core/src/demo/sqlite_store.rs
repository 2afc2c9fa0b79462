//! SQLite-backed demo store implementation.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{Demo, DemoError, DemoId, DemoStore, DemoTask, DrawStatus, TaskId};
use crate::db;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl From<rusqlite::Error> for DemoError {
    fn from(err: rusqlite::Error) -> Self {
        DemoError::Database(err.to_string())
    }
}

/// SQLite-backed demo store.
///
/// The aggregate is written in a single transaction. Updates only apply when
/// the stored `version` equals the version the caller loaded.
pub struct SqliteDemoStore {
    conn: Mutex<Connection>,
}

/// Raw demo row, converted once the tasks are loaded.
struct DemoRow {
    id: DemoId,
    title: String,
    planned_date: Option<String>,
    summary: Option<String>,
    link: Option<String>,
    draw_status: String,
    version: i64,
}

/// Raw task row.
struct TaskRow {
    id: TaskId,
    key: String,
    title: String,
    link: Option<String>,
    owner: i64,
    winner: Option<i64>,
    draw_date_time: Option<String>,
}

impl SqliteDemoStore {
    /// Create a new SQLite demo store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, DemoError> {
        let conn = db::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite demo store (useful for testing).
    pub fn in_memory() -> Result<Self, DemoError> {
        let conn = db::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), DemoError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS demos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                planned_date TEXT,
                summary TEXT,
                link TEXT,
                draw_status TEXT NOT NULL,
                version INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS demo_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                demo_id INTEGER NOT NULL REFERENCES demos(id) ON DELETE CASCADE,
                position INTEGER NOT NULL,
                task_key TEXT NOT NULL,
                title TEXT NOT NULL,
                link TEXT,
                owner_id INTEGER NOT NULL,
                winner_id INTEGER,
                draw_date_time TEXT,
                UNIQUE (demo_id, task_key)
            );

            CREATE INDEX IF NOT EXISTS idx_demo_tasks_demo_id ON demo_tasks(demo_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DemoError> {
        self.conn
            .lock()
            .map_err(|_| DemoError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_demo_row(row: &rusqlite::Row) -> rusqlite::Result<DemoRow> {
        Ok(DemoRow {
            id: row.get(0)?,
            title: row.get(1)?,
            planned_date: row.get(2)?,
            summary: row.get(3)?,
            link: row.get(4)?,
            draw_status: row.get(5)?,
            version: row.get(6)?,
        })
    }

    fn row_to_task_row(row: &rusqlite::Row) -> rusqlite::Result<TaskRow> {
        Ok(TaskRow {
            id: row.get(0)?,
            key: row.get(1)?,
            title: row.get(2)?,
            link: row.get(3)?,
            owner: row.get(4)?,
            winner: row.get(5)?,
            draw_date_time: row.get(6)?,
        })
    }

    fn demo_exists(conn: &Connection, id: DemoId) -> Result<bool, DemoError> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM demos WHERE id = ?)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn load_tasks(conn: &Connection, demo_id: DemoId) -> Result<Vec<DemoTask>, DemoError> {
        let mut stmt = conn.prepare(
            "SELECT id, task_key, title, link, owner_id, winner_id, draw_date_time FROM demo_tasks WHERE demo_id = ? ORDER BY position ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![demo_id], Self::row_to_task_row)?;

        let mut tasks = Vec::new();
        for row_result in rows {
            let row = row_result?;
            let draw_date_time = row
                .draw_date_time
                .as_deref()
                .map(parse_timestamp)
                .transpose()?;
            tasks.push(DemoTask {
                id: Some(row.id),
                key: row.key,
                title: row.title,
                link: row.link,
                owner: row.owner,
                winner: row.winner,
                draw_date_time,
            });
        }
        Ok(tasks)
    }

    fn load_demo(conn: &Connection, id: DemoId) -> Result<Option<Demo>, DemoError> {
        let row = conn
            .query_row(
                "SELECT id, title, planned_date, summary, link, draw_status, version FROM demos WHERE id = ?",
                params![id],
                Self::row_to_demo_row,
            )
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let draw_status = DrawStatus::parse(&row.draw_status).ok_or_else(|| {
            DemoError::Database(format!("Unknown draw status: {}", row.draw_status))
        })?;
        let planned_date = row
            .planned_date
            .as_deref()
            .map(|s| {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map_err(|e| DemoError::Database(format!("Invalid planned date: {}", e)))
            })
            .transpose()?;

        Ok(Some(Demo {
            id: Some(row.id),
            title: row.title,
            planned_date,
            summary: row.summary,
            link: row.link,
            draw_status,
            tasks: Self::load_tasks(conn, row.id)?,
            version: row.version,
        }))
    }

    /// Bring the task rows of a demo in line with the aggregate.
    fn sync_tasks(conn: &Connection, demo_id: DemoId, tasks: &[DemoTask]) -> Result<(), DemoError> {
        let kept: HashSet<TaskId> = tasks.iter().filter_map(|t| t.id).collect();

        let existing: Vec<TaskId> = {
            let mut stmt = conn.prepare("SELECT id FROM demo_tasks WHERE demo_id = ?")?;
            let rows = stmt.query_map(params![demo_id], |row| row.get(0))?;
            let ids: Vec<TaskId> = rows.collect::<Result<_, _>>()?;
            ids
        };

        // Removed tasks go first so a re-added key does not trip the unique index
        for task_id in existing.iter().filter(|id| !kept.contains(id)) {
            conn.execute("DELETE FROM demo_tasks WHERE id = ?", params![task_id])?;
        }

        for (position, task) in tasks.iter().enumerate() {
            let draw_date_time = task.draw_date_time.map(|dt| dt.to_rfc3339());
            match task.id {
                Some(task_id) => {
                    let updated = conn.execute(
                        "UPDATE demo_tasks SET position = ?, task_key = ?, title = ?, link = ?, owner_id = ?, winner_id = ?, draw_date_time = ? WHERE id = ? AND demo_id = ?",
                        params![
                            position as i64,
                            task.key,
                            task.title,
                            task.link,
                            task.owner,
                            task.winner,
                            draw_date_time,
                            task_id,
                            demo_id,
                        ],
                    )?;
                    if updated == 0 {
                        return Err(DemoError::TaskNotFound { demo_id, task_id });
                    }
                }
                None => {
                    conn.execute(
                        "INSERT INTO demo_tasks (demo_id, position, task_key, title, link, owner_id, winner_id, draw_date_time) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                        params![
                            demo_id,
                            position as i64,
                            task.key,
                            task.title,
                            task.link,
                            task.owner,
                            task.winner,
                            draw_date_time,
                        ],
                    )?;
                }
            }
        }

        Ok(())
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DemoError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DemoError::Database(format!("Invalid timestamp: {}", e)))
}

impl DemoStore for SqliteDemoStore {
    fn exists(&self, id: DemoId) -> Result<bool, DemoError> {
        let conn = self.lock()?;
        Self::demo_exists(&conn, id)
    }

    fn get(&self, id: DemoId) -> Result<Option<Demo>, DemoError> {
        let conn = self.lock()?;
        Self::load_demo(&conn, id)
    }

    fn find_all(&self) -> Result<Vec<Demo>, DemoError> {
        let conn = self.lock()?;

        let ids: Vec<DemoId> = {
            let mut stmt = conn.prepare("SELECT id FROM demos ORDER BY id DESC")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            let ids: Vec<DemoId> = rows.collect::<Result<_, _>>()?;
            ids
        };

        let mut demos = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(demo) = Self::load_demo(&conn, id)? {
                demos.push(demo);
            }
        }
        Ok(demos)
    }

    fn save(&self, demo: &Demo) -> Result<Demo, DemoError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let planned_date = demo
            .planned_date
            .map(|d| d.format(DATE_FORMAT).to_string());

        let demo_id = match demo.id {
            None => {
                tx.execute(
                    "INSERT INTO demos (title, planned_date, summary, link, draw_status, version) VALUES (?, ?, ?, ?, ?, 1)",
                    params![
                        demo.title,
                        planned_date,
                        demo.summary,
                        demo.link,
                        demo.draw_status.as_str(),
                    ],
                )?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                let updated = tx.execute(
                    "UPDATE demos SET title = ?, planned_date = ?, summary = ?, link = ?, draw_status = ?, version = version + 1 WHERE id = ? AND version = ?",
                    params![
                        demo.title,
                        planned_date,
                        demo.summary,
                        demo.link,
                        demo.draw_status.as_str(),
                        id,
                        demo.version,
                    ],
                )?;
                if updated == 0 {
                    return Err(if Self::demo_exists(&tx, id)? {
                        DemoError::ConcurrentModification { demo_id: id }
                    } else {
                        DemoError::NotFound(id)
                    });
                }
                id
            }
        };

        Self::sync_tasks(&tx, demo_id, &demo.tasks)?;
        let saved = Self::load_demo(&tx, demo_id)?.ok_or(DemoError::NotFound(demo_id))?;
        tx.commit()?;

        Ok(saved)
    }

    fn delete(&self, id: DemoId) -> Result<(), DemoError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM demo_tasks WHERE demo_id = ?", params![id])?;
        let deleted = tx.execute("DELETE FROM demos WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(DemoError::NotFound(id));
        }

        tx.commit()?;
        Ok(())
    }
}
