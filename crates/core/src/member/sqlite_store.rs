//! SQLite-backed team member store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{Member, MemberDirectory, MemberError, NewMember};
use crate::db;
use crate::demo::MemberId;

/// SQLite-backed member store, also serving as the draw roster.
pub struct SqliteMemberStore {
    conn: Mutex<Connection>,
}

impl SqliteMemberStore {
    /// Create a new SQLite member store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, MemberError> {
        let conn = db::open(path).map_err(|e| MemberError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite member store (useful for testing).
    pub fn in_memory() -> Result<Self, MemberError> {
        let conn =
            db::open_in_memory().map_err(|e| MemberError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), MemberError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS team_members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_team_members_active ON team_members(active);
            "#,
        )
        .map_err(|e| MemberError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, MemberError> {
        self.conn
            .lock()
            .map_err(|_| MemberError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_member(row: &rusqlite::Row) -> rusqlite::Result<Member> {
        Ok(Member {
            id: row.get(0)?,
            name: row.get(1)?,
            active: row.get(2)?,
        })
    }

    fn query_members(conn: &Connection, sql: &str) -> Result<Vec<Member>, MemberError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| MemberError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_member)
            .map_err(|e| MemberError::Database(e.to_string()))?;

        let mut members = Vec::new();
        for row_result in rows {
            members.push(row_result.map_err(|e| MemberError::Database(e.to_string()))?);
        }
        Ok(members)
    }

    /// Register a new member.
    pub fn create(&self, request: NewMember) -> Result<Member, MemberError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(MemberError::Validation(
                "member name cannot be blank".to_string(),
            ));
        }

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO team_members (name, active) VALUES (?, ?)",
            params![name, request.active],
        )
        .map_err(|e| MemberError::Database(e.to_string()))?;

        Ok(Member {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            active: request.active,
        })
    }

    /// List all members, active or not, by id.
    pub fn list(&self) -> Result<Vec<Member>, MemberError> {
        let conn = self.lock()?;
        Self::query_members(&conn, "SELECT id, name, active FROM team_members ORDER BY id ASC")
    }

    /// Activate or deactivate a member.
    pub fn set_active(&self, id: MemberId, active: bool) -> Result<Member, MemberError> {
        let conn = self.lock()?;

        let updated = conn
            .execute(
                "UPDATE team_members SET active = ? WHERE id = ?",
                params![active, id],
            )
            .map_err(|e| MemberError::Database(e.to_string()))?;

        if updated == 0 {
            return Err(MemberError::NotFound(id));
        }

        conn.query_row(
            "SELECT id, name, active FROM team_members WHERE id = ?",
            params![id],
            Self::row_to_member,
        )
        .map_err(|e| MemberError::Database(e.to_string()))
    }
}

impl MemberDirectory for SqliteMemberStore {
    fn active_members(&self) -> Result<Vec<Member>, MemberError> {
        let conn = self.lock()?;
        Self::query_members(
            &conn,
            "SELECT id, name, active FROM team_members WHERE active = 1 ORDER BY id ASC",
        )
    }

    fn get(&self, id: MemberId) -> Result<Option<Member>, MemberError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, name, active FROM team_members WHERE id = ?",
            params![id],
            Self::row_to_member,
        )
        .optional()
        .map_err(|e| MemberError::Database(e.to_string()))
    }
}
