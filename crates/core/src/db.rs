//! Shared SQLite connection setup.
//!
//! The demo, member and audit stores each hold their own connection to the
//! same database file, so every connection waits on a busy lock instead of
//! failing right away.

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

/// How long a connection waits for another writer's lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Apply per-connection pragmas.
pub(crate) fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// Open a database file with the shared settings.
pub(crate) fn open(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    Ok(conn)
}

/// Open a private in-memory database with the shared settings.
pub(crate) fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    Ok(conn)
}
