//! SQLite access layer for shelf.
//!
//! `Db` wraps a single `rusqlite` connection behind scoped acquisition: every
//! operation locks the connection, runs on the blocking pool, and releases
//! the guard unconditionally when the closure returns. Also hosts the
//! migration runner backed by a `schema_migrations` ledger table.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;

pub use rusqlite;

/// Storage error taxonomy. `NotFound` is the only variant surfaced to
/// callers as a client error; everything else is an internal failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to acquire database connection")]
    Acquire,

    #[error("no matching rows")]
    NotFound,

    #[error("query execution failed: {0}")]
    Query(rusqlite::Error),

    #[error("database io failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            other => StoreError::Query(other),
        }
    }
}

/// Shared handle to the SQLite database. Cheap to clone; all clones go
/// through the same connection.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open (or create) the database file at `path`, creating parent
    /// directories as needed.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn)?;

        tracing::info!(path, "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database; used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure(conn: &Connection) -> Result<(), StoreError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Ok(())
    }

    /// Run a closure against the connection on the blocking pool. The lock
    /// guard is scoped to the closure, so the connection is released on both
    /// success and failure paths.
    pub async fn call<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Acquire)?;
            f(&guard)
        })
        .await
        .map_err(|_| StoreError::Acquire)?
    }

    /// Apply pending migrations. Each entry is `(module, id, sql)`; applied
    /// entries are recorded in `schema_migrations` and skipped on subsequent
    /// runs. Returns the number of migrations applied.
    pub fn apply_migrations(&self, migrations: &[(&str, &str, &str)]) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Acquire)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                module     TEXT NOT NULL,
                id         TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
                PRIMARY KEY (module, id)
            );",
        )?;

        let mut applied = 0;
        for (module, id, sql) in migrations {
            let already: i64 = conn.query_row(
                "SELECT count(*) FROM schema_migrations WHERE module = ?1 AND id = ?2",
                (module, id),
                |row| row.get(0),
            )?;
            if already > 0 {
                continue;
            }

            conn.execute_batch(sql)?;
            conn.execute(
                "INSERT INTO schema_migrations (module, id) VALUES (?1, ?2)",
                (module, id),
            )?;

            tracing::info!(module = %module, migration = %id, "applied migration");
            applied += 1;
        }

        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INIT: &str = "CREATE TABLE notes (id TEXT PRIMARY KEY, body TEXT NOT NULL);";

    #[tokio::test]
    async fn call_runs_against_the_connection() {
        let db = Db::open_in_memory().unwrap();
        db.apply_migrations(&[("notes", "001_init", INIT)]).unwrap();

        db.call(|conn| {
            conn.execute(
                "INSERT INTO notes (id, body) VALUES (?1, ?2)",
                ("n1", "hello"),
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let body: String = db
            .call(|conn| {
                conn.query_row("SELECT body FROM notes WHERE id = ?1", ("n1",), |row| {
                    row.get(0)
                })
                .map_err(StoreError::from)
            })
            .await
            .unwrap();

        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn zero_rows_maps_to_not_found() {
        let db = Db::open_in_memory().unwrap();
        db.apply_migrations(&[("notes", "001_init", INIT)]).unwrap();

        let err = db
            .call(|conn| {
                conn.query_row("SELECT body FROM notes WHERE id = ?1", ("missing",), |row| {
                    row.get::<_, String>(0)
                })
                .map_err(StoreError::from)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn migrations_apply_once() {
        let db = Db::open_in_memory().unwrap();
        let migrations = [("notes", "001_init", INIT)];

        assert_eq!(db.apply_migrations(&migrations).unwrap(), 1);
        assert_eq!(db.apply_migrations(&migrations).unwrap(), 0);
    }
}
