use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use release_mirror::{RecordStore, StoreError};

use crate::schema;

/// Errors from opening or migrating the database.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("database error: {0}")]
    Database(String),

    #[error("migration error: {0}")]
    Migration(String),
}

impl From<DatabaseError> for StoreError {
    fn from(e: DatabaseError) -> Self {
        StoreError::Record(e.to_string())
    }
}

/// Sync records kept in a SQLite table.
pub struct SqliteRecordStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteRecordStore {
    /// Open a store backed by a file on disk.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| DatabaseError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = rusqlite::Connection::open_in_memory()
            .map_err(|e| DatabaseError::Database(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: rusqlite::Connection) -> Result<Self, DatabaseError> {
        schema::migrations()
            .to_latest(&mut conn)
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Every stored key, sorted.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT key FROM records ORDER BY key")
            .map_err(record_error)?;

        let keys = stmt
            .query_map([], |row| row.get(0))
            .map_err(record_error)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(record_error)?;
        Ok(keys)
    }
}

fn record_error(e: rusqlite::Error) -> StoreError {
    StoreError::Record(e.to_string())
}

#[async_trait::async_trait]
impl RecordStore for SqliteRecordStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn();
        let result = conn.query_row("SELECT value FROM records WHERE key = ?1", [key], |row| {
            row.get(0)
        });

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(record_error(e)),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO records (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, now],
            )
            .map_err(record_error)?;
        Ok(())
    }
}
