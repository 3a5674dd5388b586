//! Database-backed store: a single key/value table in SQLite.
//!
//! Database-backed stores are classified `database` and skipped by the
//! migration engine; key rewrites inside a relational schema require manual
//! handling. The backend is still a full [`StoreBackend`] so these stores
//! can be registered, listed, and reported, and so manual migrations can
//! drive them through the same capability.

use crate::core::backend::{BackendKind, StoreBackend};
use crate::core::error::RestampError;
use crate::core::key::RecordKey;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const RECORDS_SCHEMA: &str =
    "CREATE TABLE IF NOT EXISTS records (key TEXT PRIMARY KEY, value BLOB NOT NULL)";

fn connect(db_path: &Path) -> Result<Connection, RestampError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
    conn.execute("PRAGMA foreign_keys=ON;", [])?;
    Ok(conn)
}

pub struct DatabaseBackend {
    conn: Mutex<Connection>,
    location: PathBuf,
}

impl DatabaseBackend {
    pub fn open<P: Into<PathBuf>>(db_path: P) -> Result<Self, RestampError> {
        let location = db_path.into();
        let conn = connect(&location)?;
        conn.execute(RECORDS_SCHEMA, [])?;
        Ok(Self {
            conn: Mutex::new(conn),
            location,
        })
    }

    fn key_column(key: &RecordKey) -> String {
        key.to_string()
    }
}

impl StoreBackend for DatabaseBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Database
    }

    fn list_keys(&self) -> Result<Vec<RecordKey>, RestampError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key FROM records ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(RecordKey::new(row?.split('/'))?);
        }
        Ok(keys)
    }

    fn get(&self, key: &RecordKey) -> Result<Vec<u8>, RestampError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM records WHERE key = ?1",
            params![Self::key_column(key)],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .map_err(|err| match err {
            rusqlite::Error::QueryReturnedNoRows => RestampError::KeyNotFound(key.to_string()),
            other => other.into(),
        })
    }

    fn set(&self, key: &RecordKey, value: &[u8]) -> Result<(), RestampError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO records(key, value) VALUES(?1, ?2)",
            params![Self::key_column(key), value],
        )?;
        Ok(())
    }

    fn remove_key(&self, key: &RecordKey) -> Result<(), RestampError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM records WHERE key = ?1",
            params![Self::key_column(key)],
        )?;
        Ok(())
    }

    fn move_key(&self, src: &RecordKey, dest: &RecordKey) -> Result<(), RestampError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE records SET key = ?1 WHERE key = ?2",
            params![Self::key_column(dest), Self::key_column(src)],
        )?;
        if changed == 0 {
            return Err(RestampError::KeyNotFound(src.to_string()));
        }
        Ok(())
    }

    fn url_for_key(&self, key: &RecordKey) -> Result<String, RestampError> {
        let exists = {
            let conn = self.conn.lock().unwrap();
            conn.query_row(
                "SELECT COUNT(*) FROM records WHERE key = ?1",
                params![Self::key_column(key)],
                |row| row.get::<_, i64>(0),
            )?
        };
        if exists == 0 {
            return Err(RestampError::KeyNotFound(key.to_string()));
        }
        Ok(format!("database://{}/{}", self.location.display(), key))
    }

    fn provenance_time(&self, _key: &RecordKey) -> Result<DateTime<Utc>, RestampError> {
        Err(RestampError::Unsupported(
            "database-backed records carry no provenance timestamp".to_string(),
        ))
    }
}
