//! SQLite snapshot storage.
//!
//! Persists snapshots to a local SQLite database kept apart from any
//! inspected profile, one row per snapshot:
//! - snapshots: id, timestamp, local_storage, session_storage, indexed_db
//!   (the three stores as JSON text)
//!
//! Supports:
//! - Insert-or-overwrite by id, one transaction per write
//! - Full history, newest first
//! - Loading a specific snapshot by ID

pub mod diff;

use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::scan::reader::INTERNAL_DB_NAME;
use crate::snapshot::Snapshot;

/// Bumped whenever the table layout changes.
pub const SCHEMA_VERSION: i64 = 1;

/// Get the database path (~/.local/share/storagelens/storagelens_internal.db or platform equivalent)
pub fn default_db_path() -> Result<PathBuf, StoreError> {
    let data_dir = crate::platform::data_dir().ok_or(StoreError::NoDataDir)?;
    Ok(data_dir.join(format!("{INTERNAL_DB_NAME}.db")))
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > SCHEMA_VERSION {
        return Err(StoreError::UnsupportedSchema {
            found: version,
            supported: SCHEMA_VERSION,
        });
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY NOT NULL,
            timestamp INTEGER NOT NULL,
            local_storage TEXT NOT NULL,
            session_storage TEXT NOT NULL,
            indexed_db TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_timestamp ON snapshots(timestamp)",
        [],
    )?;

    if version < SCHEMA_VERSION {
        debug!("initialized snapshot schema v{SCHEMA_VERSION}");
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }

    Ok(())
}

/// Database handle. Open once per command, reuse across all operations.
pub struct SnapshotStore {
    conn: Connection,
}

impl SnapshotStore {
    /// Open the store at `path`, creating the file and schema on first use.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(SnapshotStore { conn })
    }

    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(&default_db_path()?)
    }

    /// A throwaway store that lives as long as the handle.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(SnapshotStore { conn })
    }

    /// Insert `snapshot`, replacing any row with the same id.
    pub fn put(&mut self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let local = serde_json::to_string(&snapshot.local_storage)?;
        let session = serde_json::to_string(&snapshot.session_storage)?;
        let indexed_db = serde_json::to_string(&snapshot.indexed_db)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO snapshots (id, timestamp, local_storage, session_storage, indexed_db)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![snapshot.id, snapshot.timestamp, local, session, indexed_db],
        )?;
        tx.commit()?;

        Ok(())
    }

    /// Every snapshot, newest first. Equal timestamps list the latest write first.
    pub fn get_all(&self) -> Result<Vec<Snapshot>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp, local_storage, session_storage, indexed_db
             FROM snapshots
             ORDER BY timestamp DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map([], raw_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(RawSnapshot::decode).collect()
    }

    /// Get a specific snapshot by ID
    pub fn get(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, timestamp, local_storage, session_storage, indexed_db
                 FROM snapshots
                 WHERE id = ?1",
                params![id],
                raw_from_row,
            )
            .optional()?;

        raw.map(RawSnapshot::decode).transpose()
    }

    /// Get the most recent snapshot
    pub fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, timestamp, local_storage, session_storage, indexed_db
                 FROM snapshots
                 ORDER BY timestamp DESC, rowid DESC
                 LIMIT 1",
                [],
                raw_from_row,
            )
            .optional()?;

        raw.map(RawSnapshot::decode).transpose()
    }

    pub fn latest_timestamp(&self) -> Result<Option<i64>, StoreError> {
        let ts = self
            .conn
            .query_row("SELECT MAX(timestamp) FROM snapshots", [], |row| row.get(0))?;
        Ok(ts)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Row as stored, before the JSON columns are decoded.
struct RawSnapshot {
    id: String,
    timestamp: i64,
    local_storage: String,
    session_storage: String,
    indexed_db: String,
}

impl RawSnapshot {
    fn decode(self) -> Result<Snapshot, StoreError> {
        let id = self.id;
        let decode_err = |source| StoreError::Decode { id: id.clone(), source };

        let local_storage = serde_json::from_str(&self.local_storage).map_err(decode_err)?;
        let session_storage = serde_json::from_str(&self.session_storage).map_err(decode_err)?;
        let indexed_db = serde_json::from_str(&self.indexed_db).map_err(decode_err)?;

        Ok(Snapshot {
            id,
            timestamp: self.timestamp,
            local_storage,
            session_storage,
            indexed_db,
        })
    }
}

fn raw_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawSnapshot> {
    Ok(RawSnapshot {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        local_storage: row.get(2)?,
        session_storage: row.get(3)?,
        indexed_db: row.get(4)?,
    })
}

#[cfg(test)]
impl SnapshotStore {
    /// Remove the table out from under the handle so every write fails.
    pub(crate) fn drop_table(&self) {
        self.conn.execute_batch("DROP TABLE snapshots").unwrap();
    }
}
