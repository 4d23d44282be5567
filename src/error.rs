//! Error types.
//!
//! Readers, the snapshot store and capture each get their own enum so a
//! caller can tell an isolated read failure from a failed persist.

use std::path::PathBuf;

use thiserror::Error;

use crate::snapshot::Snapshot;

/// Failure inside one storage reader.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("database not found: {0}")]
    NotFound(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },
}

impl ReadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReadError::Io { path: path.into(), source }
    }

    pub fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        ReadError::Json { what: what.into(), source }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not determine data directory")]
    NoDataDir,

    #[error("failed to prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("snapshot {id} is corrupt: {source}")]
    Decode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: i64, supported: i64 },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    /// The snapshot was built but could not be recorded. It is still
    /// handed back so the caller can show it.
    #[error("snapshot {} could not be saved: {source}", snapshot.id)]
    Persist {
        snapshot: Box<Snapshot>,
        #[source]
        source: StoreError,
    },
}

impl CaptureError {
    /// The snapshot that was captured before persisting failed.
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            CaptureError::Persist { snapshot, .. } => *snapshot,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid duration '{input}': {source}")]
    Duration {
        input: String,
        #[source]
        source: humantime::DurationError,
    },
}
