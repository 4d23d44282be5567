//! JSON output and snapshot export.
//!
//! Serializes results to JSON for scripting and piping, and writes
//! single snapshots to `snapshot-<timestamp>.json`.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::snapshot::Snapshot;

pub fn render<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

pub fn export_file_name(snapshot: &Snapshot) -> String {
    format!("snapshot-{}.json", snapshot.timestamp)
}

/// Write `snapshot` as indented JSON into `dir`, returning the file path.
pub fn export(snapshot: &Snapshot, dir: &Path) -> std::io::Result<PathBuf> {
    let path = dir.join(export_file_name(snapshot));
    let body = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&path, body)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{DatabaseDump, SimpleStore};
    use indexmap::IndexMap;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn export_roundtrips_through_the_file() {
        let mut local = SimpleStore::new();
        local.insert("settings".into(), Some("{\"a\":1}".into()));
        local.insert("gone".into(), None);
        let mut stores = IndexMap::new();
        stores.insert("users".to_string(), vec![json!({"id": 1, "tags": ["x"]})]);
        let mut indexed_db = IndexMap::new();
        indexed_db.insert("app".to_string(), DatabaseDump::Stores(stores));
        indexed_db.insert("locked".to_string(), DatabaseDump::Failed { error: "Failed to access".into() });

        let snapshot = Snapshot {
            id: "abc".into(),
            timestamp: 1_700_000_000_123,
            local_storage: local,
            session_storage: SimpleStore::new(),
            indexed_db,
        };

        let dir = TempDir::new().unwrap();
        let path = export(&snapshot, dir.path()).unwrap();

        assert_eq!(path.file_name().unwrap(), "snapshot-1700000000123.json");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n  \"localStorage\""));
        let parsed: Snapshot = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
