//! Snapshot capture.
//!
//! Builds one immutable, timestamped snapshot of a storage source and
//! records it in the snapshot store before handing it back:
//! - both key-value areas, read synchronously in store order
//! - every structured-store database, read concurrently, each isolated
//!   from the others' failures
//! - the internal history database is never captured

use futures::future::join_all;
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CaptureError, ReadError};
use crate::scan::reader::{DatabaseInfo, StorageArea, StorageSource, INTERNAL_DB_NAME};
use crate::store::SnapshotStore;

/// Key-value area contents. `None` marks a key that vanished mid-read.
pub type SimpleStore = IndexMap<String, Option<String>>;

/// Object store name to its records, in key order.
pub type ObjectStoreDump = IndexMap<String, Vec<Value>>;

/// One database in a snapshot: its object stores, or why they could not be read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatabaseDump {
    Failed { error: String },
    Stores(ObjectStoreDump),
}

impl DatabaseDump {
    pub fn is_failed(&self) -> bool {
        matches!(self, DatabaseDump::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub local_storage: SimpleStore,
    pub session_storage: SimpleStore,
    #[serde(rename = "indexedDB")]
    pub indexed_db: IndexMap<String, DatabaseDump>,
}

impl Snapshot {
    /// Number of keys across both key-value areas.
    pub fn item_count(&self) -> usize {
        self.local_storage.len() + self.session_storage.len()
    }

    pub fn failed_databases(&self) -> impl Iterator<Item = &str> {
        self.indexed_db
            .iter()
            .filter(|(_, dump)| dump.is_failed())
            .map(|(name, _)| name.as_str())
    }
}

/// Capture `source` and persist the result into `store`.
///
/// Read failures never fail the capture. A persist failure returns
/// [`CaptureError::Persist`], which still carries the snapshot.
pub async fn capture<S: StorageSource>(
    source: &S,
    store: &mut SnapshotStore,
) -> Result<Snapshot, CaptureError> {
    let local_storage = read_area(source, StorageArea::Local);
    let session_storage = read_area(source, StorageArea::Session);
    let indexed_db = read_databases(source).await;

    let timestamp = next_timestamp(store);

    let snapshot = Snapshot {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp,
        local_storage,
        session_storage,
        indexed_db,
    };

    match store.put(&snapshot) {
        Ok(()) => {
            info!(
                "captured snapshot {} ({} items, {} databases)",
                snapshot.id,
                snapshot.item_count(),
                snapshot.indexed_db.len()
            );
            Ok(snapshot)
        }
        Err(err) => {
            warn!("failed to persist snapshot {}: {err}", snapshot.id);
            Err(CaptureError::Persist { snapshot: Box::new(snapshot), source: err })
        }
    }
}

/// Wall clock in milliseconds, never earlier than the newest stored snapshot.
fn next_timestamp(store: &SnapshotStore) -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    match store.latest_timestamp() {
        Ok(Some(latest)) if latest > now => {
            debug!("clock is behind newest snapshot ({now} < {latest}), reusing {latest}");
            latest
        }
        Ok(_) => now,
        Err(e) => {
            debug!("could not read newest timestamp: {e}");
            now
        }
    }
}

fn read_area<S: StorageSource>(source: &S, area: StorageArea) -> SimpleStore {
    match source.entries(area) {
        Some(entries) => entries.into_iter().collect(),
        None => {
            debug!("{}: not available, recording empty mapping", area.as_str());
            SimpleStore::new()
        }
    }
}

async fn read_databases<S: StorageSource>(source: &S) -> IndexMap<String, DatabaseDump> {
    let infos = match source.databases().await {
        Ok(Some(infos)) => infos,
        Ok(None) => {
            debug!("indexeddb: enumeration not available");
            return IndexMap::new();
        }
        Err(e) => {
            warn!("indexeddb: failed to enumerate databases: {e}");
            return IndexMap::new();
        }
    };

    let reads = infos
        .into_iter()
        .filter(|info| !info.name.is_empty() && info.name != INTERNAL_DB_NAME)
        .map(|info| async move {
            let dump = match dump_database(source, &info).await {
                Ok(stores) => DatabaseDump::Stores(stores),
                Err(e) => {
                    warn!("indexeddb: failed to snapshot {}: {e}", info.name);
                    DatabaseDump::Failed { error: format!("Failed to access: {e}") }
                }
            };
            (info.name, dump)
        });

    join_all(reads).await.into_iter().collect()
}

async fn dump_database<S: StorageSource>(
    source: &S,
    info: &DatabaseInfo,
) -> Result<ObjectStoreDump, ReadError> {
    let handle = source.open(info).await?;

    let mut stores = ObjectStoreDump::new();
    for name in handle.object_store_names() {
        let records = handle.get_all(&name).await?;
        stores.insert(name, records);
    }
    Ok(stores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::memory::{MemorySource, ObjectStores};
    use serde_json::json;

    fn stores(name: &str, records: Vec<Value>) -> ObjectStores {
        let mut s = ObjectStores::new();
        s.insert(name.to_string(), records);
        s
    }

    #[tokio::test]
    async fn failing_database_is_isolated() {
        let source = MemorySource::new()
            .database("first", 1, stores("items", vec![json!(1), json!(2)]))
            .failing_database("second")
            .database("third", 1, stores("notes", vec![json!({"t": "x"})]));
        let mut store = SnapshotStore::open_in_memory().unwrap();

        let snapshot = capture(&source, &mut store).await.unwrap();

        assert_eq!(snapshot.indexed_db.len(), 3);
        assert_eq!(
            snapshot.indexed_db["first"],
            DatabaseDump::Stores(stores("items", vec![json!(1), json!(2)]))
        );
        assert!(snapshot.indexed_db["second"].is_failed());
        assert_eq!(
            snapshot.indexed_db["third"],
            DatabaseDump::Stores(stores("notes", vec![json!({"t": "x"})]))
        );
        assert_eq!(snapshot.failed_databases().collect::<Vec<_>>(), vec!["second"]);
    }

    #[tokio::test]
    async fn internal_database_is_not_captured() {
        let source = MemorySource::new()
            .database(INTERNAL_DB_NAME, 1, stores("snapshots", vec![json!({"id": "x"})]))
            .database("app", 1, ObjectStores::new());
        let mut store = SnapshotStore::open_in_memory().unwrap();

        let snapshot = capture(&source, &mut store).await.unwrap();

        assert!(!snapshot.indexed_db.contains_key(INTERNAL_DB_NAME));
        assert!(snapshot.indexed_db.contains_key("app"));
    }

    #[tokio::test]
    async fn unavailable_backends_capture_empty_mappings() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let snapshot = capture(&MemorySource::unavailable(), &mut store).await.unwrap();

        assert!(snapshot.local_storage.is_empty());
        assert!(snapshot.session_storage.is_empty());
        assert!(snapshot.indexed_db.is_empty());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn key_value_areas_stay_independent() {
        let source = MemorySource::new()
            .set(StorageArea::Local, "theme", "dark")
            .set(StorageArea::Session, "tab", "2")
            .vanished(StorageArea::Session, "gone");
        let mut store = SnapshotStore::open_in_memory().unwrap();

        let snapshot = capture(&source, &mut store).await.unwrap();

        assert_eq!(snapshot.local_storage.len(), 1);
        assert_eq!(snapshot.session_storage["tab"].as_deref(), Some("2"));
        assert_eq!(snapshot.session_storage["gone"], None);
    }

    #[tokio::test]
    async fn captured_snapshot_is_persisted() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let snapshot = capture(&MemorySource::new(), &mut store).await.unwrap();
        assert_eq!(store.get(&snapshot.id).unwrap(), Some(snapshot));
    }

    #[tokio::test]
    async fn persist_failure_still_returns_snapshot() {
        let source = MemorySource::new()
            .set(StorageArea::Local, "theme", "dark")
            .database("app", 1, stores("items", vec![json!(1)]));
        let mut store = SnapshotStore::open_in_memory().unwrap();
        store.drop_table();

        let err = capture(&source, &mut store).await.unwrap_err();
        assert!(matches!(err, CaptureError::Persist { .. }));

        let snapshot = err.into_snapshot();
        assert_eq!(snapshot.local_storage["theme"].as_deref(), Some("dark"));
        assert_eq!(
            snapshot.indexed_db["app"],
            DatabaseDump::Stores(stores("items", vec![json!(1)]))
        );
    }

    #[tokio::test]
    async fn timestamp_never_goes_behind_newest_stored() {
        let mut store = SnapshotStore::open_in_memory().unwrap();
        let future = chrono::Utc::now().timestamp_millis() + 10_000_000;
        let ahead = Snapshot {
            id: "ahead".to_string(),
            timestamp: future,
            local_storage: SimpleStore::new(),
            session_storage: SimpleStore::new(),
            indexed_db: IndexMap::new(),
        };
        store.put(&ahead).unwrap();

        let next = capture(&MemorySource::new(), &mut store).await.unwrap();

        assert_eq!(next.timestamp, future);
        let history = store.get_all().unwrap();
        assert_eq!(history[0].id, next.id);
        assert_eq!(history[1].id, "ahead");
    }

    #[tokio::test]
    async fn failed_enumeration_captures_no_databases() {
        let source = MemorySource::new()
            .set(StorageArea::Local, "theme", "dark")
            .database("app", 1, stores("items", vec![json!(1)]))
            .failing_enumeration();
        let mut store = SnapshotStore::open_in_memory().unwrap();

        let snapshot = capture(&source, &mut store).await.unwrap();

        assert!(snapshot.indexed_db.is_empty());
        assert_eq!(snapshot.local_storage.len(), 1);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn failed_marker_serializes_as_error_object() {
        let dump = DatabaseDump::Failed { error: "Failed to access".into() };
        assert_eq!(serde_json::to_value(&dump).unwrap(), json!({"error": "Failed to access"}));

        let parsed: DatabaseDump = serde_json::from_value(json!({"error": [1, 2]})).unwrap();
        assert!(!parsed.is_failed());
    }
}
