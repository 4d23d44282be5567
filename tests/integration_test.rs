use std::fs;
use std::path::Path;

use serde_json::json;
use storagelens::report::json as report_json;
use storagelens::scan::profile::ProfileSource;
use storagelens::snapshot::{self, DatabaseDump, Snapshot};
use storagelens::store::diff::{self, DiffStatus};
use storagelens::store::SnapshotStore;
use tempfile::TempDir;

fn write_profile(root: &Path, theme: &str) {
    fs::write(
        root.join("localStorage.json"),
        format!(r#"{{"theme": "{theme}", "settings": "{{\"a\":1}}"}}"#),
    )
    .unwrap();
    fs::write(root.join("sessionStorage.json"), r#"{"tab": "1"}"#).unwrap();
    fs::write(
        root.join("cookies.txt"),
        "# Netscape HTTP Cookie File\nexample.com\tFALSE\t/\tFALSE\t0\tsid\tabc\n",
    )
    .unwrap();

    fs::create_dir_all(root.join("indexeddb/app")).unwrap();
    fs::write(root.join("indexeddb/app/users.json"), r#"[{"id": 1, "name": "ada"}]"#).unwrap();

    // unreadable store file makes the whole database fail
    fs::create_dir_all(root.join("indexeddb/cache")).unwrap();
    fs::write(root.join("indexeddb/cache/entries.json"), "{not json").unwrap();

    fs::create_dir_all(root.join("indexeddb/zeta")).unwrap();
    fs::write(root.join("indexeddb/zeta/kv.json"), r#"["x", "y"]"#).unwrap();

    fs::create_dir_all(root.join("indexeddb/storagelens_internal")).unwrap();
    fs::write(root.join("indexeddb/storagelens_internal/snapshots.json"), "[]").unwrap();
}

#[tokio::test]
async fn capture_persists_and_isolates_failures() {
    let profile = TempDir::new().unwrap();
    write_profile(profile.path(), "dark");
    let data = TempDir::new().unwrap();
    let mut store = SnapshotStore::open(&data.path().join("history.db")).unwrap();

    let snapshot = snapshot::capture(&ProfileSource::new(profile.path()), &mut store)
        .await
        .unwrap();

    let names: Vec<&str> = snapshot.indexed_db.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["app", "cache", "zeta"]);
    assert!(snapshot.indexed_db["cache"].is_failed());
    match &snapshot.indexed_db["app"] {
        DatabaseDump::Stores(stores) => assert_eq!(stores["users"], vec![json!({"id": 1, "name": "ada"})]),
        other => panic!("expected stores, got {other:?}"),
    }
    match &snapshot.indexed_db["zeta"] {
        DatabaseDump::Stores(stores) => assert_eq!(stores["kv"].len(), 2),
        other => panic!("expected stores, got {other:?}"),
    }

    assert_eq!(store.get_all().unwrap(), vec![snapshot]);
}

#[tokio::test]
async fn history_is_newest_first_and_diffs_between_captures() {
    let profile = TempDir::new().unwrap();
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let source = ProfileSource::new(profile.path());

    let mut captured: Vec<Snapshot> = Vec::new();
    for theme in ["light", "dark", "sepia"] {
        write_profile(profile.path(), theme);
        captured.push(snapshot::capture(&source, &mut store).await.unwrap());
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let history = store.get_all().unwrap();
    let ids: Vec<&str> = history.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec![captured[2].id.as_str(), captured[1].id.as_str(), captured[0].id.as_str()]);
    assert!(history[0].timestamp >= history[1].timestamp);
    assert!(history[1].timestamp >= history[2].timestamp);

    let result = diff::compare(history.get(1), &history[0]);
    assert_eq!(result.local_storage.len(), 1);
    assert_eq!(result.local_storage[0].key, "theme");
    assert_eq!(result.local_storage[0].status, DiffStatus::Modified);
    assert_eq!(result.local_storage[0].old_value, Some(json!("dark")));
    assert_eq!(result.local_storage[0].new_value, Some(json!("sepia")));
    assert!(result.session_storage.is_empty());
    assert!(result.indexed_db.is_empty());

    let first = diff::compare(None, &history[2]);
    assert_eq!(first.local_storage.len(), 2);
    assert!(first.local_storage.iter().all(|r| r.status == DiffStatus::Added));
}

#[tokio::test]
async fn exported_snapshot_parses_back_equal() {
    let profile = TempDir::new().unwrap();
    write_profile(profile.path(), "dark");
    let mut store = SnapshotStore::open_in_memory().unwrap();
    let snapshot = snapshot::capture(&ProfileSource::new(profile.path()), &mut store)
        .await
        .unwrap();

    let out = TempDir::new().unwrap();
    let path = report_json::export(&snapshot, out.path()).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        format!("snapshot-{}.json", snapshot.timestamp)
    );
    let parsed: Snapshot = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(parsed, snapshot);
}

#[tokio::test]
async fn empty_profile_captures_empty_snapshot() {
    let profile = TempDir::new().unwrap();
    let mut store = SnapshotStore::open_in_memory().unwrap();

    let snapshot = snapshot::capture(&ProfileSource::new(profile.path()), &mut store)
        .await
        .unwrap();

    assert_eq!(snapshot.item_count(), 0);
    assert!(snapshot.indexed_db.is_empty());
    assert_eq!(store.len().unwrap(), 1);
}
