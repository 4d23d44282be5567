//! Profile directory reader.
//!
//! Reads storage exported from a browser profile into a plain directory:
//!
//! ```text
//! <profile>/
//!   localStorage.json           {"key": "value", ...}
//!   sessionStorage.json         {"key": "value", ...}
//!   cookies.txt                 Netscape cookie jar
//!   document.cookie             optional `a=1; b=2` header string
//!   indexeddb/<db>/VERSION      optional database version (defaults to 1)
//!   indexeddb/<db>/<store>.json JSON array of records
//! ```
//!
//! Missing files mean the backend is unavailable, never an error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::error::ReadError;
use super::cookies;
use super::reader::{
    Cookie, CookieReader, DatabaseHandle, DatabaseInfo, KeyValueReader, RecordStoreReader,
    StorageArea,
};

const INDEXEDDB_DIR: &str = "indexeddb";
const COOKIE_JAR: &str = "cookies.txt";
const COOKIE_HEADER: &str = "document.cookie";
const VERSION_FILE: &str = "VERSION";

#[derive(Debug, Clone)]
pub struct ProfileSource {
    root: PathBuf,
    host: String,
}

impl ProfileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProfileSource {
            root: root.into(),
            host: "localhost".to_string(),
        }
    }

    /// Host assigned to cookies read from `document.cookie`, which carries no domain.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn area_path(&self, area: StorageArea) -> PathBuf {
        self.root.join(format!("{}.json", area.as_str()))
    }

    fn database_dir(&self, name: &str) -> PathBuf {
        self.root.join(INDEXEDDB_DIR).join(name)
    }
}

impl KeyValueReader for ProfileSource {
    fn entries(&self, area: StorageArea) -> Option<Vec<(String, Option<String>)>> {
        let path = self.area_path(area);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("{}: no {} file", area.as_str(), path.display());
                return None;
            }
            Err(e) => {
                warn!("{}: failed to read {}: {e}", area.as_str(), path.display());
                return None;
            }
        };

        let map: serde_json::Map<String, Value> = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                warn!("{}: {} is not a JSON object: {e}", area.as_str(), path.display());
                return None;
            }
        };

        let entries = map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::Null => None,
                    Value::String(s) => Some(s),
                    // storage areas only hold strings, coerce like the browser does
                    other => Some(other.to_string()),
                };
                (key, value)
            })
            .collect();

        Some(entries)
    }
}

#[async_trait]
impl CookieReader for ProfileSource {
    async fn cookies(&self) -> Result<Vec<Cookie>, ReadError> {
        let jar = match read_optional(&self.root.join(COOKIE_JAR)).await? {
            Some(content) => cookies::parse_cookie_jar(&content),
            None => Vec::new(),
        };

        let header = match read_optional(&self.root.join(COOKIE_HEADER)).await? {
            Some(content) => cookies::parse_cookie_header(content.trim(), &self.host),
            None => Vec::new(),
        };

        let merged = cookies::merge(jar, header);
        debug!("scanned {} cookies", merged.len());
        Ok(merged)
    }
}

#[async_trait]
impl RecordStoreReader for ProfileSource {
    async fn databases(&self) -> Result<Option<Vec<DatabaseInfo>>, ReadError> {
        let dir = self.root.join(INDEXEDDB_DIR);
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ReadError::io(dir, e)),
        };

        let mut databases = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| ReadError::io(&dir, e))? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("skipping database with non utf-8 name in {}", dir.display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            match entry.file_type().await {
                Ok(ft) if ft.is_dir() => {}
                Ok(_) => {
                    debug!("skipping {name} in {}: not a database directory", dir.display());
                    continue;
                }
                Err(e) => return Err(ReadError::io(entry.path(), e)),
            }

            let version = match read_optional(&entry.path().join(VERSION_FILE)).await {
                Ok(Some(v)) => v.trim().parse().unwrap_or_else(|_| {
                    debug!("{name}: unparsable VERSION, assuming 1");
                    1
                }),
                // a broken database still gets listed, opening it reports the failure
                Ok(None) | Err(_) => 1,
            };

            databases.push(DatabaseInfo { name, version });
        }

        databases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(databases))
    }

    async fn open(&self, db: &DatabaseInfo) -> Result<Box<dyn DatabaseHandle>, ReadError> {
        let dir = self.database_dir(&db.name);
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReadError::NotFound(db.name.clone()))
            }
            Err(e) => return Err(ReadError::io(dir, e)),
        };

        let mut stores = Vec::new();
        while let Some(entry) = read_dir.next_entry().await.map_err(|e| ReadError::io(&dir, e))? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                stores.push(stem.to_string());
            }
        }
        stores.sort();

        Ok(Box::new(ProfileDatabase { dir, stores }))
    }
}

struct ProfileDatabase {
    dir: PathBuf,
    stores: Vec<String>,
}

#[async_trait]
impl DatabaseHandle for ProfileDatabase {
    fn object_store_names(&self) -> Vec<String> {
        self.stores.clone()
    }

    async fn get_all(&self, store: &str) -> Result<Vec<Value>, ReadError> {
        let path = self.dir.join(format!("{store}.json"));
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ReadError::io(&path, e))?;

        match serde_json::from_str(&content).map_err(|e| ReadError::json(path.display().to_string(), e))? {
            Value::Array(records) => Ok(records),
            _ => Err(ReadError::Malformed {
                what: path.display().to_string(),
                reason: "object store file must hold a JSON array".to_string(),
            }),
        }
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, ReadError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ReadError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn profile() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("localStorage.json"),
            r#"{"zeta": "1", "alpha": "{\"a\":1}", "gone": null, "n": 5}"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("indexeddb/app")).unwrap();
        fs::write(dir.path().join("indexeddb/app/VERSION"), "3\n").unwrap();
        fs::write(dir.path().join("indexeddb/app/users.json"), r#"[{"id":1},{"id":2}]"#).unwrap();
        fs::write(dir.path().join("indexeddb/app/notes.txt"), "ignored").unwrap();
        dir
    }

    #[test]
    fn key_value_keeps_file_order_and_nulls() {
        let dir = profile();
        let source = ProfileSource::new(dir.path());
        let entries = source.entries(StorageArea::Local).unwrap();
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "gone", "n"]);
        assert_eq!(entries[2].1, None);
        assert_eq!(entries[3].1.as_deref(), Some("5"));
    }

    #[test]
    fn missing_area_is_unavailable() {
        let dir = profile();
        let source = ProfileSource::new(dir.path());
        assert!(source.entries(StorageArea::Session).is_none());
    }

    #[tokio::test]
    async fn stray_files_are_not_databases() {
        let dir = profile();
        fs::write(dir.path().join("indexeddb/README.md"), "notes").unwrap();
        let source = ProfileSource::new(dir.path());

        let names: Vec<String> = source
            .databases()
            .await
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|db| db.name)
            .collect();
        assert_eq!(names, vec!["app"]);
    }

    #[tokio::test]
    async fn databases_list_versions_and_stores() {
        let dir = profile();
        let source = ProfileSource::new(dir.path());
        let dbs = source.databases().await.unwrap().unwrap();
        assert_eq!(dbs, vec![DatabaseInfo { name: "app".into(), version: 3 }]);

        let handle = source.open(&dbs[0]).await.unwrap();
        assert_eq!(handle.object_store_names(), vec!["users".to_string()]);
        let users = handle.get_all("users").await.unwrap();
        assert_eq!(users.len(), 2);
    }

    #[tokio::test]
    async fn no_indexeddb_dir_means_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = ProfileSource::new(dir.path());
        assert!(source.databases().await.unwrap().is_none());
        assert!(source.cookies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_array_store_is_malformed() {
        let dir = profile();
        fs::write(dir.path().join("indexeddb/app/users.json"), r#"{"id":1}"#).unwrap();
        let source = ProfileSource::new(dir.path());
        let handle = source.open(&DatabaseInfo { name: "app".into(), version: 3 }).await.unwrap();
        assert!(matches!(handle.get_all("users").await, Err(ReadError::Malformed { .. })));
    }
}
