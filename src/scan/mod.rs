pub mod reader;
pub mod cookies;
pub mod profile;
pub mod memory;

use std::str::FromStr;

use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;

use reader::{Cookie, DatabaseInfo, StorageArea, StorageSource};

/// A structured-store database as seen by inspection: its descriptor and
/// the object stores it exposes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseRecord {
    pub name: String,
    pub version: u64,
    pub object_store_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValueRecord {
    pub area: StorageArea,
    pub key: String,
    pub value: String,
}

/// Any single item the inspector can show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Record {
    KeyValue(KeyValueRecord),
    Cookie(Cookie),
    Database(DatabaseRecord),
}

impl Record {
    /// Label shown in listings.
    pub fn label(&self) -> &str {
        match self {
            Record::KeyValue(kv) => &kv.key,
            Record::Cookie(c) => &c.name,
            Record::Database(db) => &db.name,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Record::KeyValue(kv) => match kv.area {
                StorageArea::Local => Category::Local,
                StorageArea::Session => Category::Session,
            },
            Record::Cookie(_) => Category::Cookies,
            Record::Database(_) => Category::IndexedDb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Local,
    Session,
    Cookies,
    IndexedDb,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Local => "local",
            Category::Session => "session",
            Category::Cookies => "cookies",
            Category::IndexedDb => "indexeddb",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" | "localstorage" => Ok(Category::Local),
            "session" | "sessionstorage" => Ok(Category::Session),
            "cookies" => Ok(Category::Cookies),
            "indexeddb" | "idb" => Ok(Category::IndexedDb),
            _ => Err(format!("unknown category '{s}' (expected local, session, cookies, indexeddb)")),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub cookies: Vec<Cookie>,
    pub indexed_db: Vec<DatabaseRecord>,
    pub local_storage: Vec<KeyValueRecord>,
    pub session_storage: Vec<KeyValueRecord>,
    pub timestamp: i64,
    pub diagnostics: Vec<String>,
}

impl ScanResult {
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.local_storage
            .iter()
            .cloned()
            .map(Record::KeyValue)
            .chain(self.session_storage.iter().cloned().map(Record::KeyValue))
            .chain(self.cookies.iter().cloned().map(Record::Cookie))
            .chain(self.indexed_db.iter().cloned().map(Record::Database))
    }

    pub fn records_in(&self, category: Category) -> Vec<Record> {
        self.records().filter(|r| r.category() == category).collect()
    }
}

/// Read every backend of `source` for inspection. Each backend failure
/// becomes a diagnostic and an empty list.
pub async fn run<S: StorageSource>(source: &S) -> ScanResult {
    let mut diagnostics = Vec::new();

    let (databases, cookies) = futures::join!(scan_databases(source), source.cookies());

    let cookies = cookies.unwrap_or_else(|e| {
        warn!("cookies: {e}");
        diagnostics.push(format!("cookies: {e}"));
        Vec::new()
    });

    let indexed_db = databases.unwrap_or_else(|msg| {
        diagnostics.push(msg);
        Vec::new()
    });

    let local_storage = scan_area(source, StorageArea::Local, &mut diagnostics);
    let session_storage = scan_area(source, StorageArea::Session, &mut diagnostics);

    ScanResult {
        cookies,
        indexed_db,
        local_storage,
        session_storage,
        timestamp: chrono::Utc::now().timestamp_millis(),
        diagnostics,
    }
}

fn scan_area<S: StorageSource>(
    source: &S,
    area: StorageArea,
    diagnostics: &mut Vec<String>,
) -> Vec<KeyValueRecord> {
    let Some(entries) = source.entries(area) else {
        diagnostics.push(format!("{}: skipped (not available)", area.as_str()));
        return Vec::new();
    };

    entries
        .into_iter()
        .map(|(key, value)| KeyValueRecord {
            area,
            key,
            value: value.unwrap_or_default(),
        })
        .collect()
}

async fn scan_databases<S: StorageSource>(source: &S) -> Result<Vec<DatabaseRecord>, String> {
    let infos = match source.databases().await {
        Ok(Some(infos)) => infos,
        Ok(None) => {
            debug!("indexeddb: enumeration not available");
            return Ok(Vec::new());
        }
        Err(e) => {
            warn!("indexeddb: failed to enumerate databases: {e}");
            return Err(format!("indexeddb: {e}"));
        }
    };

    let records = infos
        .iter()
        .filter(|info| !info.name.is_empty())
        .map(|info| describe_database(source, info));

    Ok(join_all(records).await)
}

async fn describe_database<S: StorageSource>(source: &S, info: &DatabaseInfo) -> DatabaseRecord {
    match source.open(info).await {
        Ok(handle) => DatabaseRecord {
            name: info.name.clone(),
            version: info.version,
            object_store_names: handle.object_store_names(),
            error: None,
        },
        Err(e) => {
            warn!("indexeddb: failed to open {}: {e}", info.name);
            DatabaseRecord {
                name: info.name.clone(),
                version: info.version,
                object_store_names: Vec::new(),
                error: Some(e.to_string()),
            }
        }
    }
}
