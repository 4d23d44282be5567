use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReadError;

/// Name of the database the snapshot history lives in. Readers may list
/// it, but capture never records it.
pub const INTERNAL_DB_NAME: &str = "storagelens_internal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageArea {
    /// Durable per-origin store (`localStorage`).
    Local,
    /// Per-tab store cleared with the session (`sessionStorage`).
    Session,
}

impl StorageArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageArea::Local => "localStorage",
            StorageArea::Session => "sessionStorage",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CookieExpiry {
    Session,
    /// Seconds since the Unix epoch.
    At(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub expires: CookieExpiry,
    pub size: usize,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: String,
}

/// One entry of the structured store's database enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: u64,
}

/// Synchronous key-value areas. Reads cannot suspend.
pub trait KeyValueReader {
    /// Every key of `area` with its value, in the order the store reports
    /// them. A `None` value means the key vanished mid-enumeration.
    /// Returns `None` when the area is unreachable.
    fn entries(&self, area: StorageArea) -> Option<Vec<(String, Option<String>)>>;
}

#[async_trait]
pub trait CookieReader: Send + Sync {
    async fn cookies(&self) -> Result<Vec<Cookie>, ReadError>;
}

/// An open structured-store database.
#[async_trait]
pub trait DatabaseHandle: Send + Sync {
    fn object_store_names(&self) -> Vec<String>;

    /// All records of one object store, in key order.
    async fn get_all(&self, store: &str) -> Result<Vec<Value>, ReadError>;
}

#[async_trait]
pub trait RecordStoreReader: Send + Sync {
    /// Enumerates known databases. `Ok(None)` means the host has no
    /// enumeration API, which is not an error.
    async fn databases(&self) -> Result<Option<Vec<DatabaseInfo>>, ReadError>;

    async fn open(&self, db: &DatabaseInfo) -> Result<Box<dyn DatabaseHandle>, ReadError>;
}

/// Everything capture and scan need from a browser profile.
pub trait StorageSource: KeyValueReader + CookieReader + RecordStoreReader {}

impl<T> StorageSource for T where T: KeyValueReader + CookieReader + RecordStoreReader {}
