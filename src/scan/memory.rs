//! In-memory storage source.
//!
//! Used when embedding the library against storage that is already in
//! memory, and by tests that need exact control over failures.

use std::collections::HashSet;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ReadError;
use super::reader::{
    Cookie, CookieReader, DatabaseHandle, DatabaseInfo, KeyValueReader, RecordStoreReader,
    StorageArea,
};

pub type ObjectStores = IndexMap<String, Vec<Value>>;

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    local: Option<Vec<(String, Option<String>)>>,
    session: Option<Vec<(String, Option<String>)>>,
    cookies: Vec<Cookie>,
    databases: Option<Vec<(DatabaseInfo, ObjectStores)>>,
    failing: HashSet<String>,
    enumeration_fails: bool,
}

impl MemorySource {
    /// A source where every backend is reachable and empty.
    pub fn new() -> Self {
        MemorySource {
            local: Some(Vec::new()),
            session: Some(Vec::new()),
            cookies: Vec::new(),
            databases: Some(Vec::new()),
            failing: HashSet::new(),
            enumeration_fails: false,
        }
    }

    /// A source where no backend exists at all.
    pub fn unavailable() -> Self {
        MemorySource::default()
    }

    pub fn set(mut self, area: StorageArea, key: &str, value: &str) -> Self {
        self.area_mut(area).push((key.to_string(), Some(value.to_string())));
        self
    }

    /// A key whose value disappeared while it was being enumerated.
    pub fn vanished(mut self, area: StorageArea, key: &str) -> Self {
        self.area_mut(area).push((key.to_string(), None));
        self
    }

    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn database(mut self, name: &str, version: u64, stores: ObjectStores) -> Self {
        self.databases
            .get_or_insert_with(Vec::new)
            .push((DatabaseInfo { name: name.to_string(), version }, stores));
        self
    }

    /// Make opening `name` fail.
    pub fn failing_database(mut self, name: &str) -> Self {
        self.failing.insert(name.to_string());
        self.database(name, 1, ObjectStores::new())
    }

    /// Make listing the databases fail outright.
    pub fn failing_enumeration(mut self) -> Self {
        self.enumeration_fails = true;
        self
    }

    fn area_mut(&mut self, area: StorageArea) -> &mut Vec<(String, Option<String>)> {
        let slot = match area {
            StorageArea::Local => &mut self.local,
            StorageArea::Session => &mut self.session,
        };
        slot.get_or_insert_with(Vec::new)
    }
}

impl KeyValueReader for MemorySource {
    fn entries(&self, area: StorageArea) -> Option<Vec<(String, Option<String>)>> {
        match area {
            StorageArea::Local => self.local.clone(),
            StorageArea::Session => self.session.clone(),
        }
    }
}

#[async_trait]
impl CookieReader for MemorySource {
    async fn cookies(&self) -> Result<Vec<Cookie>, ReadError> {
        Ok(self.cookies.clone())
    }
}

#[async_trait]
impl RecordStoreReader for MemorySource {
    async fn databases(&self) -> Result<Option<Vec<DatabaseInfo>>, ReadError> {
        if self.enumeration_fails {
            return Err(ReadError::Unavailable("database listing blocked".to_string()));
        }

        Ok(self
            .databases
            .as_ref()
            .map(|dbs| dbs.iter().map(|(info, _)| info.clone()).collect()))
    }

    async fn open(&self, db: &DatabaseInfo) -> Result<Box<dyn DatabaseHandle>, ReadError> {
        if self.failing.contains(&db.name) {
            return Err(ReadError::Unavailable(format!("{}: open blocked", db.name)));
        }

        let stores = self
            .databases
            .iter()
            .flatten()
            .find(|(info, _)| info.name == db.name)
            .map(|(_, stores)| stores.clone())
            .ok_or_else(|| ReadError::NotFound(db.name.clone()))?;

        Ok(Box::new(MemoryDatabase { stores }))
    }
}

struct MemoryDatabase {
    stores: ObjectStores,
}

#[async_trait]
impl DatabaseHandle for MemoryDatabase {
    fn object_store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    async fn get_all(&self, store: &str) -> Result<Vec<Value>, ReadError> {
        self.stores
            .get(store)
            .cloned()
            .ok_or_else(|| ReadError::NotFound(store.to_string()))
    }
}
