//! Snapshot comparison engine.
//!
//! Compares two JSON trees key by key and reports changes:
//! - Only top-level keys are compared, values are compared deeply
//! - Each changed key is added, removed or modified
//! - localStorage, sessionStorage and indexedDB are compared separately
//!
//! A missing tree, or one that is not a JSON object, has no keys.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Added,
    Removed,
    Modified,
    /// Present on both sides with equal values. `diff_objects` never
    /// produces such keys, only hand-built deltas do.
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub key: String,
    pub status: DiffStatus,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Top-level keys whose presence or value differs between two trees.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    keys: BTreeSet<String>,
}

impl Delta {
    pub fn from_keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Delta {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Keys in ascending string order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn object(tree: Option<&Value>) -> Option<&Map<String, Value>> {
    tree.and_then(Value::as_object)
}

/// Compute which top-level keys differ. `None` when the trees agree.
pub fn diff_objects(left: Option<&Value>, right: Option<&Value>) -> Option<Delta> {
    let empty = Map::new();
    let left = object(left).unwrap_or(&empty);
    let right = object(right).unwrap_or(&empty);

    let mut keys = BTreeSet::new();

    for (key, new) in right {
        if left.get(key) != Some(new) {
            keys.insert(key.clone());
        }
    }

    for key in left.keys() {
        if !right.contains_key(key) {
            keys.insert(key.clone());
        }
    }

    if keys.is_empty() {
        None
    } else {
        Some(Delta { keys })
    }
}

/// Turn a delta into one result per key, sorted by key.
pub fn flatten_delta(delta: Option<&Delta>, left: Option<&Value>, right: Option<&Value>) -> Vec<DiffResult> {
    let Some(delta) = delta else {
        return Vec::new();
    };

    let empty = Map::new();
    let left = object(left).unwrap_or(&empty);
    let right = object(right).unwrap_or(&empty);

    delta
        .keys()
        .filter_map(|key| {
            let (status, old_value, new_value) = match (left.get(key), right.get(key)) {
                (None, Some(new)) => (DiffStatus::Added, None, Some(new.clone())),
                (Some(old), None) => (DiffStatus::Removed, Some(old.clone()), None),
                (Some(old), Some(new)) if old == new => {
                    (DiffStatus::Unchanged, Some(old.clone()), Some(new.clone()))
                }
                (Some(old), Some(new)) => (DiffStatus::Modified, Some(old.clone()), Some(new.clone())),
                (None, None) => return None,
            };

            Some(DiffResult {
                key: key.to_string(),
                status,
                old_value,
                new_value,
            })
        })
        .collect()
}

/// `diff_objects` followed by `flatten_delta`.
pub fn diff(left: Option<&Value>, right: &Value) -> Vec<DiffResult> {
    let delta = diff_objects(left, Some(right));
    flatten_delta(delta.as_ref(), left, Some(right))
}

/// Per-category changes between two snapshots.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDiff {
    pub from_id: Option<String>,
    pub to_id: String,
    pub from_timestamp: Option<i64>,
    pub to_timestamp: i64,
    pub local_storage: Vec<DiffResult>,
    pub session_storage: Vec<DiffResult>,
    #[serde(rename = "indexedDB")]
    pub indexed_db: Vec<DiffResult>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.local_storage.is_empty() && self.session_storage.is_empty() && self.indexed_db.is_empty()
    }

    pub fn len(&self) -> usize {
        self.local_storage.len() + self.session_storage.len() + self.indexed_db.len()
    }
}

/// Compare `current` against `previous`. Without a previous snapshot
/// every key of `current` is added.
pub fn compare(previous: Option<&Snapshot>, current: &Snapshot) -> SnapshotDiff {
    fn tree<T: Serialize>(value: &T) -> Value {
        // maps of strings and json values always serialize
        serde_json::to_value(value).unwrap_or(Value::Null)
    }

    let category = |pick: fn(&Snapshot) -> Value| {
        let right = pick(current);
        let left = previous.map(pick);
        diff(left.as_ref(), &right)
    };

    SnapshotDiff {
        from_id: previous.map(|p| p.id.clone()),
        to_id: current.id.clone(),
        from_timestamp: previous.map(|p| p.timestamp),
        to_timestamp: current.timestamp,
        local_storage: category(|s| tree(&s.local_storage)),
        session_storage: category(|s| tree(&s.session_storage)),
        indexed_db: category(|s| tree(&s.indexed_db)),
    }
}

/// Render a diff value for display.
///
/// Objects and arrays, and strings holding JSON, come out pretty-printed.
/// Absent and null values are empty.
pub fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v @ (Value::Object(_) | Value::Array(_))) => pretty(v),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(parsed) => pretty(&parsed),
            Err(_) => s.clone(),
        },
        Some(other) => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
