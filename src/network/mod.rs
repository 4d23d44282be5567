//! Passive network collection.
//!
//! Resource-timing entries are turned into `NetworkLog` rows. Collection
//! is scoped to a `MonitorHandle`: `Monitor::enable` hands out the handle
//! plus a sink observers push entries into, and `Monitor::disable`
//! consumes the handle and returns what was collected. There is no
//! process-wide observer.

pub mod har;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use url::Url;

use crate::util::format_bytes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLog {
    pub id: String,
    pub method: String,
    pub url: String,
    pub domain: String,
    pub file: String,
    pub status: u16,
    #[serde(rename = "type")]
    pub kind: String,
    pub transferred: String,
    pub size: String,
    pub time: String,
    /// Start time in milliseconds. Relative to the observer's time origin
    /// for monitored requests, Unix epoch for entries imported from HAR.
    pub timestamp: f64,
}

/// A resource-timing entry as reported by a performance observer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTiming {
    pub name: String,
    #[serde(default)]
    pub initiator_type: String,
    #[serde(default)]
    pub transfer_size: u64,
    #[serde(default)]
    pub decoded_body_size: u64,
    pub duration: f64,
    pub start_time: f64,
}

/// Domain and last path segment of `url`. Unparsable urls keep the raw
/// string as the file name.
fn split_url(raw: &str) -> (String, String) {
    match Url::parse(raw) {
        Ok(url) => {
            let domain = url.host_str().unwrap_or_default().to_string();
            let file = url
                .path_segments()
                .and_then(|mut segs| segs.next_back())
                .filter(|s| !s.is_empty())
                .unwrap_or("/")
                .to_string();
            (domain, file)
        }
        Err(e) => {
            debug!("unparsable url {raw}: {e}");
            (String::new(), raw.to_string())
        }
    }
}

impl NetworkLog {
    /// Timing entries carry no method or status, assume a successful GET.
    pub fn from_resource_timing(entry: &ResourceTiming) -> Self {
        let (domain, file) = split_url(&entry.name);
        let size = if entry.decoded_body_size > 0 {
            entry.decoded_body_size
        } else {
            entry.transfer_size
        };
        let kind = if entry.initiator_type.is_empty() {
            "other".to_string()
        } else {
            entry.initiator_type.clone()
        };

        NetworkLog {
            id: uuid::Uuid::new_v4().to_string(),
            method: "GET".to_string(),
            url: entry.name.clone(),
            domain,
            file,
            status: 200,
            kind,
            transferred: format_bytes(entry.transfer_size),
            size: format_bytes(size),
            time: format!("{} ms", entry.duration.round() as i64),
            timestamp: entry.start_time,
        }
    }
}

/// Owns one collection session. Dropping it stops collection.
#[derive(Debug)]
pub struct MonitorHandle {
    rx: mpsc::UnboundedReceiver<NetworkLog>,
}

/// Where observers report entries. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResourceSink {
    tx: mpsc::UnboundedSender<NetworkLog>,
}

impl ResourceSink {
    /// Record one entry. Returns false once the monitor is disabled.
    pub fn record(&self, entry: &ResourceTiming) -> bool {
        self.tx.send(NetworkLog::from_resource_timing(entry)).is_ok()
    }

    pub fn is_active(&self) -> bool {
        !self.tx.is_closed()
    }
}

pub struct Monitor;

impl Monitor {
    pub fn enable() -> (MonitorHandle, ResourceSink) {
        let (tx, rx) = mpsc::unbounded_channel();
        debug!("network monitoring enabled");
        (MonitorHandle { rx }, ResourceSink { tx })
    }

    /// Stop collecting and return every entry recorded so far.
    pub fn disable(mut handle: MonitorHandle) -> Vec<NetworkLog> {
        handle.rx.close();
        let mut logs = Vec::new();
        while let Ok(log) = handle.rx.try_recv() {
            logs.push(log);
        }
        debug!("network monitoring disabled, {} entries", logs.len());
        logs
    }
}
