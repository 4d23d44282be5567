//! HAR 1.2 import.
//!
//! Only `log.entries[]` is read: request method and url, response
//! status and sizes, total time and start date.

use serde::Deserialize;

use crate::error::ReadError;
use crate::util::format_bytes;
use super::{split_url, NetworkLog};

#[derive(Deserialize)]
struct Har {
    log: HarLog,
}

#[derive(Deserialize)]
struct HarLog {
    #[serde(default)]
    entries: Vec<HarEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarEntry {
    started_date_time: String,
    time: f64,
    request: HarRequest,
    response: HarResponse,
    #[serde(rename = "_resourceType", default)]
    resource_type: Option<String>,
}

#[derive(Deserialize)]
struct HarRequest {
    method: String,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HarResponse {
    status: u16,
    #[serde(default)]
    content: HarContent,
    /// -1 when unknown
    #[serde(default)]
    body_size: i64,
    #[serde(rename = "_transferSize", default)]
    transfer_size: Option<i64>,
}

#[derive(Deserialize, Default)]
struct HarContent {
    #[serde(default)]
    size: i64,
    #[serde(rename = "mimeType", default)]
    mime_type: String,
}

pub fn parse(content: &str) -> Result<Vec<NetworkLog>, ReadError> {
    let har: Har = serde_json::from_str(content).map_err(|e| ReadError::json("HAR file", e))?;

    Ok(har.log.entries.into_iter().map(to_log).collect())
}

fn to_log(entry: HarEntry) -> NetworkLog {
    let (domain, file) = split_url(&entry.request.url);
    let body = entry.response.body_size.max(0) as u64;
    let transferred = entry.response.transfer_size.map(|t| t.max(0) as u64).unwrap_or(body);

    let timestamp = chrono::DateTime::parse_from_rfc3339(&entry.started_date_time)
        .map(|dt| dt.timestamp_millis() as f64)
        .unwrap_or(0.0);

    NetworkLog {
        id: uuid::Uuid::new_v4().to_string(),
        method: entry.request.method,
        url: entry.request.url,
        domain,
        file,
        status: entry.response.status,
        kind: entry
            .resource_type
            .unwrap_or_else(|| kind_from_mime(&entry.response.content.mime_type).to_string()),
        transferred: format_bytes(transferred),
        size: format_bytes(entry.response.content.size.max(0) as u64),
        time: format!("{} ms", entry.time.round() as i64),
        timestamp,
    }
}

fn kind_from_mime(mime: &str) -> &'static str {
    let mime = mime.split(';').next().unwrap_or_default().trim();
    match mime {
        "text/html" => "document",
        "text/css" => "stylesheet",
        "application/javascript" | "text/javascript" => "script",
        "application/json" => "fetch",
        m if m.starts_with("image/") => "img",
        m if m.starts_with("font/") => "font",
        _ => "other",
    }
}
