//! Terminal table rendering.
//!
//! Formats snapshots, diffs and inspection records for a terminal:
//! - History as one row per snapshot, newest first
//! - Diffs grouped by category with a marker per status
//! - Inspection records grouped by category

use crate::network::NetworkLog;
use crate::scan::{Category, Record, ScanResult};
use crate::snapshot::{DatabaseDump, Snapshot};
use crate::store::diff::{format_value, DiffResult, DiffStatus, SnapshotDiff};
use crate::util::{format_timestamp_ms, truncate};

pub fn render_history(snapshots: &[Snapshot]) -> String {
    if snapshots.is_empty() {
        return String::from("No snapshots found. Run 'storagelens snapshot' to create one.\n");
    }

    let mut output = String::new();
    output.push_str(&format!("{:<38} {:<20} {:>6} {:>10}\n", "ID", "Date", "Items", "Databases"));
    output.push_str(&"-".repeat(77));
    output.push('\n');

    for snapshot in snapshots {
        output.push_str(&format!(
            "{:<38} {:<20} {:>6} {:>10}\n",
            snapshot.id,
            format_timestamp_ms(snapshot.timestamp),
            snapshot.item_count(),
            snapshot.indexed_db.len()
        ));
    }

    output
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut output = format!(
        "snapshot: {} ({})\n",
        snapshot.id,
        format_timestamp_ms(snapshot.timestamp)
    );

    for (label, area) in [("localStorage", &snapshot.local_storage), ("sessionStorage", &snapshot.session_storage)] {
        output.push_str(&format!("\n{label} ({} keys)\n", area.len()));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        for (key, value) in area {
            let value = value.as_deref().unwrap_or("<removed>");
            output.push_str(&format!("  {:30} {}\n", truncate(key, 30), truncate(value, 40)));
        }
    }

    output.push_str(&format!("\nindexedDB ({} databases)\n", snapshot.indexed_db.len()));
    output.push_str(&"-".repeat(40));
    output.push('\n');
    for (name, dump) in &snapshot.indexed_db {
        match dump {
            DatabaseDump::Stores(stores) => {
                output.push_str(&format!("  {name}\n"));
                for (store, records) in stores {
                    output.push_str(&format!("    {:28} {:>6} records\n", truncate(store, 28), records.len()));
                }
            }
            DatabaseDump::Failed { error } => {
                output.push_str(&format!("  {name} [error] {error}\n"));
            }
        }
    }

    output
}

fn status_marker(status: DiffStatus) -> &'static str {
    match status {
        DiffStatus::Added => "[+]",
        DiffStatus::Removed => "[-]",
        DiffStatus::Modified => "[~]",
        DiffStatus::Unchanged => "[=]",
    }
}

fn render_entries(output: &mut String, label: &str, entries: &[DiffResult], values: bool) {
    output.push_str(&format!("{label} ({}):\n", entries.len()));

    if entries.is_empty() {
        output.push_str("  No changes detected.\n\n");
        return;
    }

    for entry in entries {
        output.push_str(&format!("  {} {}\n", status_marker(entry.status), entry.key));

        if values {
            for (side, value) in [("old", entry.old_value.as_ref()), ("new", entry.new_value.as_ref())] {
                if value.is_none() {
                    continue;
                }
                let formatted = format_value(value);
                for (i, line) in formatted.lines().enumerate() {
                    let prefix = if i == 0 { format!("{side}:") } else { String::new() };
                    output.push_str(&format!("      {prefix:5}{line}\n"));
                }
            }
        }
    }

    output.push('\n');
}

/// `only` narrows output to one snapshot category. Cookies have no section.
pub fn render_diff(diff: &SnapshotDiff, only: Option<Category>, values: bool) -> String {
    let mut output = String::from("\nComparing snapshots:\n");

    match (&diff.from_id, diff.from_timestamp) {
        (Some(id), Some(ts)) => output.push_str(&format!("  From: {id} ({})\n", format_timestamp_ms(ts))),
        _ => output.push_str("  From: (initial)\n"),
    }
    output.push_str(&format!("  To:   {} ({})\n\n", diff.to_id, format_timestamp_ms(diff.to_timestamp)));

    let sections = [
        (Category::Local, "localStorage", &diff.local_storage),
        (Category::Session, "sessionStorage", &diff.session_storage),
        (Category::IndexedDb, "indexedDB", &diff.indexed_db),
    ];

    for (category, label, entries) in sections {
        if only.is_some_and(|c| c != category) {
            continue;
        }
        render_entries(&mut output, label, entries, values);
    }

    output
}

pub fn render_records(result: &ScanResult, only: Option<Category>) -> String {
    let categories = [Category::Local, Category::Session, Category::Cookies, Category::IndexedDb];
    let mut output = String::new();

    for category in categories {
        if only.is_some_and(|c| c != category) {
            continue;
        }

        let records = result.records_in(category);
        output.push_str(&format!("\n{} ({})\n", category.as_str(), records.len()));
        output.push_str(&"-".repeat(40));
        output.push('\n');

        for record in &records {
            let detail = match record {
                Record::KeyValue(kv) => truncate(&kv.value, 40),
                Record::Cookie(c) => format!("{} {}{}", c.domain, c.path, if c.secure { " secure" } else { "" }),
                Record::Database(db) => match &db.error {
                    Some(e) => format!("v{} [error] {e}", db.version),
                    None => format!("v{} stores: {}", db.version, db.object_store_names.join(", ")),
                },
            };
            output.push_str(&format!("  {:30} {}\n", truncate(record.label(), 30), detail));
        }
    }

    output
}

pub fn render_network(logs: &[NetworkLog]) -> String {
    if logs.is_empty() {
        return String::from("No requests recorded.\n");
    }

    let mut output = format!(
        "{:<7} {:<6} {:<24} {:<24} {:<10} {:>10} {:>8}\n",
        "Method", "Status", "Domain", "File", "Type", "Size", "Time"
    );
    output.push_str(&"-".repeat(95));
    output.push('\n');

    for log in logs {
        output.push_str(&format!(
            "{:<7} {:<6} {:<24} {:<24} {:<10} {:>10} {:>8}\n",
            log.method,
            log.status,
            truncate(&log.domain, 24),
            truncate(&log.file, 24),
            truncate(&log.kind, 10),
            log.size,
            log.time
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SimpleStore;
    use crate::store::diff::compare;
    use indexmap::IndexMap;

    fn snapshot(id: &str, ts: i64, pairs: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            id: id.into(),
            timestamp: ts,
            local_storage: pairs.iter().map(|(k, v)| (k.to_string(), Some(v.to_string()))).collect(),
            session_storage: SimpleStore::new(),
            indexed_db: IndexMap::new(),
        }
    }

    #[test]
    fn empty_history_points_at_snapshot_command() {
        assert!(render_history(&[]).contains("storagelens snapshot"));
    }

    #[test]
    fn diff_marks_each_status() {
        let previous = snapshot("p", 1_000, &[("a", "1"), ("b", "2")]);
        let current = snapshot("c", 2_000, &[("b", "3"), ("c", "4")]);
        let output = render_diff(&compare(Some(&previous), &current), None, false);

        assert!(output.contains("[-] a"));
        assert!(output.contains("[~] b"));
        assert!(output.contains("[+] c"));
        assert!(output.contains("sessionStorage (0):\n  No changes detected."));
    }

    #[test]
    fn diff_category_filter_hides_other_sections() {
        let current = snapshot("c", 2_000, &[("k", "v")]);
        let output = render_diff(&compare(None, &current), Some(Category::Session), false);
        assert!(output.contains("From: (initial)"));
        assert!(!output.contains("localStorage"));
        assert!(output.contains("sessionStorage"));
    }

    #[test]
    fn diff_values_are_pretty_printed() {
        let previous = snapshot("p", 1, &[("cfg", "{\"a\":1}")]);
        let current = snapshot("c", 2, &[("cfg", "{\"a\":2}")]);
        let output = render_diff(&compare(Some(&previous), &current), None, true);
        assert!(output.contains("old: {"));
        assert!(output.contains("\"a\": 2"));
    }
}
