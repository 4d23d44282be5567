use std::fmt::Display;
use std::path::PathBuf;

use clap::Parser;
use log::debug;
use storagelens::cli::{Cli, Command};
use storagelens::config::{self, Config};
use storagelens::network::har;
use storagelens::report::{self, json, table};
use storagelens::scan;
use storagelens::snapshot::{self, Snapshot};
use storagelens::store::diff;
use storagelens::store::SnapshotStore;
use storagelens::util;

fn exit_with(message: impl Display) -> ! {
    eprintln!("{message}");
    std::process::exit(1);
}

fn open_store(config: &Config) -> SnapshotStore {
    config
        .open_store()
        .unwrap_or_else(|e| exit_with(format!("Error opening snapshot database: {e}")))
}

fn load_history(store: &SnapshotStore) -> Vec<Snapshot> {
    store
        .get_all()
        .unwrap_or_else(|e| exit_with(format!("Error loading snapshots: {e}")))
}

/// The snapshot named by `id`, or the newest one.
fn select_snapshot(store: &SnapshotStore, id: Option<&str>) -> Snapshot {
    let result = match id {
        Some(id) => store.get(id),
        None => store.latest(),
    };

    match result {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => match id {
            Some(id) => exit_with(format!("Snapshot {id} not found")),
            None => exit_with("No snapshots found. Run 'storagelens snapshot' to create one."),
        },
        Err(e) => exit_with(format!("Error loading snapshot: {e}")),
    }
}

fn print_capture_summary(snapshot: &Snapshot) {
    println!(
        "snapshot: {} ({})",
        snapshot.id,
        util::format_timestamp_ms(snapshot.timestamp)
    );
    println!(
        "  localStorage: {} keys, sessionStorage: {} keys, indexedDB: {} databases",
        snapshot.local_storage.len(),
        snapshot.session_storage.len(),
        snapshot.indexed_db.len()
    );
    for name in snapshot.failed_databases() {
        println!("  [error] {name}: could not be read");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = Config::load(&cli.global).unwrap_or_else(|e| exit_with(e));

    match cli.command {
        Command::Snapshot(args) => {
            let config = config.with_profile(args.profile.as_ref()).with_json(args.json);
            let source = config.profile_source().unwrap_or_else(|| {
                exit_with("No profile directory. Pass --profile or set 'profile' in config.toml.")
            });
            let mut store = open_store(&config);

            match snapshot::capture(&source, &mut store).await {
                Ok(snapshot) => {
                    if config.json_output {
                        println!("{}", json::render(&snapshot));
                    } else {
                        print_capture_summary(&snapshot);
                    }
                }
                Err(e) => {
                    eprintln!("warning: {e}");
                    let snapshot = e.into_snapshot();
                    if config.json_output {
                        println!("{}", json::render(&snapshot));
                    } else {
                        print_capture_summary(&snapshot);
                    }
                    std::process::exit(1);
                }
            }
        }
        Command::History(args) => {
            let config = config.with_json(args.json);
            let store = open_store(&config);
            let mut snapshots = load_history(&store);

            if let Some(since) = &args.since {
                let age = config::parse_since(since).unwrap_or_else(|e| exit_with(e));
                let cutoff = chrono::Utc::now().timestamp_millis()
                    - i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
                snapshots.retain(|s| s.timestamp >= cutoff);
                debug!("{} snapshots newer than {since}", snapshots.len());
            }

            if config.json_output {
                println!("{}", json::render(&snapshots));
            } else {
                print!("{}", table::render_history(&snapshots));
            }
        }
        Command::Diff(args) => {
            let config = config.with_json(args.json);
            let store = open_store(&config);

            // always re-read history so the newest captures are visible
            let snapshots = load_history(&store);
            if snapshots.is_empty() {
                exit_with("No snapshots found. Run 'storagelens snapshot' to create one.");
            }

            let to_index = match &args.to {
                Some(id) => snapshots
                    .iter()
                    .position(|s| &s.id == id)
                    .unwrap_or_else(|| exit_with(format!("Snapshot {id} not found"))),
                None => 0,
            };

            let previous = match &args.from {
                Some(id) => Some(
                    snapshots
                        .iter()
                        .find(|s| &s.id == id)
                        .unwrap_or_else(|| exit_with(format!("Snapshot {id} not found"))),
                ),
                // history is newest first, so the one before `to` is next in the list
                None => snapshots.get(to_index + 1),
            };

            let result = diff::compare(previous, &snapshots[to_index]);

            if config.json_output {
                println!("{}", json::render(&result));
            } else {
                print!("{}", table::render_diff(&result, args.category, args.values));
            }
        }
        Command::Show(args) => {
            let config = config.with_json(args.json);
            let store = open_store(&config);
            let snapshot = select_snapshot(&store, args.id.as_deref());

            if config.json_output {
                println!("{}", json::render(&snapshot));
            } else {
                print!("{}", table::render_snapshot(&snapshot));
            }
        }
        Command::Export(args) => {
            let store = open_store(&config);
            let snapshot = select_snapshot(&store, args.id.as_deref());
            let dir = args.out.unwrap_or_else(|| PathBuf::from("."));

            match json::export(&snapshot, &dir) {
                Ok(path) => println!("exported {} to {}", snapshot.id, path.display()),
                Err(e) => exit_with(format!("Error exporting snapshot {}: {e}", snapshot.id)),
            }
        }
        Command::Inspect(args) => {
            let config = config.with_profile(args.profile.as_ref()).with_json(args.json);
            let source = config.profile_source().unwrap_or_else(|| {
                exit_with("No profile directory. Pass --profile or set 'profile' in config.toml.")
            });

            let result = scan::run(&source).await;
            report::print_scan(&result, args.category, &config);
        }
        Command::Network(args) => {
            let config = config.with_json(args.json);
            let content = std::fs::read_to_string(&args.har)
                .unwrap_or_else(|e| exit_with(format!("Error reading {}: {e}", args.har.display())));
            let logs = har::parse(&content).unwrap_or_else(|e| exit_with(e));

            if config.json_output {
                println!("{}", json::render(&logs));
            } else {
                print!("{}", table::render_network(&logs));
            }
        }
    }
}
