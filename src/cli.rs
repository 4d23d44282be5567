use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::scan::Category;

#[derive(Parser)]
#[command(name = "storagelens")]
#[command(about = "Inspect browser storage and diff snapshots over time")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Snapshot database location (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Capture the profile's storage and save it as a snapshot
    Snapshot(SnapshotArgs),

    /// List saved snapshots, newest first
    History(HistoryArgs),

    /// Compare two snapshots
    Diff(DiffArgs),

    /// Display the most recent snapshot or a specific one
    Show(ShowArgs),

    /// Write a snapshot to snapshot-<timestamp>.json
    Export(ExportArgs),

    /// List the profile's current storage records
    Inspect(InspectArgs),

    /// List network requests recorded in a HAR file
    Network(NetworkArgs),
}

#[derive(Parser)]
pub struct SnapshotArgs {
    /// Exported profile directory to read
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Output as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct HistoryArgs {
    /// Only snapshots newer than this age ("30m", "7d", "2w")
    #[arg(long)]
    pub since: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Older snapshot ID (defaults to the one before --to)
    #[arg(long)]
    pub from: Option<String>,

    /// Newer snapshot ID (defaults to the most recent)
    #[arg(long)]
    pub to: Option<String>,

    /// Only show one category (local, session, indexeddb)
    #[arg(long, value_parser = parse_diff_category)]
    pub category: Option<Category>,

    /// Print full before/after values
    #[arg(long, default_value_t = false)]
    pub values: bool,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Snapshot ID (defaults to the most recent)
    #[arg(long)]
    pub id: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ExportArgs {
    /// Snapshot ID (defaults to the most recent)
    #[arg(long)]
    pub id: Option<String>,

    /// Directory to write into (defaults to the current directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Parser)]
pub struct InspectArgs {
    /// Exported profile directory to read
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Only list one category (local, session, cookies, indexeddb)
    #[arg(long)]
    pub category: Option<Category>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct NetworkArgs {
    /// HAR file to read
    #[arg(long)]
    pub har: PathBuf,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

/// Snapshots hold no cookies, so a diff cannot be narrowed to them.
fn parse_diff_category(s: &str) -> Result<Category, String> {
    match s.parse::<Category>()? {
        Category::Cookies => Err("cookies are not part of snapshots (expected local, session, indexeddb)".to_string()),
        category => Ok(category),
    }
}
