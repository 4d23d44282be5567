//! Browser storage inspection with a snapshot time machine.
//!
//! Storage is read through the traits in [`scan::reader`]. [`snapshot::capture`]
//! records one snapshot into a [`store::SnapshotStore`], and
//! [`store::diff`] compares any two of them key by key.

pub mod cli;
pub mod config;
pub mod error;
pub mod network;
pub mod platform;
pub mod report;
pub mod scan;
pub mod snapshot;
pub mod store;
pub mod util;
