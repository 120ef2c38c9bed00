// ABOUTME: Library root for plan-replicator
// ABOUTME: Exposes snapshot, diff, materialize, apply, replicate and workbook modules

pub mod apply;
pub mod commands;
pub mod config;
pub mod diff;
pub mod materialize;
pub mod replicate;
pub mod snapshot;
pub mod utils;
pub mod wip;
pub mod xlsx;

pub use snapshot::{CellValue, Snapshot};
