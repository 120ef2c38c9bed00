// ABOUTME: Workbook file access - calamine for typed reads, umya-spreadsheet for edits
// ABOUTME: Everything that touches an .xlsx file on disk goes through this module

pub mod book;
pub mod reader;
pub mod target;
pub mod writer;

use anyhow::Result;
use std::path::Path;

use crate::snapshot::Snapshot;

pub use reader::{read_first_snapshot, read_snapshot, sheet_names};
pub use target::{apply_to_workbook, WorksheetTarget};
pub use writer::{read_annotated_sheet, write_annotated_sheet, write_wip_workbook, BASELINE_SHEET};

/// Load a sheet with its column widths attached.
pub fn read_snapshot_with_widths(path: &Path, sheet_name: &str) -> Result<Snapshot> {
    let snapshot = read_snapshot(path, sheet_name)?;
    let workbook = book::open(path)?;
    let widths = book::column_widths(book::sheet(&workbook, sheet_name)?, snapshot.width());
    Ok(snapshot.with_column_widths(widths))
}
