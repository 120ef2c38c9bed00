// ABOUTME: Change application against a real workbook sheet
// ABOUTME: Adapts a umya worksheet to TargetSheet and writes the _with_updates copy

use anyhow::{anyhow, Result};
use std::path::Path;
use umya_spreadsheet::Worksheet;

use super::book;
use crate::apply::{ApplyStats, ChangeApplier, TargetSheet};
use crate::diff::ChangeRecord;
use crate::snapshot::CellValue;

/// A worksheet being updated in place.
pub struct WorksheetTarget<'a> {
    sheet: &'a mut Worksheet,
}

impl<'a> WorksheetTarget<'a> {
    pub fn new(sheet: &'a mut Worksheet) -> Self {
        Self { sheet }
    }
}

impl TargetSheet for WorksheetTarget<'_> {
    fn row_count(&self) -> u32 {
        self.sheet.get_highest_row()
    }

    fn header(&self) -> Vec<String> {
        (1..=self.sheet.get_highest_column())
            .map(|col| book::read_cell(self.sheet, col, 1).to_string())
            .collect()
    }

    fn value(&self, row: u32, column: usize) -> CellValue {
        book::read_cell(self.sheet, column as u32 + 1, row)
    }

    fn write_value(&mut self, row: u32, column: usize, value: &CellValue) {
        book::write_cell(self.sheet, column as u32 + 1, row, value);
    }

    fn highlight(&mut self, row: u32, column: usize, argb: &str) {
        book::set_font_argb(self.sheet, column as u32 + 1, row, argb);
    }

    fn append_column(&mut self, header: &str) -> usize {
        let col = self.sheet.get_highest_column() + 1;
        book::write_cell(self.sheet, col, 1, &CellValue::text(header));
        col as usize - 1
    }
}

/// Apply `changes` to the first sheet of the workbook at `plan` and save the
/// result to `output`. The plan file itself is not modified.
pub fn apply_to_workbook(
    plan: &Path,
    output: &Path,
    changes: &[ChangeRecord],
    applier: &ChangeApplier,
) -> Result<ApplyStats> {
    let mut workbook = book::open(plan)?;
    let sheet = workbook
        .get_sheet_mut(&0)
        .ok_or_else(|| anyhow!("Workbook {} has no sheets", plan.display()))?;

    tracing::info!(
        "Applying {} change record(s) to sheet '{}'",
        changes.len(),
        sheet.get_name()
    );
    let stats = applier.apply(&mut WorksheetTarget::new(sheet), changes);

    book::save(&workbook, output)?;
    tracing::info!(
        "Applied {} field(s) across {} row(s); saved {}",
        stats.fields_applied,
        stats.rows_updated,
        output.display()
    );
    Ok(stats)
}
