// ABOUTME: Writes annotated change sheets and WIP report workbooks
// ABOUTME: Also reads annotated sheets back so their marks can be checked

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use umya_spreadsheet::Worksheet;

use super::book;
use crate::materialize::{AnnotatedCell, AnnotatedRow, AnnotatedSheet, CellMark, HEADER_FILL_ARGB};
use crate::snapshot::{CellValue, Snapshot};
use crate::wip::WipReport;

/// Name of the hidden baseline tab in a WIP workbook.
pub const BASELINE_SHEET: &str = "original";

const REPORT_FONT: (&str, f64) = ("Calibri", 11.0);

/// Add `annotated` to the workbook at `path`, replacing any sheet of the same
/// name, and save the workbook back to `path`. Other sheets are kept.
pub fn write_annotated_sheet(path: &Path, annotated: &AnnotatedSheet) -> Result<()> {
    let mut workbook = book::open(path)?;

    if workbook.get_sheet_by_name(&annotated.name).is_some() {
        tracing::info!("Replacing existing '{}' sheet", annotated.name);
        workbook
            .remove_sheet_by_name(&annotated.name)
            .map_err(|e| anyhow!("Failed to remove sheet '{}': {}", annotated.name, e))?;
    }
    let sheet = workbook
        .new_sheet(annotated.name.clone())
        .map_err(|e| anyhow!("Failed to create sheet '{}': {}", annotated.name, e))?;

    for (idx, name) in annotated.header.iter().enumerate() {
        let col = idx as u32 + 1;
        book::write_cell(sheet, col, 1, &CellValue::text(name.clone()));
        book::set_header_style(sheet, col, HEADER_FILL_ARGB);
        book::set_body_style(sheet, col, 1, None);
    }

    for (offset, row) in annotated.rows.iter().enumerate() {
        let row_num = offset as u32 + 2;
        for (idx, cell) in row.cells.iter().enumerate() {
            let col = idx as u32 + 1;
            book::write_cell(sheet, col, row_num, &cell.value);
            book::set_body_style(sheet, col, row_num, None);
            if let Some(mark) = cell.mark {
                book::set_font_argb(sheet, col, row_num, mark.argb());
            }
        }
    }

    book::set_widths(sheet, &annotated.widths);
    if annotated.freeze_top_row {
        book::freeze_top_row(sheet);
    }

    book::save(&workbook, path)?;
    tracing::info!(
        "Wrote {} changed row(s) to sheet '{}' in {}",
        annotated.rows.len(),
        annotated.name,
        path.display()
    );
    Ok(())
}

/// Read an annotated sheet back, recovering each cell's mark from its font colour.
pub fn read_annotated_sheet(path: &Path, sheet_name: &str) -> Result<AnnotatedSheet> {
    let workbook = book::open(path)?;
    let sheet = book::sheet(&workbook, sheet_name)?;
    let width = sheet.get_highest_column();
    let height = sheet.get_highest_row();

    let header = (1..=width)
        .map(|col| book::read_cell(sheet, col, 1).to_string())
        .collect::<Vec<_>>();
    let rows = (2..=height)
        .map(|row| AnnotatedRow {
            cells: (1..=width)
                .map(|col| AnnotatedCell {
                    value: book::read_cell(sheet, col, row),
                    mark: book::font_argb(sheet, col, row)
                        .as_deref()
                        .and_then(CellMark::from_argb),
                })
                .collect(),
        })
        .collect();

    Ok(AnnotatedSheet {
        name: sheet_name.to_string(),
        widths: book::column_widths(sheet, header.len()),
        header,
        rows,
        freeze_top_row: true,
    })
}

/// Write the WIP report as `Sheet1` plus a hidden identical `original` tab.
pub fn write_wip_workbook(path: &Path, report: &WipReport) -> Result<()> {
    let mut workbook = umya_spreadsheet::new_file();

    let first = workbook
        .get_sheet_mut(&0)
        .ok_or_else(|| anyhow!("New workbook has no sheet"))?;
    first.set_name(report.sheet.name());
    write_report_sheet(first, report);

    let baseline = workbook
        .new_sheet(BASELINE_SHEET)
        .map_err(|e| anyhow!("Failed to create sheet '{}': {}", BASELINE_SHEET, e))?;
    write_report_sheet(baseline, report);
    baseline.set_sheet_state("hidden".to_string());

    book::save(&workbook, path).context("Failed to save WIP report")?;
    tracing::info!(
        "Report created: {} ({} rows)",
        path.display(),
        report.len()
    );
    Ok(())
}

fn write_report_sheet(sheet: &mut Worksheet, report: &WipReport) {
    write_snapshot(sheet, &report.sheet);
    for col in 1..=report.sheet.width() as u32 {
        book::set_header_style(sheet, col, HEADER_FILL_ARGB);
    }
    let widths: Vec<Option<f64>> = (0..report.sheet.width())
        .map(|i| report.sheet.column_width(i))
        .collect();
    book::set_widths(sheet, &widths);
    book::hide_column(sheet, report.key_column() as u32 + 1);
    book::freeze_top_row(sheet);
}

/// Write header and rows of a snapshot from A1, with the report body style.
fn write_snapshot(sheet: &mut Worksheet, snapshot: &Snapshot) {
    for (idx, name) in snapshot.columns().iter().enumerate() {
        let col = idx as u32 + 1;
        book::write_cell(sheet, col, 1, &CellValue::text(name.clone()));
        book::set_body_style(sheet, col, 1, Some(REPORT_FONT));
    }
    for (offset, row) in snapshot.rows().iter().enumerate() {
        let row_num = offset as u32 + 2;
        for (idx, value) in row.iter().enumerate() {
            let col = idx as u32 + 1;
            book::write_cell(sheet, col, row_num, value);
            book::set_body_style(sheet, col, row_num, Some(REPORT_FONT));
        }
    }
}
