// ABOUTME: Workbook editing helpers over umya-spreadsheet
// ABOUTME: Loading, saving, cell value conversion, and shared cell styling

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::path::Path;
use umya_spreadsheet::{
    Coordinate, HorizontalAlignmentValues, Pane, PaneStateValues, PaneValues, SheetView,
    Spreadsheet, VerticalAlignmentValues, Worksheet,
};

use crate::snapshot::CellValue;

pub fn open(path: &Path) -> Result<Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))
}

pub fn save(book: &Spreadsheet, path: &Path) -> Result<()> {
    umya_spreadsheet::writer::xlsx::write(book, path)
        .with_context(|| format!("Failed to write workbook {}", path.display()))
}

pub fn sheet<'a>(book: &'a Spreadsheet, name: &str) -> Result<&'a Worksheet> {
    book.get_sheet_by_name(name)
        .ok_or_else(|| anyhow!("Required sheet '{}' not found", name))
}

pub fn sheet_mut<'a>(book: &'a mut Spreadsheet, name: &str) -> Result<&'a mut Worksheet> {
    book.get_sheet_by_name_mut(name)
        .ok_or_else(|| anyhow!("Required sheet '{}' not found", name))
}

/// Column widths for the first `count` columns; `None` where unset.
pub fn column_widths(sheet: &Worksheet, count: usize) -> Vec<Option<f64>> {
    (1..=count as u32)
        .map(|col| {
            sheet
                .get_column_dimension_by_number(&col)
                .map(|c| *c.get_width())
                .filter(|w| *w > 0.0)
        })
        .collect()
}

fn excel_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Excel serial day number for a date-time.
pub fn to_serial(date: NaiveDateTime) -> f64 {
    (date - excel_epoch()).num_seconds() as f64 / 86_400.0
}

/// Write a value into a 1-based (column, row) cell.
pub fn write_cell(sheet: &mut Worksheet, col: u32, row: u32, value: &CellValue) {
    let cell = sheet.get_cell_mut((col, row));
    match value {
        CellValue::Empty => {
            cell.set_value_string(String::new());
        }
        CellValue::Text(s) => {
            cell.set_value_string(s.clone());
        }
        CellValue::Number(n) => {
            cell.set_value_number(*n);
        }
        CellValue::Bool(b) => {
            cell.set_value_bool(*b);
        }
        CellValue::Date(d) => {
            cell.set_value_number(to_serial(*d));
            let format = if d.time().num_seconds_from_midnight() == 0 {
                "mm/dd/yyyy"
            } else {
                "mm/dd/yyyy hh:mm"
            };
            cell.get_style_mut()
                .get_number_format_mut()
                .set_format_code(format);
        }
    }
}

/// Read a 1-based (column, row) cell back as a value.
pub fn read_cell(sheet: &Worksheet, col: u32, row: u32) -> CellValue {
    let Some(cell) = sheet.get_cell((col, row)) else {
        return CellValue::Empty;
    };
    let text = cell.get_value().to_string();
    if text.is_empty() {
        return CellValue::Empty;
    }
    match cell.get_data_type() {
        "n" => text
            .parse::<f64>()
            .map(CellValue::Number)
            .unwrap_or(CellValue::Text(text)),
        "b" => CellValue::Bool(text.eq_ignore_ascii_case("true") || text == "1"),
        _ => CellValue::Text(text),
    }
}

/// Font colour of a cell, as stored (usually `AARRGGBB`).
pub fn font_argb(sheet: &Worksheet, col: u32, row: u32) -> Option<String> {
    let font = sheet.get_cell((col, row))?.get_style().get_font()?;
    let argb = font.get_color().get_argb();
    (!argb.is_empty()).then(|| argb.to_string())
}

pub fn set_font_argb(sheet: &mut Worksheet, col: u32, row: u32, argb: &str) {
    sheet
        .get_cell_mut((col, row))
        .get_style_mut()
        .get_font_mut()
        .get_color_mut()
        .set_argb(argb);
}

/// Top/left aligned, wrapped text; optionally a named font and size.
pub fn set_body_style(sheet: &mut Worksheet, col: u32, row: u32, font: Option<(&str, f64)>) {
    let style = sheet.get_cell_mut((col, row)).get_style_mut();
    let alignment = style.get_alignment_mut();
    alignment.set_horizontal(HorizontalAlignmentValues::Left);
    alignment.set_vertical(VerticalAlignmentValues::Top);
    alignment.set_wrap_text(true);
    if let Some((name, size)) = font {
        let f = style.get_font_mut();
        f.set_name(name);
        f.set_size(size);
    }
}

pub fn set_header_style(sheet: &mut Worksheet, col: u32, fill_argb: &str) {
    let style = sheet.get_cell_mut((col, 1)).get_style_mut();
    style.set_background_color(fill_argb);
    style.get_font_mut().set_bold(true);
}

pub fn set_widths(sheet: &mut Worksheet, widths: &[Option<f64>]) {
    for (idx, width) in widths.iter().enumerate() {
        if let Some(width) = width {
            sheet
                .get_column_dimension_by_number_mut(&(idx as u32 + 1))
                .set_width(*width);
        }
    }
}

pub fn hide_column(sheet: &mut Worksheet, col: u32) {
    sheet.get_column_dimension_by_number_mut(&col).set_hidden(true);
}

/// Freeze row 1 so it stays visible while scrolling.
pub fn freeze_top_row(sheet: &mut Worksheet) {
    let mut top_left = Coordinate::default();
    top_left.set_coordinate("A2");

    let mut pane = Pane::default();
    pane.set_vertical_split(1.0);
    pane.set_top_left_cell(top_left);
    pane.set_active_pane(PaneValues::BottomLeft);
    pane.set_state(PaneStateValues::Frozen);

    let views = sheet.get_sheet_views_mut();
    if views.get_sheet_view_list().is_empty() {
        views.add_sheet_view_list_mut(SheetView::default());
    }
    for view in views.get_sheet_view_list_mut().iter_mut() {
        view.set_pane(pane.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_dates() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(to_serial(d), 45658.5);
    }

    #[test]
    fn test_write_then_read_cell() {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        write_cell(sheet, 1, 1, &CellValue::text("Status"));
        write_cell(sheet, 2, 1, &CellValue::Number(7.0));
        set_font_argb(sheet, 1, 1, "FFC00000");

        assert_eq!(read_cell(sheet, 1, 1), CellValue::text("Status"));
        assert_eq!(read_cell(sheet, 2, 1), CellValue::Number(7.0));
        assert_eq!(read_cell(sheet, 3, 1), CellValue::Empty);
        assert_eq!(font_argb(sheet, 1, 1).as_deref(), Some("FFC00000"));
    }

    #[test]
    fn test_freeze_top_row_sets_pane_on_every_view() {
        let mut book = umya_spreadsheet::new_file();
        let sheet = book.get_sheet_mut(&0).unwrap();
        freeze_top_row(sheet);
        freeze_top_row(sheet);

        let views = sheet.get_sheets_views().get_sheet_view_list();
        assert!(!views.is_empty());
        assert!(views.iter().all(|view| view.get_pane().is_some()));
    }
}
