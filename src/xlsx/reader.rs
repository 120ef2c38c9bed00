// ABOUTME: Typed sheet reading via calamine
// ABOUTME: Converts a worksheet range into a Snapshot, preserving dates as date values

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDateTime;
use std::path::Path;

use crate::snapshot::{CellValue, Snapshot};

/// Names of all sheets in the workbook, in tab order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    let workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    Ok(workbook.sheet_names())
}

/// Load one named sheet. A missing sheet is a schema error.
pub fn read_snapshot(path: &Path, sheet_name: &str) -> Result<Snapshot> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;

    let names = workbook.sheet_names();
    if !names.iter().any(|n| n == sheet_name) {
        bail!(
            "Required sheet '{}' not found in {} (sheets: {})",
            sheet_name,
            path.display(),
            names.join(", ")
        );
    }

    let range = workbook
        .worksheet_range(sheet_name)
        .with_context(|| format!("Failed to read sheet '{}' from {}", sheet_name, path.display()))?;

    let snapshot = Snapshot::from_grid(sheet_name, grid_from_range(&range));
    tracing::debug!(
        "Read sheet '{}' from {}: {} columns, {} rows",
        sheet_name,
        path.display(),
        snapshot.width(),
        snapshot.len()
    );
    Ok(snapshot)
}

/// Load the first sheet of the workbook.
pub fn read_first_snapshot(path: &Path) -> Result<Snapshot> {
    let names = sheet_names(path)?;
    let Some(first) = names.first() else {
        bail!("Workbook {} has no sheets", path.display());
    };
    read_snapshot(path, first)
}

/// Expand a used range into a grid anchored at A1.
fn grid_from_range(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut grid: Vec<Vec<CellValue>> = (0..start_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut values = vec![CellValue::Empty; start_col as usize];
        values.extend(row.iter().map(to_cell_value));
        grid.push(values);
    }
    grid
}

fn to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => CellValue::Date(d),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => parse_iso(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_cell_value() {
        assert_eq!(to_cell_value(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(to_cell_value(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(to_cell_value(&Data::String("x".into())), CellValue::text("x"));
        assert_eq!(to_cell_value(&Data::Bool(true)), CellValue::Bool(true));
    }

    #[test]
    fn test_parse_iso() {
        let d = parse_iso("2025-03-04").unwrap();
        assert_eq!(d.format("%m/%d/%Y").to_string(), "03/04/2025");
        assert!(parse_iso("2025-03-04T10:30:00").is_some());
        assert!(parse_iso("nope").is_none());
    }
}
