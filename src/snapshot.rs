// ABOUTME: Tabular snapshot model - an immutable grid of named columns and rows
// ABOUTME: Loaded once from a sheet; all downstream components read from it

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single scalar cell value.
///
/// Equality is exact: a date stored as text and the same date stored as a date
/// value are different values, and `Number(5.0)` differs from `Text("5")`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDateTime),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for empty cells and for text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Interpret the value as a 1-based row key.
    ///
    /// Accepts positive integral numbers and text holding a positive integer.
    pub fn as_row_key(&self) -> Option<u32> {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && *n >= 1.0 && *n <= u32::MAX as f64 => {
                Some(*n as u32)
            }
            CellValue::Text(s) => s.trim().parse::<u32>().ok().filter(|k| *k >= 1),
            _ => None,
        }
    }

    /// Lower-cased, trimmed text form used by row predicates.
    pub fn normalized(&self) -> String {
        self.to_string().trim().to_lowercase()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

/// An in-memory grid loaded from one sheet.
///
/// Row 1 of the sheet becomes `columns`; every later sheet row becomes one
/// record. Records are padded so each has exactly `columns.len()` values.
/// Data row positions are 1-based and exclude the header, so data row `n`
/// lives on physical sheet row `n + 1`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    name: String,
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<CellValue>>,
    widths: Vec<Option<f64>>,
}

impl Snapshot {
    /// Build a snapshot from a raw grid whose first row is the header.
    pub fn from_grid(name: impl Into<String>, grid: Vec<Vec<CellValue>>) -> Self {
        let mut grid = grid.into_iter();
        let header = grid.next().unwrap_or_default();
        let columns = header
            .iter()
            .map(|v| v.to_string().trim().to_string())
            .collect();
        Self::new(name, columns, grid.collect())
    }

    /// Build a snapshot from explicit column names and data rows.
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(columns.len()))
            .max()
            .unwrap_or(0);

        let mut columns = columns;
        columns.resize(width, String::new());

        // Repeated names: the last occurrence wins
        let mut index = HashMap::new();
        for (i, name) in columns.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            if index.insert(name.clone(), i).is_some() {
                tracing::debug!("Column '{}' repeats in header; using column {}", name, i + 1);
            }
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            index,
            rows,
            widths: Vec::new(),
        }
    }

    /// Attach per-column widths (in character units) read from the source sheet.
    pub fn with_column_widths(mut self, widths: Vec<Option<f64>>) -> Self {
        self.widths = widths;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zero-based index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Zero-based index of a named column, matching case-insensitively.
    pub fn column_index_ignore_case(&self, name: &str) -> Option<usize> {
        self.column_index(name).or_else(|| {
            let wanted = name.to_lowercase();
            self.columns
                .iter()
                .rposition(|c| !c.is_empty() && c.to_lowercase() == wanted)
        })
    }

    /// Like `column_index`, but a missing column is a schema error.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        match self.column_index(name) {
            Some(i) => Ok(i),
            None => bail!(
                "Required column '{}' not found in sheet '{}' (columns: {})",
                name,
                self.name,
                self.columns.join(", ")
            ),
        }
    }

    /// Data row by 1-based position.
    pub fn row(&self, position: u32) -> Option<&[CellValue]> {
        let idx = (position as usize).checked_sub(1)?;
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Value at a 1-based data row and zero-based column. Missing cells read as empty.
    pub fn value(&self, position: u32, column: usize) -> &CellValue {
        const EMPTY: &CellValue = &CellValue::Empty;
        self.row(position)
            .and_then(|r| r.get(column))
            .unwrap_or(EMPTY)
    }

    pub fn column_width(&self, column: usize) -> Option<f64> {
        self.widths.get(column).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn grid() -> Vec<Vec<CellValue>> {
        vec![
            vec!["Primary".into(), "Status".into(), "key".into()],
            vec!["Kickoff".into(), "done".into(), CellValue::Number(1.0)],
            vec!["Launch".into()],
        ]
    }

    #[test]
    fn test_from_grid_uses_first_row_as_header() {
        let snap = Snapshot::from_grid("Sheet1", grid());
        assert_eq!(snap.columns(), &["Primary", "Status", "key"]);
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.column_index("Status"), Some(1));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let snap = Snapshot::from_grid("Sheet1", grid());
        assert_eq!(snap.row(2).unwrap().len(), 3);
        assert_eq!(snap.value(2, 2), &CellValue::Empty);
        assert_eq!(snap.value(99, 0), &CellValue::Empty);
        assert!(snap.row(0).is_none());
    }

    #[test]
    fn test_repeated_header_last_occurrence_wins() {
        let snap = Snapshot::new(
            "Sheet1",
            vec!["Start".into(), "Owner".into(), "Start".into()],
            vec![],
        );
        assert_eq!(snap.column_index("Start"), Some(2));
    }

    #[test]
    fn test_require_column_reports_schema_error() {
        let snap = Snapshot::from_grid("Sheet1", grid());
        let err = snap.require_column("Owner").unwrap_err();
        assert!(err.to_string().contains("Required column 'Owner'"));
    }

    #[test]
    fn test_column_index_ignore_case() {
        let snap = Snapshot::from_grid("Sheet1", grid());
        assert_eq!(snap.column_index_ignore_case("status"), Some(1));
        assert_eq!(snap.column_index_ignore_case("missing"), None);
    }

    #[test]
    fn test_exact_equality_has_no_coercion() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_ne!(CellValue::Date(date), CellValue::text("03-04-2025"));
        assert_ne!(CellValue::Number(5.0), CellValue::text("5"));
        assert_eq!(CellValue::Empty, CellValue::Empty);
    }

    #[test]
    fn test_row_key_parsing() {
        assert_eq!(CellValue::Number(12.0).as_row_key(), Some(12));
        assert_eq!(CellValue::text(" 7 ").as_row_key(), Some(7));
        assert_eq!(CellValue::Number(1.5).as_row_key(), None);
        assert_eq!(CellValue::Number(0.0).as_row_key(), None);
        assert_eq!(CellValue::Empty.as_row_key(), None);
    }

    #[test]
    fn test_display_formats_integral_numbers_without_fraction() {
        assert_eq!(CellValue::Number(42.0).to_string(), "42");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Empty.to_string(), "");
    }

    #[test]
    fn test_is_blank() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::text("   ").is_blank());
        assert!(!CellValue::text("x").is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
