// ABOUTME: Change-set materializer - renders a positional diff as an annotated sheet
// ABOUTME: Marks added/removed rows and modified cells with distinct font colours

use serde::Serialize;
use std::collections::BTreeSet;

use crate::diff::RowDelta;
use crate::snapshot::{CellValue, Snapshot};

/// Grey fill applied to the header row.
pub const HEADER_FILL_ARGB: &str = "FFD3D3D3";

/// Semantic mark on one annotated cell, rendered as a font colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellMark {
    Added,
    Removed,
    Modified,
}

impl CellMark {
    pub fn argb(self) -> &'static str {
        match self {
            CellMark::Added => "FF0000FF",
            CellMark::Removed => "FFFF0000",
            CellMark::Modified => "FF7030A0",
        }
    }

    /// Map a font colour back to its mark. Accepts `RRGGBB` or `AARRGGBB`.
    pub fn from_argb(argb: &str) -> Option<Self> {
        let argb = argb.trim().to_uppercase();
        let rgb = if argb.len() == 8 { &argb[2..] } else { argb.as_str() };
        [CellMark::Added, CellMark::Removed, CellMark::Modified]
            .into_iter()
            .find(|mark| &mark.argb()[2..] == rgb)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedCell {
    pub value: CellValue,
    pub mark: Option<CellMark>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRow {
    pub cells: Vec<AnnotatedCell>,
}

/// Layout and naming for the annotated sheet.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    pub sheet_name: String,
    /// Columns that get `fixed_width` instead of the source width
    pub fixed_width_columns: Vec<String>,
    pub fixed_width: f64,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            sheet_name: "changes".to_string(),
            fixed_width_columns: vec!["Start".to_string(), "Finish".to_string()],
            fixed_width: 17.0,
        }
    }
}

/// A human-reviewable rendering of a change set.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedSheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<AnnotatedRow>,
    /// Width per column; `None` leaves the sheet default
    pub widths: Vec<Option<f64>>,
    pub freeze_top_row: bool,
}

/// Kind of row recovered from an annotated sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveredKind {
    Inserted,
    Deleted,
    Modified,
}

/// A row re-derived from the marks of an annotated sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveredRow {
    pub kind: RecoveredKind,
    pub columns: BTreeSet<String>,
}

/// Build the annotated sheet for a positional diff.
///
/// Inserted and modified rows are copied from `current`, deleted rows from
/// `baseline`. Inserted and deleted rows mark every cell; modified rows mark
/// only the changed columns.
pub fn materialize(
    current: &Snapshot,
    deltas: &[RowDelta],
    options: &MaterializeOptions,
) -> AnnotatedSheet {
    let width = current.width();
    let mut rows = Vec::with_capacity(deltas.len());

    for delta in deltas {
        let row = match delta {
            RowDelta::Inserted { values, .. } => whole_row(values, width, CellMark::Added),
            RowDelta::Deleted { values, .. } => whole_row(values, width, CellMark::Removed),
            RowDelta::Modified(change) => {
                let cells = current
                    .columns()
                    .iter()
                    .enumerate()
                    .map(|(col, name)| {
                        let label = if name.is_empty() {
                            format!("#{}", col + 1)
                        } else {
                            name.clone()
                        };
                        AnnotatedCell {
                            value: current.value(change.key, col).clone(),
                            mark: change
                                .changed_fields
                                .contains_key(&label)
                                .then_some(CellMark::Modified),
                        }
                    })
                    .collect();
                AnnotatedRow { cells }
            }
        };
        rows.push(row);
    }

    let widths = current
        .columns()
        .iter()
        .enumerate()
        .map(|(col, name)| {
            if options.fixed_width_columns.iter().any(|c| c == name) {
                Some(options.fixed_width)
            } else {
                current.column_width(col)
            }
        })
        .collect();

    AnnotatedSheet {
        name: options.sheet_name.clone(),
        header: current.columns().to_vec(),
        rows,
        widths,
        freeze_top_row: true,
    }
}

fn whole_row(values: &[CellValue], width: usize, mark: CellMark) -> AnnotatedRow {
    let mut values = values.to_vec();
    values.resize(width.max(values.len()), CellValue::Empty);
    AnnotatedRow {
        cells: values
            .into_iter()
            .map(|value| AnnotatedCell {
                value,
                mark: Some(mark),
            })
            .collect(),
    }
}

impl AnnotatedSheet {
    /// Re-derive the change set from the cell marks.
    ///
    /// Rows with no marks are dropped.
    pub fn recover_changes(&self) -> Vec<RecoveredRow> {
        self.rows
            .iter()
            .filter_map(|row| {
                let marks: Vec<(usize, CellMark)> = row
                    .cells
                    .iter()
                    .enumerate()
                    .filter_map(|(col, cell)| cell.mark.map(|m| (col, m)))
                    .collect();
                let kind = match marks.first()?.1 {
                    CellMark::Added => RecoveredKind::Inserted,
                    CellMark::Removed => RecoveredKind::Deleted,
                    CellMark::Modified => RecoveredKind::Modified,
                };
                let columns = marks
                    .iter()
                    .map(|(col, _)| match self.header.get(*col) {
                        Some(name) if !name.is_empty() => name.clone(),
                        _ => format!("#{}", col + 1),
                    })
                    .collect();
                Some(RecoveredRow { kind, columns })
            })
            .collect()
    }
}

/// What a positional diff should recover to, for comparison with `recover_changes`.
pub fn expected_recovery(current: &Snapshot, deltas: &[RowDelta]) -> Vec<RecoveredRow> {
    let all_columns = || -> BTreeSet<String> {
        current
            .columns()
            .iter()
            .enumerate()
            .map(|(col, name)| {
                if name.is_empty() {
                    format!("#{}", col + 1)
                } else {
                    name.clone()
                }
            })
            .collect()
    };
    deltas
        .iter()
        .map(|delta| match delta {
            RowDelta::Inserted { .. } => RecoveredRow {
                kind: RecoveredKind::Inserted,
                columns: all_columns(),
            },
            RowDelta::Deleted { .. } => RecoveredRow {
                kind: RecoveredKind::Deleted,
                columns: all_columns(),
            },
            RowDelta::Modified(change) => RecoveredRow {
                kind: RecoveredKind::Modified,
                columns: change.changed_fields.keys().cloned().collect(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_positional;

    fn snapshot(name: &str, rows: Vec<Vec<&str>>) -> Snapshot {
        Snapshot::new(
            name,
            vec!["Primary".into(), "Start".into(), "Status".into()],
            rows.into_iter()
                .map(|r| r.into_iter().map(CellValue::from).collect())
                .collect(),
        )
        .with_column_widths(vec![Some(50.0), Some(12.0), None])
    }

    #[test]
    fn test_modified_row_marks_only_changed_cells() {
        let current = snapshot("Sheet1", vec![vec!["Ship", "01-02-2025", "done"]]);
        let baseline = snapshot("original", vec![vec!["Ship", "01-02-2025", "open"]]);
        let deltas = diff_positional(&current, &baseline);

        let sheet = materialize(&current, &deltas, &MaterializeOptions::default());
        assert_eq!(sheet.rows.len(), 1);
        let marks: Vec<Option<CellMark>> = sheet.rows[0].cells.iter().map(|c| c.mark).collect();
        assert_eq!(marks, vec![None, None, Some(CellMark::Modified)]);
        assert_eq!(sheet.rows[0].cells[2].value, CellValue::text("done"));
    }

    #[test]
    fn test_inserted_and_deleted_rows_mark_every_cell() {
        let current = snapshot("Sheet1", vec![vec!["A", "x", "y"], vec!["B", "x", "y"]]);
        let baseline = snapshot("original", vec![vec!["A", "x", "y"]]);

        let added = materialize(
            &current,
            &diff_positional(&current, &baseline),
            &MaterializeOptions::default(),
        );
        assert!(added.rows[0]
            .cells
            .iter()
            .all(|c| c.mark == Some(CellMark::Added)));

        let removed = materialize(
            &baseline,
            &diff_positional(&baseline, &current),
            &MaterializeOptions::default(),
        );
        assert_eq!(removed.rows[0].cells[0].value, CellValue::text("B"));
        assert!(removed.rows[0]
            .cells
            .iter()
            .all(|c| c.mark == Some(CellMark::Removed)));
    }

    #[test]
    fn test_widths_copied_except_fixed_date_columns() {
        let current = snapshot("Sheet1", vec![]);
        let sheet = materialize(&current, &[], &MaterializeOptions::default());
        assert_eq!(sheet.widths, vec![Some(50.0), Some(17.0), None]);
        assert!(sheet.freeze_top_row);
        assert_eq!(sheet.header, vec!["Primary", "Start", "Status"]);
    }

    #[test]
    fn test_marks_round_trip_to_changed_fields() {
        let current = snapshot(
            "Sheet1",
            vec![
                vec!["A", "01-01-2025", "done"],
                vec!["B", "02-01-2025", "open"],
                vec!["C", "03-01-2025", "open"],
            ],
        );
        let baseline = snapshot(
            "original",
            vec![vec!["A", "01-05-2025", "open"], vec!["B", "02-01-2025", "open"]],
        );
        let deltas = diff_positional(&current, &baseline);
        let sheet = materialize(&current, &deltas, &MaterializeOptions::default());

        assert_eq!(sheet.recover_changes(), expected_recovery(&current, &deltas));
    }

    #[test]
    fn test_colour_mapping_is_lossless() {
        for mark in [CellMark::Added, CellMark::Removed, CellMark::Modified] {
            assert_eq!(CellMark::from_argb(mark.argb()), Some(mark));
            assert_eq!(CellMark::from_argb(&mark.argb()[2..]), Some(mark));
        }
        assert_eq!(CellMark::from_argb("FF000000"), None);
    }
}
