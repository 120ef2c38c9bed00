// ABOUTME: Change applier - writes keyed change records onto a separate target sheet
// ABOUTME: Highlights each written cell and stamps a marker column per updated row

use serde::Serialize;

use crate::diff::ChangeRecord;
use crate::snapshot::CellValue;

/// Font colour applied to cells overwritten by the applier.
pub const APPLIED_FONT_ARGB: &str = "FFC00000";

/// Mutable access to the sheet changes are applied to.
///
/// Rows are physical sheet rows (row 1 is the header); columns are zero-based.
pub trait TargetSheet {
    /// Highest populated physical row, header included.
    fn row_count(&self) -> u32;

    /// Header names from row 1.
    fn header(&self) -> Vec<String>;

    fn value(&self, row: u32, column: usize) -> CellValue;

    fn write_value(&mut self, row: u32, column: usize, value: &CellValue);

    fn highlight(&mut self, row: u32, column: usize, argb: &str);

    /// Append a column with the given header; returns its index.
    fn append_column(&mut self, header: &str) -> usize;
}

/// How a change record's key is mapped to a target row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowMapping {
    /// Target row = key + offset. Assumes the target's row order matches the
    /// file the key was captured from.
    Positional { offset: u32 },
    /// Target row = first data row whose value in this column equals the
    /// record's anchor value.
    Anchored { column: String },
}

impl Default for RowMapping {
    fn default() -> Self {
        RowMapping::Positional { offset: 1 }
    }
}

/// Configuration for the change applier.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    pub mapping: RowMapping,
    /// Header of the column that flags updated rows
    pub marker_column: String,
    pub marker_value: String,
    pub highlight_argb: String,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self {
            mapping: RowMapping::default(),
            marker_column: "Row Updated".to_string(),
            marker_value: "X".to_string(),
            highlight_argb: APPLIED_FONT_ARGB.to_string(),
        }
    }
}

/// Statistics from applying a change list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyStats {
    pub fields_applied: usize,
    pub rows_updated: usize,
    pub rows_skipped: usize,
    pub fields_skipped: usize,
    pub warnings: Vec<String>,
}

impl ApplyStats {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Applies change records to a target sheet.
///
/// Failures are per-field warnings; a bad row or column never aborts the run.
pub struct ChangeApplier {
    config: ApplyConfig,
}

impl ChangeApplier {
    pub fn new(config: ApplyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    /// Write every changed field into its mapped target row.
    pub fn apply<T: TargetSheet>(&self, target: &mut T, changes: &[ChangeRecord]) -> ApplyStats {
        let mut stats = ApplyStats::default();
        let header = target.header();
        let mut marker_idx = find_column(&header, &self.config.marker_column);

        let anchor_idx = match &self.config.mapping {
            RowMapping::Anchored { column } => match find_column(&header, column) {
                Some(idx) => Some(idx),
                None => {
                    stats.warn(format!(
                        "Anchor column '{}' not found in target; no rows can be mapped",
                        column
                    ));
                    stats.rows_skipped = changes.len();
                    return stats;
                }
            },
            RowMapping::Positional { .. } => None,
        };

        for change in changes {
            let Some(target_row) = self.map_row(target, change, anchor_idx, &mut stats) else {
                stats.rows_skipped += 1;
                continue;
            };

            tracing::debug!("Updating target row {} (key {})", target_row, change.key);

            let mut row_touched = false;
            for (col_name, field) in &change.changed_fields {
                let Some(col_idx) = find_column(&header, col_name) else {
                    stats.warn(format!(
                        "Column '{}' not found in target file, skipping",
                        col_name
                    ));
                    stats.fields_skipped += 1;
                    continue;
                };

                let old = target.value(target_row, col_idx);
                target.write_value(target_row, col_idx, &field.new);
                target.highlight(target_row, col_idx, &self.config.highlight_argb);

                let marker = *marker_idx
                    .get_or_insert_with(|| target.append_column(&self.config.marker_column));
                target.write_value(
                    target_row,
                    marker,
                    &CellValue::text(self.config.marker_value.clone()),
                );

                tracing::debug!("  {}: '{}' -> '{}'", col_name, old, field.new);
                stats.fields_applied += 1;
                row_touched = true;
            }

            if row_touched {
                stats.rows_updated += 1;
            }
        }

        tracing::info!("Changes applied: {}", stats.fields_applied);
        stats
    }

    fn map_row<T: TargetSheet>(
        &self,
        target: &T,
        change: &ChangeRecord,
        anchor_idx: Option<usize>,
        stats: &mut ApplyStats,
    ) -> Option<u32> {
        match (&self.config.mapping, anchor_idx) {
            (RowMapping::Anchored { column }, Some(idx)) => {
                let Some(anchor) = change.anchor.as_ref().filter(|a| !a.is_blank()) else {
                    stats.warn(format!(
                        "Key {} has no '{}' anchor value, skipping",
                        change.key, column
                    ));
                    return None;
                };
                let found = (2..=target.row_count()).find(|row| &target.value(*row, idx) == anchor);
                if found.is_none() {
                    stats.warn(format!(
                        "Key {}: no target row with {} = '{}', skipping",
                        change.key, column, anchor
                    ));
                }
                found
            }
            (mapping, _) => {
                let offset = match mapping {
                    RowMapping::Positional { offset } => *offset,
                    RowMapping::Anchored { .. } => 1,
                };
                match change.key.checked_add(offset) {
                    Some(target_row) if target_row <= target.row_count() => Some(target_row),
                    target_row => {
                        stats.warn(format!(
                            "Key {} (row {}) exceeds file rows ({}), skipping",
                            change.key,
                            target_row.map_or_else(|| "out of range".to_string(), |r| r.to_string()),
                            target.row_count()
                        ));
                        None
                    }
                }
            }
        }
    }
}

fn find_column(header: &[String], name: &str) -> Option<usize> {
    header.iter().rposition(|h| !h.is_empty() && h == name)
}

/// In-memory target sheet.
#[derive(Debug, Clone, Default)]
pub struct GridSheet {
    /// Physical rows; row 1 (index 0) is the header
    pub cells: Vec<Vec<CellValue>>,
    pub highlights: Vec<(u32, usize, String)>,
}

impl GridSheet {
    pub fn new(header: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut cells = vec![header.into_iter().map(CellValue::Text).collect()];
        cells.extend(rows);
        Self {
            cells,
            highlights: Vec::new(),
        }
    }

    pub fn is_highlighted(&self, row: u32, column: usize) -> bool {
        self.highlights
            .iter()
            .any(|(r, c, _)| *r == row && *c == column)
    }
}

impl TargetSheet for GridSheet {
    fn row_count(&self) -> u32 {
        self.cells.len() as u32
    }

    fn header(&self) -> Vec<String> {
        self.cells
            .first()
            .map(|h| h.iter().map(|v| v.to_string()).collect())
            .unwrap_or_default()
    }

    fn value(&self, row: u32, column: usize) -> CellValue {
        (row as usize)
            .checked_sub(1)
            .and_then(|r| self.cells.get(r))
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or_default()
    }

    fn write_value(&mut self, row: u32, column: usize, value: &CellValue) {
        let Some(r) = (row as usize).checked_sub(1) else {
            return;
        };
        if self.cells.len() <= r {
            self.cells.resize(r + 1, Vec::new());
        }
        let cells = &mut self.cells[r];
        if cells.len() <= column {
            cells.resize(column + 1, CellValue::Empty);
        }
        cells[column] = value.clone();
    }

    fn highlight(&mut self, row: u32, column: usize, argb: &str) {
        if !self.is_highlighted(row, column) {
            self.highlights.push((row, column, argb.to_string()));
        }
    }

    fn append_column(&mut self, header: &str) -> usize {
        let idx = self.cells.iter().map(Vec::len).max().unwrap_or(0);
        self.write_value(1, idx, &CellValue::text(header));
        idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::FieldChange;
    use std::collections::BTreeMap;

    fn plan(rows: usize) -> GridSheet {
        GridSheet::new(
            vec!["Task Name".into(), "Status".into(), "Owner".into()],
            (1..=rows)
                .map(|i| {
                    vec![
                        CellValue::text(format!("Task {}", i)),
                        CellValue::text("in progress"),
                        CellValue::text("kim"),
                    ]
                })
                .collect(),
        )
    }

    fn change(key: u32, fields: &[(&str, &str, &str)]) -> ChangeRecord {
        let changed_fields: BTreeMap<String, FieldChange> = fields
            .iter()
            .map(|(col, prev, new)| {
                (
                    col.to_string(),
                    FieldChange {
                        previous: CellValue::text(*prev),
                        new: CellValue::text(*new),
                    },
                )
            })
            .collect();
        ChangeRecord {
            key,
            anchor: None,
            changed_fields,
        }
    }

    #[test]
    fn test_status_change_lands_on_key_plus_one() {
        let mut target = plan(10);
        let applier = ChangeApplier::new(ApplyConfig::default());
        let stats = applier.apply(&mut target, &[change(5, &[("Status", "in progress", "done")])]);

        assert_eq!(stats.fields_applied, 1);
        assert_eq!(target.value(6, 1), CellValue::text("done"));
        assert!(target.is_highlighted(6, 1));
        assert_eq!(target.value(1, 3), CellValue::text("Row Updated"));
        assert_eq!(target.value(6, 3), CellValue::text("X"));
        // Neighbouring rows untouched
        assert_eq!(target.value(5, 1), CellValue::text("in progress"));
        assert_eq!(target.value(7, 3), CellValue::Empty);
    }

    #[test]
    fn test_out_of_range_keys_are_skipped() {
        let mut target = plan(3); // physical rows 1..=4
        let applier = ChangeApplier::new(ApplyConfig::default());
        let changes = vec![
            change(2, &[("Status", "in progress", "done")]),
            change(3, &[("Status", "in progress", "done"), ("Owner", "kim", "lee")]),
            change(4, &[("Status", "in progress", "done")]),
            change(9, &[("Status", "in progress", "done")]),
        ];
        let stats = applier.apply(&mut target, &changes);

        assert_eq!(stats.fields_applied, 3);
        assert_eq!(stats.rows_skipped, 2);
        assert_eq!(stats.warnings.len(), 2);
        assert!(stats.warnings[0].contains("Key 4"));
    }

    #[test]
    fn test_largest_key_is_skipped_without_overflow() {
        let mut target = plan(3);
        let applier = ChangeApplier::new(ApplyConfig::default());
        let stats = applier.apply(&mut target, &[change(u32::MAX, &[("Status", "open", "done")])]);

        assert_eq!(stats.fields_applied, 0);
        assert_eq!(stats.rows_skipped, 1);
        assert!(stats.warnings[0].contains("out of range"));
    }

    #[test]
    fn test_missing_column_skips_only_that_field() {
        let mut target = plan(5);
        let applier = ChangeApplier::new(ApplyConfig::default());
        let stats = applier.apply(
            &mut target,
            &[change(
                1,
                &[("Status", "in progress", "done"), ("Status Update", "", "shipped")],
            )],
        );

        assert_eq!(stats.fields_applied, 1);
        assert_eq!(stats.fields_skipped, 1);
        assert_eq!(stats.rows_updated, 1);
        assert!(stats.warnings[0].contains("Status Update"));
        assert_eq!(target.value(2, 1), CellValue::text("done"));
    }

    #[test]
    fn test_applying_twice_is_idempotent() {
        let mut target = plan(4);
        let applier = ChangeApplier::new(ApplyConfig::default());
        let changes = vec![change(2, &[("Owner", "kim", "lee")])];

        applier.apply(&mut target, &changes);
        let once = target.cells.clone();
        applier.apply(&mut target, &changes);

        assert_eq!(target.cells, once);
        assert_eq!(target.value(3, 3), CellValue::text("X"));
    }

    #[test]
    fn test_existing_marker_column_is_reused() {
        let mut target = GridSheet::new(
            vec!["Status".into(), "Row Updated".into(), "Owner".into()],
            vec![vec![CellValue::text("open"), CellValue::Empty, CellValue::text("kim")]],
        );
        let applier = ChangeApplier::new(ApplyConfig::default());
        applier.apply(&mut target, &[change(1, &[("Status", "open", "done")])]);

        assert_eq!(target.header().len(), 3);
        assert_eq!(target.value(2, 1), CellValue::text("X"));
    }

    #[test]
    fn test_no_marker_column_without_applied_fields() {
        let mut target = plan(2);
        let applier = ChangeApplier::new(ApplyConfig::default());
        applier.apply(&mut target, &[change(1, &[("Nope", "a", "b")])]);
        assert_eq!(target.header().len(), 3);
    }

    #[test]
    fn test_anchored_mapping_follows_business_identifier() {
        let mut target = plan(6);
        let config = ApplyConfig {
            mapping: RowMapping::Anchored {
                column: "Task Name".to_string(),
            },
            ..ApplyConfig::default()
        };
        let mut record = change(1, &[("Status", "in progress", "done")]);
        record.anchor = Some(CellValue::text("Task 4"));

        let stats = ChangeApplier::new(config).apply(&mut target, &[record]);
        assert_eq!(stats.fields_applied, 1);
        assert_eq!(target.value(5, 1), CellValue::text("done"));
        assert_eq!(target.value(2, 1), CellValue::text("in progress"));
    }

    #[test]
    fn test_anchored_mapping_warns_when_anchor_missing() {
        let mut target = plan(2);
        let config = ApplyConfig {
            mapping: RowMapping::Anchored {
                column: "Task Name".to_string(),
            },
            ..ApplyConfig::default()
        };
        let mut record = change(1, &[("Status", "in progress", "done")]);
        record.anchor = Some(CellValue::text("Gone"));

        let stats = ChangeApplier::new(config).apply(&mut target, &[record]);
        assert_eq!(stats.fields_applied, 0);
        assert_eq!(stats.rows_skipped, 1);
        assert!(!stats.is_clean());
    }
}
