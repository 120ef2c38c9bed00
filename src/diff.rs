// ABOUTME: Row differ - compares a current snapshot against its baseline
// ABOUTME: Produces per-row change records plus inserted/deleted rows

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::snapshot::{CellValue, Snapshot};

/// Previous and new value for one changed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub previous: CellValue,
    pub new: CellValue,
}

/// Per-column differences for one logical row.
///
/// Only constructed with a non-empty `changed_fields` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Row key: the data row position, or the explicit key column value
    pub key: u32,
    /// Baseline value of the anchor column, when one is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<CellValue>,
    pub changed_fields: BTreeMap<String, FieldChange>,
}

impl ChangeRecord {
    pub fn changed_columns(&self) -> impl Iterator<Item = &str> {
        self.changed_fields.keys().map(String::as_str)
    }
}

/// One entry of a positional diff, in row-position order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowDelta {
    /// Row exists only in the current snapshot
    Inserted { row: u32, values: Vec<CellValue> },
    /// Row exists only in the baseline snapshot
    Deleted { row: u32, values: Vec<CellValue> },
    /// Row exists in both and at least one column differs
    Modified(ChangeRecord),
}

impl RowDelta {
    pub fn row(&self) -> u32 {
        match self {
            RowDelta::Inserted { row, .. } | RowDelta::Deleted { row, .. } => *row,
            RowDelta::Modified(change) => change.key,
        }
    }
}

/// Counts describing a positional diff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub inserted: usize,
    pub deleted: usize,
    pub modified: usize,
}

impl DiffSummary {
    pub fn from_deltas(deltas: &[RowDelta]) -> Self {
        let mut summary = Self::default();
        for delta in deltas {
            match delta {
                RowDelta::Inserted { .. } => summary.inserted += 1,
                RowDelta::Deleted { .. } => summary.deleted += 1,
                RowDelta::Modified(_) => summary.modified += 1,
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.inserted + self.deleted + self.modified
    }
}

/// Compare two snapshots row by row, aligned on physical row position.
///
/// Rows beyond the shorter snapshot are reported as inserted (only in
/// `current`) or deleted (only in `baseline`). Rows present in both produce a
/// `Modified` entry only when some column differs. Columns are compared by
/// position over the current snapshot's header.
pub fn diff_positional(current: &Snapshot, baseline: &Snapshot) -> Vec<RowDelta> {
    warn_on_header_mismatch(current, baseline);

    let n = current.len().max(baseline.len()) as u32;
    let mut deltas = Vec::new();

    for position in 1..=n {
        match (current.row(position), baseline.row(position)) {
            (Some(values), None) => deltas.push(RowDelta::Inserted {
                row: position,
                values: values.to_vec(),
            }),
            (None, Some(values)) => deltas.push(RowDelta::Deleted {
                row: position,
                values: values.to_vec(),
            }),
            (Some(_), Some(_)) => {
                let changed_fields = compare_row(current, baseline, position, true);
                if !changed_fields.is_empty() {
                    deltas.push(RowDelta::Modified(ChangeRecord {
                        key: position,
                        anchor: None,
                        changed_fields,
                    }));
                }
            }
            (None, None) => {}
        }
    }

    tracing::debug!(
        "Positional diff of '{}' vs '{}': {} row(s) differ",
        current.name(),
        baseline.name(),
        deltas.len()
    );

    deltas
}

/// Compare two snapshots and key each change record by an explicit key column.
///
/// Walks the rows of `current` only. Columns without a header name are ignored,
/// since they cannot be matched to a target column. Rows whose key cell is empty are skipped,
/// since they cannot be correlated to a target row. A non-empty key that is not
/// a positive integer is skipped with a warning. When `anchor_column` is given,
/// its baseline value is captured on each record.
///
/// A missing key or anchor column is a schema error.
pub fn diff_keyed(
    current: &Snapshot,
    baseline: &Snapshot,
    key_column: &str,
    anchor_column: Option<&str>,
) -> Result<Vec<ChangeRecord>> {
    let key_idx = current.require_column(key_column)?;
    let anchor_idx = anchor_column
        .map(|name| current.require_column(name))
        .transpose()?;

    warn_on_header_mismatch(current, baseline);

    let mut changes = Vec::new();
    for position in 1..=current.len() as u32 {
        let key_value = current.value(position, key_idx);
        if key_value.is_blank() {
            continue;
        }
        let Some(key) = key_value.as_row_key() else {
            tracing::warn!(
                "Row {}: key value '{}' is not a row number, skipping",
                position,
                key_value
            );
            continue;
        };

        let changed_fields = compare_row(current, baseline, position, false);
        if changed_fields.is_empty() {
            continue;
        }

        tracing::debug!(
            "Row {}: key={}, changed columns: {:?}",
            position,
            key,
            changed_fields.keys().collect::<Vec<_>>()
        );

        changes.push(ChangeRecord {
            key,
            anchor: anchor_idx.map(|i| baseline.value(position, i).clone()),
            changed_fields,
        });
    }

    tracing::info!("Total rows with changes to apply: {}", changes.len());
    Ok(changes)
}

/// Collect the columns whose values differ at one row position.
///
/// With `include_unnamed`, columns with an empty header are compared and
/// reported under their 1-based column number; otherwise they are ignored.
fn compare_row(
    current: &Snapshot,
    baseline: &Snapshot,
    position: u32,
    include_unnamed: bool,
) -> BTreeMap<String, FieldChange> {
    let mut changed = BTreeMap::new();
    for (col, name) in current.columns().iter().enumerate() {
        if name.is_empty() && !include_unnamed {
            continue;
        }
        let new = current.value(position, col);
        let previous = baseline.value(position, col);
        if new != previous {
            let label = if name.is_empty() {
                format!("#{}", col + 1)
            } else {
                name.clone()
            };
            changed.insert(
                label,
                FieldChange {
                    previous: previous.clone(),
                    new: new.clone(),
                },
            );
        }
    }
    changed
}

/// Logs a warning when the two headers differ. Returns whether they matched.
fn warn_on_header_mismatch(current: &Snapshot, baseline: &Snapshot) -> bool {
    let matched = current.columns() == baseline.columns();
    if !matched {
        tracing::warn!(
            "Headers of '{}' and '{}' differ; comparing columns by position",
            current.name(),
            baseline.name()
        );
    }
    matched
}
