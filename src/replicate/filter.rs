// ABOUTME: Row-selection rules for selective replication
// ABOUTME: Decides per row whether to stop, skip, or replay it into the remote grid

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::snapshot::{CellValue, Snapshot};

/// Column names the filter reads from a snapshot. Matching ignores case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterColumns {
    /// Accepted names for the primary column, first match wins
    pub primary: Vec<String>,
    pub kind: String,
    pub status: String,
    pub date: String,
}

impl Default for FilterColumns {
    fn default() -> Self {
        Self {
            primary: vec!["Primary".to_string(), "Task Name".to_string()],
            kind: "Type".to_string(),
            status: "Status".to_string(),
            date: "Start".to_string(),
        }
    }
}

/// Represents row selection rules for one replication run
#[derive(Debug, Clone)]
pub struct RowFilter {
    columns: FilterColumns,
    category: String,
    done_status: String,
    cutoff: Option<NaiveDateTime>,
    keys: Option<BTreeSet<u32>>,
    blank_run_limit: u32,
}

/// Why the row walk ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BlankRun,
    PastLastKey,
}

/// What to do with one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowDecision {
    Stop(StopReason),
    SkipDone,
    Replay,
    Skip,
}

/// Column indexes resolved against one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedColumns {
    primary: usize,
    kind: usize,
    status: usize,
    date: Option<usize>,
}

impl RowFilter {
    /// Creates a filter for the given category and completed status.
    pub fn new(category: &str, done_status: &str, blank_run_limit: u32) -> Result<Self> {
        if category.trim().is_empty() {
            bail!("Replicated category must not be empty");
        }
        if blank_run_limit == 0 {
            bail!("Blank-run limit must be at least 1");
        }
        Ok(Self {
            columns: FilterColumns::default(),
            category: category.trim().to_lowercase(),
            done_status: done_status.trim().to_lowercase(),
            cutoff: None,
            keys: None,
            blank_run_limit,
        })
    }

    pub fn with_columns(mut self, columns: FilterColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Only replay rows whose date column is on or before `cutoff`.
    pub fn with_cutoff(mut self, cutoff: NaiveDateTime) -> Self {
        self.cutoff = Some(cutoff);
        self
    }

    /// Replay exactly the rows whose 1-based data row number is in `keys`.
    ///
    /// Keyed rows skip the category, status and cutoff checks. The walk stops
    /// once it passes the largest key.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = u32>) -> Self {
        self.keys = Some(keys.into_iter().collect());
        self
    }

    pub fn blank_run_limit(&self) -> u32 {
        self.blank_run_limit
    }

    /// Look up every column the filter needs. A missing column is a schema error.
    pub fn resolve(&self, snapshot: &Snapshot) -> Result<ResolvedColumns> {
        let primary = self
            .columns
            .primary
            .iter()
            .find_map(|name| snapshot.column_index_ignore_case(name));
        let Some(primary) = primary else {
            bail!(
                "Required column '{}' not found in sheet '{}'",
                self.columns.primary.join("' or '"),
                snapshot.name()
            );
        };
        Ok(ResolvedColumns {
            primary,
            kind: require_ignore_case(snapshot, &self.columns.kind)?,
            status: require_ignore_case(snapshot, &self.columns.status)?,
            date: match self.cutoff {
                Some(_) => Some(require_ignore_case(snapshot, &self.columns.date)?),
                None => None,
            },
        })
    }

    /// Classify one row. Rules are checked in order and the first match wins.
    ///
    /// `blank_run` carries the count of consecutive rows with a blank primary
    /// column across calls.
    pub fn decide(
        &self,
        columns: &ResolvedColumns,
        position: u32,
        values: &[CellValue],
        blank_run: &mut u32,
    ) -> RowDecision {
        let cell = |idx: usize| values.get(idx).unwrap_or(&CellValue::Empty);

        if cell(columns.primary).is_blank() {
            *blank_run += 1;
            if *blank_run >= self.blank_run_limit {
                return RowDecision::Stop(StopReason::BlankRun);
            }
        } else {
            *blank_run = 0;
        }

        // Keyed rows are replayed whatever their type or status
        if let Some(keys) = &self.keys {
            return match keys.last() {
                Some(last) if position > *last => RowDecision::Stop(StopReason::PastLastKey),
                None => RowDecision::Stop(StopReason::PastLastKey),
                _ if keys.contains(&position) => RowDecision::Replay,
                _ => RowDecision::Skip,
            };
        }

        let in_category = cell(columns.kind).normalized() == self.category;
        if in_category && cell(columns.status).normalized() == self.done_status {
            return RowDecision::SkipDone;
        }

        if in_category && self.before_cutoff(columns, values) {
            return RowDecision::Replay;
        }

        RowDecision::Skip
    }

    fn before_cutoff(&self, columns: &ResolvedColumns, values: &[CellValue]) -> bool {
        match (self.cutoff, columns.date) {
            (Some(cutoff), Some(idx)) => values
                .get(idx)
                .and_then(CellValue::as_date)
                .is_some_and(|d| d <= cutoff),
            _ => true,
        }
    }
}

fn require_ignore_case(snapshot: &Snapshot, name: &str) -> Result<usize> {
    match snapshot.column_index_ignore_case(name) {
        Some(idx) => Ok(idx),
        None => snapshot.require_column(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(day: u32) -> CellValue {
        CellValue::Date(
            NaiveDate::from_ymd_opt(2025, 6, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn plan() -> Snapshot {
        Snapshot::new(
            "Sheet1",
            vec!["Primary".into(), "Type".into(), "Status".into(), "Start".into()],
            vec![
                vec!["Kickoff".into(), "Milestone".into(), " DONE ".into(), date(1)],
                vec!["Build".into(), "milestone".into(), "open".into(), date(2)],
                vec!["Review".into(), "task".into(), "open".into(), date(2)],
                vec!["Launch".into(), "milestone".into(), "open".into(), date(20)],
            ],
        )
    }

    fn decide_all(filter: &RowFilter, snapshot: &Snapshot) -> Vec<RowDecision> {
        let columns = filter.resolve(snapshot).unwrap();
        let mut run = 0;
        (1..=snapshot.len() as u32)
            .map(|pos| filter.decide(&columns, pos, snapshot.row(pos).unwrap(), &mut run))
            .collect()
    }

    #[test]
    fn test_category_and_done_status_are_case_insensitive() {
        let filter = RowFilter::new("milestone", "done", 5).unwrap();
        assert_eq!(
            decide_all(&filter, &plan()),
            vec![
                RowDecision::SkipDone,
                RowDecision::Replay,
                RowDecision::Skip,
                RowDecision::Replay
            ]
        );
    }

    #[test]
    fn test_cutoff_excludes_later_rows() {
        let cutoff = NaiveDate::from_ymd_opt(2025, 6, 10)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let filter = RowFilter::new("milestone", "done", 5)
            .unwrap()
            .with_cutoff(cutoff);
        assert_eq!(decide_all(&filter, &plan())[3], RowDecision::Skip);
    }

    #[test]
    fn test_key_set_limits_rows_and_stops_past_last_key() {
        let filter = RowFilter::new("milestone", "done", 5)
            .unwrap()
            .with_keys([2]);
        let decisions = decide_all(&filter, &plan());
        assert_eq!(decisions[0], RowDecision::Skip);
        assert_eq!(decisions[1], RowDecision::Replay);
        assert_eq!(decisions[2], RowDecision::Stop(StopReason::PastLastKey));
    }

    #[test]
    fn test_keyed_rows_replay_even_when_done_or_out_of_category() {
        let filter = RowFilter::new("milestone", "done", 5)
            .unwrap()
            .with_keys([1, 3]);
        let decisions = decide_all(&filter, &plan());
        assert_eq!(
            decisions,
            vec![
                RowDecision::Replay,
                RowDecision::Skip,
                RowDecision::Replay,
                RowDecision::Stop(StopReason::PastLastKey)
            ]
        );
    }

    #[test]
    fn test_blank_run_guard_checked_before_key_stop() {
        let filter = RowFilter::new("milestone", "done", 1)
            .unwrap()
            .with_keys([1]);
        let snapshot = Snapshot::new(
            "Sheet1",
            vec!["Primary".into(), "Type".into(), "Status".into()],
            vec![vec!["A".into()], vec![CellValue::Empty]],
        );
        let decisions = decide_all(&filter, &snapshot);
        assert_eq!(decisions[1], RowDecision::Stop(StopReason::BlankRun));
    }

    #[test]
    fn test_blank_run_counter_resets_on_populated_row() {
        let filter = RowFilter::new("milestone", "done", 2).unwrap();
        let snapshot = Snapshot::new(
            "Sheet1",
            vec!["Primary".into(), "Type".into(), "Status".into()],
            vec![
                vec![CellValue::Empty],
                vec!["A".into()],
                vec![CellValue::Empty],
                vec!["  ".into()],
            ],
        );
        let decisions = decide_all(&filter, &snapshot);
        assert_eq!(decisions[..3], [RowDecision::Skip; 3]);
        assert_eq!(decisions[3], RowDecision::Stop(StopReason::BlankRun));
    }

    #[test]
    fn test_task_name_accepted_as_primary() {
        let filter = RowFilter::new("milestone", "done", 5).unwrap();
        let snapshot = Snapshot::new(
            "Sheet1",
            vec!["task name".into(), "TYPE".into(), "Status".into()],
            vec![vec!["Build".into(), "Milestone".into(), "open".into()]],
        );
        assert_eq!(decide_all(&filter, &snapshot), vec![RowDecision::Replay]);
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let filter = RowFilter::new("milestone", "done", 5).unwrap();
        let snapshot = Snapshot::new("Sheet1", vec!["Primary".into()], vec![]);
        let err = filter.resolve(&snapshot).unwrap_err();
        assert!(err.to_string().contains("'Type'"));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        assert!(RowFilter::new("  ", "done", 5).is_err());
        assert!(RowFilter::new("milestone", "done", 0).is_err());
    }
}
