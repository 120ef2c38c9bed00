// ABOUTME: WIP report builder - filters the exported plan down to open work
// ABOUTME: Projects, keys and sorts plan rows into the report and baseline tabs

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::snapshot::{CellValue, Snapshot};

/// Name of the generated row-key column.
pub const KEY_COLUMN: &str = "key";

/// Output column and the plan column it is copied from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub output: String,
    pub source: String,
    pub width: f64,
}

impl Projection {
    fn new(output: &str, source: &str, width: f64) -> Self {
        Self {
            output: output.to_string(),
            source: source.to_string(),
            width,
        }
    }
}

/// Report columns in order, with the plan column each is copied from.
pub fn default_projection() -> Vec<Projection> {
    vec![
        Projection::new("Release", "Release", 13.0),
        Projection::new("Swimlane", "Swimlane", 18.0),
        Projection::new("Primary", "Task Name", 50.0),
        Projection::new("Owner", "Owner", 11.0),
        Projection::new("Start", "Start", 12.0),
        Projection::new("Finish", "Finish", 12.0),
        Projection::new("Status Update", "Status Update", 46.0),
    ]
}

/// Selection and layout rules for the WIP report.
#[derive(Debug, Clone)]
pub struct WipOptions {
    pub releases: Vec<String>,
    pub types: Vec<String>,
    pub done_status: String,
    pub cutoff: NaiveDateTime,
    pub projection: Vec<Projection>,
    pub date_columns: Vec<String>,
    pub key_width: f64,
}

impl WipOptions {
    /// Default projection, filtering on the given releases and cutoff.
    pub fn new(releases: Vec<String>, cutoff: NaiveDateTime) -> Self {
        Self {
            releases,
            types: vec!["milestone".to_string()],
            done_status: "done".to_string(),
            cutoff,
            projection: default_projection(),
            date_columns: vec!["Start".to_string(), "Finish".to_string()],
            key_width: 10.0,
        }
    }
}

/// The filtered report, ready to be written as both report and baseline tabs.
#[derive(Debug, Clone)]
pub struct WipReport {
    pub sheet: Snapshot,
    pub source_rows: usize,
}

impl WipReport {
    pub fn len(&self) -> usize {
        self.sheet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheet.is_empty()
    }

    /// Zero-based index of the hidden key column.
    pub fn key_column(&self) -> usize {
        self.sheet.width().saturating_sub(1)
    }
}

/// Filter and project `plan` into a WIP report.
///
/// A row is kept when its release and type are in the configured lists, its
/// status is not the done status, and its start date is on or before the
/// cutoff. Rows without a start date are dropped. Each kept row carries its
/// 1-based plan data row number in the `key` column.
///
/// Missing plan columns are schema errors.
pub fn build_wip_report(plan: &Snapshot, options: &WipOptions) -> Result<WipReport> {
    let release_idx = plan.require_column("Release")?;
    let type_idx = plan.require_column("Type")?;
    let status_idx = plan.require_column("Status")?;
    let start_idx = plan.require_column("Start")?;
    let sources = options
        .projection
        .iter()
        .map(|p| plan.require_column(&p.source))
        .collect::<Result<Vec<usize>>>()?;
    let owner_out = options.projection.iter().position(|p| p.output == "Owner");

    let mut kept: Vec<(u32, NaiveDateTime, Vec<CellValue>)> = Vec::new();
    for position in 1..=plan.len() as u32 {
        let value = |idx| plan.value(position, idx);

        if !options.releases.iter().any(|r| value(release_idx).to_string() == *r) {
            continue;
        }
        if !options.types.iter().any(|t| value(type_idx).to_string() == *t) {
            continue;
        }
        if value(status_idx).to_string() == options.done_status {
            continue;
        }
        let Some(start) = value(start_idx).as_date() else {
            continue;
        };
        if start > options.cutoff {
            continue;
        }

        let mut row: Vec<CellValue> = sources.iter().map(|&idx| value(idx).clone()).collect();
        row.push(CellValue::Number(position as f64));
        kept.push((position, start, row));
    }

    tracing::info!("Filtered {} rows from {} total rows", kept.len(), plan.len());

    kept.sort_by(|a, b| {
        let owner = |row: &Vec<CellValue>| owner_out.map(|i| row[i].to_string()).unwrap_or_default();
        owner(&a.2)
            .cmp(&owner(&b.2))
            .then(a.1.cmp(&b.1))
            .then(a.0.cmp(&b.0))
    });

    let date_outputs: Vec<usize> = options
        .projection
        .iter()
        .enumerate()
        .filter(|(_, p)| options.date_columns.contains(&p.output))
        .map(|(i, _)| i)
        .collect();

    let rows = kept
        .into_iter()
        .map(|(_, _, mut row)| {
            for &i in &date_outputs {
                if let Some(d) = row[i].as_date() {
                    row[i] = CellValue::Text(d.format("%m-%d-%Y").to_string());
                }
            }
            row
        })
        .collect();

    let mut columns: Vec<String> = options.projection.iter().map(|p| p.output.clone()).collect();
    columns.push(KEY_COLUMN.to_string());
    let mut widths: Vec<Option<f64>> = options.projection.iter().map(|p| Some(p.width)).collect();
    widths.push(Some(options.key_width));

    Ok(WipReport {
        sheet: Snapshot::new("Sheet1", columns, rows).with_column_widths(widths),
        source_rows: plan.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(month: u32, day: u32) -> CellValue {
        ymd(2025, month, day)
    }

    fn ymd(year: i32, month: u32, day: u32) -> CellValue {
        CellValue::Date(
            NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    fn plan_row(release: &str, kind: &str, status: &str, owner: &str, start: CellValue) -> Vec<CellValue> {
        vec![
            release.into(),
            "Lane".into(),
            format!("{} task", owner).into(),
            owner.into(),
            start,
            date(12, 31),
            "".into(),
            kind.into(),
            status.into(),
        ]
    }

    fn plan(rows: Vec<Vec<CellValue>>) -> Snapshot {
        Snapshot::new(
            "Sheet1",
            [
                "Release",
                "Swimlane",
                "Task Name",
                "Owner",
                "Start",
                "Finish",
                "Status Update",
                "Type",
                "Status",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            rows,
        )
    }

    fn options() -> WipOptions {
        let cutoff = NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        WipOptions::new(vec!["Release 5".to_string()], cutoff)
    }

    #[test]
    fn test_filters_release_type_status_and_cutoff() {
        let plan = plan(vec![
            plan_row("Release 5", "milestone", "open", "amy", date(5, 1)),
            plan_row("Release 9", "milestone", "open", "amy", date(5, 1)),
            plan_row("Release 5", "task", "open", "amy", date(5, 1)),
            plan_row("Release 5", "milestone", "done", "amy", date(5, 1)),
            plan_row("Release 5", "milestone", "open", "amy", date(7, 1)),
            plan_row("Release 5", "milestone", "open", "amy", CellValue::Empty),
        ]);
        let report = build_wip_report(&plan, &options()).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.source_rows, 6);
        assert_eq!(report.sheet.value(1, report.key_column()), &CellValue::Number(1.0));
    }

    #[test]
    fn test_projection_and_date_format() {
        let plan = plan(vec![plan_row("Release 5", "milestone", "open", "amy", date(5, 2))]);
        let report = build_wip_report(&plan, &options()).unwrap();
        assert_eq!(
            report.sheet.columns(),
            &["Release", "Swimlane", "Primary", "Owner", "Start", "Finish", "Status Update", "key"]
        );
        assert_eq!(report.sheet.value(1, 2), &CellValue::text("amy task"));
        assert_eq!(report.sheet.value(1, 4), &CellValue::text("05-02-2025"));
        assert_eq!(report.sheet.column_width(2), Some(50.0));
    }

    #[test]
    fn test_sorted_by_owner_then_actual_start_date() {
        let plan = plan(vec![
            plan_row("Release 5", "milestone", "open", "zoe", date(1, 1)),
            plan_row("Release 5", "milestone", "open", "amy", date(1, 15)),
            plan_row("Release 5", "milestone", "open", "amy", ymd(2024, 12, 1)),
        ]);
        let report = build_wip_report(&plan, &options()).unwrap();
        let keys: Vec<String> = (1..=3)
            .map(|pos| report.sheet.value(pos, report.key_column()).to_string())
            .collect();
        assert_eq!(keys, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_missing_plan_column_is_schema_error() {
        let plan = Snapshot::new("Sheet1", vec!["Release".into()], vec![]);
        assert!(build_wip_report(&plan, &options()).is_err());
    }
}
