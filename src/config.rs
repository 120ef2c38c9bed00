// ABOUTME: TOML configuration for folders, filters, sheet names and remote pacing
// ABOUTME: Loaded from --config or ~/.plan-replicator/config.toml; every field has a default

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::apply::{ApplyConfig, RowMapping, APPLIED_FONT_ARGB};
use crate::materialize::MaterializeOptions;
use crate::replicate::{FilterColumns, Pacing, RowFilter};
use crate::wip::{self, WipOptions};

/// Environment variable that supplies the WebDriver session id.
pub const SESSION_ENV: &str = "PLAN_REPLICATOR_SESSION";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub wip: WipConfig,
    pub compare: CompareConfig,
    pub apply: ApplySection,
    pub replicate: ReplicateSection,
    pub pacing: Pacing,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub folder: PathBuf,
    pub plan_prefix: String,
    pub wip_prefix: String,
    pub extension: String,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            plan_prefix: "am_program_plan_".to_string(),
            wip_prefix: "am_program_wip_".to_string(),
            extension: ".xlsx".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WipConfig {
    pub releases: Vec<String>,
    pub types: Vec<String>,
    pub done_status: String,
    /// Rows starting later than now + this many days are left out
    pub cutoff_days: i64,
}

impl Default for WipConfig {
    fn default() -> Self {
        Self {
            releases: [
                "Market Scaling",
                "Release 5",
                "Release 4",
                "Roadmap 2026 (first half)",
                "Ground Truth",
                "Release 6",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            types: vec!["milestone".to_string()],
            done_status: "done".to_string(),
            cutoff_days: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub current_sheet: String,
    pub baseline_sheet: String,
    pub key_column: String,
    pub changes_sheet: String,
    pub fixed_width_columns: Vec<String>,
    pub fixed_width: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            current_sheet: "Sheet1".to_string(),
            baseline_sheet: "original".to_string(),
            key_column: "key".to_string(),
            changes_sheet: "changes".to_string(),
            fixed_width_columns: vec!["Start".to_string(), "Finish".to_string()],
            fixed_width: 17.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplySection {
    pub marker_column: String,
    pub marker_value: String,
    pub highlight_argb: String,
    /// Map rows by this plan column's value instead of by key position
    pub anchor_column: Option<String>,
    /// WIP column holding the anchor value; defaults to the column projected
    /// from `anchor_column`
    pub anchor_source: Option<String>,
}

impl Default for ApplySection {
    fn default() -> Self {
        Self {
            marker_column: "Row Updated".to_string(),
            marker_value: "X".to_string(),
            highlight_argb: APPLIED_FONT_ARGB.to_string(),
            anchor_column: None,
            anchor_source: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateSection {
    pub category: String,
    pub done_status: String,
    pub primary_columns: Vec<String>,
    pub type_column: String,
    pub status_column: String,
    pub date_column: String,
    pub blank_run_limit: u32,
    /// When set, only rows dated on or before now + this many days are replayed
    pub cutoff_days: Option<i64>,
    pub save: bool,
}

impl Default for ReplicateSection {
    fn default() -> Self {
        let columns = FilterColumns::default();
        Self {
            category: "milestone".to_string(),
            done_status: "done".to_string(),
            primary_columns: columns.primary,
            type_column: columns.kind,
            status_column: columns.status,
            date_column: columns.date,
            blank_run_limit: 5,
            cutoff_days: None,
            save: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub webdriver_url: String,
    pub session_id: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:4444".to_string(),
            session_id: None,
        }
    }
}

/// Default config location: `~/.plan-replicator/config.toml`.
pub fn default_path() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home_dir.join(".plan-replicator").join("config.toml"))
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    bail!("Config file not found: {}", p.display());
                }
                p.to_path_buf()
            }
            None => {
                let p = default_path()?;
                if !p.exists() {
                    tracing::debug!("No config at {}, using defaults", p.display());
                    return Ok(Self::default());
                }
                p
            }
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn wip_options(&self, now: NaiveDateTime) -> WipOptions {
        let mut options = WipOptions::new(
            self.wip.releases.clone(),
            now + Duration::days(self.wip.cutoff_days),
        );
        options.types = self.wip.types.clone();
        options.done_status = self.wip.done_status.clone();
        options
    }

    pub fn materialize_options(&self) -> MaterializeOptions {
        MaterializeOptions {
            sheet_name: self.compare.changes_sheet.clone(),
            fixed_width_columns: self.compare.fixed_width_columns.clone(),
            fixed_width: self.compare.fixed_width,
        }
    }

    pub fn apply_config(&self) -> ApplyConfig {
        ApplyConfig {
            mapping: match &self.apply.anchor_column {
                Some(column) => RowMapping::Anchored {
                    column: column.clone(),
                },
                None => RowMapping::default(),
            },
            marker_column: self.apply.marker_column.clone(),
            marker_value: self.apply.marker_value.clone(),
            highlight_argb: self.apply.highlight_argb.clone(),
        }
    }

    /// WIP column whose baseline value anchors each change record, if any.
    ///
    /// Without an explicit `anchor_source`, the WIP column projected from the
    /// plan's `anchor_column` is used, falling back to the same name.
    pub fn anchor_source_column(&self) -> Option<String> {
        if let Some(source) = &self.apply.anchor_source {
            return Some(source.clone());
        }
        let column = self.apply.anchor_column.as_ref()?;
        let projected = wip::default_projection()
            .into_iter()
            .find(|p| &p.source == column)
            .map(|p| p.output);
        Some(projected.unwrap_or_else(|| column.clone()))
    }

    pub fn row_filter(&self, now: NaiveDateTime) -> Result<RowFilter> {
        let section = &self.replicate;
        let mut filter = RowFilter::new(
            &section.category,
            &section.done_status,
            section.blank_run_limit,
        )?
        .with_columns(FilterColumns {
            primary: section.primary_columns.clone(),
            kind: section.type_column.clone(),
            status: section.status_column.clone(),
            date: section.date_column.clone(),
        });
        if let Some(days) = section.cutoff_days {
            filter = filter.with_cutoff(now + Duration::days(days));
        }
        Ok(filter)
    }

    /// Session id from the config file, falling back to the environment.
    pub fn session_id(&self) -> Option<String> {
        self.remote
            .session_id
            .clone()
            .or_else(|| std::env::var(SESSION_ENV).ok())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.compare.current_sheet, "Sheet1");
        assert_eq!(config.compare.baseline_sheet, "original");
        assert_eq!(config.apply.marker_column, "Row Updated");
        assert_eq!(config.replicate.blank_run_limit, 5);
        assert_eq!(config.pacing, Pacing::default());
        assert_eq!(config.wip.releases.len(), 6);
    }

    #[test]
    fn test_partial_sections_override_defaults() {
        let config = Config::from_toml(
            r#"
            [workspace]
            folder = "/plans"

            [apply]
            anchor_column = "Task Name"
            anchor_source = "Primary"

            [pacing]
            row_move = 250

            [remote]
            session_id = "abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.workspace.folder, PathBuf::from("/plans"));
        assert_eq!(config.workspace.plan_prefix, "am_program_plan_");
        assert_eq!(
            config.apply_config().mapping,
            RowMapping::Anchored {
                column: "Task Name".to_string()
            }
        );
        assert_eq!(config.anchor_source_column().as_deref(), Some("Primary"));
        assert_eq!(config.pacing.row_move, StdDuration::from_millis(250));
        assert_eq!(config.pacing.top, StdDuration::from_secs(1));
        assert_eq!(config.session_id().as_deref(), Some("abc"));
    }

    #[test]
    fn test_anchor_source_follows_wip_projection() {
        let mut config = Config::default();
        assert_eq!(config.anchor_source_column(), None);

        config.apply.anchor_column = Some("Task Name".to_string());
        assert_eq!(config.anchor_source_column().as_deref(), Some("Primary"));

        config.apply.anchor_column = Some("Row ID".to_string());
        assert_eq!(config.anchor_source_column().as_deref(), Some("Row ID"));
    }

    #[test]
    fn test_unknown_value_type_is_an_error() {
        assert!(Config::from_toml("[replicate]\nblank_run_limit = \"five\"").is_err());
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[compare]\nchanges_sheet = \"diff\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.materialize_options().sheet_name, "diff");
    }

    #[test]
    fn test_wip_cutoff_is_relative_to_now() {
        let now = chrono::NaiveDate::from_ymd_opt(2025, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let options = Config::default().wip_options(now);
        assert_eq!(options.cutoff, now + Duration::days(1));
    }
}
