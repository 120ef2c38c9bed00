// ABOUTME: Apply command - carries WIP edits back into a fresh plan export
// ABOUTME: Writes a _with_updates copy of the plan with changed cells highlighted

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::apply::{ApplyStats, ChangeApplier};
use crate::config::Config;
use crate::diff::{diff_keyed, ChangeRecord};
use crate::utils;
use crate::xlsx;

use super::changes::resolve_wip;

/// Keyed change records between the WIP tab and its baseline.
pub fn collect_changes(config: &Config, wip: Option<PathBuf>) -> Result<Vec<ChangeRecord>> {
    let path = resolve_wip(config, wip)?;
    tracing::info!("Reading changes from {}", path.display());
    let current = xlsx::read_snapshot(&path, &config.compare.current_sheet)?;
    let baseline = xlsx::read_snapshot(&path, &config.compare.baseline_sheet)?;
    diff_keyed(
        &current,
        &baseline,
        &config.compare.key_column,
        config.anchor_source_column().as_deref(),
    )
}

/// Apply WIP changes to a plan export.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `wip` - WIP workbook; defaults to the newest one in the workspace folder
/// * `plan` - Plan export to update; defaults to the newest plan in the workspace
/// * `output` - Destination; defaults to `<plan stem>_with_updates.xlsx`
///
/// # Returns
///
/// `None` when there was nothing to apply, otherwise the apply statistics.
pub fn apply(
    config: &Config,
    wip: Option<PathBuf>,
    plan: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<Option<ApplyStats>> {
    let changes = collect_changes(config, wip)?;
    if changes.is_empty() {
        println!("No changes to apply.");
        return Ok(None);
    }

    let plan = match plan {
        Some(p) => p,
        None => utils::find_most_recent_source(
            &utils::expand_home(&config.workspace.folder),
            &config.workspace.plan_prefix,
            &config.workspace.extension,
        )
        .context("Failed to locate a plan export to update")?,
    };
    let output = output.unwrap_or_else(|| utils::with_updates_path(&plan));
    utils::validate_distinct_paths(&plan, &output)?;

    let applier = ChangeApplier::new(config.apply_config());
    let stats = xlsx::apply_to_workbook(&plan, &output, &changes, &applier)?;

    println!(
        "Applied {} field(s) to {} row(s): {}",
        stats.fields_applied,
        stats.rows_updated,
        output.display()
    );
    if !stats.is_clean() {
        println!("{} warning(s):", stats.warnings.len());
        for warning in &stats.warnings {
            println!("  - {}", warning);
        }
    }
    Ok(Some(stats))
}
