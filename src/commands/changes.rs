// ABOUTME: Changes command - diffs the WIP tab against its baseline
// ABOUTME: Writes the annotated changes sheet back into the WIP workbook

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::diff::{diff_positional, DiffSummary};
use crate::materialize::{expected_recovery, materialize};
use crate::utils;
use crate::xlsx;

/// Resolve the WIP workbook: the given path, or the newest one in the workspace.
pub fn resolve_wip(config: &Config, wip: Option<PathBuf>) -> Result<PathBuf> {
    match wip {
        Some(p) => Ok(p),
        None => utils::find_most_recent_file(
            &utils::expand_home(&config.workspace.folder),
            &config.workspace.wip_prefix,
            &config.workspace.extension,
        )
        .context("Failed to locate a WIP report"),
    }
}

/// Compare the WIP tab with its baseline and write the annotated sheet.
///
/// The workbook is overwritten in place; an existing changes sheet is replaced.
pub fn changes(config: &Config, wip: Option<PathBuf>) -> Result<DiffSummary> {
    let path = resolve_wip(config, wip)?;
    tracing::info!("Identifying changes in {}", path.display());

    let current = xlsx::read_snapshot_with_widths(&path, &config.compare.current_sheet)?;
    let baseline = xlsx::read_snapshot(&path, &config.compare.baseline_sheet)?;

    let deltas = diff_positional(&current, &baseline);
    let summary = DiffSummary::from_deltas(&deltas);
    let annotated = materialize(&current, &deltas, &config.materialize_options());
    xlsx::write_annotated_sheet(&path, &annotated)?;

    verify_marks(&path, &annotated.name, &expected_recovery(&current, &deltas))?;

    println!(
        "Changes: {} modified, {} added, {} removed (sheet '{}' in {})",
        summary.modified,
        summary.inserted,
        summary.deleted,
        annotated.name,
        path.display()
    );
    Ok(summary)
}

/// Re-read the written sheet and check its colours still describe the diff.
fn verify_marks(
    path: &Path,
    sheet: &str,
    expected: &[crate::materialize::RecoveredRow],
) -> Result<()> {
    let written = xlsx::read_annotated_sheet(path, sheet)?;
    if written.recover_changes() != expected {
        tracing::warn!(
            "Marks in sheet '{}' do not match the computed changes; review it manually",
            sheet
        );
    } else {
        tracing::debug!("Verified marks in sheet '{}'", sheet);
    }
    Ok(())
}
