// ABOUTME: Run command - the daily pipeline of changes followed by apply
// ABOUTME: Marks up the WIP workbook, then writes the updated plan copy

use anyhow::Result;
use std::path::PathBuf;

use crate::apply::ApplyStats;
use crate::config::Config;
use crate::diff::DiffSummary;

use super::{apply, changes};

/// Run `changes` and then `apply` against the same WIP workbook.
pub fn run(
    config: &Config,
    wip: Option<PathBuf>,
    plan: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(DiffSummary, Option<ApplyStats>)> {
    let wip = changes::resolve_wip(config, wip)?;
    let summary = changes::changes(config, Some(wip.clone()))?;
    let stats = apply::apply(config, Some(wip), plan, output)?;
    Ok((summary, stats))
}
