// ABOUTME: Report command - builds the dated WIP workbook from the exported plan
// ABOUTME: Writes the report tab plus a hidden baseline copy for later comparison

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::path::PathBuf;

use crate::config::Config;
use crate::utils;
use crate::wip::build_wip_report;
use crate::xlsx;

/// Build the WIP report.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `plan` - Exported plan; defaults to the newest plan in the workspace folder
/// * `output` - Report path; defaults to `<wip_prefix>YYYY_MM_DD.xlsx` next to the plan
/// * `now` - Reference time for the start-date cutoff and the file date
///
/// # Returns
///
/// Path of the written report.
pub fn report(
    config: &Config,
    plan: Option<PathBuf>,
    output: Option<PathBuf>,
    now: NaiveDateTime,
) -> Result<PathBuf> {
    let plan = match plan {
        Some(p) => p,
        None => utils::find_most_recent_source(
            &utils::expand_home(&config.workspace.folder),
            &config.workspace.plan_prefix,
            &config.workspace.extension,
        )
        .context("Failed to locate an exported plan")?,
    };
    let output = output.unwrap_or_else(|| {
        plan.with_file_name(utils::dated_file_name(
            &config.workspace.wip_prefix,
            now.date(),
            &config.workspace.extension,
        ))
    });
    utils::validate_distinct_paths(&plan, &output)?;

    tracing::info!("Reading plan: {}", plan.display());
    let snapshot = xlsx::read_first_snapshot(&plan)?;
    let report = build_wip_report(&snapshot, &config.wip_options(now))?;
    xlsx::write_wip_workbook(&output, &report)?;

    println!(
        "WIP report: {} ({} of {} plan rows)",
        output.display(),
        report.len(),
        report.source_rows
    );
    Ok(output)
}
