// ABOUTME: Replicate command - replays eligible plan rows into the live remote sheet
// ABOUTME: Drives a WebDriver session, or a recording grid for dry runs

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use dialoguer::{theme::ColorfulTheme, Confirm};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use crate::config::Config;
use crate::replicate::{
    Pacing, RecordingGrid, RemoteGrid, ReplicateStats, Replicator, RowFilter, WebDriverGrid,
};
use crate::snapshot::Snapshot;
use crate::utils;
use crate::xlsx;

use super::apply::collect_changes;

/// Options for one replication run
#[derive(Debug, Clone, Default)]
pub struct ReplicateOptions {
    /// Workbook whose first sheet is replayed; defaults to the newest `_with_updates` plan
    pub source: Option<PathBuf>,
    /// Restrict replay to rows changed in this WIP workbook (or the newest one)
    pub changed_only: bool,
    pub wip: Option<PathBuf>,
    pub session: Option<String>,
    pub webdriver_url: Option<String>,
    pub dry_run: bool,
    pub yes: bool,
    pub no_save: bool,
}

pub async fn replicate(
    config: &Config,
    options: ReplicateOptions,
    now: NaiveDateTime,
) -> Result<ReplicateStats> {
    let source = match &options.source {
        Some(p) => p.clone(),
        None => utils::find_most_recent_file(
            &utils::expand_home(&config.workspace.folder),
            &config.workspace.plan_prefix,
            &format!("_with_updates{}", config.workspace.extension),
        )
        .context("Failed to locate an updated plan to replicate")?,
    };

    let mut filter = config.row_filter(now)?;
    if options.changed_only {
        let keys: Vec<u32> = collect_changes(config, options.wip.clone())?
            .iter()
            .map(|c| c.key)
            .collect();
        if keys.is_empty() {
            println!("No changed rows to replicate.");
            return Ok(ReplicateStats::default());
        }
        tracing::info!("Restricting replication to {} changed row(s)", keys.len());
        filter = filter.with_keys(keys);
    }

    tracing::info!("Reading {}", source.display());
    let snapshot = xlsx::read_first_snapshot(&source)?;
    let save = config.replicate.save && !options.no_save;

    if options.dry_run {
        let (stats, grid) =
            drive(RecordingGrid::new(), filter, Pacing::none(), &snapshot, false).await?;
        println!("{}", grid.to_json()?);
        print_summary(&stats);
        return Ok(stats);
    }

    if !options.yes {
        println!();
        println!("Open the target sheet in the browser session and give it focus.");
        println!("Keys and clipboard pastes will be sent to that tab until the walk ends.");
        println!();
        let confirm = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Replay eligible rows of {} ({} rows)?",
                source.display(),
                snapshot.len()
            ))
            .default(false)
            .interact()?;
        if !confirm {
            bail!("Replication cancelled");
        }
    }

    let session = options
        .session
        .clone()
        .or_else(|| config.session_id())
        .context(
            "No WebDriver session id. Use --session, [remote] session_id, or PLAN_REPLICATOR_SESSION",
        )?;
    let url = options
        .webdriver_url
        .clone()
        .unwrap_or_else(|| config.remote.webdriver_url.clone());
    let grid = WebDriverGrid::new(&url, &session)?;

    let (stats, _) = drive(grid, filter, config.pacing.clone(), &snapshot, save).await?;
    print_summary(&stats);
    Ok(stats)
}

async fn drive<R: RemoteGrid>(
    remote: R,
    filter: RowFilter,
    pacing: Pacing,
    snapshot: &Snapshot,
    save: bool,
) -> Result<(ReplicateStats, R)> {
    let progress = ProgressBar::new(snapshot.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} rows")?
            .progress_chars("=>-"),
    );

    let mut replicator = Replicator::new(remote, filter, pacing).with_progress(progress);
    let start = replicator.go_home().await?;
    let mut stats = replicator.run(snapshot, start).await?;
    if save {
        replicator.save().await?;
        stats.saved = true;
    }
    Ok((stats, replicator.into_remote()))
}

fn print_summary(stats: &ReplicateStats) {
    println!(
        "Replayed {} row(s), {} cell(s); skipped {} done and {} other row(s)",
        stats.rows_replayed, stats.cells_written, stats.rows_skipped_done, stats.rows_skipped
    );
    if let Some(reason) = stats.stopped {
        println!("Stopped early: {:?}", reason);
    }
}
