// ABOUTME: Selective replicator - replays eligible snapshot rows into a remote grid
// ABOUTME: Walks rows top to bottom, pacing each step and tracking the remote cursor

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::time::Duration;

use super::filter::{RowDecision, RowFilter, StopReason};
use super::remote::{escape_for_injection, format_cell, Cursor, Direction, Pacing, RemoteGrid};
use crate::snapshot::{CellValue, Snapshot};

/// Statistics from one replication run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplicateStats {
    pub rows_replayed: usize,
    pub rows_skipped_done: usize,
    pub rows_skipped: usize,
    pub cells_written: usize,
    pub stopped: Option<StopReason>,
    pub saved: bool,
    pub final_cursor: Cursor,
}

/// Drives a remote grid through the rows of a snapshot.
pub struct Replicator<R: RemoteGrid> {
    remote: R,
    filter: RowFilter,
    pacing: Pacing,
    progress: ProgressBar,
}

impl<R: RemoteGrid> Replicator<R> {
    pub fn new(remote: R, filter: RowFilter, pacing: Pacing) -> Self {
        Self {
            remote,
            filter,
            pacing,
            progress: ProgressBar::hidden(),
        }
    }

    /// Report per-row progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn into_remote(self) -> R {
        self.remote
    }

    /// Move the remote cursor to the top-left data cell.
    pub async fn go_home(&mut self) -> Result<Cursor> {
        let cursor = self.step(Cursor::origin(), Direction::Top).await?;
        self.step(cursor, Direction::Down).await
    }

    /// Walk every row of `snapshot`, starting with the remote cursor at `start`
    /// (the top-left data cell). Leaves the cursor one row below the last
    /// processed row.
    ///
    /// # Arguments
    ///
    /// * `snapshot` - Rows to replay; row `n` maps to remote data row `n`
    /// * `start` - Where the remote cursor currently is
    ///
    /// # Returns
    ///
    /// Counts of replayed and skipped rows, and why the walk stopped if it
    /// stopped early.
    pub async fn run(&mut self, snapshot: &Snapshot, start: Cursor) -> Result<ReplicateStats> {
        let columns = self.filter.resolve(snapshot)?;
        let mut stats = ReplicateStats::default();
        let mut cursor = start;
        let mut blank_run = 0;

        tracing::info!(
            "Replicating '{}' ({} rows) into remote grid",
            snapshot.name(),
            snapshot.len()
        );
        self.progress.set_length(snapshot.len() as u64);

        for position in 1..=snapshot.len() as u32 {
            let values = snapshot.row(position).unwrap_or_default();
            let decision = self
                .filter
                .decide(&columns, position, values, &mut blank_run);
            tracing::debug!("Row {}: {:?}", position, decision);

            match decision {
                RowDecision::Stop(reason) => {
                    tracing::info!("Stopping at row {}: {:?}", position, reason);
                    stats.stopped = Some(reason);
                    break;
                }
                RowDecision::SkipDone => {
                    stats.rows_skipped_done += 1;
                    cursor = self.step(cursor, Direction::Down).await?;
                }
                RowDecision::Skip => {
                    stats.rows_skipped += 1;
                    cursor = self.step(cursor, Direction::Down).await?;
                }
                RowDecision::Replay => {
                    cursor = self
                        .replay_row(cursor, values, &mut stats)
                        .await
                        .with_context(|| format!("Failed to replay row {}", position))?;
                    stats.rows_replayed += 1;
                }
            }
            self.progress.inc(1);
        }

        self.progress.finish_and_clear();
        stats.final_cursor = cursor;

        tracing::info!(
            "Replicated {} row(s) ({} cells); skipped {} done and {} ineligible",
            stats.rows_replayed,
            stats.cells_written,
            stats.rows_skipped_done,
            stats.rows_skipped
        );
        Ok(stats)
    }

    /// Save the remote sheet.
    pub async fn save(&mut self) -> Result<()> {
        self.remote.save().await.context("Failed to save remote sheet")?;
        self.settle(self.pacing.save).await
    }

    async fn replay_row(
        &mut self,
        mut cursor: Cursor,
        values: &[CellValue],
        stats: &mut ReplicateStats,
    ) -> Result<Cursor> {
        let last = values.len().saturating_sub(1);
        for (idx, value) in values.iter().enumerate() {
            if let Some(text) = format_cell(value) {
                self.remote
                    .inject_text(&escape_for_injection(&text))
                    .await?;
                self.settle(self.pacing.inject).await?;
                self.remote.commit_cell().await?;
                self.settle(self.pacing.commit).await?;
                stats.cells_written += 1;
            }
            if idx < last {
                cursor = self.step(cursor, Direction::Right).await?;
            }
        }
        cursor = self.step(cursor, Direction::RowStart).await?;
        self.step(cursor, Direction::Down).await
    }

    async fn step(&mut self, cursor: Cursor, direction: Direction) -> Result<Cursor> {
        self.remote.move_cursor(direction).await?;
        self.settle(self.pacing.after_move(direction)).await?;
        Ok(cursor.moved(direction))
    }

    async fn settle(&mut self, delay: Duration) -> Result<()> {
        if !self.remote.wait_ready().await? && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
