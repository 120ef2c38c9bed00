// ABOUTME: In-memory remote grid that records every interaction
// ABOUTME: Backs dry runs and tests; simulates the cursor and clipboard of a real grid

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use super::remote::{unescape_injected, Cursor, Direction, RemoteGrid};

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemoteAction {
    Move { direction: Direction },
    Inject { text: String },
    Commit { row: u32, column: u32 },
    Save,
}

/// Remote grid that keeps its own cursor, so tests can compare the modelled
/// cursor against where the keys would actually have landed.
#[derive(Debug, Default)]
pub struct RecordingGrid {
    actions: Vec<RemoteAction>,
    cells: BTreeMap<(u32, u32), String>,
    cursor: Cursor,
    clipboard: String,
    saved: bool,
}

impl RecordingGrid {
    /// A grid whose cursor starts on the top-left data cell.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[RemoteAction] {
        &self.actions
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Committed text at a 1-based data row and column.
    pub fn cell(&self, row: u32, column: u32) -> Option<&str> {
        self.cells.get(&(row, column)).map(String::as_str)
    }

    /// All committed cells, keyed by (row, column).
    pub fn cells(&self) -> &BTreeMap<(u32, u32), String> {
        &self.cells
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Render the action log as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.actions)?)
    }
}

impl RemoteGrid for RecordingGrid {
    async fn move_cursor(&mut self, direction: Direction) -> Result<()> {
        self.cursor = self.cursor.moved(direction);
        self.actions.push(RemoteAction::Move { direction });
        Ok(())
    }

    async fn inject_text(&mut self, text: &str) -> Result<()> {
        self.clipboard = unescape_injected(text);
        self.actions.push(RemoteAction::Inject {
            text: text.to_string(),
        });
        Ok(())
    }

    async fn commit_cell(&mut self) -> Result<()> {
        let Cursor { row, column } = self.cursor;
        self.cells.insert((row, column), self.clipboard.clone());
        self.actions.push(RemoteAction::Commit { row, column });
        Ok(())
    }

    async fn save(&mut self) -> Result<()> {
        self.saved = true;
        self.actions.push(RemoteAction::Save);
        Ok(())
    }
}
