// ABOUTME: Remote grid capability and the explicit cursor model used to drive it
// ABOUTME: Also holds pacing delays and the per-cell formatting and escaping rules

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::snapshot::CellValue;

/// A cursor movement the remote grid understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Jump to the top-left cell of the sheet (the header row)
    Top,
    /// One row down, same column
    Down,
    /// One field to the right
    Right,
    /// Back to column 1 of the current row
    RowStart,
}

/// Where the remote cursor is believed to be.
///
/// `row` is the 1-based data row (0 is the header row); `column` is 1-based.
/// The position is never read back from the remote, only modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub row: u32,
    pub column: u32,
}

impl Cursor {
    /// Top-left data cell.
    pub fn origin() -> Self {
        Self { row: 1, column: 1 }
    }

    /// Position after moving one step in `direction`.
    pub fn moved(self, direction: Direction) -> Self {
        match direction {
            Direction::Top => Self { row: 0, column: 1 },
            Direction::Down => Self {
                row: self.row + 1,
                ..self
            },
            Direction::Right => Self {
                column: self.column + 1,
                ..self
            },
            Direction::RowStart => Self { column: 1, ..self },
        }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::origin()
    }
}

/// An interactive grid that can only be driven through cursor keys and text
/// entry. There is no acknowledgment channel: a call returning `Ok` means the
/// request was delivered, not that the remote acted on it.
pub trait RemoteGrid {
    fn move_cursor(&mut self, direction: Direction) -> impl Future<Output = Result<()>> + Send;

    /// Stage already-escaped text for the focused cell.
    fn inject_text(&mut self, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Commit the staged text into the focused cell.
    fn commit_cell(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn save(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Wait until the remote has settled. Returns `false` when the remote has
    /// no readiness signal and the caller should fall back to pacing delays.
    fn wait_ready(&mut self) -> impl Future<Output = Result<bool>> + Send {
        async { Ok(false) }
    }
}

/// Settle delays after each kind of remote interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    #[serde(with = "millis")]
    pub top: Duration,
    #[serde(with = "millis")]
    pub row_move: Duration,
    #[serde(with = "millis")]
    pub column_move: Duration,
    #[serde(with = "millis")]
    pub inject: Duration,
    #[serde(with = "millis")]
    pub commit: Duration,
    #[serde(with = "millis")]
    pub save: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            top: Duration::from_millis(1000),
            row_move: Duration::from_millis(500),
            column_move: Duration::from_millis(100),
            inject: Duration::from_millis(50),
            commit: Duration::from_millis(100),
            save: Duration::from_millis(2000),
        }
    }
}

impl Pacing {
    /// No delays at all; used for dry runs and tests.
    pub fn none() -> Self {
        Self {
            top: Duration::ZERO,
            row_move: Duration::ZERO,
            column_move: Duration::ZERO,
            inject: Duration::ZERO,
            commit: Duration::ZERO,
            save: Duration::ZERO,
        }
    }

    pub fn after_move(&self, direction: Direction) -> Duration {
        match direction {
            Direction::Top => self.top,
            Direction::Down | Direction::RowStart => self.row_move,
            Direction::Right => self.column_move,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Text to type into a remote cell, or `None` for an empty cell.
///
/// Dates use `MM/DD/YY`; everything else uses the value's display form.
pub fn format_cell(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Empty => None,
        CellValue::Date(d) => Some(d.format("%m/%d/%y").to_string()),
        other => Some(other.to_string()),
    }
}

/// Escape text for embedding in a single-quoted script string literal.
pub fn escape_for_injection(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Inverse of `escape_for_injection`, as the remote's script engine would read it.
pub fn unescape_injected(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cursor_moves() {
        let cursor = Cursor::origin()
            .moved(Direction::Right)
            .moved(Direction::Right)
            .moved(Direction::Down);
        assert_eq!(cursor, Cursor { row: 2, column: 3 });
        assert_eq!(cursor.moved(Direction::RowStart), Cursor { row: 2, column: 1 });
        assert_eq!(cursor.moved(Direction::Top), Cursor { row: 0, column: 1 });
    }

    #[test]
    fn test_format_cell() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_cell(&CellValue::Date(date)).as_deref(), Some("01/07/25"));
        assert_eq!(format_cell(&CellValue::Number(3.0)).as_deref(), Some("3"));
        assert_eq!(format_cell(&CellValue::text("done")).as_deref(), Some("done"));
        assert_eq!(format_cell(&CellValue::Empty), None);
    }

    #[test]
    fn test_escape_for_injection() {
        assert_eq!(escape_for_injection("it's"), "it\\'s");
        assert_eq!(escape_for_injection("a\\b"), "a\\\\b");
        assert_eq!(escape_for_injection("line1\r\nline2"), "line1\\nline2");
    }

    #[test]
    fn test_unescape_reverses_escape() {
        let raw = "Bob's \\ path\nnext";
        assert_eq!(unescape_injected(&escape_for_injection(raw)), raw);
    }

    #[test]
    fn test_default_pacing() {
        let pacing = Pacing::default();
        assert_eq!(pacing.after_move(Direction::Top), Duration::from_secs(1));
        assert_eq!(pacing.after_move(Direction::Right), Duration::from_millis(100));
        assert_eq!(Pacing::none().save, Duration::ZERO);
    }
}
