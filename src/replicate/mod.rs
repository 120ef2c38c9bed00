// ABOUTME: Selective replication of plan rows into an interactive remote grid
// ABOUTME: Exposes the remote capability, row filter, replicator loop and grid backends

pub mod filter;
pub mod recording;
pub mod remote;
pub mod replicator;
pub mod webdriver;

pub use filter::{FilterColumns, RowDecision, RowFilter, StopReason};
pub use recording::{RecordingGrid, RemoteAction};
pub use remote::{Cursor, Direction, Pacing, RemoteGrid};
pub use replicator::{ReplicateStats, Replicator};
pub use webdriver::WebDriverGrid;
