// ABOUTME: Command implementations for each step of the plan workflow
// ABOUTME: Exports report, changes, apply, run and replicate commands

pub mod apply;
pub mod changes;
pub mod replicate;
pub mod report;
pub mod run;

pub use apply::apply;
pub use changes::changes;
pub use replicate::{replicate, ReplicateOptions};
pub use report::report;
pub use run::run;
