// ABOUTME: Workflow diff engine for specifications, parameters and workspace listings
// ABOUTME: Results are abstract entries; rendering belongs to the output module

pub mod engine;
pub mod entry;
pub mod workspace;

pub use engine::{diff_specs, render_value, WorkflowDiff};
pub use entry::{DiffEntry, DiffKind, DiffOrigin};
pub use workspace::{FileStat, WorkspaceListing};
