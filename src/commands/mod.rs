//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod flamegraph;
pub mod models;
pub mod show;
pub mod utils;

// Re-export main command functions
pub use flamegraph::{execute_flamegraph, validate_flamegraph_args};
pub use models::{FlamegraphArgs, ShowArgs};
pub use show::{execute_show, execute_stacks, validate_show_args};
pub use utils::{display_schema, display_version, validate_report_file};
