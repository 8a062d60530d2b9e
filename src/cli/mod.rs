//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init` |
//! | Task | Task records and status | `task add`, `task status`, `task delete` |
//! | Dep | Dependency edges | `dep add`, `dep remove`, `dep check` |
//! | Graph | Whole-graph views | `graph`, `audit`, `cascade` |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! The default can be changed with `default_format` in the global config.
//!
//! ## Logging
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr, or `--log-level`:
//! ```bash
//! taskdeps --log-level info dep add 3 1
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod task;
mod dep;
mod graph;

pub use app::{run, Cli, Commands, LogLevel};
pub use output::Output;
pub use crate::storage::OutputFormat;
