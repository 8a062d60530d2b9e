//! # Storage Layer
//!
//! Persistence for taskdeps in git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.taskdeps/tasks.jsonl` |
//! | Dependencies | JSONL (one edge per line) | `.taskdeps/dependencies.jsonl` |
//! | Config | TOML | `.taskdeps/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - Each file read takes a shared `fs2` lock, each write an exclusive one
//! - All writes are atomic (temp file + rename)
//! - [`Project::lock`] serializes whole commands: load, validate, commit, save
//!
//! ## Project Structure
//!
//! ```text
//! .taskdeps/
//! ├── tasks.jsonl           # All tasks
//! ├── dependencies.jsonl    # All dependency edges
//! ├── config.toml           # Project configuration
//! ├── lock                  # Advisory lock file
//! └── .gitignore
//! ```

mod jsonl;
mod config;
mod project;

pub use jsonl::{DependencyFile, JsonlFile, TaskFile};
pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, DATA_DIR};
pub use project::{Project, ProjectError, ProjectLock};
