//! Project management
//!
//! Handles project initialization, the project-wide write lock, and moving
//! the task graph between its files and memory.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use thiserror::Error;

use super::config::{Config, DATA_DIR};
use super::jsonl::{DependencyFile, TaskFile};
use crate::domain::TaskGraph;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a taskdeps project. Run 'taskdeps init' first.")]
    NotInProject,
}

/// Exclusive hold on a project's data
///
/// Held for a whole load, mutate, save cycle so concurrent invocations
/// cannot validate edges against a stale graph. Released on drop.
pub struct ProjectLock {
    file: File,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// A taskdeps project
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(DATA_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let data_dir = root.join(DATA_DIR);

        fs::create_dir_all(&data_dir).with_context(|| {
            format!("Failed to create {} directory: {}", DATA_DIR, data_dir.display())
        })?;

        // Create default config
        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            let default_config = r#"# taskdeps configuration

# Propagate status changes to dependent tasks automatically
auto_cascade = true

# Refuse to delete tasks that other tasks depend on (override with --force)
protect_dependents = true

# Default log level: error, warn, info, debug, trace
# log_level = "warn"
"#;
            fs::write(&config_path, default_config)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = data_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let gitignore = r#"# Lock and temp files are transient
lock
*.tmp
"#;
            fs::write(&gitignore_path, gitignore).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the `.taskdeps` directory path
    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the task file
    pub fn task_file(&self) -> TaskFile {
        TaskFile::new(self.data_dir().join("tasks.jsonl"))
    }

    /// Returns the dependency file
    pub fn dependency_file(&self) -> DependencyFile {
        DependencyFile::new(self.data_dir().join("dependencies.jsonl"))
    }

    /// Takes the project-wide exclusive lock, blocking until it is free
    pub fn lock(&self) -> Result<ProjectLock> {
        let path = self.data_dir().join("lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock project: {}", path.display()))?;

        Ok(ProjectLock { file })
    }

    /// Loads every task and edge into memory
    pub fn load_graph(&self) -> Result<TaskGraph> {
        let tasks = self.task_file().read_all()?;
        let edges = self.dependency_file().read_all()?;

        TaskGraph::from_parts(tasks, edges).context("Stored dependencies are inconsistent")
    }

    /// Writes the whole graph back to disk
    pub fn save_graph(&self, graph: &TaskGraph) -> Result<()> {
        self.task_file().write_all(graph.tasks())?;
        self.dependency_file().write_all(&graph.edges())
    }
}
