//! Dependency CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::app::with_engine;
use super::output::Output;
use crate::domain::TaskId;
use crate::engine::{format_path, CascadeReport};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum DepCommands {
    /// Make a task depend on another
    ///
    /// Rejected if the edge would create a cycle.
    Add {
        /// Task that waits
        task: TaskId,

        /// Task that must finish first
        depends_on: TaskId,
    },

    /// Remove a dependency
    Remove {
        /// Task that waits
        task: TaskId,

        /// Dependency to remove
        depends_on: TaskId,
    },

    /// Check whether a dependency could be added, without adding it
    Check {
        /// Task that would wait
        task: TaskId,

        /// Task that would have to finish first
        depends_on: TaskId,
    },
}

pub fn run(cmd: DepCommands, output: &Output) -> Result<()> {
    match cmd {
        DepCommands::Add { task, depends_on } => add_dependency(output, task, depends_on),
        DepCommands::Remove { task, depends_on } => remove_dependency(output, task, depends_on),
        DepCommands::Check { task, depends_on } => check_dependency(output, task, depends_on),
    }
}

fn add_dependency(output: &Output, task_id: TaskId, depends_on_id: TaskId) -> Result<()> {
    let report = with_engine(|engine| engine.add_dependency(task_id, depends_on_id))?;

    report_edge_change(
        output,
        task_id,
        depends_on_id,
        "added",
        &format!("{} now depends on {}", task_id, depends_on_id),
        &report,
    );
    Ok(())
}

fn remove_dependency(output: &Output, task_id: TaskId, depends_on_id: TaskId) -> Result<()> {
    let report = with_engine(|engine| engine.remove_dependency(task_id, depends_on_id))?;

    report_edge_change(
        output,
        task_id,
        depends_on_id,
        "removed",
        &format!("{} no longer depends on {}", task_id, depends_on_id),
        &report,
    );
    Ok(())
}

fn report_edge_change(
    output: &Output,
    task_id: TaskId,
    depends_on_id: TaskId,
    action: &str,
    message: &str,
    report: &CascadeReport,
) {
    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id,
            "depends_on": depends_on_id,
            "action": action,
            "changes": report.changes,
        }));
    } else {
        output.success(message);
        output.changes(report);
    }
}

fn check_dependency(output: &Output, task_id: TaskId, depends_on_id: TaskId) -> Result<()> {
    let project = Project::open_current()?;
    let engine = crate::engine::DependencyEngine::new(project.load_graph()?);

    let cycle = engine.validate_and_describe_cycle(task_id, depends_on_id)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id,
            "depends_on": depends_on_id,
            "valid": cycle.is_none(),
            "path": cycle,
        }));
    } else {
        match &cycle {
            None => println!("OK: {} can depend on {}", task_id, depends_on_id),
            Some(path) => println!("Would create a cycle: {}", format_path(path)),
        }
    }

    Ok(())
}
