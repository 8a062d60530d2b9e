//! Task CLI commands

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use super::app::with_engine;
use super::output::Output;
use crate::domain::{Task, TaskGraph, TaskId, TaskStatus};
use crate::engine::DependencyEngine;
use crate::storage::Project;

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   taskdeps task add "Write schema"
    ///   taskdeps task add "Ship it" --description "Cut the release" --status in_progress
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,

        /// Initial status
        #[arg(long, short, default_value = "pending")]
        status: TaskStatus,
    },

    /// List all tasks
    List,

    /// Show task details, with its dependencies and dependents
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Change a task's title or description
    Edit {
        /// Task ID
        id: TaskId,

        /// New title
        #[arg(long, short)]
        title: Option<String>,

        /// New description (empty string clears it)
        #[arg(long, short)]
        description: Option<String>,
    },

    /// Set a task's status; completed and blocked cascade to dependents
    Status {
        /// Task ID
        id: TaskId,

        /// New status (pending, in_progress, completed, blocked)
        status: TaskStatus,
    },

    /// Delete a task and its dependency edges
    Delete {
        /// Task ID
        id: TaskId,

        /// Delete even if other tasks depend on it
        #[arg(long)]
        force: bool,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<ExitCode> {
    let done = match cmd {
        TaskCommands::Add {
            title,
            description,
            status,
        } => add_task(output, &title, description, status),
        TaskCommands::List => list_tasks(output),
        TaskCommands::Show { id } => show_task(output, id),
        TaskCommands::Edit {
            id,
            title,
            description,
        } => edit_task(output, id, title, description),
        TaskCommands::Status { id, status } => set_status(output, id, status),
        TaskCommands::Delete { id, force } => return delete_task(output, id, force),
    };
    done.map(|()| ExitCode::SUCCESS)
}

fn require_task(graph: &TaskGraph, id: TaskId) -> Result<&Task> {
    graph
        .task(id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))
}

fn add_task(
    output: &Output,
    title: &str,
    description: Option<String>,
    status: TaskStatus,
) -> Result<()> {
    if title.trim().is_empty() {
        anyhow::bail!("Task title cannot be empty");
    }

    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;

    let mut task = Task::new(graph.next_id()?, title).with_status(status);
    if let Some(description) = description {
        task.set_description(description);
    }
    let id = task.id;
    graph.insert_task(task);
    project.save_graph(&graph)?;

    info!(task = %id, "task created");
    let task = require_task(&graph, id)?;

    if output.is_json() {
        output.data(task);
    } else {
        output.success(&format!("Created task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let graph = project.load_graph()?;
    let tasks = graph.tasks();

    if output.is_json() {
        let items: Vec<_> = tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "title": t.title,
                    "status": t.status,
                    "depends_on": graph.dependencies(t.id),
                })
            })
            .collect();
        output.data(&items);
    } else if tasks.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<6} {:<12} TITLE", "ID", "STATUS");
        println!("{}", "-".repeat(60));

        for task in tasks {
            println!("{:<6} {:<12} {}", task.id, task.status, task.title);
        }
    }

    Ok(())
}

fn show_task(output: &Output, id: TaskId) -> Result<()> {
    let project = Project::open_current()?;
    let graph = project.load_graph()?;
    let task = require_task(&graph, id)?;

    let dependencies = graph.dependencies(id);
    let dependents = graph.dependents(id);

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "title": task.title,
            "description": task.description,
            "status": task.status,
            "created_at": task.created_at,
            "updated_at": task.updated_at,
            "depends_on": dependencies,
            "dependents": dependents,
        }));
        return Ok(());
    }

    println!("Task: {}", task.id);
    println!("Title: {}", task.title);
    println!("Status: {}", task.status);
    println!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M"));
    println!("Updated: {}", task.updated_at.format("%Y-%m-%d %H:%M"));

    let status_of = |id: &TaskId| {
        graph
            .task(*id)
            .map(|t| t.status.to_string())
            .unwrap_or_else(|| "?".to_string())
    };

    if !dependencies.is_empty() {
        println!("\nDepends on:");
        for dep in &dependencies {
            println!("  {} ({})", dep, status_of(dep));
        }
    }

    if !dependents.is_empty() {
        println!("\nRequired by:");
        for dep in &dependents {
            println!("  {} ({})", dep, status_of(dep));
        }
    }

    if let Some(desc) = &task.description {
        println!("\nDescription:");
        println!("{}", desc);
    }

    Ok(())
}

fn edit_task(
    output: &Output,
    id: TaskId,
    title: Option<String>,
    description: Option<String>,
) -> Result<()> {
    if title.is_none() && description.is_none() {
        anyhow::bail!("Nothing to change: pass --title or --description");
    }
    if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        anyhow::bail!("Task title cannot be empty");
    }

    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;

    let task = graph
        .task_mut(id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;
    if let Some(title) = title {
        task.rename(title);
    }
    if let Some(description) = description {
        task.set_description(description);
    }
    let task = task.clone();

    project.save_graph(&graph)?;

    if output.is_json() {
        output.data(&task);
    } else {
        output.success(&format!("Updated task: {} - {}", task.id, task.title));
    }

    Ok(())
}

fn set_status(output: &Output, id: TaskId, status: TaskStatus) -> Result<()> {
    let report = with_engine(|engine| engine.set_status(id, status))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "status": status,
            "changes": report.changes,
        }));
    } else {
        output.success(&format!("Task {} is now {}", id, status));
        output.changes(&report);
    }

    Ok(())
}

/// Deletes a task, or refuses with a warning naming its dependents
///
/// A refused delete leaves the task in place and exits with failure.
fn delete_task(output: &Output, id: TaskId, force: bool) -> Result<ExitCode> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;
    let mut graph = project.load_graph()?;

    require_task(&graph, id)?;
    let dependents = graph.dependents(id);

    if !dependents.is_empty() && project.config().project.protect_dependents && !force {
        output.warning(
            &format!(
                "Task {} is required by {} other task(s). Use --force to delete it anyway",
                id,
                dependents.len()
            ),
            &dependents,
        );
        return Ok(ExitCode::FAILURE);
    }

    let (task, former_dependents) = graph
        .remove_task(id)
        .with_context(|| format!("Task not found: {}", id))?;
    info!(task = %id, dependents = former_dependents.len(), "task deleted");

    let engine = DependencyEngine::new(graph)
        .with_auto_cascade(project.config().project.auto_cascade);
    let recomputed = engine.recompute(&former_dependents);
    project.save_graph(&engine.into_inner())?;
    let report = recomputed?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "deleted": task.id,
            "affected_tasks": former_dependents,
            "changes": report.changes,
        }));
    } else {
        output.success(&format!("Deleted task: {} - {}", task.id, task.title));
        output.id_list("Affected tasks", &former_dependents);
        output.changes(&report);
    }

    Ok(ExitCode::SUCCESS)
}
