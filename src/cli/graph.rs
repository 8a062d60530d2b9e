//! Whole-graph CLI commands: graph, audit, cascade

use std::process::ExitCode;

use anyhow::Result;

use super::app::with_engine;
use super::output::Output;
use crate::domain::TaskId;
use crate::engine::{format_path, DependencyEngine};
use crate::storage::Project;

/// Prints every task and edge
pub fn show(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let graph = project.load_graph()?;
    let edges = graph.edges();

    if output.is_json() {
        let nodes: Vec<_> = graph
            .tasks()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "title": t.title,
                    "status": t.status,
                })
            })
            .collect();
        let edges: Vec<_> = edges
            .iter()
            .map(|e| serde_json::json!({ "from": e.task, "to": e.depends_on }))
            .collect();

        output.data(&serde_json::json!({
            "nodes": nodes,
            "edges": edges,
            "order": graph.topological_order(),
        }));
        return Ok(());
    }

    if graph.is_empty() {
        println!("No tasks");
        return Ok(());
    }

    println!("Tasks ({}):", graph.len());
    for task in graph.tasks() {
        println!("  {:<6} {:<12} {}", task.id, task.status, task.title);
    }

    if !edges.is_empty() {
        println!("\nDependencies ({}):", edges.len());
        for edge in &edges {
            println!("  {} -> {}", edge.task, edge.depends_on);
        }
    }

    match graph.topological_order() {
        Some(order) => println!("\nOrder: {}", format_path(&order)),
        None => println!("\nOrder: unavailable, the graph contains a cycle (run 'taskdeps audit')"),
    }

    Ok(())
}

/// Reports every dependency cycle in the stored graph
///
/// Exits with failure when any cycle is found.
pub fn audit(output: &Output) -> Result<ExitCode> {
    let project = Project::open_current()?;
    let engine = DependencyEngine::new(project.load_graph()?);
    let cycles = engine.audit_cycles()?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "ok": cycles.is_empty(),
            "cycles": cycles,
        }));
    } else if cycles.is_empty() {
        println!("No dependency cycles found");
    } else {
        println!("Found {} dependency cycle(s):", cycles.len());
        for cycle in &cycles {
            println!("  {}", format_path(cycle));
        }
    }

    Ok(if cycles.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Re-derives the statuses of everything downstream of a task
pub fn cascade(output: &Output, id: TaskId) -> Result<()> {
    let report = with_engine(|engine| engine.cascade_from(id))?;

    if output.is_json() {
        output.data(&report);
    } else if report.is_empty() {
        println!("No status changes ({} task(s) evaluated)", report.evaluated);
    } else {
        output.success(&format!(
            "Cascade from {} changed {} task(s):",
            id,
            report.changes.len()
        ));
        output.changes(&report);
    }

    Ok(())
}
