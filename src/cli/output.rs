//! Output formatting for CLI commands

use serde::Serialize;

use crate::domain::TaskId;
use crate::engine::{CascadeReport, EngineError};
use crate::storage::OutputFormat;

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Prints a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": true,
                        "message": message
                    })
                );
            }
        }
    }

    /// Prints a rejected engine operation
    ///
    /// JSON output carries the error kind and, for cycles, the offending path.
    pub fn engine_error(&self, error: &EngineError) {
        match self.format {
            OutputFormat::Text => eprintln!("Error: {}", error),
            OutputFormat::Json => {
                let mut body = serde_json::json!({
                    "success": false,
                    "error": error.to_string(),
                    "kind": error.kind(),
                });
                if let Some(path) = error.cycle_path() {
                    body["path"] = serde_json::json!(path);
                }
                eprintln!("{}", body);
            }
        }
    }

    /// Prints a refusal that names the tasks it would have affected
    ///
    /// JSON goes to stdout as `{"warning", "affected_tasks", "count"}`.
    pub fn warning(&self, message: &str, affected: &[TaskId]) {
        match self.format {
            OutputFormat::Text => {
                eprintln!("Warning: {}", message);
                let list: Vec<String> = affected.iter().map(|id| id.to_string()).collect();
                eprintln!("Affected tasks: {}", list.join(", "));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "warning": message,
                        "affected_tasks": affected,
                        "count": affected.len(),
                    })
                );
            }
        }
    }

    /// Prints structured data
    pub fn data<T: Serialize>(&self, data: &T) {
        match self.format {
            OutputFormat::Text => {
                // Text callers normally print themselves; pretty JSON is the fallback
                if let Ok(json) = serde_json::to_string_pretty(data) {
                    println!("{}", json);
                }
            }
            OutputFormat::Json => {
                if let Ok(json) = serde_json::to_string(data) {
                    println!("{}", json);
                }
            }
        }
    }

    /// Prints the status changes a cascade applied (text only)
    pub fn changes(&self, report: &CascadeReport) {
        if self.format != OutputFormat::Text {
            return;
        }
        for change in &report.changes {
            println!("  {}: {} -> {}", change.task, change.from, change.to);
        }
    }

    /// Prints a list of task IDs under a heading (text only)
    pub fn id_list(&self, heading: &str, ids: &[TaskId]) {
        if self.format != OutputFormat::Text || ids.is_empty() {
            return;
        }
        let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        println!("{}: {}", heading, list.join(", "));
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }
}
