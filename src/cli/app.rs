//! Main CLI application structure

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use super::output::Output;
use super::{dep, graph, task};
use crate::domain::{TaskGraph, TaskId};
use crate::engine::{DependencyEngine, EngineError};
use crate::logging;
use crate::storage::{Config, OutputFormat, Project};

#[derive(Parser)]
#[command(name = "taskdeps")]
#[command(author, version, about = "Task dependency tracking with cycle prevention")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level (overrides --verbose, TASKDEPS_LOG and the project config)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Log level as exposed on the CLI
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskdeps project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(dep::DepCommands),

    /// Push a task's status out to everything that depends on it
    Cascade {
        /// Task ID
        id: TaskId,
    },

    /// Print the whole dependency graph
    Graph,

    /// Check the stored graph for dependency cycles
    Audit,
}

/// Main entry point for the CLI
///
/// Rejected engine operations are reported here and turn into a failing
/// exit code; every other error is returned to the caller.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = Config::load()?;

    logging::init_logging(
        cli.log_level,
        cli.verbose,
        config.project.log_level.as_deref(),
    )?;

    let output = Output::new(cli.format.unwrap_or(config.global.default_format));
    debug!(root = ?config.project_root, "taskdeps starting");

    let result = match cli.command {
        Commands::Init { path } => {
            let project = Project::init(&path)?;
            debug!(data_dir = %project.data_dir().display(), "project initialized");
            output.success(&format!(
                "Initialized taskdeps project at {}",
                project.root().display()
            ));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Task(cmd) => task::run(cmd, &output),
        Commands::Dep(cmd) => dep::run(cmd, &output).map(|()| ExitCode::SUCCESS),
        Commands::Cascade { id } => graph::cascade(&output, id).map(|()| ExitCode::SUCCESS),
        Commands::Graph => graph::show(&output).map(|()| ExitCode::SUCCESS),
        Commands::Audit => graph::audit(&output),
    };

    match result {
        Err(error) => match error.downcast_ref::<EngineError>() {
            Some(engine_error) => {
                output.engine_error(engine_error);
                Ok(ExitCode::FAILURE)
            }
            None => Err(error),
        },
        ok => ok,
    }
}

/// Runs an engine operation against the current project
///
/// The project lock is held across load, operation and save. The graph is
/// written back unless the operation was rejected before changing anything;
/// a cascade that failed part-way still has its applied writes saved.
pub(super) fn with_engine<R>(
    f: impl FnOnce(&DependencyEngine<TaskGraph>) -> Result<R, EngineError>,
) -> Result<R> {
    let project = Project::open_current()?;
    let _lock = project.lock()?;

    let graph = project.load_graph()?;
    let engine =
        DependencyEngine::new(graph).with_auto_cascade(project.config().project.auto_cascade);

    let result = f(&engine);
    if matches!(result, Ok(_) | Err(EngineError::Cascade(_))) {
        project.save_graph(&engine.into_inner())?;
    }

    Ok(result?)
}
