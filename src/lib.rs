//! taskdeps - task dependency tracking
//!
//! Tasks depend on other tasks. taskdeps refuses any dependency that would
//! close a cycle and keeps statuses consistent as work moves: completing
//! every dependency of a pending task starts it, and a blocked dependency
//! blocks everything downstream.

pub mod domain;
pub mod engine;
pub mod storage;
pub mod cli;
pub mod logging;

pub use domain::{Dependency, Task, TaskGraph, TaskId, TaskStatus};
pub use engine::{DependencyEngine, EngineError, GraphStore};
