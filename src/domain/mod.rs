//! Domain models for taskdeps
//!
//! Contains the task model and the in-memory task graph, without any I/O
//! concerns.

mod id;
mod task;
mod graph;

pub use id::{IdError, TaskId};
pub use task::{Dependency, ParseStatusError, Task, TaskStatus};
pub use graph::TaskGraph;
