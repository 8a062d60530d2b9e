//! Storage interface consumed by the engine

use thiserror::Error;

use crate::domain::{Task, TaskId, TaskStatus};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    UnknownTask(TaskId),

    #[error("Storage failure: {0}")]
    Backend(String),
}

/// Capabilities the engine needs from whatever holds tasks and edges
///
/// An edge `(task_id, depends_on_id)` means `task_id` depends on
/// `depends_on_id`. Adjacency lists are returned in ascending ID order.
/// Implementations must not validate acyclicity themselves.
pub trait GraphStore {
    /// Returns a copy of the task
    fn get_task(&self, task_id: TaskId) -> Result<Task, StoreError>;

    /// Returns the tasks `task_id` depends on
    fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskId>, StoreError>;

    /// Returns the tasks that depend on `task_id`
    fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskId>, StoreError>;

    /// Returns true if the edge is present
    fn edge_exists(&self, task_id: TaskId, depends_on_id: TaskId) -> Result<bool, StoreError>;

    /// Inserts an edge; fails if either task is unknown
    fn insert_edge(&mut self, task_id: TaskId, depends_on_id: TaskId) -> Result<(), StoreError>;

    /// Deletes an edge, returning false if it was not present
    fn delete_edge(&mut self, task_id: TaskId, depends_on_id: TaskId) -> Result<bool, StoreError>;

    /// Overwrites the status of a task
    fn set_status(&mut self, task_id: TaskId, status: TaskStatus) -> Result<(), StoreError>;

    /// Returns every task ID, ascending
    fn list_all_task_ids(&self) -> Result<Vec<TaskId>, StoreError>;
}
