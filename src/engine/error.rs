use thiserror::Error;

use super::cascade::CascadeError;
use super::cycle::format_path;
use super::store::StoreError;
use crate::domain::TaskId;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Cannot add a task as a dependency to itself: {0}")]
    SelfDependency(TaskId),

    #[error("Dependency already exists: {task} depends on {depends_on}")]
    DuplicateEdge { task: TaskId, depends_on: TaskId },

    #[error("Circular dependency detected: {}", format_path(.path))]
    CycleDetected { path: Vec<TaskId> },

    #[error("Task not found: {0}")]
    UnknownTask(TaskId),

    #[error("Dependency not found: {task} does not depend on {depends_on}")]
    EdgeNotFound { task: TaskId, depends_on: TaskId },

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

impl EngineError {
    /// Stable machine-readable code for the error
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::SelfDependency(_) => "self_dependency",
            EngineError::DuplicateEdge { .. } => "duplicate_edge",
            EngineError::CycleDetected { .. } => "cycle_detected",
            EngineError::UnknownTask(_) => "unknown_task",
            EngineError::EdgeNotFound { .. } => "edge_not_found",
            EngineError::Store(_) => "store",
            EngineError::Cascade(_) => "cascade",
        }
    }

    /// The offending path, for cycle errors
    pub fn cycle_path(&self) -> Option<&[TaskId]> {
        match self {
            EngineError::CycleDetected { path } => Some(path),
            _ => None,
        }
    }

    /// Returns true for rejections of the request itself, as opposed to
    /// failures of the store underneath
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::SelfDependency(_)
                | EngineError::DuplicateEdge { .. }
                | EngineError::CycleDetected { .. }
                | EngineError::EdgeNotFound { .. }
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UnknownTask(id) => EngineError::UnknownTask(id),
            other => EngineError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_task_is_lifted_from_store() {
        let err: EngineError = StoreError::UnknownTask(TaskId::new(4)).into();
        assert_eq!(err, EngineError::UnknownTask(TaskId::new(4)));
        assert_eq!(err.kind(), "unknown_task");
    }

    #[test]
    fn cycle_message_includes_path() {
        let err = EngineError::CycleDetected {
            path: vec![TaskId::new(1), TaskId::new(2), TaskId::new(1)],
        };
        assert_eq!(err.to_string(), "Circular dependency detected: 1 -> 2 -> 1");
        assert_eq!(err.cycle_path().map(|p| p.len()), Some(3));
        assert!(err.is_validation());
    }

    #[test]
    fn backend_failures_are_not_validation() {
        let err: EngineError = StoreError::Backend("disk full".into()).into();
        assert_eq!(err.kind(), "store");
        assert!(!err.is_validation());
    }
}
