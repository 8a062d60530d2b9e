//! Status cascade
//!
//! When a task's status or its set of dependencies changes, the statuses
//! derived from it may change too. A cascade wave recomputes the affected
//! tasks with [`derive_status`] and keeps going through the dependents of
//! every task whose status moved.
//!
//! The wave first discovers the dependent closure of its seeds, then visits
//! it in dependency order so each task is evaluated at most once, after all
//! of its in-wave dependencies have settled. On a corrupted (cyclic) graph
//! the members stuck on the cycle are evaluated once each afterwards, so the
//! wave still terminates.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use super::store::{GraphStore, StoreError};
use super::traversal;
use crate::domain::{TaskId, TaskStatus};

/// Derives a task's status from the statuses of its dependencies
///
/// Returns the new status, or `None` when the task is left untouched.
/// Tasks never leave `blocked` or `completed` through this policy.
pub fn derive_status(current: TaskStatus, dependencies: &[TaskStatus]) -> Option<TaskStatus> {
    if dependencies.is_empty() {
        return None;
    }

    if dependencies.iter().any(TaskStatus::is_blocked) {
        return (current != TaskStatus::Blocked).then_some(TaskStatus::Blocked);
    }

    if dependencies.iter().all(TaskStatus::is_complete) && current.is_pending() {
        return Some(TaskStatus::InProgress);
    }

    None
}

/// A status write performed by a cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusChange {
    pub task: TaskId,
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// Outcome of a cascade wave
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Status writes, in the order they were applied
    pub changes: Vec<StatusChange>,

    /// Number of tasks the policy was evaluated on
    pub evaluated: usize,
}

impl CascadeReport {
    /// Returns true if the wave changed nothing
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// A task the wave could not evaluate or update
#[derive(Debug, Clone, PartialEq, Error)]
#[error("task {task}: {error}")]
pub struct CascadeFailure {
    pub task: TaskId,
    #[source]
    pub error: StoreError,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CascadeError {
    #[error("Cascade could not start: {0}")]
    Discovery(#[source] StoreError),

    #[error(
        "Cascade partially applied: {} change(s) written, {} task(s) failed",
        .applied.len(),
        .failures.len()
    )]
    Partial {
        applied: Vec<StatusChange>,
        failures: Vec<CascadeFailure>,
    },
}

/// Applies the status policy through a store
pub struct StatusCascader<'a, S: ?Sized> {
    store: &'a mut S,
}

impl<'a, S> StatusCascader<'a, S>
where
    S: GraphStore + ?Sized,
{
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Re-evaluates one task and writes its new status if the policy changes it
    pub fn recompute(&mut self, task_id: TaskId) -> Result<Option<StatusChange>, StoreError> {
        let task = self.store.get_task(task_id)?;

        let statuses = self
            .store
            .list_dependencies(task_id)?
            .into_iter()
            .map(|dep| self.store.get_task(dep).map(|t| t.status))
            .collect::<Result<Vec<_>, _>>()?;

        let Some(next) = derive_status(task.status, &statuses) else {
            return Ok(None);
        };

        self.store.set_status(task_id, next)?;
        debug!(task = %task_id, from = %task.status, to = %next, "status derived");

        Ok(Some(StatusChange {
            task: task_id,
            from: task.status,
            to: next,
        }))
    }

    /// Pushes a change of `task_id`'s own status out to its dependents
    pub fn cascade_from(&mut self, task_id: TaskId) -> Result<CascadeReport, CascadeError> {
        let seeds = self
            .store
            .list_dependents(task_id)
            .map_err(CascadeError::Discovery)?;
        self.run_wave(&seeds)
    }

    /// Recomputes `seeds` and cascades from whichever of them change
    pub fn run_wave(&mut self, seeds: &[TaskId]) -> Result<CascadeReport, CascadeError> {
        let closure =
            traversal::dependent_closure(&*self.store, seeds).map_err(CascadeError::Discovery)?;
        let schedule = closure.schedule();

        if !schedule.residue.is_empty() {
            warn!(
                tasks = ?schedule.residue,
                "cascade reached tasks on a dependency cycle; evaluating each once"
            );
        }

        let seeds: HashSet<TaskId> = seeds.iter().copied().collect();
        let mut dirty: HashSet<TaskId> = HashSet::new();
        let mut report = CascadeReport::default();
        let mut failures = Vec::new();

        for task_id in schedule.ordered.into_iter().chain(schedule.residue) {
            if !seeds.contains(&task_id) && !dirty.contains(&task_id) {
                continue;
            }

            report.evaluated += 1;
            match self.recompute(task_id) {
                Ok(Some(change)) => {
                    dirty.extend(closure.dependents_of(task_id).iter().copied());
                    report.changes.push(change);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(task = %task_id, %error, "cascade step failed");
                    failures.push(CascadeFailure {
                        task: task_id,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(CascadeError::Partial {
                applied: report.changes,
                failures,
            })
        }
    }
}
