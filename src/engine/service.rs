//! Engine entry points for the request layer
//!
//! [`DependencyEngine`] owns a store behind a mutex. Every operation holds
//! the lock from its first read to its last write, so an edge is validated
//! and committed as one unit and no cascade observes a half-applied change.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::cascade::{CascadeReport, StatusCascader};
use super::cycle::{format_path, CycleDetector};
use super::error::EngineError;
use super::store::GraphStore;
use crate::domain::{TaskId, TaskStatus};

pub struct DependencyEngine<S> {
    store: Mutex<S>,
    auto_cascade: bool,
}

impl<S: GraphStore> DependencyEngine<S> {
    /// Wraps a store; cascading is on by default
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
            auto_cascade: true,
        }
    }

    /// Enables or disables automatic cascades after graph changes
    ///
    /// With cascading off, [`cascade_from`](Self::cascade_from) still works
    /// when called explicitly.
    pub fn with_auto_cascade(mut self, enabled: bool) -> Self {
        self.auto_cascade = enabled;
        self
    }

    /// Releases the store
    pub fn into_inner(self) -> S {
        self.store
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        // Poison is ignored: each store call leaves the graph consistent on
        // its own.
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a read-only closure against the store
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock())
    }

    /// Describes the cycle that `task_id -> depends_on_id` would close
    ///
    /// Returns `None` when the edge is safe. A self-loop is always a cycle.
    pub fn validate_and_describe_cycle(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> Result<Option<Vec<TaskId>>, EngineError> {
        let store = self.lock();
        store.get_task(task_id)?;
        store.get_task(depends_on_id)?;

        Ok(CycleDetector::new(&*store).detect_cycle(task_id, depends_on_id)?)
    }

    /// Validates and commits `task_id -> depends_on_id`, then recomputes
    /// `task_id` and cascades from it
    ///
    /// If the cascade fails part-way the edge stays committed and the error
    /// carries the partial outcome.
    pub fn add_dependency(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> Result<CascadeReport, EngineError> {
        if task_id == depends_on_id {
            return Err(EngineError::SelfDependency(task_id));
        }

        let mut store = self.lock();
        store.get_task(task_id)?;
        store.get_task(depends_on_id)?;

        if store.edge_exists(task_id, depends_on_id)? {
            return Err(EngineError::DuplicateEdge {
                task: task_id,
                depends_on: depends_on_id,
            });
        }

        if let Some(path) = CycleDetector::new(&*store).detect_cycle(task_id, depends_on_id)? {
            debug!(task = %task_id, depends_on = %depends_on_id, cycle = %format_path(&path), "edge rejected");
            return Err(EngineError::CycleDetected { path });
        }

        store.insert_edge(task_id, depends_on_id)?;
        info!(task = %task_id, depends_on = %depends_on_id, "dependency added");

        if !self.auto_cascade {
            return Ok(CascadeReport::default());
        }
        Ok(StatusCascader::new(&mut *store).run_wave(&[task_id])?)
    }

    /// Deletes `task_id -> depends_on_id`, then recomputes `task_id`
    pub fn remove_dependency(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> Result<CascadeReport, EngineError> {
        let mut store = self.lock();

        if !store.delete_edge(task_id, depends_on_id)? {
            return Err(EngineError::EdgeNotFound {
                task: task_id,
                depends_on: depends_on_id,
            });
        }
        info!(task = %task_id, depends_on = %depends_on_id, "dependency removed");

        if !self.auto_cascade {
            return Ok(CascadeReport::default());
        }
        Ok(StatusCascader::new(&mut *store).run_wave(&[task_id])?)
    }

    /// Applies a direct status edit
    ///
    /// Moving a task to completed or blocked cascades to its dependents.
    pub fn set_status(
        &self,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<CascadeReport, EngineError> {
        let mut store = self.lock();
        let previous = store.get_task(task_id)?.status;

        if previous == status {
            return Ok(CascadeReport::default());
        }

        store.set_status(task_id, status)?;
        info!(task = %task_id, from = %previous, to = %status, "status set");

        if !self.auto_cascade || !status.propagates() {
            return Ok(CascadeReport::default());
        }
        Ok(StatusCascader::new(&mut *store).cascade_from(task_id)?)
    }

    /// Pushes `task_id`'s current status out to its dependents
    pub fn cascade_from(&self, task_id: TaskId) -> Result<CascadeReport, EngineError> {
        let mut store = self.lock();
        store.get_task(task_id)?;

        Ok(StatusCascader::new(&mut *store).cascade_from(task_id)?)
    }

    /// Recomputes tasks that lost dependencies outside the engine, such as
    /// the former dependents of a deleted task
    pub fn recompute(&self, task_ids: &[TaskId]) -> Result<CascadeReport, EngineError> {
        if !self.auto_cascade || task_ids.is_empty() {
            return Ok(CascadeReport::default());
        }

        let mut store = self.lock();
        Ok(StatusCascader::new(&mut *store).run_wave(task_ids)?)
    }

    /// Returns the tasks that depend on `task_id`
    pub fn dependents_of(&self, task_id: TaskId) -> Result<Vec<TaskId>, EngineError> {
        Ok(self.lock().list_dependents(task_id)?)
    }

    /// Sweeps the whole graph for cycles
    pub fn audit_cycles(&self) -> Result<Vec<Vec<TaskId>>, EngineError> {
        let store = self.lock();
        let cycles = CycleDetector::new(&*store).get_all_cycles()?;

        for cycle in &cycles {
            warn!(cycle = %format_path(cycle), "dependency cycle found");
        }
        Ok(cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskGraph};
    use crate::engine::CascadeError;
    use std::sync::Arc;
    use std::thread;

    use TaskStatus::{Blocked, Completed, InProgress, Pending};

    fn id(n: u64) -> TaskId {
        TaskId::new(n)
    }

    fn engine(n: u64) -> DependencyEngine<TaskGraph> {
        let mut graph = TaskGraph::new();
        for i in 1..=n {
            graph.insert_task(Task::new(id(i), format!("Task {}", i)));
        }
        DependencyEngine::new(graph)
    }

    fn status(engine: &DependencyEngine<TaskGraph>, n: u64) -> TaskStatus {
        engine.read(|g| g.task(id(n)).map(|t| t.status)).unwrap()
    }

    #[test]
    fn self_dependency_rejected() {
        let engine = engine(1);

        let err = engine.add_dependency(id(1), id(1)).unwrap_err();
        assert_eq!(err, EngineError::SelfDependency(id(1)));
        assert_eq!(
            engine.validate_and_describe_cycle(id(1), id(1)).unwrap(),
            Some(vec![id(1), id(1)])
        );
    }

    #[test]
    fn engine_keeps_working_after_a_panicking_reader() {
        let engine = engine(2);
        engine.add_dependency(id(2), id(1)).unwrap();

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            engine.read(|_| panic!("reader failed"))
        }));
        assert!(panicked.is_err());

        assert_eq!(engine.read(|g| g.edge_count()), 1);
        assert_eq!(
            engine.add_dependency(id(1), id(2)).unwrap_err().kind(),
            "cycle_detected"
        );
    }

    #[test]
    fn duplicate_edge_rejected_and_graph_unchanged() {
        let engine = engine(2);
        engine.add_dependency(id(1), id(2)).unwrap();

        let err = engine.add_dependency(id(1), id(2)).unwrap_err();
        assert_eq!(err.kind(), "duplicate_edge");
        assert_eq!(engine.read(|g| g.edge_count()), 1);
    }

    #[test]
    fn cycle_rejected_with_path_and_not_committed() {
        let engine = engine(3);
        engine.add_dependency(id(1), id(2)).unwrap();
        engine.add_dependency(id(2), id(3)).unwrap();

        assert_eq!(
            engine.validate_and_describe_cycle(id(3), id(1)).unwrap(),
            Some(vec![id(1), id(2), id(3), id(1)])
        );

        let err = engine.add_dependency(id(3), id(1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::CycleDetected { path: vec![id(1), id(2), id(3), id(1)] }
        );
        assert!(engine.read(|g| g.dependencies(id(3)).is_empty()));
    }

    #[test]
    fn unknown_tasks_rejected() {
        let engine = engine(1);

        assert_eq!(
            engine.add_dependency(id(1), id(9)).unwrap_err(),
            EngineError::UnknownTask(id(9))
        );
        assert_eq!(
            engine.validate_and_describe_cycle(id(8), id(1)).unwrap_err(),
            EngineError::UnknownTask(id(8))
        );
        assert_eq!(engine.cascade_from(id(5)).unwrap_err(), EngineError::UnknownTask(id(5)));
    }

    #[test]
    fn new_edge_recomputes_source_task() {
        let engine = engine(2);
        engine.set_status(id(2), Blocked).unwrap();

        let report = engine.add_dependency(id(1), id(2)).unwrap();

        assert_eq!(status(&engine, 1), Blocked);
        assert_eq!(report.changes.len(), 1);
    }

    #[test]
    fn completing_dependency_starts_dependent() {
        // A=1 -> B=2 -> C=3
        let engine = engine(3);
        engine.add_dependency(id(1), id(2)).unwrap();
        engine.add_dependency(id(2), id(3)).unwrap();

        engine.set_status(id(3), Completed).unwrap();

        assert_eq!(status(&engine, 2), InProgress);
        assert_eq!(status(&engine, 1), Pending);

        // Nothing left to do on a second pass
        assert!(engine.cascade_from(id(3)).unwrap().is_empty());
    }

    #[test]
    fn non_terminal_status_edit_does_not_cascade() {
        let engine = engine(2);
        engine.add_dependency(id(1), id(2)).unwrap();
        engine.set_status(id(1), Blocked).unwrap();

        let report = engine.set_status(id(2), InProgress).unwrap();
        assert!(report.is_empty());
        assert_eq!(status(&engine, 1), Blocked);
    }

    #[test]
    fn removing_edge_recomputes_task() {
        // 1 depends on 2 (completed) and 3 (pending)
        let engine = engine(3);
        engine.set_status(id(2), Completed).unwrap();
        engine.add_dependency(id(1), id(2)).unwrap();
        engine.add_dependency(id(1), id(3)).unwrap();
        assert_eq!(status(&engine, 1), InProgress);

        // Reset to pending and drop the unfinished dependency
        engine.set_status(id(1), Pending).unwrap();
        let report = engine.remove_dependency(id(1), id(3)).unwrap();

        assert_eq!(status(&engine, 1), InProgress);
        assert_eq!(report.changes.len(), 1);
    }

    #[test]
    fn removing_missing_edge_fails() {
        let engine = engine(2);
        let err = engine.remove_dependency(id(1), id(2)).unwrap_err();
        assert_eq!(err.kind(), "edge_not_found");
    }

    #[test]
    fn auto_cascade_off_commits_without_propagating() {
        let engine = engine(2).with_auto_cascade(false);
        engine.set_status(id(2), Blocked).unwrap();
        engine.add_dependency(id(1), id(2)).unwrap();

        assert_eq!(status(&engine, 1), Pending);

        // Explicit cascade still runs
        engine.cascade_from(id(2)).unwrap();
        assert_eq!(status(&engine, 1), Blocked);
    }

    #[test]
    fn recompute_after_external_removal() {
        let engine = engine(3);
        engine.set_status(id(2), Completed).unwrap();
        engine.add_dependency(id(1), id(2)).unwrap();
        engine.add_dependency(id(1), id(3)).unwrap();
        engine.set_status(id(1), Pending).unwrap();

        let mut graph = engine.into_inner();
        graph.remove_task(id(3));
        let engine = DependencyEngine::new(graph);

        engine.recompute(&[id(1)]).unwrap();
        assert_eq!(status(&engine, 1), InProgress);
    }

    #[test]
    fn audit_reports_corruption() {
        let engine = engine(2);
        engine.add_dependency(id(1), id(2)).unwrap();
        assert!(engine.audit_cycles().unwrap().is_empty());

        // Bypass validation the way a broken writer would
        let mut graph = engine.into_inner();
        graph.insert_edge(id(2), id(1)).unwrap();
        let engine = DependencyEngine::new(graph);

        assert_eq!(engine.audit_cycles().unwrap(), vec![vec![id(1), id(2), id(1)]]);
    }

    #[test]
    fn concurrent_insertions_cannot_jointly_close_a_cycle() {
        for _ in 0..50 {
            let engine = Arc::new(engine(2));

            let handles: Vec<_> = [(1, 2), (2, 1)]
                .into_iter()
                .map(|(a, b)| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || engine.add_dependency(id(a), id(b)).is_ok())
                })
                .collect();

            let accepted = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count();

            assert_eq!(accepted, 1);
            assert!(engine.audit_cycles().unwrap().is_empty());
        }
    }

    #[test]
    fn cascade_error_is_wrapped() {
        let err: EngineError = CascadeError::Partial {
            applied: vec![],
            failures: vec![],
        }
        .into();
        assert_eq!(err.kind(), "cascade");
    }
}
