//! Cycle detection
//!
//! Two entry points:
//!
//! - [`CycleDetector::detect_cycle`] checks a single proposed edge. Adding
//!   `task -> depends_on` closes a cycle exactly when `depends_on` already
//!   reaches `task`, so one depth-first search from `depends_on` decides it.
//! - [`CycleDetector::get_all_cycles`] sweeps the whole graph for corruption.
//!   It reports at least one witness per strongly connected component that
//!   contains a cycle; witnesses may overlap.
//!
//! Cycle paths are closed: the first and last IDs are the same.

use std::collections::HashSet;

use super::store::{GraphStore, StoreError};
use super::traversal::{self, Frame};
use crate::domain::TaskId;

/// Renders a path as `1 -> 2 -> 3`
pub fn format_path(path: &[TaskId]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Read-only cycle checks over a store
pub struct CycleDetector<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CycleDetector<'a, S>
where
    S: GraphStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Returns the cycle that adding `task_id -> depends_on_id` would close
    ///
    /// The path runs from `depends_on_id` along existing edges to `task_id`
    /// and ends with `depends_on_id` again (the proposed edge). A self-loop
    /// yields `[task_id, task_id]`.
    pub fn detect_cycle(
        &self,
        task_id: TaskId,
        depends_on_id: TaskId,
    ) -> Result<Option<Vec<TaskId>>, StoreError> {
        let found = traversal::find_path(self.store, depends_on_id, task_id)?;

        Ok(found.map(|mut path| {
            path.push(depends_on_id);
            path
        }))
    }

    /// Finds cycle witnesses anywhere in the graph
    pub fn get_all_cycles(&self) -> Result<Vec<Vec<TaskId>>, StoreError> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut cycles = Vec::new();

        for root in self.store.list_all_task_ids()? {
            if !visited.insert(root) {
                continue;
            }

            on_stack.insert(root);
            let mut stack = vec![Frame::new(root, self.store.list_dependencies(root)?)];

            while let Some(frame) = stack.last_mut() {
                match frame.next_neighbor() {
                    Some(next) if visited.insert(next) => {
                        on_stack.insert(next);
                        let neighbors = self.store.list_dependencies(next)?;
                        stack.push(Frame::new(next, neighbors));
                    }
                    Some(next) if on_stack.contains(&next) => {
                        if let Some(start) = stack.iter().position(|f| f.node == next) {
                            let mut cycle: Vec<TaskId> =
                                stack[start..].iter().map(|f| f.node).collect();
                            cycle.push(next);
                            cycles.push(cycle);
                        }
                    }
                    Some(_) => {}
                    None => {
                        if let Some(done) = stack.pop() {
                            on_stack.remove(&done.node);
                        }
                    }
                }
            }
        }

        Ok(cycles)
    }
}
