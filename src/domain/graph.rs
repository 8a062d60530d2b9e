//! In-memory task graph
//!
//! Holds every task together with the dependency edges between them and
//! implements [`GraphStore`] so the engine can run against it directly.
//! Uses petgraph for edge storage and topological ordering.
//!
//! The graph itself does not enforce acyclicity: validating edges is the
//! engine's job, and a raw graph must be able to hold a corrupted edge set
//! so the integrity audit can report it.

use chrono::{DateTime, Utc};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::id::{IdError, TaskId};
use super::task::{Dependency, Task, TaskStatus};
use crate::engine::{GraphStore, StoreError};

/// Tasks plus their dependency edges
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Task records by ID
    tasks: HashMap<TaskId, Task>,

    /// Edge direction is `depends_on -> task`, weighted with the creation time
    graph: DiGraph<TaskId, DateTime<Utc>>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,
}

impl TaskGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from stored tasks and edges
    ///
    /// Edges are loaded as-is, without cycle validation.
    pub fn from_parts(
        tasks: impl IntoIterator<Item = Task>,
        edges: impl IntoIterator<Item = Dependency>,
    ) -> Result<Self, StoreError> {
        let mut graph = Self::new();

        for task in tasks {
            graph.insert_task(task);
        }

        for edge in edges {
            graph.insert_dependency(edge)?;
        }

        Ok(graph)
    }

    /// Returns the ID the next created task will receive
    ///
    /// Fails once the highest stored ID is `u64::MAX`.
    pub fn next_id(&self) -> Result<TaskId, IdError> {
        match self.tasks.keys().max() {
            Some(id) => id.next(),
            None => Ok(TaskId::new(1)),
        }
    }

    /// Creates a new pending task with the next free ID
    pub fn create_task(&mut self, title: impl Into<String>) -> Result<TaskId, IdError> {
        let id = self.next_id()?;
        self.insert_task(Task::new(id, title));
        Ok(id)
    }

    /// Inserts or replaces a task record
    pub fn insert_task(&mut self, task: Task) {
        let id = task.id;
        if !self.node_map.contains_key(&id) {
            let idx = self.graph.add_node(id);
            self.node_map.insert(id, idx);
        }
        self.tasks.insert(id, task);
    }

    /// Removes a task and all of its edges
    ///
    /// Returns the removed task and the tasks that depended on it.
    pub fn remove_task(&mut self, task_id: TaskId) -> Option<(Task, Vec<TaskId>)> {
        let task = self.tasks.remove(&task_id)?;
        let dependents = self.neighbors(task_id, Direction::Outgoing);

        if let Some(idx) = self.node_map.remove(&task_id) {
            self.graph.remove_node(idx);
            // petgraph moves the last node into the freed index
            self.rebuild_node_map();
        }

        Some((task, dependents))
    }

    /// Rebuilds the node map after removal
    fn rebuild_node_map(&mut self) {
        self.node_map.clear();
        for idx in self.graph.node_indices() {
            if let Some(task_id) = self.graph.node_weight(idx) {
                self.node_map.insert(*task_id, idx);
            }
        }
    }

    /// Inserts a stored edge, keeping its timestamp
    ///
    /// Inserting an edge that already exists is a no-op.
    pub fn insert_dependency(&mut self, edge: Dependency) -> Result<(), StoreError> {
        let task_idx = self.index_of(edge.task)?;
        let dep_idx = self.index_of(edge.depends_on)?;

        if self.graph.find_edge(dep_idx, task_idx).is_none() {
            self.graph.add_edge(dep_idx, task_idx, edge.created_at);
        }

        Ok(())
    }

    fn index_of(&self, task_id: TaskId) -> Result<NodeIndex, StoreError> {
        self.node_map
            .get(&task_id)
            .copied()
            .ok_or(StoreError::UnknownTask(task_id))
    }

    /// Returns neighbors in ascending ID order
    fn neighbors(&self, task_id: TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(idx) = self.node_map.get(&task_id) else {
            return vec![];
        };

        let mut ids: Vec<TaskId> = self
            .graph
            .neighbors_directed(*idx, direction)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        ids.sort();
        ids
    }

    /// Returns the task with the given ID
    pub fn task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.get(&task_id)
    }

    /// Returns a mutable reference to the task with the given ID
    pub fn task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&task_id)
    }

    /// Returns all tasks sorted by ID
    pub fn tasks(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.tasks.values().collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    /// Returns the direct dependencies of a task
    pub fn dependencies(&self, task_id: TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Incoming)
    }

    /// Returns the direct dependents of a task (tasks that depend on it)
    pub fn dependents(&self, task_id: TaskId) -> Vec<TaskId> {
        self.neighbors(task_id, Direction::Outgoing)
    }

    /// Returns every edge, sorted by (task, depends_on)
    pub fn edges(&self) -> Vec<Dependency> {
        let mut edges: Vec<Dependency> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                let depends_on = *self.graph.node_weight(e.source())?;
                let task = *self.graph.node_weight(e.target())?;
                Some(Dependency {
                    task,
                    depends_on,
                    created_at: *e.weight(),
                })
            })
            .collect();
        edges.sort_by_key(|e| (e.task, e.depends_on));
        edges
    }

    /// Returns all tasks in topological order (dependencies before dependents)
    ///
    /// Returns `None` if the edge set contains a cycle.
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        toposort(&self.graph, None).ok().map(|order| {
            order
                .into_iter()
                .filter_map(|idx| self.graph.node_weight(idx).copied())
                .collect()
        })
    }

    /// Returns true if the graph contains the task
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Returns the number of dependency edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl GraphStore for TaskGraph {
    fn get_task(&self, task_id: TaskId) -> Result<Task, StoreError> {
        self.tasks
            .get(&task_id)
            .cloned()
            .ok_or(StoreError::UnknownTask(task_id))
    }

    fn list_dependencies(&self, task_id: TaskId) -> Result<Vec<TaskId>, StoreError> {
        self.index_of(task_id)?;
        Ok(self.dependencies(task_id))
    }

    fn list_dependents(&self, task_id: TaskId) -> Result<Vec<TaskId>, StoreError> {
        self.index_of(task_id)?;
        Ok(self.dependents(task_id))
    }

    fn edge_exists(&self, task_id: TaskId, depends_on_id: TaskId) -> Result<bool, StoreError> {
        let task_idx = self.index_of(task_id)?;
        let dep_idx = self.index_of(depends_on_id)?;
        Ok(self.graph.find_edge(dep_idx, task_idx).is_some())
    }

    fn insert_edge(&mut self, task_id: TaskId, depends_on_id: TaskId) -> Result<(), StoreError> {
        self.insert_dependency(Dependency::new(task_id, depends_on_id))
    }

    fn delete_edge(&mut self, task_id: TaskId, depends_on_id: TaskId) -> Result<bool, StoreError> {
        let task_idx = self.index_of(task_id)?;
        let dep_idx = self.index_of(depends_on_id)?;

        match self.graph.find_edge(dep_idx, task_idx) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_status(&mut self, task_id: TaskId, status: TaskStatus) -> Result<(), StoreError> {
        let task = self
            .tasks
            .get_mut(&task_id)
            .ok_or(StoreError::UnknownTask(task_id))?;
        task.set_status(status);
        Ok(())
    }

    fn list_all_task_ids(&self) -> Result<Vec<TaskId>, StoreError> {
        let mut ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}
