//! Graph traversal shared by the cycle detector and the cascader
//!
//! All walks use explicit stacks or queues plus visited sets, so call depth
//! stays constant and every walk terminates even on a corrupted graph.

use std::collections::{HashMap, HashSet, VecDeque};

use super::store::{GraphStore, StoreError};
use crate::domain::TaskId;

/// One level of an explicit DFS stack
pub(crate) struct Frame {
    pub node: TaskId,
    pending: std::vec::IntoIter<TaskId>,
}

impl Frame {
    pub fn new(node: TaskId, neighbors: Vec<TaskId>) -> Self {
        Self {
            node,
            pending: neighbors.into_iter(),
        }
    }

    /// Next unexplored neighbor of this node
    pub fn next_neighbor(&mut self) -> Option<TaskId> {
        self.pending.next()
    }
}

/// Finds a path `from -> ... -> to` following depends_on edges
///
/// The returned path starts with `from` and ends with `to`.
pub fn find_path<S>(store: &S, from: TaskId, to: TaskId) -> Result<Option<Vec<TaskId>>, StoreError>
where
    S: GraphStore + ?Sized,
{
    if from == to {
        return Ok(Some(vec![from]));
    }

    let mut visited = HashSet::from([from]);
    let mut stack = vec![Frame::new(from, store.list_dependencies(from)?)];

    while let Some(frame) = stack.last_mut() {
        match frame.next_neighbor() {
            Some(next) if next == to => {
                let mut path: Vec<TaskId> = stack.iter().map(|f| f.node).collect();
                path.push(to);
                return Ok(Some(path));
            }
            Some(next) => {
                if visited.insert(next) {
                    let neighbors = store.list_dependencies(next)?;
                    stack.push(Frame::new(next, neighbors));
                }
            }
            None => {
                stack.pop();
            }
        }
    }

    Ok(None)
}

/// The seeds of a cascade wave plus every task transitively depending on them
#[derive(Debug, Default)]
pub struct DependentClosure {
    /// Members in discovery (breadth-first) order
    pub members: Vec<TaskId>,
    dependencies: HashMap<TaskId, Vec<TaskId>>,
    dependents: HashMap<TaskId, Vec<TaskId>>,
}

/// Evaluation order for a closure
#[derive(Debug, Default, PartialEq)]
pub struct Schedule {
    /// Members whose in-closure dependencies all come earlier
    pub ordered: Vec<TaskId>,
    /// Members stuck on a cycle, in discovery order
    pub residue: Vec<TaskId>,
}

impl DependentClosure {
    /// Direct dependents of a member
    pub fn dependents_of(&self, task_id: TaskId) -> &[TaskId] {
        self.dependents
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Returns true if the task is part of the closure
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.dependents.contains_key(&task_id)
    }

    /// Orders members so each comes after its in-closure dependencies
    ///
    /// Kahn's algorithm restricted to the closure. Members left over when
    /// the queue drains sit on a cycle and are returned as residue.
    pub fn schedule(&self) -> Schedule {
        let mut in_degree: HashMap<TaskId, usize> = self
            .members
            .iter()
            .map(|id| {
                let count = self
                    .dependencies
                    .get(id)
                    .map(|deps| deps.iter().filter(|d| self.contains(**d)).count())
                    .unwrap_or(0);
                (*id, count)
            })
            .collect();

        let mut queue: VecDeque<TaskId> = self
            .members
            .iter()
            .copied()
            .filter(|id| in_degree.get(id) == Some(&0))
            .collect();

        let mut ordered = Vec::with_capacity(self.members.len());
        while let Some(id) = queue.pop_front() {
            ordered.push(id);
            for dependent in self.dependents_of(id) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }

        let placed: HashSet<TaskId> = ordered.iter().copied().collect();
        let residue = self
            .members
            .iter()
            .copied()
            .filter(|id| !placed.contains(id))
            .collect();

        Schedule { ordered, residue }
    }
}

/// Collects `seeds` and all of their transitive dependents
pub fn dependent_closure<S>(store: &S, seeds: &[TaskId]) -> Result<DependentClosure, StoreError>
where
    S: GraphStore + ?Sized,
{
    let mut closure = DependentClosure::default();
    let mut seen = HashSet::new();
    let mut queue: VecDeque<TaskId> = seeds.iter().copied().filter(|id| seen.insert(*id)).collect();

    while let Some(id) = queue.pop_front() {
        let dependents = store.list_dependents(id)?;
        let dependencies = store.list_dependencies(id)?;

        for dependent in &dependents {
            if seen.insert(*dependent) {
                queue.push_back(*dependent);
            }
        }

        closure.members.push(id);
        closure.dependents.insert(id, dependents);
        closure.dependencies.insert(id, dependencies);
    }

    Ok(closure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskGraph};

    fn id(n: u64) -> TaskId {
        TaskId::new(n)
    }

    /// Builds a graph of `n` tasks with the given (task, depends_on) edges
    fn graph(n: u64, edges: &[(u64, u64)]) -> TaskGraph {
        let mut graph = TaskGraph::new();
        for i in 1..=n {
            graph.insert_task(Task::new(id(i), format!("Task {}", i)));
        }
        for (task, dep) in edges {
            graph.insert_edge(id(*task), id(*dep)).unwrap();
        }
        graph
    }

    #[test]
    fn find_path_follows_dependencies() {
        let g = graph(4, &[(1, 2), (2, 3), (3, 4)]);

        let path = find_path(&g, id(1), id(4)).unwrap();
        assert_eq!(path, Some(vec![id(1), id(2), id(3), id(4)]));

        // Edges are never followed backwards
        assert_eq!(find_path(&g, id(4), id(1)).unwrap(), None);
    }

    #[test]
    fn find_path_backtracks_out_of_dead_ends() {
        // 1 -> 2 (dead end), 1 -> 3 -> 4
        let g = graph(4, &[(1, 2), (1, 3), (3, 4)]);

        let path = find_path(&g, id(1), id(4)).unwrap();
        assert_eq!(path, Some(vec![id(1), id(3), id(4)]));
    }

    #[test]
    fn find_path_terminates_on_cycles() {
        let g = graph(3, &[(1, 2), (2, 1)]);
        assert_eq!(find_path(&g, id(1), id(3)).unwrap(), None);
    }

    #[test]
    fn find_path_deep_chain_uses_no_recursion() {
        let n = 20_000;
        let edges: Vec<(u64, u64)> = (1..n).map(|i| (i, i + 1)).collect();
        let g = graph(n, &edges);

        let path = find_path(&g, id(1), id(n)).unwrap().unwrap();
        assert_eq!(path.len(), n as usize);
    }

    #[test]
    fn closure_collects_transitive_dependents() {
        // 2 and 3 depend on 1, 4 depends on 3; 5 is unrelated
        let g = graph(5, &[(2, 1), (3, 1), (4, 3)]);

        let closure = dependent_closure(&g, &[id(1)]).unwrap();
        assert_eq!(closure.members, vec![id(1), id(2), id(3), id(4)]);
        assert_eq!(closure.dependents_of(id(3)), &[id(4)]);
        assert!(!closure.contains(id(5)));
    }

    #[test]
    fn schedule_respects_diamond() {
        // 4 depends on 2 and 3, which both depend on 1; 4 also depends on 1
        let g = graph(4, &[(2, 1), (3, 1), (4, 2), (4, 3), (4, 1)]);

        let schedule = dependent_closure(&g, &[id(1)]).unwrap().schedule();
        assert_eq!(schedule.ordered, vec![id(1), id(2), id(3), id(4)]);
        assert!(schedule.residue.is_empty());
    }

    #[test]
    fn schedule_waits_for_longer_paths() {
        // 4 depends on 1 directly and through 2 -> 3
        let g = graph(4, &[(2, 1), (3, 2), (4, 3), (4, 1)]);

        let schedule = dependent_closure(&g, &[id(1)]).unwrap().schedule();
        let pos = |t: TaskId| schedule.ordered.iter().position(|x| *x == t).unwrap();
        assert!(pos(id(3)) < pos(id(4)));
    }

    #[test]
    fn schedule_reports_cycle_residue() {
        // 2 and 3 depend on each other, both downstream of 1
        let g = graph(3, &[(2, 1), (2, 3), (3, 2)]);

        let schedule = dependent_closure(&g, &[id(1)]).unwrap().schedule();
        assert_eq!(schedule.ordered, vec![id(1)]);
        assert_eq!(schedule.residue, vec![id(2), id(3)]);
    }
}
