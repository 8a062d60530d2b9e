//! Property tests for cycle prevention and status cascades

use std::collections::{HashSet, VecDeque};

use proptest::prelude::*;
use taskdeps::engine::{derive_status, CycleDetector, DependencyEngine, EngineError};
use taskdeps::{GraphStore, Task, TaskGraph, TaskId, TaskStatus};

fn id(n: usize) -> TaskId {
    TaskId::new(n as u64 + 1)
}

fn graph_with_tasks(n: usize, statuses: &[TaskStatus]) -> TaskGraph {
    let mut graph = TaskGraph::new();
    for i in 0..n {
        let status = statuses.get(i).copied().unwrap_or_default();
        graph.insert_task(Task::new(id(i), format!("Task {}", i)).with_status(status));
    }
    graph
}

// Breadth-first reachability along "depends on" edges
fn reaches(graph: &TaskGraph, from: TaskId, to: TaskId) -> bool {
    let mut seen = HashSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        if current == to {
            return true;
        }
        for next in graph.dependencies(current) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    false
}

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Blocked),
    ]
}

// Task count plus candidate edges as index pairs below that count
fn edges_strategy(max_tasks: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (2..=max_tasks).prop_flat_map(|n| {
        let pairs = proptest::collection::vec((0..n, 0..n), 0..n * 3);
        (Just(n), pairs)
    })
}

// Builds a DAG by keeping only edges that point from a higher to a lower index
fn dag_from(n: usize, pairs: &[(usize, usize)], statuses: &[TaskStatus]) -> TaskGraph {
    let mut graph = graph_with_tasks(n, statuses);
    for &(a, b) in pairs {
        if a > b {
            let _ = graph.insert_edge(id(a), id(b));
        }
    }
    graph
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn engine_never_admits_a_cycle((n, pairs) in edges_strategy(10)) {
        let engine = DependencyEngine::new(graph_with_tasks(n, &[]));

        for (a, b) in pairs {
            match engine.add_dependency(id(a), id(b)) {
                Ok(_) => {}
                Err(EngineError::CycleDetected { path }) => {
                    // Closed path that starts at depends_on and walks existing edges to task
                    prop_assert_eq!(path.first(), Some(&id(b)));
                    prop_assert_eq!(path.last(), Some(&id(b)));
                    prop_assert_eq!(path[path.len() - 2], id(a));
                    engine.read(|graph| {
                        for pair in path[..path.len() - 1].windows(2) {
                            assert!(graph.edge_exists(pair[0], pair[1]).unwrap());
                        }
                    });
                }
                Err(EngineError::SelfDependency(_)) => prop_assert_eq!(a, b),
                Err(EngineError::DuplicateEdge { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error: {}", other),
            }
        }

        prop_assert!(engine.audit_cycles().unwrap().is_empty());
        let graph = engine.into_inner();
        prop_assert!(graph.topological_order().is_some());
    }

    #[test]
    fn detector_agrees_with_reachability(
        (n, pairs) in edges_strategy(10),
        a in 0usize..10,
        b in 0usize..10,
    ) {
        let graph = dag_from(n, &pairs, &[]);
        let (task, depends_on) = (id(a % n), id(b % n));

        let cycle = CycleDetector::new(&graph).detect_cycle(task, depends_on).unwrap();

        prop_assert_eq!(cycle.is_some(), reaches(&graph, depends_on, task));
    }

    #[test]
    fn cascade_is_idempotent_and_bounded(
        (n, pairs) in edges_strategy(10),
        statuses in proptest::collection::vec(status_strategy(), 10),
        seed in 0usize..10,
    ) {
        let engine = DependencyEngine::new(dag_from(n, &pairs, &statuses));
        let seed = id(seed % n);

        let first = engine.cascade_from(seed).unwrap();
        prop_assert!(first.evaluated <= n);

        let second = engine.cascade_from(seed).unwrap();
        prop_assert!(second.is_empty(), "second cascade changed {:?}", second.changes);
    }

    #[test]
    fn cascade_settles_every_task_it_touches(
        (n, pairs) in edges_strategy(10),
        statuses in proptest::collection::vec(status_strategy(), 10),
        seed in 0usize..10,
    ) {
        let engine = DependencyEngine::new(dag_from(n, &pairs, &statuses));
        let seed = id(seed % n);
        let report = engine.cascade_from(seed).unwrap();

        let graph = engine.into_inner();

        // Direct dependents of the seed and of every changed task are re-derived
        let mut touched: HashSet<TaskId> = graph.dependents(seed).into_iter().collect();
        for change in &report.changes {
            touched.extend(graph.dependents(change.task));
        }

        for task_id in touched {
            let task = graph.task(task_id).unwrap();
            let deps: Vec<TaskStatus> = graph
                .dependencies(task_id)
                .iter()
                .filter_map(|d| graph.task(*d).map(|t| t.status))
                .collect();
            prop_assert_eq!(derive_status(task.status, &deps), None, "task {} unsettled", task_id);
        }
    }
}
