//! Execution ordering for planned tasks

use crate::planner::Task;
use scout_common::config::ExecutionMode;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Return the indices of `tasks` in the order they should run
pub fn execution_order(tasks: &[Task], mode: ExecutionMode) -> Vec<usize> {
    match mode {
        ExecutionMode::ListOrder => (0..tasks.len()).collect(),
        ExecutionMode::DependencyOrder => dependency_order(tasks),
    }
}

/// Kahn traversal over the task arena. Ties are broken by list index, ids that
/// name no task are ignored, and tasks caught in a cycle run last in list order.
fn dependency_order(tasks: &[Task]) -> Vec<usize> {
    let index_of: HashMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    let mut indegree = vec![0usize; tasks.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tasks.len()];

    for (i, task) in tasks.iter().enumerate() {
        let mut parents: Vec<usize> = task
            .depends_on
            .iter()
            .filter_map(|id| index_of.get(id.as_str()).copied())
            .filter(|&p| p != i)
            .collect();
        parents.sort_unstable();
        parents.dedup();

        indegree[i] = parents.len();
        for p in parents {
            dependents[p].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..tasks.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(tasks.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &child in &dependents[next] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                ready.insert(child);
            }
        }
    }

    if order.len() < tasks.len() {
        let blocked: Vec<usize> = (0..tasks.len()).filter(|i| !order.contains(i)).collect();
        warn!(
            tasks = ?blocked.iter().map(|&i| tasks[i].id.as_str()).collect::<Vec<_>>(),
            "Dependency cycle in plan, running remaining tasks in list order"
        );
        order.extend(blocked);
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            description: id.to_string(),
            search_query: id.to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_list_order_ignores_dependencies() {
        let tasks = vec![task("a", &["b"]), task("b", &[])];
        assert_eq!(execution_order(&tasks, ExecutionMode::ListOrder), vec![0, 1]);
    }

    #[test]
    fn test_dependency_order() {
        let tasks = vec![
            task("compare", &["x", "y"]),
            task("x", &[]),
            task("y", &["x"]),
        ];
        assert_eq!(execution_order(&tasks, ExecutionMode::DependencyOrder), vec![1, 2, 0]);
    }

    #[test]
    fn test_stable_by_list_index() {
        let tasks = vec![task("a", &[]), task("b", &["ghost"]), task("c", &[])];
        assert_eq!(execution_order(&tasks, ExecutionMode::DependencyOrder), vec![0, 1, 2]);
    }

    #[test]
    fn test_cycle_appended_in_list_order() {
        let tasks = vec![
            task("a", &["c"]),
            task("free", &[]),
            task("c", &["a"]),
            task("after", &["free"]),
        ];
        assert_eq!(execution_order(&tasks, ExecutionMode::DependencyOrder), vec![1, 3, 0, 2]);
    }
}
