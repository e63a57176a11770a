//! Task graph builder: validation, cycle detection, and topological order.
//!
//! Uses `petgraph` to model the dependencies between top-level tasks (edges
//! point from a dependency to its dependent). Tasks referenced by Loop or
//! Parallel containers are sub-tasks: they never appear as graph nodes, and
//! their own dependencies are hoisted onto their top-level container.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};

use bizbrain_types::workflow::TaskDefinition;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Structural problems with a workflow's task set. Fatal before any task runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("duplicate task id '{0}'")]
    DuplicateTask(String),

    #[error("task '{task_id}' references unknown task '{missing}'")]
    DanglingReference { task_id: String, missing: String },

    #[error("task '{task_id}' depends on '{sub_task_id}', which only runs inside a loop or parallel task")]
    SubTaskDependency { task_id: String, sub_task_id: String },

    #[error("dependency cycle detected: {0}")]
    Cycle(String),
}

// ---------------------------------------------------------------------------
// TaskGraph
// ---------------------------------------------------------------------------

/// A validated workflow task graph.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    tasks: HashMap<String, TaskDefinition>,
    graph: DiGraph<String, ()>,
    nodes: HashMap<String, NodeIndex>,
    order: Vec<String>,
    sub_tasks: HashSet<String>,
    prerequisites: HashMap<String, Vec<String>>,
}

impl TaskGraph {
    /// Validate a flat task set and build its execution graph.
    ///
    /// Checks run in this order: duplicate ids, dangling references (both
    /// `depends_on` and container sub-task references), cycles over the
    /// combined dependency + containment relation, dependencies on sub-tasks.
    pub fn build(tasks: Vec<TaskDefinition>) -> Result<Self, GraphError> {
        let mut by_id: HashMap<String, TaskDefinition> = HashMap::with_capacity(tasks.len());
        for task in tasks {
            if by_id.contains_key(&task.id) {
                return Err(GraphError::DuplicateTask(task.id));
            }
            by_id.insert(task.id.clone(), task);
        }

        let mut ids: Vec<&String> = by_id.keys().collect();
        ids.sort();

        // Outgoing edges of the combined relation, per task: its dependencies
        // followed by the sub-tasks it contains.
        let mut relation: HashMap<&str, Vec<&str>> = HashMap::with_capacity(ids.len());
        let mut containment: HashMap<&str, Vec<String>> = HashMap::new();
        for id in &ids {
            let task = &by_id[id.as_str()];
            let subs = task.sub_task_refs();
            for referenced in task.depends_on.iter().chain(subs.iter()) {
                if !by_id.contains_key(referenced) {
                    return Err(GraphError::DanglingReference {
                        task_id: task.id.clone(),
                        missing: referenced.clone(),
                    });
                }
            }
            let mut edges: Vec<&str> = task.depends_on.iter().map(String::as_str).collect();
            for sub in &subs {
                // Borrow the key owned by `by_id` so `relation` outlives `subs`.
                if let Some((key, _)) = by_id.get_key_value(sub) {
                    edges.push(key.as_str());
                }
            }
            edges.sort_unstable();
            edges.dedup();
            relation.insert(id.as_str(), edges);
            if !subs.is_empty() {
                containment.insert(id.as_str(), subs);
            }
        }

        if let Some(cycle) = find_cycle(&ids, &relation) {
            return Err(GraphError::Cycle(cycle.join(" -> ")));
        }

        let sub_tasks: HashSet<String> = containment.values().flatten().cloned().collect();

        for id in &ids {
            let task = &by_id[id.as_str()];
            if let Some(sub) = task.depends_on.iter().find(|d| sub_tasks.contains(*d)) {
                return Err(GraphError::SubTaskDependency {
                    task_id: task.id.clone(),
                    sub_task_id: sub.clone(),
                });
            }
        }

        // Effective prerequisites of each top-level task: its own dependencies
        // plus those of every task it (transitively) contains.
        let mut prerequisites: HashMap<String, Vec<String>> = HashMap::new();
        for id in ids.iter().filter(|id| !sub_tasks.contains(id.as_str())) {
            let mut deps: BTreeSet<String> = BTreeSet::new();
            let mut stack = vec![id.as_str()];
            let mut seen: HashSet<&str> = HashSet::new();
            while let Some(current) = stack.pop() {
                if !seen.insert(current) {
                    continue;
                }
                deps.extend(by_id[current].depends_on.iter().cloned());
                if let Some(children) = containment.get(current) {
                    stack.extend(children.iter().map(String::as_str));
                }
            }
            prerequisites.insert((*id).clone(), deps.into_iter().collect());
        }

        let mut graph = DiGraph::<String, ()>::new();
        let mut nodes: HashMap<String, NodeIndex> = HashMap::new();
        for id in &ids {
            if !sub_tasks.contains(id.as_str()) {
                nodes.insert((*id).clone(), graph.add_node((*id).clone()));
            }
        }
        for (id, deps) in &prerequisites {
            for dep in deps {
                graph.add_edge(nodes[dep], nodes[id], ());
            }
        }

        let order = topological_order(&graph, &by_id);

        tracing::debug!(
            tasks = by_id.len(),
            top_level = order.len(),
            sub_tasks = sub_tasks.len(),
            "built task graph"
        );

        Ok(Self {
            tasks: by_id,
            graph,
            nodes,
            order,
            sub_tasks,
            prerequisites,
        })
    }

    /// Top-level task ids, dependencies before dependents, ties broken by
    /// (`order`, id).
    pub fn topological_order(&self) -> &[String] {
        &self.order
    }

    /// Any task of the workflow, top-level or sub-task.
    pub fn task(&self, id: &str) -> Option<&TaskDefinition> {
        self.tasks.get(id)
    }

    /// Effective prerequisites of a top-level task (empty for sub-tasks).
    pub fn prerequisites(&self, id: &str) -> &[String] {
        self.prerequisites
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Direct dependents of a top-level task, sorted by id.
    pub fn dependents(&self, id: &str) -> Vec<String> {
        let Some(&node) = self.nodes.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<String> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Every top-level task that (transitively) depends on `id`.
    pub fn transitive_dependents(&self, id: &str) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let Some(&start) = self.nodes.get(id) else {
            return out;
        };
        let mut bfs = Bfs::new(&self.graph, start);
        while let Some(node) = bfs.next(&self.graph) {
            if node != start {
                out.insert(self.graph[node].clone());
            }
        }
        out
    }

    pub fn is_sub_task(&self, id: &str) -> bool {
        self.sub_tasks.contains(id)
    }

    /// Number of top-level tasks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Three-colour depth-first search. Returns the first cycle found as a closed
/// path (`[a, b, a]`). Roots and edges are visited in sorted order.
fn find_cycle(ids: &[&String], relation: &HashMap<&str, Vec<&str>>) -> Option<Vec<String>> {
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    for root in ids {
        let root = root.as_str();
        if marks.contains_key(root) {
            continue;
        }
        // Explicit stack of (node, next edge index) plus the current path.
        let mut stack: Vec<(&str, usize)> = vec![(root, 0)];
        let mut path: Vec<&str> = vec![root];
        marks.insert(root, Mark::InProgress);

        while let Some((node, edge)) = stack.last_mut() {
            let edges = relation.get(*node).map(Vec::as_slice).unwrap_or_default();
            if let Some(&next) = edges.get(*edge) {
                *edge += 1;
                match marks.get(next) {
                    Some(Mark::InProgress) => {
                        let start = path.iter().position(|n| *n == next).unwrap_or(0);
                        let mut cycle: Vec<String> =
                            path[start..].iter().map(|s| s.to_string()).collect();
                        cycle.push(next.to_string());
                        return Some(cycle);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(next, Mark::InProgress);
                        stack.push((next, 0));
                        path.push(next);
                    }
                }
            } else {
                marks.insert(*node, Mark::Done);
                stack.pop();
                path.pop();
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Topological order
// ---------------------------------------------------------------------------

/// Kahn's algorithm with a min-heap on (`order`, id) for stable tie-breaking.
fn topological_order(
    graph: &DiGraph<String, ()>,
    tasks: &HashMap<String, TaskDefinition>,
) -> Vec<String> {
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();

    let key = |n: NodeIndex| {
        let id = &graph[n];
        let order = tasks.get(id).map(|t| t.order).unwrap_or_default();
        Reverse((order, id.clone(), n))
    };

    let mut ready: BinaryHeap<_> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| key(*n))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(Reverse((_, id, node))) = ready.pop() {
        order.push(id);
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            if let Some(d) = in_degree.get_mut(&next) {
                *d -= 1;
                if *d == 0 {
                    ready.push(key(next));
                }
            }
        }
    }
    order
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
