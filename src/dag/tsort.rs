// src/dag/tsort.rs

//! Cycle-tolerant topological ordering.
//!
//! Nodes are first grouped into strongly connected components (Tarjan, via
//! `petgraph`), then the component graph is ordered with Kahn's algorithm.
//! Ties between ready components go to the one seen first in the input, so
//! the output is stable for a given graph.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::errors::{BuildclothError, Result};
use crate::types::CyclePolicy;

/// Order every node of `graph` so that prerequisites come before the nodes
/// that depend on them.
///
/// Each node appears exactly once. Nodes on a cycle are emitted together in
/// first-seen order under [`CyclePolicy::Warn`]; [`CyclePolicy::Reject`]
/// turns any cycle (including a self-dependency) into `DependencyCycle`.
pub fn topological_sort(graph: &DependencyGraph, policy: CyclePolicy) -> Result<Vec<String>> {
    Ok(sorted_components(graph, policy)?.into_iter().flatten().collect())
}

/// Like [`topological_sort`], but keeps the members of each strongly
/// connected component grouped. Acyclic nodes form single-member groups.
pub fn sorted_components(
    graph: &DependencyGraph,
    policy: CyclePolicy,
) -> Result<Vec<Vec<String>>> {
    let names: Vec<&str> = graph.nodes().collect();
    let index_of: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    // Edge direction: prerequisite -> dependent.
    let mut pg: DiGraph<usize, ()> = DiGraph::with_capacity(names.len(), names.len());
    let indices: Vec<NodeIndex> = (0..names.len()).map(|i| pg.add_node(i)).collect();
    for (i, name) in names.iter().enumerate() {
        for dep in graph.dependencies_of(name) {
            if let Some(&j) = index_of.get(dep.as_str()) {
                pg.add_edge(indices[j], indices[i], ());
            }
        }
    }

    let mut components: Vec<Vec<usize>> = tarjan_scc(&pg)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<usize> = scc.into_iter().map(|ix| pg[ix]).collect();
            members.sort_unstable();
            members
        })
        .collect();
    components.sort_by_key(|members| members[0]);

    let mut component_of = vec![0usize; names.len()];
    for (c, members) in components.iter().enumerate() {
        for &m in members {
            component_of[m] = c;
        }
    }

    for members in &components {
        let self_loop = members.len() == 1 && {
            let n = indices[members[0]];
            pg.contains_edge(n, n)
        };
        if members.len() > 1 || self_loop {
            let cycle: Vec<&str> = members.iter().map(|&m| names[m]).collect();
            match policy {
                CyclePolicy::Reject => {
                    return Err(BuildclothError::DependencyCycle(format!(
                        "targets depend on each other: {}",
                        cycle.join(" -> ")
                    )));
                }
                CyclePolicy::Warn => {
                    warn!(?cycle, "dependency cycle detected; treating members as one unit");
                }
            }
        }
    }

    // Condensed graph, then Kahn.
    let mut successors: Vec<HashSet<usize>> = vec![HashSet::new(); components.len()];
    let mut incoming = vec![0usize; components.len()];
    for edge in pg.raw_edges() {
        let from = component_of[pg[edge.source()]];
        let to = component_of[pg[edge.target()]];
        if from != to && successors[from].insert(to) {
            incoming[to] += 1;
        }
    }

    // Components are sorted by their first member, so the component id is
    // also its first-seen rank.
    let mut ready: BinaryHeap<Reverse<usize>> = incoming
        .iter()
        .enumerate()
        .filter(|&(_, &n)| n == 0)
        .map(|(c, _)| Reverse(c))
        .collect();

    let mut result: Vec<Vec<String>> = Vec::with_capacity(components.len());
    while let Some(Reverse(c)) = ready.pop() {
        result.push(components[c].iter().map(|&m| names[m].to_string()).collect());

        let mut next: Vec<usize> = successors[c].iter().copied().collect();
        next.sort_unstable();
        for s in next {
            incoming[s] -= 1;
            if incoming[s] == 0 {
                ready.push(Reverse(s));
            }
        }
    }

    debug!(order = ?result, "topologically sorted dependency graph");
    Ok(result)
}
