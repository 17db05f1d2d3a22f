// src/dag/graph.rs

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
struct DagNode {
    /// Direct prerequisites: nodes that must be built before this one.
    deps: Vec<String>,
}

/// In-memory dependency graph keyed by target name.
///
/// Edge convention: `add_node("c", ["b"])` means "c depends on b", so `b`
/// sorts before `c`. Prerequisites that are never declared themselves are
/// kept as leaf nodes. Iteration follows first-seen order, which makes the
/// topological sort deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    nodes: HashMap<String, DagNode>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `name` with the given prerequisites.
    ///
    /// Declaring the same node twice replaces its prerequisite list.
    pub fn add_node<S: Into<String>>(&mut self, name: impl Into<String>, deps: impl IntoIterator<Item = S>) {
        let name = name.into();
        let mut new_deps: Vec<String> = Vec::new();
        for dep in deps {
            let dep = dep.into();
            if !new_deps.contains(&dep) {
                new_deps.push(dep);
            }
        }

        self.ensure(&name);
        for dep in &new_deps {
            self.ensure(dep);
        }

        self.ensure(&name).deps = new_deps;
    }

    fn ensure(&mut self, name: &str) -> &mut DagNode {
        if !self.nodes.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.nodes.entry(name.to_string()).or_default()
    }

    /// All node names (declared and leaf) in first-seen order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(|s| s.as_str())
    }

    /// Immediate prerequisites of a node.
    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K, S> FromIterator<(K, Vec<S>)> for DependencyGraph
where
    K: Into<String>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, Vec<S>)>>(iter: I) -> Self {
        let mut graph = DependencyGraph::new();
        for (name, deps) in iter {
            graph.add_node(name, deps);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_deps_and_leaves() {
        let graph: DependencyGraph = [("c", vec!["b"]), ("b", vec!["a"])].into_iter().collect();

        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["c", "b", "a"]);
        assert_eq!(graph.dependencies_of("c"), ["b".to_string()]);
        assert!(graph.dependencies_of("a").is_empty());
    }

    #[test]
    fn redeclaring_replaces_prerequisites() {
        let mut graph = DependencyGraph::new();
        graph.add_node("out", ["x", "y"]);
        graph.add_node("out", ["y"]);

        assert_eq!(graph.dependencies_of("out"), ["y".to_string()]);
        assert_eq!(graph.nodes().collect::<Vec<_>>(), vec!["out", "x", "y"]);
    }
}
