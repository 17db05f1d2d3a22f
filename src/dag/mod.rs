// src/dag/mod.rs

//! Target dependency graph and its ordering.
//!
//! - [`graph`] stores target -> prerequisites with first-seen ordering.
//! - [`tsort`] turns a graph into a build order, collapsing cycles.

pub mod graph;
pub mod tsort;

pub use graph::DependencyGraph;
pub use tsort::{sorted_components, topological_sort};
