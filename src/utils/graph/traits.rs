//! Trait definitions for graph abstractions.
//!
//! The dominator engine and the traversal algorithms are written against these traits,
//! so the same code serves the generic [`crate::utils::graph::DirectedGraph`], the
//! basic-block graph, and the reversed view used for post-dominance.
//!
//! The hierarchy is minimal and composable:
//!
//! - [`GraphBase`] - node count and node iteration
//! - [`Successors`] - outward edge lookup
//! - [`Predecessors`] - inward edge lookup
//! - [`RootedGraph`] - a designated entry node, required for dominator computation

use crate::utils::graph::NodeId;

/// Base trait providing core graph properties.
///
/// All node ids yielded by [`node_ids`](GraphBase::node_ids) are less than
/// [`node_count`](GraphBase::node_count); per-node tables of that length can be indexed
/// by `NodeId::index` without further checks.
pub trait GraphBase {
    /// Returns the number of node slots in the graph.
    ///
    /// This count includes nodes that are unreachable from any root.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers in the graph, in ascending index
    /// order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support outward (forward) edge lookup.
///
/// For a directed edge `(u, v)`, node `v` is a successor of `u`.
pub trait Successors: GraphBase {
    /// Returns an iterator over the successor nodes of the given node.
    ///
    /// The iteration order is the order edges were added; algorithms that need
    /// deterministic output rely on this.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support inward (backward) edge lookup.
///
/// For a directed edge `(u, v)`, node `u` is a predecessor of `v`.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the predecessor nodes of the given node.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs with a designated entry (root) node.
///
/// Dominator computation requires a well-defined starting point: in a control flow
/// graph this is the entry block, and in the reversed post-dominance view it is the
/// synthetic virtual exit.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry (root) node of the graph.
    fn entry(&self) -> NodeId;
}
