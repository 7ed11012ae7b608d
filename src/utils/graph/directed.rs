//! Core adjacency-list directed graph.
//!
//! [`DirectedGraph`] is the concrete graph used wherever no domain structure is needed:
//! unit tests for the dominator engine, the benchmark harness, and as a building block
//! for synthetic graphs. The domain graphs (basic blocks) implement the traversal
//! traits directly over their own arenas instead of wrapping this type.

use crate::{
    utils::graph::{
        node::NodeId,
        traits::{GraphBase, Predecessors, Successors},
    },
    Error, Result,
};

/// A directed graph with typed node data and adjacency-list edge storage.
///
/// Nodes are addressed by [`NodeId`] in insertion order. Multiple edges between the
/// same pair of nodes are allowed; algorithms that care deduplicate while traversing.
///
/// # Examples
///
/// ```rust
/// use logicscript::utils::graph::{DirectedGraph, GraphBase, Successors};
///
/// // Diamond: A -> B, A -> C, B -> D, C -> D
/// let mut graph: DirectedGraph<&str> = DirectedGraph::new();
/// let a = graph.add_node("A");
/// let b = graph.add_node("B");
/// let c = graph.add_node("C");
/// let d = graph.add_node("D");
///
/// graph.add_edge(a, b).unwrap();
/// graph.add_edge(a, c).unwrap();
/// graph.add_edge(b, d).unwrap();
/// graph.add_edge(c, d).unwrap();
///
/// assert_eq!(graph.node_count(), 4);
/// assert_eq!(graph.successors(a).count(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph<N> {
    /// Node data storage, indexed by `NodeId`
    nodes: Vec<N>,
    /// Outgoing adjacency per node
    outgoing: Vec<Vec<NodeId>>,
    /// Incoming adjacency per node
    incoming: Vec<Vec<NodeId>>,
}

impl<N> DirectedGraph<N> {
    /// Creates a new empty directed graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Creates a new directed graph with pre-allocated node capacity.
    #[must_use]
    pub fn with_capacity(node_capacity: usize) -> Self {
        DirectedGraph {
            nodes: Vec::with_capacity(node_capacity),
            outgoing: Vec::with_capacity(node_capacity),
            incoming: Vec::with_capacity(node_capacity),
        }
    }

    /// Adds a new node with the given data and returns its id.
    ///
    /// Ids are assigned sequentially starting from 0.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Adds a directed edge from `source` to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either endpoint does not exist in the graph.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId) -> Result<()> {
        if source.index() >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "source node {} does not exist in graph with {} nodes",
                source,
                self.nodes.len()
            )));
        }
        if target.index() >= self.nodes.len() {
            return Err(Error::GraphError(format!(
                "target node {} does not exist in graph with {} nodes",
                target,
                self.nodes.len()
            )));
        }

        self.outgoing[source.index()].push(target);
        self.incoming[target.index()].push(source);
        Ok(())
    }

    /// Returns a reference to the data associated with the given node, or `None` if the
    /// node does not exist.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Returns `true` if the graph contains no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of edges in the graph.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.outgoing.iter().map(Vec::len).sum()
    }

    /// Returns an iterator over all nodes with their identifiers.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, data)| (NodeId::new(i), data))
    }
}

impl<N> GraphBase for DirectedGraph<N> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N> Successors for DirectedGraph<N> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.outgoing
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .copied()
    }
}

impl<N> Predecessors for DirectedGraph<N> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.incoming
            .get(node.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .copied()
    }
}
