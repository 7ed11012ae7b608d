//! Guarded depth-first graph traversal.
//!
//! The traversals here are *guarded*: a visited bitmap ensures every node is yielded at
//! most once, so they terminate on cyclic graphs. [`dfs`] yields pre-order and is lazy;
//! [`postorder`] collects, since the order requires a full traversal anyway.

use crate::utils::graph::{NodeId, Successors};

/// Depth-first search iterator over graph nodes.
///
/// Performs an iterative pre-order traversal from a start node, visiting each reachable
/// node exactly once. Successors are explored in the order the graph yields them.
///
/// # Examples
///
/// ```rust
/// use logicscript::utils::graph::{algorithms::dfs, DirectedGraph, NodeId};
///
/// let mut graph: DirectedGraph<char> = DirectedGraph::new();
/// let a = graph.add_node('A');
/// let b = graph.add_node('B');
/// let c = graph.add_node('C');
/// graph.add_edge(a, b).unwrap();
/// graph.add_edge(b, c).unwrap();
/// graph.add_edge(c, a).unwrap(); // cycle terminates anyway
///
/// let visited: Vec<NodeId> = dfs(&graph, a).collect();
/// assert_eq!(visited, vec![a, b, c]);
/// ```
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<'g, G: Successors> DfsIterator<'g, G> {
    fn new(graph: &'g G, start: NodeId) -> Self {
        let node_count = graph.node_count();
        if start.index() >= node_count {
            return DfsIterator {
                graph,
                stack: Vec::new(),
                visited: Vec::new(),
            };
        }

        let mut visited = vec![false; node_count];
        visited[start.index()] = true;

        DfsIterator {
            graph,
            stack: vec![start],
            visited,
        }
    }
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Push unvisited successors in reverse so they pop in natural order
        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &succ in successors.iter().rev() {
            if !self.visited[succ.index()] {
                self.visited[succ.index()] = true;
                self.stack.push(succ);
            }
        }

        Some(node)
    }
}

/// Returns a guarded depth-first pre-order iterator starting from the given node.
///
/// Nodes not reachable from `start` are not visited. A `start` outside the graph
/// yields an empty iterator.
///
/// # Complexity
///
/// O(V + E) time, O(V) space.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    DfsIterator::new(graph, start)
}

/// Returns the nodes reachable from `start` in depth-first post-order.
///
/// A node appears after all of its descendants in the DFS tree. Reversing the result
/// gives reverse post-order, the canonical iteration order for forward analyses.
#[must_use]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    let mut visited = vec![false; node_count];
    let mut order = Vec::new();
    // (node, child cursor) pairs; expanding lazily keeps this iterative
    let mut stack: Vec<(NodeId, Vec<NodeId>, usize)> = Vec::new();

    visited[start.index()] = true;
    stack.push((start, graph.successors(start).collect(), 0));

    while let Some((node, children, cursor)) = stack.last_mut() {
        if let Some(&next) = children.get(*cursor) {
            *cursor += 1;
            if !visited[next.index()] {
                visited[next.index()] = true;
                stack.push((next, graph.successors(next).collect(), 0));
            }
        } else {
            order.push(*node);
            stack.pop();
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::graph::DirectedGraph;

    fn diamond() -> (DirectedGraph<()>, [NodeId; 4]) {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        let d = graph.add_node(());
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, c).unwrap();
        graph.add_edge(b, d).unwrap();
        graph.add_edge(c, d).unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn test_dfs_preorder() {
        let (graph, [a, b, c, d]) = diamond();
        let order: Vec<NodeId> = dfs(&graph, a).collect();
        assert_eq!(order, vec![a, b, d, c]);
    }

    #[test]
    fn test_dfs_unreachable_not_visited() {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let island = graph.add_node(());
        graph.add_edge(a, b).unwrap();

        let order: Vec<NodeId> = dfs(&graph, a).collect();
        assert_eq!(order, vec![a, b]);
        assert!(!order.contains(&island));
    }

    #[test]
    fn test_dfs_cycle_terminates() {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, a).unwrap();

        let order: Vec<NodeId> = dfs(&graph, a).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn test_dfs_start_out_of_bounds() {
        let graph: DirectedGraph<()> = DirectedGraph::new();
        assert_eq!(dfs(&graph, NodeId::new(3)).count(), 0);
    }

    #[test]
    fn test_postorder_diamond() {
        let (graph, [a, b, c, d]) = diamond();
        let order = postorder(&graph, a);
        assert_eq!(order.len(), 4);
        // Root is last; d precedes both of its visitors' parents' completion
        assert_eq!(*order.last().unwrap(), a);
        let pos = |n: NodeId| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(d) < pos(b));
        assert!(pos(b) < pos(a));
        assert!(pos(c) < pos(a));
    }

    #[test]
    fn test_postorder_cycle_terminates() {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        let c = graph.add_node(());
        graph.add_edge(a, b).unwrap();
        graph.add_edge(b, c).unwrap();
        graph.add_edge(c, b).unwrap(); // back edge

        let order = postorder(&graph, a);
        assert_eq!(order.len(), 3);
        assert_eq!(*order.last().unwrap(), a);
    }
}
