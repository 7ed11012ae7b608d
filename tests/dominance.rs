//! Dominance and post-dominance checked against brute-force path enumeration.
//!
//! For every pair of reachable nodes, `dominates(a, b)` must hold exactly when every
//! path from the root to `b` passes through `a` — equivalently, when removing `a`
//! makes `b` unreachable. Small synthetic graphs cover the interesting shapes (loop,
//! unreachable merge, multi-exit), and a proptest sweep hammers the engine with
//! random graphs.

use std::collections::HashSet;

use proptest::prelude::*;

use logicscript::cfg::{BlockEdgeKind, BlockGraph, PostDominatorTree};
use logicscript::utils::graph::{
    algorithms::compute_dominators, DirectedGraph, GraphBase, NodeId, Predecessors, RootedGraph,
    Successors,
};

/// `DirectedGraph` plus an explicit entry node.
struct Rooted {
    graph: DirectedGraph<()>,
    entry: NodeId,
}

impl Rooted {
    fn build(node_count: usize, edges: &[(usize, usize)]) -> Self {
        let mut graph: DirectedGraph<()> = DirectedGraph::new();
        let ids: Vec<NodeId> = (0..node_count).map(|_| graph.add_node(())).collect();
        for &(source, target) in edges {
            graph.add_edge(ids[source], ids[target]).unwrap();
        }
        Rooted {
            graph,
            entry: NodeId::new(0),
        }
    }
}

impl GraphBase for Rooted {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }
    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.graph.node_ids()
    }
}
impl Successors for Rooted {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}
impl Predecessors for Rooted {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}
impl RootedGraph for Rooted {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

/// Nodes reachable from `start`, optionally pretending `removed` does not exist.
fn reachable(graph: &Rooted, start: NodeId, removed: Option<NodeId>) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    if Some(start) == removed {
        return seen;
    }
    let mut stack = vec![start];
    seen.insert(start);
    while let Some(node) = stack.pop() {
        for successor in graph.successors(node) {
            if Some(successor) == removed {
                continue;
            }
            if seen.insert(successor) {
                stack.push(successor);
            }
        }
    }
    seen
}

/// Brute-force oracle: `a` dominates `b` iff both are reachable and removing `a`
/// cuts every root path to `b`.
fn oracle_dominates(graph: &Rooted, a: NodeId, b: NodeId) -> bool {
    let from_root = reachable(graph, graph.entry(), None);
    if !from_root.contains(&a) || !from_root.contains(&b) {
        return false;
    }
    if a == b {
        return true;
    }
    !reachable(graph, graph.entry(), Some(a)).contains(&b)
}

fn check_all_pairs(graph: &Rooted) {
    let tree = compute_dominators(graph);
    for a in graph.node_ids() {
        for b in graph.node_ids() {
            assert_eq!(
                tree.dominates(a, b).unwrap(),
                oracle_dominates(graph, a, b),
                "dominates({a}, {b}) disagrees with path enumeration"
            );
        }
    }
}

#[test]
fn linear_chain_matches_oracle() {
    check_all_pairs(&Rooted::build(4, &[(0, 1), (1, 2), (2, 3)]));
}

#[test]
fn diamond_matches_oracle() {
    check_all_pairs(&Rooted::build(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]));
}

#[test]
fn loop_matches_oracle() {
    // 0 -> 1 -> 2 -> 1 back edge, 2 -> 3 exit
    check_all_pairs(&Rooted::build(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]));
}

#[test]
fn unreachable_merge_matches_oracle() {
    // Node 4 is an island feeding the merge at 3: it must not affect dominance
    check_all_pairs(&Rooted::build(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (4, 3)]));
}

#[test]
fn irreducible_region_matches_oracle() {
    // Two entries into the {3, 4} cycle: 1 -> 3 and 2 -> 4
    check_all_pairs(&Rooted::build(
        5,
        &[(0, 1), (0, 2), (1, 3), (2, 4), (3, 4), (4, 3)],
    ));
}

#[test]
fn dense_graph_matches_oracle() {
    check_all_pairs(&Rooted::build(
        6,
        &[
            (0, 1),
            (0, 2),
            (1, 3),
            (2, 3),
            (3, 4),
            (4, 2),
            (3, 5),
            (1, 5),
            (5, 0),
        ],
    ));
}

proptest! {
    #[test]
    fn random_graphs_match_oracle(
        node_count in 1usize..10,
        raw_edges in proptest::collection::vec((0usize..10, 0usize..10), 0..25),
    ) {
        let edges: Vec<(usize, usize)> = raw_edges
            .into_iter()
            .map(|(a, b)| (a % node_count, b % node_count))
            .collect();
        let graph = Rooted::build(node_count, &edges);
        let tree = compute_dominators(&graph);
        for a in graph.node_ids() {
            for b in graph.node_ids() {
                prop_assert_eq!(
                    tree.dominates(a, b).unwrap(),
                    oracle_dominates(&graph, a, b)
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Post-dominance over the reversed, virtually-rooted block-graph view
// ---------------------------------------------------------------------------

/// Builds a block graph whose shape mirrors the given edge list. Blocks with fewer
/// than two outgoing edges become single-path blocks (missing edge = exit); blocks
/// with two become splits.
fn block_graph(node_count: usize, edges: &[(usize, usize)]) -> BlockGraph {
    use logicscript::bytecode::{Clause, ClauseTerm, TestCall};

    let clause = || {
        vec![Clause::Single(ClauseTerm {
            negated: false,
            test: TestCall {
                opcode: 0x07,
                args: vec![1],
            },
        })]
    };

    let mut out_degree = vec![0usize; node_count];
    for &(source, _) in edges {
        out_degree[source] += 1;
    }

    let mut graph = BlockGraph::new();
    let ids: Vec<_> = (0..node_count)
        .map(|i| {
            if out_degree[i] >= 2 {
                graph.add_if_exit(clause(), None, None)
            } else {
                graph.add_single_path(None, None)
            }
        })
        .collect();

    let mut used = vec![0usize; node_count];
    for &(source, target) in edges {
        let kind = if out_degree[source] >= 2 {
            if used[source] == 0 {
                BlockEdgeKind::Then
            } else {
                BlockEdgeKind::Else
            }
        } else {
            BlockEdgeKind::Next
        };
        used[source] += 1;
        graph.attach(ids[source], kind, ids[target]).unwrap();
    }
    graph.set_entry(ids[0]);
    graph
}

/// Can control get from `from` to the end of the resource without entering `avoid`?
fn escapes_avoiding(graph: &BlockGraph, from: usize, avoid: Option<usize>) -> bool {
    if Some(from) == avoid {
        return false;
    }
    let from = logicscript::cfg::BlockId::from_node(NodeId::new(from));
    let avoid = avoid.map(|a| logicscript::cfg::BlockId::from_node(NodeId::new(a)));

    let mut seen = HashSet::new();
    let mut stack = vec![from];
    seen.insert(from);
    while let Some(block) = stack.pop() {
        if graph.block(block).unwrap().is_exit() {
            return true;
        }
        for successor in graph.successors(block.as_node()) {
            let successor = logicscript::cfg::BlockId::from_node(successor);
            if Some(successor) == avoid {
                continue;
            }
            if seen.insert(successor) {
                stack.push(successor);
            }
        }
    }
    false
}

fn check_post_dominance(node_count: usize, edges: &[(usize, usize)]) {
    let graph = block_graph(node_count, edges);
    let post = PostDominatorTree::compute(&graph);

    for a in 0..node_count {
        for b in 0..node_count {
            let a_id = logicscript::cfg::BlockId::from_node(NodeId::new(a));
            let b_id = logicscript::cfg::BlockId::from_node(NodeId::new(b));
            // a post-dominates b iff b can reach the end at all, and never
            // without passing through a
            let expected = if a == b {
                escapes_avoiding(&graph, b, None)
            } else {
                escapes_avoiding(&graph, b, None) && !escapes_avoiding(&graph, b, Some(a))
            };
            assert_eq!(
                post.post_dominates(a_id, b_id).unwrap(),
                expected,
                "post_dominates({a}, {b}) disagrees with path enumeration"
            );
        }
    }
}

#[test]
fn post_dominance_single_exit() {
    // 0 splits to 1/2, both rejoin at 3
    check_post_dominance(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
}

#[test]
fn post_dominance_multi_exit() {
    // 0 splits; 1 ends the resource; 2 -> 3 ends the resource
    check_post_dominance(4, &[(0, 1), (0, 2), (2, 3)]);
}

#[test]
fn post_dominance_loop() {
    // 0 -> 1 -> 2 -> 1 back edge, 2 -> 3 exit
    check_post_dominance(4, &[(0, 1), (1, 2), (2, 1), (2, 3)]);
}

#[test]
fn post_dominance_no_exit_cycle() {
    // 1 <-> 2 never reaches the end; nothing post-dominates inside it
    check_post_dominance(3, &[(0, 1), (1, 2), (2, 1)]);
}
