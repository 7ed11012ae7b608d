//! Dominator tree computation using the SEMI-NCA algorithm.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n` must
//! pass through `d`. The **immediate dominator** of `n` is the unique closest strict
//! dominator, and making each node's immediate dominator its parent forms the
//! dominator tree.
//!
//! The structuring code generator asks this tree which jumps can become nested
//! `if`/`else` bodies, and the compiler asks the same engine, run over a reversed,
//! virtually-rooted view of the block graph, where control must reconverge after a
//! conditional. Neither caller gets its own algorithm: post-dominance is dominance on
//! the reverse graph, nothing more.
//!
//! # Algorithm
//!
//! SEMI-NCA works in three phases over any [`RootedGraph`]:
//!
//! 1. **DFS numbering**: assign preorder numbers and record each node's DFS parent.
//! 2. **Semidominators** (reverse preorder): a node's semidominator is the minimum DFS
//!    number among predecessors reached directly and the semidominators of
//!    predecessors reached through path-compressed ancestor links; each node is then
//!    linked under its DFS parent.
//! 3. **NCA pass** (forward preorder): a node's immediate dominator starts at its DFS
//!    parent and walks upward while the candidate's DFS number exceeds the node's
//!    semidominator number.
//!
//! O((V + E) log V) worst case, linear in practice for control-flow graphs.

use crate::{
    utils::graph::{NodeId, RootedGraph},
    Error, Result,
};

/// Sentinel for "no node" in the internal index arrays.
const NONE: usize = usize::MAX;

/// Result of dominator tree computation.
///
/// One entry exists per node *slot* of the analyzed graph; nodes that were unreachable
/// from the root are recorded as such and never participate in any dominance relation.
///
/// # Examples
///
/// ```rust,ignore
/// use logicscript::utils::graph::{
///     algorithms::compute_dominators, DirectedGraph, GraphBase, NodeId, Predecessors,
///     RootedGraph, Successors,
/// };
///
/// struct Rooted(DirectedGraph<&'static str>, NodeId);
/// impl GraphBase for Rooted {
///     fn node_count(&self) -> usize { self.0.node_count() }
///     fn node_ids(&self) -> impl Iterator<Item = NodeId> { self.0.node_ids() }
/// }
/// impl Successors for Rooted {
///     fn successors(&self, n: NodeId) -> impl Iterator<Item = NodeId> { self.0.successors(n) }
/// }
/// impl Predecessors for Rooted {
///     fn predecessors(&self, n: NodeId) -> impl Iterator<Item = NodeId> { self.0.predecessors(n) }
/// }
/// impl RootedGraph for Rooted {
///     fn entry(&self) -> NodeId { self.1 }
/// }
///
/// // Diamond: entry -> a, entry -> b, a -> exit, b -> exit
/// let mut graph: DirectedGraph<&str> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// let exit = graph.add_node("exit");
/// graph.add_edge(entry, a).unwrap();
/// graph.add_edge(entry, b).unwrap();
/// graph.add_edge(a, exit).unwrap();
/// graph.add_edge(b, exit).unwrap();
///
/// let tree = compute_dominators(&Rooted(graph, entry));
/// assert!(tree.dominates(entry, exit).unwrap());
/// assert_eq!(tree.immediate_dominator(exit).unwrap(), Some(entry));
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) node the tree was computed from
    root: NodeId,
    /// Immediate dominator per node slot; `None` for the root and for unreachable nodes
    idom: Vec<Option<NodeId>>,
    /// Reachability per node slot
    reachable: Vec<bool>,
}

impl DominatorTree {
    /// Returns the root node of the dominator tree.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the number of node slots the tree was computed over.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }

    /// Returns `true` if the node was reachable from the root when the tree was built.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the node id is outside the analyzed graph;
    /// that always signals an upstream construction bug, not bad input.
    pub fn is_reachable(&self, node: NodeId) -> Result<bool> {
        self.check(node)?;
        Ok(self.reachable[node.index()])
    }

    /// Returns the immediate dominator of a node.
    ///
    /// The root and unreachable nodes have no immediate dominator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the node id is outside the analyzed graph.
    pub fn immediate_dominator(&self, node: NodeId) -> Result<Option<NodeId>> {
        self.check(node)?;
        Ok(self.idom[node.index()])
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A node dominates itself. Unreachable nodes participate in no dominance
    /// relation, so any query involving one answers `false`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either node id is outside the analyzed graph.
    pub fn dominates(&self, a: NodeId, b: NodeId) -> Result<bool> {
        self.check(a)?;
        self.check(b)?;
        if !self.reachable[a.index()] || !self.reachable[b.index()] {
            return Ok(false);
        }
        if a == b {
            return Ok(true);
        }

        // Walk immediate-dominator edges up from b
        let mut current = b;
        while let Some(idom) = self.idom[current.index()] {
            if idom == a {
                return Ok(true);
            }
            current = idom;
        }
        Ok(false)
    }

    /// Checks if node `a` is the immediate dominator of node `b`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either node id is outside the analyzed graph.
    pub fn immediately_dominates(&self, a: NodeId, b: NodeId) -> Result<bool> {
        self.check(a)?;
        Ok(self.immediate_dominator(b)? == Some(a))
    }

    fn check(&self, node: NodeId) -> Result<()> {
        if node.index() >= self.idom.len() {
            return Err(Error::GraphError(format!(
                "dominator query for node {} outside graph with {} nodes",
                node,
                self.idom.len()
            )));
        }
        Ok(())
    }
}

/// Computes the dominator tree of a rooted graph using SEMI-NCA.
///
/// Every node reachable from [`RootedGraph::entry`] receives an immediate dominator
/// (except the entry itself); unreachable nodes are marked as such. Run this over a
/// reversed, virtually-rooted view of a graph to obtain its post-dominator tree;
/// the algorithm is reused unmodified.
#[must_use]
pub fn compute_dominators<G: RootedGraph>(graph: &G) -> DominatorTree {
    let node_count = graph.node_count();
    let root = graph.entry();

    if node_count == 0 {
        return DominatorTree {
            root,
            idom: Vec::new(),
            reachable: Vec::new(),
        };
    }

    let mut state = SemiNca::new(node_count);
    state.compute(graph, root);

    let reachable: Vec<bool> = state.dfnum.iter().map(|&n| n != 0).collect();
    let idom: Vec<Option<NodeId>> = (0..node_count)
        .map(|i| {
            if i == root.index() || !reachable[i] || state.idom[i] == NONE {
                None
            } else {
                Some(NodeId::new(state.idom[i]))
            }
        })
        .collect();

    tracing::trace!(
        nodes = node_count,
        reachable = reachable.iter().filter(|&&r| r).count(),
        "dominator tree computed"
    );

    DominatorTree {
        root,
        idom,
        reachable,
    }
}

/// Internal state for the SEMI-NCA algorithm, indexed by raw node id.
struct SemiNca {
    /// DFS preorder number per node (0 = not visited, numbering starts at 1)
    dfnum: Vec<usize>,
    /// Node with each preorder position (inverse of dfnum, 0-based)
    vertex: Vec<usize>,
    /// DFS tree parent per node
    parent: Vec<usize>,
    /// Semidominator per node, as a DFS number
    semi: Vec<usize>,
    /// Immediate dominator per node (result)
    idom: Vec<usize>,
    /// Forest ancestor for link-eval
    ancestor: Vec<usize>,
    /// Node with minimum semidominator on the compressed path to the forest root
    best: Vec<usize>,
    /// Number of nodes visited by the DFS
    visited: usize,
}

impl SemiNca {
    fn new(n: usize) -> Self {
        SemiNca {
            dfnum: vec![0; n],
            vertex: vec![NONE; n],
            parent: vec![NONE; n],
            semi: vec![0; n],
            idom: vec![NONE; n],
            ancestor: vec![NONE; n],
            best: (0..n).collect(),
            visited: 0,
        }
    }

    fn compute<G: RootedGraph>(&mut self, graph: &G, root: NodeId) {
        // Phase 1: DFS numbering
        self.dfs(graph, root);

        // Every visited node starts as its own semidominator; a predecessor that is
        // still unlinked then contributes its plain DFS number through eval
        for i in 0..self.visited {
            let v = self.vertex[i];
            self.semi[v] = self.dfnum[v];
        }

        // Phase 2: semidominators, in reverse preorder (excluding the root)
        for i in (1..self.visited).rev() {
            let w = self.vertex[i];

            let preds: Vec<NodeId> = graph.predecessors(NodeId::new(w)).collect();
            for v in preds {
                if self.dfnum[v.index()] == 0 {
                    // predecessor unreachable from the root
                    continue;
                }
                let u = self.eval(v.index());
                if self.semi[u] < self.semi[w] {
                    self.semi[w] = self.semi[u];
                }
            }

            // Link w under its DFS parent for subsequent evals
            self.ancestor[w] = self.parent[w];
        }

        // Phase 3: NCA pass, in preorder (excluding the root). Because nodes are
        // processed in preorder, idom of every smaller-numbered node is already final.
        for i in 1..self.visited {
            let w = self.vertex[i];
            let mut candidate = self.parent[w];
            while self.dfnum[candidate] > self.semi[w] {
                candidate = self.idom[candidate];
            }
            self.idom[w] = candidate;
        }
    }

    /// Iterative DFS assigning preorder numbers and recording tree parents.
    fn dfs<G: RootedGraph>(&mut self, graph: &G, start: NodeId) {
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            let idx = node.index();
            if self.dfnum[idx] != 0 {
                continue;
            }

            self.visited += 1;
            self.dfnum[idx] = self.visited;
            self.vertex[self.visited - 1] = idx;

            let successors: Vec<NodeId> = graph.successors(node).collect();
            for &succ in successors.iter().rev() {
                if self.dfnum[succ.index()] == 0 {
                    self.parent[succ.index()] = idx;
                    stack.push(succ);
                }
            }
        }
    }

    /// Returns the node with minimum semidominator on the path from `v` to its forest
    /// root, compressing the path as a side effect.
    fn eval(&mut self, v: usize) -> usize {
        if self.ancestor[v] == NONE {
            return v;
        }
        self.compress(v);
        self.best[v]
    }

    fn compress(&mut self, v: usize) {
        let a = self.ancestor[v];
        if self.ancestor[a] == NONE {
            return;
        }

        self.compress(a);

        if self.semi[self.best[a]] < self.semi[self.best[v]] {
            self.best[v] = self.best[a];
        }
        self.ancestor[v] = self.ancestor[a];
    }
}
