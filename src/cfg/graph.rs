//! The basic-block graph and its dominance views.
//!
//! [`BlockGraph`] is an arena of blocks addressed by stable [`BlockId`]s. All edge
//! mutation goes through four primitives ([`attach`](BlockGraph::attach),
//! [`detach`](BlockGraph::detach), [`redirect`](BlockGraph::redirect) and
//! [`remove`](BlockGraph::remove)) which keep every block's inbound-edge set exactly
//! in sync with the forward edges. Violations (a second outward edge of one kind, an
//! inbound entry that is not actually there) are internal invariant errors and abort
//! immediately.
//!
//! The graph implements the generic traversal traits, so the SEMI-NCA engine runs on
//! it directly; [`ReverseBlockView`] presents the same blocks with every edge
//! inverted plus a synthetic virtual root connected to the exit set, which is all
//! post-dominance needs; the engine is reused unchanged.

use crate::{
    ast::AstNodeId,
    bytecode::{Clause, Command},
    cfg::block::{BasicBlock, BlockEdge, BlockEdgeKind, BlockId, BlockKind},
    utils::graph::{
        algorithms::{compute_dominators, DominatorTree},
        GraphBase, NodeId, Predecessors, RootedGraph, Successors,
    },
    Error, Result,
};

/// Arena of basic blocks with typed edges and maintained inbound-edge sets.
#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    /// Block slots; `None` marks a removed block (ids stay stable)
    blocks: Vec<Option<BasicBlock>>,
    /// The entry block
    entry: BlockId,
}

impl BlockGraph {
    /// Creates an empty block graph.
    ///
    /// The entry defaults to the first block added.
    #[must_use]
    pub fn new() -> Self {
        BlockGraph {
            blocks: Vec::new(),
            entry: BlockId(0),
        }
    }

    /// Adds an empty single-path block and returns its id.
    pub fn add_single_path(&mut self, label: Option<String>, source: Option<AstNodeId>) -> BlockId {
        self.add(BasicBlock {
            kind: BlockKind::SinglePath {
                commands: Vec::new(),
                next: None,
            },
            label,
            entry_points: Vec::new(),
            source,
        })
    }

    /// Adds a split block with the given condition payload and returns its id.
    pub fn add_if_exit(
        &mut self,
        clauses: Vec<Clause>,
        label: Option<String>,
        source: Option<AstNodeId>,
    ) -> BlockId {
        self.add(BasicBlock {
            kind: BlockKind::IfExit {
                clauses,
                then_branch: None,
                else_branch: None,
            },
            label,
            entry_points: Vec::new(),
            source,
        })
    }

    fn add(&mut self, block: BasicBlock) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Some(block));
        id
    }

    /// Returns the entry block id.
    #[must_use]
    pub fn entry_block(&self) -> BlockId {
        self.entry
    }

    /// Designates the entry block.
    pub fn set_entry(&mut self, id: BlockId) {
        self.entry = id;
    }

    /// Returns the block with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the id is outside the arena or the block was
    /// removed; asking for a removed block always signals an upstream bug.
    pub fn block(&self, id: BlockId) -> Result<&BasicBlock> {
        self.blocks
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| Error::GraphError(format!("block {id} does not exist")))
    }

    /// Returns `true` if the id names a live (non-removed) block.
    #[must_use]
    pub fn is_live(&self, id: BlockId) -> bool {
        matches!(self.blocks.get(id.0), Some(Some(_)))
    }

    /// Returns the number of block slots, including removed ones.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns the number of live blocks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    /// Iterates live blocks in id order.
    pub fn live_blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|b| (BlockId(i), b)))
    }

    /// Returns the outward edges of a block in `Next`/`Then`/`Else` order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the block does not exist.
    pub fn outward_edges(&self, id: BlockId) -> Result<Vec<BlockEdge>> {
        Ok(self.block(id)?.outward_edges(id))
    }

    /// Returns the target of a block's outward edge of the given kind, if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the block does not exist.
    pub fn target(&self, id: BlockId, kind: BlockEdgeKind) -> Result<Option<BlockId>> {
        Ok(self.block(id)?.outward(kind))
    }

    /// Creates the outward edge `source --kind--> target`, recording it in the
    /// target's inbound set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either block does not exist, and
    /// [`Error::Internal`] if the edge kind does not fit the source block's shape or
    /// an edge of that kind already exists.
    pub fn attach(&mut self, source: BlockId, kind: BlockEdgeKind, target: BlockId) -> Result<()> {
        self.block(target)?;
        let slot = self.outward_slot(source, kind)?;
        if slot.is_some() {
            return Err(internal_error!(
                "second outward {kind} edge on block {source}"
            ));
        }
        *slot = Some(target);

        let edge = BlockEdge {
            source,
            target,
            kind,
        };
        self.block_mut(target)?.entry_points.push(edge);
        Ok(())
    }

    /// Removes the outward edge of the given kind, un-recording it from the target's
    /// inbound set, and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if no such edge exists or the target's inbound set
    /// does not contain it; the latter means the bookkeeping invariant was broken.
    pub fn detach(&mut self, source: BlockId, kind: BlockEdgeKind) -> Result<BlockEdge> {
        let slot = self.outward_slot(source, kind)?;
        let Some(target) = slot.take() else {
            return Err(internal_error!("no outward {kind} edge on block {source}"));
        };

        let edge = BlockEdge {
            source,
            target,
            kind,
        };
        let entry_points = &mut self.block_mut(target)?.entry_points;
        let Some(position) = entry_points.iter().position(|e| *e == edge) else {
            return Err(internal_error!(
                "inbound-edge set of block {target} missing edge {source} --{kind}-->"
            ));
        };
        entry_points.swap_remove(position);
        Ok(edge)
    }

    /// Re-points an existing edge at a new target, preserving its source and kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the edge does not exist as described.
    pub fn redirect(&mut self, edge: BlockEdge, new_target: BlockId) -> Result<()> {
        let detached = self.detach(edge.source, edge.kind)?;
        if detached.target != edge.target {
            return Err(internal_error!(
                "redirect of {} --{}--> expected target {}, found {}",
                edge.source,
                edge.kind,
                edge.target,
                detached.target
            ));
        }
        self.attach(edge.source, edge.kind, new_target)
    }

    /// Removes a block from the graph.
    ///
    /// Outward edges are detached first; the block must have no live inbound edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if inbound edges remain; removal would leave
    /// dangling references.
    pub fn remove(&mut self, id: BlockId) -> Result<()> {
        for edge in self.outward_edges(id)? {
            self.detach(edge.source, edge.kind)?;
        }
        let block = self.block(id)?;
        if !block.entry_points.is_empty() {
            return Err(internal_error!(
                "removing block {id} with {} live inbound edge(s)",
                block.entry_points.len()
            ));
        }
        self.blocks[id.0] = None;
        Ok(())
    }

    /// Appends a command to a single-path block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the block is a split.
    pub fn push_command(&mut self, id: BlockId, command: Command) -> Result<()> {
        match &mut self.block_mut(id)?.kind {
            BlockKind::SinglePath { commands, .. } => {
                commands.push(command);
                Ok(())
            }
            BlockKind::IfExit { .. } => Err(internal_error!("push_command on split block {id}")),
        }
    }

    /// Moves all commands of `from` onto the end of `into` (both single-path).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if either block is a split.
    pub fn move_commands(&mut self, from: BlockId, into: BlockId) -> Result<()> {
        let taken = match &mut self.block_mut(from)?.kind {
            BlockKind::SinglePath { commands, .. } => std::mem::take(commands),
            BlockKind::IfExit { .. } => {
                return Err(internal_error!("move_commands from split block {from}"))
            }
        };
        match &mut self.block_mut(into)?.kind {
            BlockKind::SinglePath { commands, .. } => {
                commands.extend(taken);
                Ok(())
            }
            BlockKind::IfExit { .. } => {
                Err(internal_error!("move_commands into split block {into}"))
            }
        }
    }

    /// Moves `from`'s label onto `into` if `into` has none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either block does not exist.
    pub fn donate_label(&mut self, from: BlockId, into: BlockId) -> Result<()> {
        let label = self.block_mut(from)?.label.take();
        let target = self.block_mut(into)?;
        if target.label.is_none() {
            target.label = label;
        }
        Ok(())
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock> {
        self.blocks
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| Error::GraphError(format!("block {id} does not exist")))
    }

    fn outward_slot(&mut self, id: BlockId, kind: BlockEdgeKind) -> Result<&mut Option<BlockId>> {
        match (&mut self.block_mut(id)?.kind, kind) {
            (BlockKind::SinglePath { next, .. }, BlockEdgeKind::Next) => Ok(next),
            (BlockKind::IfExit { then_branch, .. }, BlockEdgeKind::Then) => Ok(then_branch),
            (BlockKind::IfExit { else_branch, .. }, BlockEdgeKind::Else) => Ok(else_branch),
            _ => Err(internal_error!("block {id} has no {kind} edge slot")),
        }
    }

    /// Returns the ids of blocks control can leave the resource through.
    #[must_use]
    pub fn exit_blocks(&self) -> Vec<BlockId> {
        self.live_blocks()
            .filter(|(_, block)| block.is_exit())
            .map(|(id, _)| id)
            .collect()
    }

    /// Computes the dominator tree of this graph from its entry block.
    #[must_use]
    pub fn dominators(&self) -> DominatorTree {
        compute_dominators(self)
    }
}

impl GraphBase for BlockGraph {
    fn node_count(&self) -> usize {
        self.blocks.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.blocks.len()).map(NodeId::new)
    }
}

impl Successors for BlockGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let edges = self
            .blocks
            .get(node.index())
            .and_then(Option::as_ref)
            .map(|block| block.outward_edges(BlockId(node.index())))
            .unwrap_or_default();
        edges.into_iter().map(|e| e.target.as_node())
    }
}

impl Predecessors for BlockGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.blocks
            .get(node.index())
            .and_then(Option::as_ref)
            .map(|block| block.entry_points.clone())
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.source.as_node())
    }
}

impl RootedGraph for BlockGraph {
    fn entry(&self) -> NodeId {
        self.entry.as_node()
    }
}

/// The block graph with every edge inverted, plus a synthetic virtual root connected
/// to each block in the exit set.
///
/// Post-dominance requires one common exit; real logic resources can end in several
/// places (and a split with a missing branch ends right there), so the virtual root
/// stands in for "after the resource". Its node id is one past the last block slot,
/// keeping every per-node table dense.
pub struct ReverseBlockView<'a> {
    graph: &'a BlockGraph,
    exits: Vec<BlockId>,
}

impl<'a> ReverseBlockView<'a> {
    /// Builds the reversed view of a block graph.
    #[must_use]
    pub fn new(graph: &'a BlockGraph) -> Self {
        ReverseBlockView {
            exits: graph.exit_blocks(),
            graph,
        }
    }

    /// Returns the synthetic virtual root's node id.
    #[must_use]
    pub fn virtual_root(&self) -> NodeId {
        NodeId::new(self.graph.slot_count())
    }
}

impl GraphBase for ReverseBlockView<'_> {
    fn node_count(&self) -> usize {
        self.graph.slot_count() + 1
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId::new)
    }
}

impl Successors for ReverseBlockView<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let ids: Vec<NodeId> = if node == self.virtual_root() {
            self.exits.iter().map(|b| b.as_node()).collect()
        } else {
            self.graph.predecessors(node).collect()
        };
        ids.into_iter()
    }
}

impl Predecessors for ReverseBlockView<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        let mut ids: Vec<NodeId> = if node == self.virtual_root() {
            Vec::new()
        } else {
            self.graph.successors(node).collect()
        };
        if node != self.virtual_root()
            && self.exits.iter().any(|b| b.as_node() == node)
        {
            ids.push(self.virtual_root());
        }
        ids.into_iter()
    }
}

impl RootedGraph for ReverseBlockView<'_> {
    fn entry(&self) -> NodeId {
        self.virtual_root()
    }
}

/// The post-dominator tree of a block graph.
///
/// Built by running the unchanged SEMI-NCA engine over [`ReverseBlockView`]. The
/// virtual root is internal: queries speak in [`BlockId`]s, and an immediate
/// post-dominator that would be the virtual root reads as `None` ("nothing but the
/// end of the resource post-dominates this block").
#[derive(Debug, Clone)]
pub struct PostDominatorTree {
    tree: DominatorTree,
    virtual_root: NodeId,
}

impl PostDominatorTree {
    /// Computes the post-dominator tree of a block graph.
    #[must_use]
    pub fn compute(graph: &BlockGraph) -> Self {
        let view = ReverseBlockView::new(graph);
        let virtual_root = view.virtual_root();
        PostDominatorTree {
            tree: compute_dominators(&view),
            virtual_root,
        }
    }

    /// Checks if block `a` post-dominates block `b` (every path from `b` off the
    /// resource passes through `a`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either id is outside the analyzed graph.
    pub fn post_dominates(&self, a: BlockId, b: BlockId) -> Result<bool> {
        self.tree.dominates(a.as_node(), b.as_node())
    }

    /// Returns the immediate post-dominator of a block, or `None` when only the end
    /// of the resource post-dominates it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if the id is outside the analyzed graph.
    pub fn immediate(&self, block: BlockId) -> Result<Option<BlockId>> {
        match self.tree.immediate_dominator(block.as_node())? {
            None => Ok(None),
            Some(node) if node == self.virtual_root => Ok(None),
            Some(node) => Ok(Some(BlockId::from_node(node))),
        }
    }
}
