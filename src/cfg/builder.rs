//! Basic-block graph construction from the unstructured AST.
//!
//! Consecutive command nodes group into one single-path block. A run is split at any
//! node that carries a label (a jump can only target a block-initial position) and
//! at any node with more than one inbound AST edge, which is the same rule seen from
//! the lowered-source side, where convergence points carry no labels. If nodes become
//! split blocks; goto nodes become empty single-path retarget blocks (the optimizer
//! elides them later). Every inbound edge discovered is recorded on the target block
//! through the graph's attach primitive.

use std::collections::{HashMap, HashSet};

use crate::{
    ast::{AstGraph, AstNode, AstNodeId},
    cfg::{
        block::{BlockEdgeKind, BlockId},
        graph::BlockGraph,
    },
    Error, Result,
};

/// Builds the basic-block graph for an AST.
///
/// # Errors
///
/// Returns [`Error::Empty`] if the AST has no root, or propagates internal errors if
/// the AST violates engine invariants.
pub fn build_blocks(ast: &AstGraph) -> Result<BlockGraph> {
    let root = ast.root().ok_or(Error::Empty)?;

    let mut builder = BlockBuilder {
        ast,
        inbound: inbound_degrees(ast, root)?,
        graph: BlockGraph::new(),
        memo: HashMap::new(),
    };

    let entry = builder.block_at(root)?;
    builder.graph.set_entry(entry);

    tracing::trace!(
        ast_nodes = ast.len(),
        blocks = builder.graph.live_count(),
        "block graph built"
    );
    Ok(builder.graph)
}

/// Counts inbound AST edges per node, over the subgraph reachable from the root.
fn inbound_degrees(ast: &AstGraph, root: AstNodeId) -> Result<HashMap<AstNodeId, usize>> {
    let mut inbound: HashMap<AstNodeId, usize> = HashMap::new();
    let mut stack: Vec<AstNodeId> = vec![root];
    let mut seen: HashSet<AstNodeId> = HashSet::new();
    seen.insert(root);

    while let Some(node) = stack.pop() {
        for target in edge_targets(ast.node(node)?) {
            *inbound.entry(target).or_insert(0) += 1;
            if seen.insert(target) {
                stack.push(target);
            }
        }
    }
    Ok(inbound)
}

fn edge_targets(node: &AstNode) -> Vec<AstNodeId> {
    match node {
        AstNode::Command { next, .. } => next.iter().copied().collect(),
        AstNode::If {
            then_branch,
            else_branch,
            ..
        } => then_branch.iter().chain(else_branch.iter()).copied().collect(),
        AstNode::Goto { target, .. } => target.iter().copied().collect(),
    }
}

struct BlockBuilder<'a> {
    ast: &'a AstGraph,
    inbound: HashMap<AstNodeId, usize>,
    graph: BlockGraph,
    /// Block started by each block-initial AST node
    memo: HashMap<AstNodeId, BlockId>,
}

impl BlockBuilder<'_> {
    /// Returns the block starting at the given AST node, building it on first
    /// request. Nodes absorbed into the middle of a run never appear here.
    fn block_at(&mut self, node: AstNodeId) -> Result<BlockId> {
        if let Some(&block) = self.memo.get(&node) {
            return Ok(block);
        }

        match self.ast.node(node)? {
            AstNode::Command {
                command,
                label,
                next,
            } => {
                let block = self.graph.add_single_path(label.clone(), Some(node));
                self.memo.insert(node, block);
                self.graph.push_command(block, command.clone())?;

                // Absorb the linear run, stopping where a block boundary begins
                let mut cursor = *next;
                let mut continuation: Option<AstNodeId> = None;
                while let Some(current) = cursor {
                    if self.starts_block(current)? {
                        continuation = Some(current);
                        break;
                    }
                    match self.ast.node(current)? {
                        AstNode::Command { command, next, .. } => {
                            self.graph.push_command(block, command.clone())?;
                            cursor = *next;
                        }
                        AstNode::If { .. } | AstNode::Goto { .. } => {
                            continuation = Some(current);
                            break;
                        }
                    }
                }

                if let Some(target) = continuation {
                    let target_block = self.block_at(target)?;
                    self.graph.attach(block, BlockEdgeKind::Next, target_block)?;
                }
                Ok(block)
            }
            AstNode::Goto { target, label } => {
                // A pure retarget: an empty block whose fall-through is the target.
                // Registered before the target resolves so a self-goto finds it.
                let block = self.graph.add_single_path(label.clone(), Some(node));
                self.memo.insert(node, block);
                if let Some(target) = *target {
                    let target_block = self.block_at(target)?;
                    self.graph.attach(block, BlockEdgeKind::Next, target_block)?;
                }
                Ok(block)
            }
            AstNode::If {
                clauses,
                then_branch,
                else_branch,
                label,
            } => {
                let block = self
                    .graph
                    .add_if_exit(clauses.clone(), label.clone(), Some(node));
                self.memo.insert(node, block);

                if let Some(target) = *then_branch {
                    let target_block = self.block_at(target)?;
                    self.graph.attach(block, BlockEdgeKind::Then, target_block)?;
                }
                if let Some(target) = *else_branch {
                    let target_block = self.block_at(target)?;
                    self.graph.attach(block, BlockEdgeKind::Else, target_block)?;
                }
                Ok(block)
            }
        }
    }

    /// A node starts a new block when it is a jump target (labelled), when several
    /// AST edges converge on it, or when it was already built as a block head.
    fn starts_block(&self, node: AstNodeId) -> Result<bool> {
        if self.memo.contains_key(&node) {
            return Ok(true);
        }
        if self.ast.node(node)?.label().is_some() {
            return Ok(true);
        }
        Ok(self.inbound.get(&node).copied().unwrap_or(0) > 1)
    }
}
