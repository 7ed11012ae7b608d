//! Fixed-point block-graph simplification for the decompile path.
//!
//! Two local rewrites run over the graph in DFS order until a full pass changes
//! nothing:
//!
//! - [`remove_empty_block`]: a zero-command single-path block is a pure retarget;
//!   every inbound edge is redirected to its fall-through target and the block is
//!   excised. The decompiler fabricates such blocks for every goto, so this is where
//!   they disappear again.
//! - [`concatenate_linear_blocks`]: a single-path block with exactly one inbound
//!   edge, whose predecessor is also single-path, is absorbed into that predecessor.
//!
//! Each rewrite strictly reduces the live block count, so the fixed point is reached
//! in at most as many rewrites as there are blocks. Running the optimizer on an
//! already-optimized graph changes nothing.

use crate::{
    cfg::{
        block::{BlockEdgeKind, BlockId},
        graph::BlockGraph,
    },
    utils::graph::algorithms::dfs,
    Result,
};

/// Safety stop for the outer pass loop; the strict-decrease argument means it can
/// never be reached on a graph the builder produced.
const MAX_PASSES: usize = 1024;

/// Runs both rewrites to a fixed point and returns the number of rewrites applied.
///
/// # Errors
///
/// Propagates internal errors from the graph primitives; returns
/// [`crate::Error::Internal`] if the pass loop fails to converge, which would mean a
/// rewrite stopped reducing the block count.
pub fn optimize(graph: &mut BlockGraph) -> Result<usize> {
    let mut total = 0;

    for pass in 0..MAX_PASSES {
        let mut changed = 0;

        // The DFS order is captured up front; blocks removed mid-pass are skipped
        // by the liveness check.
        let order: Vec<BlockId> = dfs(graph, graph.entry_block().as_node())
            .map(BlockId::from_node)
            .collect();

        for block in order {
            if !graph.is_live(block) {
                continue;
            }
            if remove_empty_block(graph, block)? {
                changed += 1;
                continue;
            }
            if concatenate_linear_blocks(graph, block)? {
                changed += 1;
            }
        }

        total += changed;
        if changed == 0 {
            tracing::debug!(passes = pass + 1, rewrites = total, "optimizer fixed point");
            return Ok(total);
        }
    }

    Err(internal_error!(
        "optimizer failed to reach a fixed point after {MAX_PASSES} passes"
    ))
}

/// Excises a zero-command single-path block by redirecting every inbound edge to its
/// fall-through target. Returns `true` if the block was removed.
///
/// A self-looping empty block (an infinite loop with no body) has no meaningful
/// retarget and is left alone, as is an empty terminal block.
fn remove_empty_block(graph: &mut BlockGraph, block: BlockId) -> Result<bool> {
    let candidate = graph.block(block)?;
    if !candidate.is_single_path() || !candidate.commands().is_empty() {
        return Ok(false);
    }
    let Some(target) = candidate.outward(BlockEdgeKind::Next) else {
        return Ok(false);
    };
    if target == block {
        return Ok(false);
    }

    // A goto target's name must survive the retarget
    graph.donate_label(block, target)?;

    for edge in graph.block(block)?.entry_points().to_vec() {
        graph.redirect(edge, target)?;
    }
    if graph.entry_block() == block {
        graph.set_entry(target);
    }
    graph.remove(block)?;

    tracing::trace!(%block, %target, "removed empty block");
    Ok(true)
}

/// Absorbs a single-path block into its sole single-path predecessor. Returns `true`
/// if the block was absorbed.
fn concatenate_linear_blocks(graph: &mut BlockGraph, block: BlockId) -> Result<bool> {
    if graph.entry_block() == block {
        return Ok(false);
    }
    let candidate = graph.block(block)?;
    if !candidate.is_single_path() {
        return Ok(false);
    }
    let [edge] = candidate.entry_points() else {
        return Ok(false);
    };
    let edge = *edge;
    if edge.kind != BlockEdgeKind::Next || edge.source == block {
        return Ok(false);
    }
    let predecessor = edge.source;
    if !graph.block(predecessor)?.is_single_path() {
        return Ok(false);
    }

    graph.detach(predecessor, BlockEdgeKind::Next)?;
    graph.move_commands(block, predecessor)?;
    if graph.block(block)?.outward(BlockEdgeKind::Next).is_some() {
        let next = graph.detach(block, BlockEdgeKind::Next)?;
        graph.attach(predecessor, BlockEdgeKind::Next, next.target)?;
    }
    graph.remove(block)?;

    tracing::trace!(%block, %predecessor, "concatenated linear blocks");
    Ok(true)
}
