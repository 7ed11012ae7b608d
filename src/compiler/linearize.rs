//! Depth-first linearization of a block graph into an instruction stream.
//!
//! Each block compiles exactly once and is cached; a block reached a second time
//! becomes a goto to its first, address-stable compilation, inventing a label if none
//! exists yet. A split becomes a condition whose skip target is the first address of
//! its (possibly inlined) reconvergence point, chosen through the post-dominator tree
//! exactly as on the decompile path, but here deciding where control *must*
//! reconverge rather than where it came from. Regions are compiled up to that
//! reconvergence point, with a jump over the else body when the then region falls
//! through to it.
//!
//! A branch whose edge is missing ends the resource, so its jumps resolve to the
//! first byte past the last instruction.

use std::collections::HashMap;

use crate::{
    bytecode::{Clause, CodeTables, Instruction},
    cfg::{BlockGraph, BlockId, BlockKind, PostDominatorTree},
    compiler::context::{CompilerContext, LabelId},
    Result,
};

/// Linearizes a block graph into an address-stamped instruction stream.
///
/// # Errors
///
/// Propagates internal errors from the context (conflicting address assignment,
/// unresolved labels) and graph queries; none of these is a user diagnostic, since user
/// errors were caught at the statement level before a block graph ever existed.
pub fn linearize(graph: &BlockGraph, tables: &CodeTables) -> Result<Vec<Instruction>> {
    let mut linearizer = Linearizer {
        post_dominators: PostDominatorTree::compute(graph),
        graph,
        context: CompilerContext::new(),
        placed: HashMap::new(),
        block_labels: HashMap::new(),
    };

    linearizer.emit_chain(Some(graph.entry_block()), None)?;
    linearizer.context.simplify()?;
    linearizer.context.finalize(tables)
}

struct Linearizer<'a> {
    graph: &'a BlockGraph,
    /// Built once per block graph and cached for the lifetime of code generation
    post_dominators: PostDominatorTree,
    context: CompilerContext,
    /// Item index of each block's first instruction
    placed: HashMap<BlockId, usize>,
    /// Label invented for each block that is (or will be) a jump target
    block_labels: HashMap<BlockId, LabelId>,
}

impl Linearizer<'_> {
    /// Compiles the chain starting at `start`, stopping (without compiling it) when
    /// the walk reaches `stop`.
    ///
    /// Returns `true` if control fell through to `stop`, `false` if the chain ended
    /// with an unconditional transfer or by running off the resource.
    fn emit_chain(&mut self, start: Option<BlockId>, stop: Option<BlockId>) -> Result<bool> {
        let mut cursor = start;
        while let Some(block) = cursor {
            if Some(block) == stop {
                return Ok(true);
            }
            if self.placed.contains_key(&block) {
                let label = self.label_for(block)?;
                self.context.push_goto(label);
                return Ok(false);
            }
            self.place(block)?;

            match self.graph.block(block)?.kind().clone() {
                BlockKind::SinglePath { commands, next } => {
                    for command in commands {
                        self.context.push_command(command);
                    }
                    match next {
                        None => return Ok(false),
                        Some(target) => cursor = Some(target),
                    }
                }
                BlockKind::IfExit {
                    clauses,
                    then_branch,
                    else_branch,
                } => {
                    cursor = self.emit_split(block, clauses, then_branch, else_branch)?;
                }
            }
        }
        Ok(false)
    }

    /// Compiles one split and returns where the outer chain continues.
    fn emit_split(
        &mut self,
        block: BlockId,
        clauses: Vec<Clause>,
        then_branch: Option<BlockId>,
        else_branch: Option<BlockId>,
    ) -> Result<Option<BlockId>> {
        let reconvergence = self.post_dominators.immediate(block)?;
        let skip = self.context.new_label(None);
        self.context.push_condition(clauses, skip);

        // Then side: compile up to the reconvergence point
        let fell_through = match then_branch {
            Some(target) => self.emit_chain(Some(target), reconvergence)?,
            None => {
                // The condition-holds path ends the resource immediately
                let end = self.context.end_label();
                self.context.push_goto(end);
                false
            }
        };

        // Else side: decide where the skip lands
        match else_branch {
            None => {
                // The condition-fails path ends the resource; with a missing branch
                // nothing short of the end post-dominates the split
                self.context.bind_to_end(skip)?;
                Ok(reconvergence)
            }
            Some(else_target) if Some(else_target) == reconvergence => {
                // No else body: the skip lands on the reconvergence point, which is
                // compiled right after the then region
                self.context.bind_here(skip)?;
                Ok(reconvergence)
            }
            Some(else_target) => {
                if fell_through {
                    // The then region runs into the reconvergence point, so it must
                    // jump over the else body
                    let reconvergence_block = reconvergence.ok_or_else(|| {
                        internal_error!("then region of {block} fell through without a reconvergence point")
                    })?;
                    let label = self.label_for(reconvergence_block)?;
                    self.context.push_goto(label);
                }
                self.context.bind_here(skip)?;
                self.emit_chain(Some(else_target), reconvergence)?;
                Ok(reconvergence)
            }
        }
    }

    /// Records a block's first instruction index and binds its pending label, if a
    /// jump to it was already compiled.
    fn place(&mut self, block: BlockId) -> Result<()> {
        let index = self.context.next_index();
        if self.placed.insert(block, index).is_some() {
            return Err(internal_error!("block {block} compiled twice"));
        }
        if let Some(&label) = self.block_labels.get(&block) {
            self.context.bind_at(label, index)?;
        }
        tracing::trace!(%block, index, "placed block");
        Ok(())
    }

    /// Returns the label for a block, inventing (and, for placed blocks, binding)
    /// one on first use. The block's source-level name is kept when it has one.
    fn label_for(&mut self, block: BlockId) -> Result<LabelId> {
        if let Some(&label) = self.block_labels.get(&block) {
            return Ok(label);
        }
        let name = self.graph.block(block)?.label().map(str::to_string);
        let label = self.context.new_label(name);
        self.block_labels.insert(block, label);
        if let Some(&index) = self.placed.get(&block) {
            self.context.bind_at(label, index)?;
        }
        Ok(label)
    }
}
