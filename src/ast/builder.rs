//! Decompile-direction AST construction from an addressed instruction stream.
//!
//! A single recursive-descent pass, memoized by address, so convergent and cyclic
//! control flow reuses node objects. A `Condition` instruction becomes an if node
//! whose `then` continues to the next instruction and whose `else` is a *synthetic*
//! unconditional goto to the skip address: a fabricated extra node, so the same
//! resolution machinery treats every conditional uniformly as "continue on then, jump
//! on else" before any structuring runs.

use std::collections::HashMap;

use crate::{
    ast::{AstGraph, AstNode, AstNodeId},
    bytecode::{Address, Instruction, InstructionKind, LabelTable},
    Error, Result,
};

/// Builds the unstructured AST for an instruction stream.
///
/// `end_address` is the first byte past the last instruction; jumps resolving exactly
/// there are jumps off the end of the resource and produce nodes with no target.
///
/// # Errors
///
/// Returns [`Error::Empty`] for an empty stream, [`Error::GraphError`] when a jump
/// target is not an instruction boundary, and [`Error::Internal`] when the stream
/// violates engine invariants (unsorted or duplicate addresses).
pub fn build_ast(
    instructions: &[Instruction],
    labels: &LabelTable,
    end_address: Address,
) -> Result<AstGraph> {
    if instructions.is_empty() {
        return Err(Error::Empty);
    }

    let mut index_of: HashMap<Address, usize> = HashMap::with_capacity(instructions.len());
    for (i, instruction) in instructions.iter().enumerate() {
        if i > 0 && instructions[i - 1].address >= instruction.address {
            return Err(internal_error!(
                "instruction stream not strictly ascending at {:#06x}",
                instruction.address
            ));
        }
        index_of.insert(instruction.address, i);
    }

    let mut builder = AstBuilder {
        instructions,
        labels,
        index_of,
        end_address,
        graph: AstGraph::new(),
    };

    let root = builder.node_at(instructions[0].address)?;
    builder.graph.set_root(root);

    tracing::trace!(
        instructions = instructions.len(),
        nodes = builder.graph.len(),
        "AST built"
    );
    Ok(builder.graph)
}

struct AstBuilder<'a> {
    instructions: &'a [Instruction],
    labels: &'a LabelTable,
    index_of: HashMap<Address, usize>,
    end_address: Address,
    graph: AstGraph,
}

impl AstBuilder<'_> {
    /// Returns the node for the instruction at `address`, constructing it (and,
    /// recursively, everything it reaches) on first request.
    fn node_at(&mut self, address: Address) -> Result<AstNodeId> {
        if let Some(id) = self.graph.lookup(address) {
            return Ok(id);
        }

        let index = *self.index_of.get(&address).ok_or_else(|| {
            Error::GraphError(format!(
                "jump target {address:#06x} is not an instruction boundary"
            ))
        })?;
        let instruction = &self.instructions[index];
        let label = self.labels.get(address).map(|l| l.name.clone());

        match &instruction.kind {
            InstructionKind::Command(command) => {
                let id = self.graph.add_at(
                    address,
                    AstNode::Command {
                        command: command.clone(),
                        label,
                        next: None,
                    },
                )?;
                if let Some(next) = self.following_address(index) {
                    let next_id = self.node_at(next)?;
                    self.graph.set_next(id, next_id)?;
                }
                Ok(id)
            }
            InstructionKind::Goto { target } => {
                // Pre-register before resolving: a goto targeting itself must find
                // its own node, or recursion never terminates.
                let id = self
                    .graph
                    .add_at(address, AstNode::Goto { target: None, label })?;
                if let Some(target_id) = self.resolve_target(*target)? {
                    self.graph.set_goto_target(id, target_id)?;
                }
                Ok(id)
            }
            InstructionKind::Condition { clauses, skip_to } => {
                let id = self.graph.add_at(
                    address,
                    AstNode::If {
                        clauses: clauses.clone(),
                        then_branch: None,
                        else_branch: None,
                        label,
                    },
                )?;

                // Fabricated else-goto, inserted before either branch resolves so a
                // skip straight back to this condition still finds the node.
                let synthetic = self.graph.add_synthetic(AstNode::Goto {
                    target: None,
                    label: None,
                });
                self.graph.set_else(id, synthetic)?;

                if let Some(next) = self.following_address(index) {
                    let then_id = self.node_at(next)?;
                    self.graph.set_then(id, then_id)?;
                }
                if let Some(target_id) = self.resolve_target(*skip_to)? {
                    self.graph.set_goto_target(synthetic, target_id)?;
                }
                Ok(id)
            }
        }
    }

    /// Address of the instruction following position `index`, if any.
    fn following_address(&self, index: usize) -> Option<Address> {
        self.instructions.get(index + 1).map(|i| i.address)
    }

    /// Resolves a jump target address to a node; a jump exactly past the end of the
    /// stream resolves to `None` (flow ends).
    fn resolve_target(&mut self, target: Address) -> Result<Option<AstNodeId>> {
        if target == self.end_address {
            return Ok(None);
        }
        self.node_at(target).map(Some)
    }
}
