//! Explicit compiler state: pending instructions, invented labels, layout.
//!
//! The context is a value threaded through the linearizer; no module-level counters,
//! so concurrent compile calls can never share address state. It holds the growing
//! instruction list in *label form* (jumps reference [`LabelId`]s, not addresses),
//! which is what lets the post-passes delete instructions without invalidating every
//! subsequent address. The final [`finalize`](CompilerContext::finalize) pass stamps
//! sequential byte addresses using the size model and resolves every label; a
//! referenced label that never received a binding is a fatal internal error, since it
//! would be a jump into unassigned address space.

use std::fmt;

use crate::{
    bytecode::{Address, Clause, CodeTables, Command, Instruction, InstructionKind},
    Result,
};

/// Identifier for a pending label inside one compilation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(usize);

impl fmt::Debug for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LabelId({})", self.0)
    }
}

/// Where a pending label points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// The instruction at this item index (an index one past the last item reads as
    /// the end of the stream)
    Item(usize),
    /// The first byte past the last instruction
    End,
}

/// A label invented during compilation: name, eventual address, reference count.
#[derive(Debug, Clone)]
struct PendingLabel {
    name: String,
    bound: Option<Binding>,
    references: usize,
}

/// One pending instruction, with jumps still in label form.
#[derive(Debug, Clone)]
pub(crate) enum AsmOp {
    /// An action command
    Command(Command),
    /// A condition whose skip target is a label
    Condition {
        /// The condition payload
        clauses: Vec<Clause>,
        /// Label the interpreter skips to when the condition fails
        skip: LabelId,
    },
    /// An unconditional jump to a label
    Goto {
        /// The jump target label
        target: LabelId,
    },
}

/// Explicit compiler state for one linearization.
#[derive(Debug, Default)]
pub struct CompilerContext {
    items: Vec<AsmOp>,
    labels: Vec<PendingLabel>,
    end_label: Option<LabelId>,
}

impl CompilerContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        CompilerContext {
            items: Vec::new(),
            labels: Vec::new(),
            end_label: None,
        }
    }

    /// Index the next pushed instruction will occupy.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.items.len()
    }

    /// Invents a new label; unnamed labels get deterministic `L<n>` names.
    pub fn new_label(&mut self, name: Option<String>) -> LabelId {
        let id = LabelId(self.labels.len());
        self.labels.push(PendingLabel {
            name: name.unwrap_or_else(|| format!("L{}", self.labels.len())),
            bound: None,
            references: 0,
        });
        id
    }

    /// Returns the shared end-of-stream label, creating it on first use.
    pub fn end_label(&mut self) -> LabelId {
        if let Some(label) = self.end_label {
            return label;
        }
        let label = LabelId(self.labels.len());
        self.labels.push(PendingLabel {
            name: "end".to_string(),
            bound: Some(Binding::End),
            references: 0,
        });
        self.end_label = Some(label);
        label
    }

    /// Binds a label to the next instruction pushed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the label is already bound; one label
    /// with two addresses is a conflicting address assignment.
    pub fn bind_here(&mut self, label: LabelId) -> Result<()> {
        let index = self.items.len();
        self.bind_at(label, index)
    }

    /// Binds a label to the instruction at a known item index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] on a second binding.
    pub fn bind_at(&mut self, label: LabelId, index: usize) -> Result<()> {
        let pending = &mut self.labels[label.0];
        if pending.bound.is_some() {
            return Err(internal_error!(
                "conflicting address assignment for label '{}'",
                pending.name
            ));
        }
        pending.bound = Some(Binding::Item(index));
        Ok(())
    }

    /// Binds a label to the first byte past the last instruction.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] on a second binding.
    pub fn bind_to_end(&mut self, label: LabelId) -> Result<()> {
        let pending = &mut self.labels[label.0];
        if pending.bound.is_some() {
            return Err(internal_error!(
                "conflicting address assignment for label '{}'",
                pending.name
            ));
        }
        pending.bound = Some(Binding::End);
        Ok(())
    }

    /// Appends a command.
    pub fn push_command(&mut self, command: Command) {
        self.items.push(AsmOp::Command(command));
    }

    /// Appends a condition skipping to `skip` on failure.
    pub fn push_condition(&mut self, clauses: Vec<Clause>, skip: LabelId) {
        self.labels[skip.0].references += 1;
        self.items.push(AsmOp::Condition { clauses, skip });
    }

    /// Appends an unconditional jump to `target`.
    pub fn push_goto(&mut self, target: LabelId) {
        self.labels[target.0].references += 1;
        self.items.push(AsmOp::Goto { target });
    }

    /// Runs the fixed-point cleanup passes and returns the number of instructions
    /// removed:
    ///
    /// - a goto to the instruction immediately following it is dropped;
    /// - an instruction right after an unconditional jump, with no referenced label
    ///   bound to it, is unreachable and dropped.
    ///
    /// # Errors
    ///
    /// This pass itself cannot fail; the `Result` covers future invariant checks in
    /// the primitives it calls.
    pub fn simplify(&mut self) -> Result<usize> {
        let mut removed = 0;
        loop {
            let before = removed;

            if let Some(index) = self.find_goto_to_next() {
                self.remove_item(index);
                removed += 1;
            }
            if let Some(index) = self.find_unreachable() {
                self.remove_item(index);
                removed += 1;
            }

            if removed == before {
                break;
            }
        }
        if removed > 0 {
            tracing::debug!(removed, "post-pass removed redundant instructions");
        }
        Ok(removed)
    }

    /// Finds a goto whose target is the very next instruction (or the end of the
    /// stream, for a trailing goto).
    fn find_goto_to_next(&self) -> Option<usize> {
        self.items.iter().enumerate().find_map(|(index, op)| {
            let AsmOp::Goto { target } = op else {
                return None;
            };
            match self.labels[target.0].bound? {
                Binding::Item(bound) if bound == index + 1 => Some(index),
                Binding::Item(_) => None,
                Binding::End if index + 1 == self.items.len() => Some(index),
                Binding::End => None,
            }
        })
    }

    /// Finds an instruction unreachable after an unconditional jump.
    fn find_unreachable(&self) -> Option<usize> {
        (1..self.items.len()).find(|&index| {
            matches!(self.items[index - 1], AsmOp::Goto { .. }) && !self.is_jump_target(index)
        })
    }

    fn is_jump_target(&self, index: usize) -> bool {
        self.labels.iter().any(|label| {
            label.references > 0 && label.bound == Some(Binding::Item(index))
        })
    }

    /// Removes the item at `index`, shifting label bindings and dropping the removed
    /// jump's reference.
    fn remove_item(&mut self, index: usize) {
        match &self.items[index] {
            AsmOp::Goto { target } => self.labels[target.0].references -= 1,
            AsmOp::Condition { skip, .. } => self.labels[skip.0].references -= 1,
            AsmOp::Command(_) => {}
        }
        self.items.remove(index);
        for label in &mut self.labels {
            if let Some(Binding::Item(bound)) = &mut label.bound {
                if *bound > index {
                    *bound -= 1;
                }
            }
        }
    }

    /// Stamps sequential byte addresses and resolves every label reference,
    /// producing the final instruction stream.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if a referenced label never received a
    /// binding (a jump into unassigned address space) and propagates size-model
    /// errors for opcodes missing from the tables.
    pub fn finalize(self, tables: &CodeTables) -> Result<Vec<Instruction>> {
        // Pass 1: addresses
        let mut addresses = Vec::with_capacity(self.items.len());
        let mut cursor: Address = 0;
        for op in &self.items {
            addresses.push(cursor);
            let kind = match op {
                AsmOp::Command(command) => InstructionKind::Command(command.clone()),
                AsmOp::Condition { clauses, .. } => InstructionKind::Condition {
                    clauses: clauses.clone(),
                    skip_to: 0,
                },
                AsmOp::Goto { .. } => InstructionKind::Goto { target: 0 },
            };
            cursor += kind.byte_size(tables)?;
        }
        let end = cursor;

        // Pass 2: label addresses
        let resolve = |label: &LabelId| -> Result<Address> {
            let pending = &self.labels[label.0];
            match pending.bound {
                Some(Binding::Item(index)) if index < addresses.len() => Ok(addresses[index]),
                Some(Binding::Item(_)) | Some(Binding::End) => Ok(end),
                None => Err(internal_error!(
                    "jump through label '{}' into unassigned address space",
                    pending.name
                )),
            }
        };

        // Pass 3: materialize
        let mut instructions = Vec::with_capacity(self.items.len());
        for (op, address) in self.items.iter().zip(addresses.iter()) {
            let kind = match op {
                AsmOp::Command(command) => InstructionKind::Command(command.clone()),
                AsmOp::Condition { clauses, skip } => InstructionKind::Condition {
                    clauses: clauses.clone(),
                    skip_to: resolve(skip)?,
                },
                AsmOp::Goto { target } => InstructionKind::Goto {
                    target: resolve(target)?,
                },
            };
            instructions.push(Instruction {
                address: *address,
                kind,
            });
        }

        tracing::debug!(
            instructions = instructions.len(),
            bytes = end,
            "layout finalized"
        );
        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> CodeTables {
        CodeTables::fixture()
    }

    fn command(opcode: u8, args: Vec<u16>) -> Command {
        Command { opcode, args }
    }

    #[test]
    fn test_sequential_addresses() {
        let mut ctx = CompilerContext::new();
        ctx.push_command(command(0x03, vec![1, 5])); // assignn: 3 bytes
        ctx.push_command(command(0x01, vec![1])); // increment: 2 bytes
        ctx.push_command(command(0x00, vec![])); // return: 1 byte

        let out = ctx.finalize(&tables()).unwrap();
        let addresses: Vec<Address> = out.iter().map(|i| i.address).collect();
        assert_eq!(addresses, vec![0, 3, 5]);
    }

    #[test]
    fn test_forward_label_resolution() {
        let mut ctx = CompilerContext::new();
        let label = ctx.new_label(None);
        ctx.push_goto(label); // 3 bytes at 0
        ctx.push_command(command(0x01, vec![1])); // 2 bytes at 3... unreachable though
        ctx.bind_here(label).unwrap();
        ctx.push_command(command(0x00, vec![])); // at 5

        let out = ctx.finalize(&tables()).unwrap();
        assert_eq!(out[0].kind, InstructionKind::Goto { target: 5 });
    }

    #[test]
    fn test_unbound_referenced_label_is_fatal() {
        let mut ctx = CompilerContext::new();
        let label = ctx.new_label(None);
        ctx.push_goto(label);
        assert!(ctx.finalize(&tables()).is_err());
    }

    #[test]
    fn test_unbound_unreferenced_label_is_fine() {
        let mut ctx = CompilerContext::new();
        let _ = ctx.new_label(None);
        ctx.push_command(command(0x00, vec![]));
        assert!(ctx.finalize(&tables()).is_ok());
    }

    #[test]
    fn test_double_binding_is_fatal() {
        let mut ctx = CompilerContext::new();
        let label = ctx.new_label(None);
        ctx.bind_here(label).unwrap();
        ctx.push_command(command(0x00, vec![]));
        assert!(ctx.bind_here(label).is_err());
    }

    #[test]
    fn test_goto_to_next_dropped() {
        let mut ctx = CompilerContext::new();
        let label = ctx.new_label(None);
        ctx.push_goto(label);
        ctx.bind_here(label).unwrap();
        ctx.push_command(command(0x00, vec![]));

        let removed = ctx.simplify().unwrap();
        assert_eq!(removed, 1);
        let out = ctx.finalize(&tables()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, 0);
    }

    #[test]
    fn test_trailing_goto_to_end_dropped() {
        let mut ctx = CompilerContext::new();
        ctx.push_command(command(0x00, vec![]));
        let end = ctx.end_label();
        ctx.push_goto(end);

        let removed = ctx.simplify().unwrap();
        assert_eq!(removed, 1);
        assert_eq!(ctx.finalize(&tables()).unwrap().len(), 1);
    }

    #[test]
    fn test_unreachable_after_goto_stripped() {
        let mut ctx = CompilerContext::new();
        let label = ctx.new_label(None);
        ctx.push_goto(label);
        ctx.push_command(command(0x01, vec![1])); // unreachable, no label
        ctx.push_command(command(0x02, vec![1])); // unreachable once previous goes
        ctx.bind_here(label).unwrap();
        ctx.push_command(command(0x00, vec![]));

        ctx.simplify().unwrap();
        let out = ctx.finalize(&tables()).unwrap();
        // goto collapses onto its now-adjacent target, leaving just return
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0].kind, InstructionKind::Command(_)));
    }

    #[test]
    fn test_labelled_instruction_survives_after_goto() {
        let mut ctx = CompilerContext::new();
        let target = ctx.new_label(None);
        let skip = ctx.new_label(None);
        ctx.push_goto(skip);
        ctx.bind_here(target).unwrap();
        ctx.push_command(command(0x01, vec![1])); // referenced below: stays
        ctx.bind_here(skip).unwrap();
        ctx.push_command(command(0x00, vec![]));
        ctx.push_goto(target);

        let removed = ctx.simplify().unwrap();
        assert_eq!(removed, 0);
        assert_eq!(ctx.finalize(&tables()).unwrap().len(), 4);
    }

    #[test]
    fn test_condition_skip_resolution() {
        let mut ctx = CompilerContext::new();
        let skip = ctx.new_label(None);
        ctx.push_condition(
            vec![Clause::Single(crate::bytecode::ClauseTerm {
                negated: false,
                test: crate::bytecode::TestCall {
                    opcode: 0x01,
                    args: vec![1, 5],
                },
            })],
            skip,
        ); // 7 bytes at 0
        ctx.push_command(command(0x66, vec![1])); // printv: 2 bytes at 7
        ctx.bind_here(skip).unwrap();
        ctx.push_command(command(0x00, vec![])); // at 9

        let out = ctx.finalize(&tables()).unwrap();
        let InstructionKind::Condition { skip_to, .. } = &out[0].kind else {
            panic!("expected condition");
        };
        assert_eq!(*skip_to, 9);
    }

    #[test]
    fn test_skip_to_end() {
        let mut ctx = CompilerContext::new();
        let skip = ctx.new_label(None);
        ctx.push_condition(
            vec![Clause::Single(crate::bytecode::ClauseTerm {
                negated: false,
                test: crate::bytecode::TestCall {
                    opcode: 0x07,
                    args: vec![1],
                },
            })],
            skip,
        ); // 6 bytes
        ctx.push_command(command(0x00, vec![])); // 1 byte at 6
        ctx.bind_here(skip).unwrap(); // binds past the last item: end

        let out = ctx.finalize(&tables()).unwrap();
        let InstructionKind::Condition { skip_to, .. } = &out[0].kind else {
            panic!("expected condition");
        };
        assert_eq!(*skip_to, 7);
    }
}
