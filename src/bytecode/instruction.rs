//! Typed, addressed logic instructions.
//!
//! An [`Instruction`] is one of three things: an action [`Command`], a `Condition`
//! guarding a skip, or an unconditional `Goto`. Each carries the byte address it was
//! decoded from (or will be encoded at). Instructions are immutable once produced.
//!
//! Conditions carry their boolean payload as [`Clause`]s: the bytecode can encode an
//! implicit AND of groups, where each group is either a single (possibly negated) test
//! or an OR of (possibly negated) tests. Deeper nesting is not representable; the
//! propositional normalizer in [`crate::logic`] enforces that before anything reaches
//! this layer.
//!
//! Byte sizes are derived from the caller-supplied [`CodeTables`]; the actual byte
//! encoding lives outside the engine.

use crate::{
    bytecode::codes::CodeTables,
    Result,
};

/// A byte address within one logic resource.
///
/// Fabricated instructions (the synthetic else-gotos of the decompiler) live above any
/// real address rather than in negative space, so plain unsigned arithmetic stays
/// valid throughout.
pub type Address = u32;

/// Marker byte opening and closing an OR group inside a condition.
pub const OR_MARKER_SIZE: u32 = 1;
/// Size of the NOT prefix byte in front of a negated test.
pub const NOT_MARKER_SIZE: u32 = 1;
/// Size of the condition bracket byte (one before the tests, one after).
pub const IF_MARKER_SIZE: u32 = 1;
/// Encoded size of a goto instruction: opcode plus 16-bit displacement.
pub const GOTO_SIZE: u32 = 3;
/// Encoded size of the skip displacement trailing a condition.
pub const SKIP_OFFSET_SIZE: u32 = 2;

/// One action command: opcode plus argument values.
///
/// Argument values are stored widened to `u16` so word arguments fit; the argument
/// kinds in the code tables say how wide each is on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The opcode byte
    pub opcode: u8,
    /// Argument values, in encoding order
    pub args: Vec<u16>,
}

impl Command {
    /// Returns the encoded size of this command in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the opcode is absent from the tables;
    /// name resolution happens before instructions are built, so an unknown opcode
    /// here is an engine defect.
    pub fn byte_size(&self, tables: &CodeTables) -> Result<u32> {
        let def = tables
            .command(self.opcode)
            .ok_or_else(|| internal_error!("command opcode {:#04x} missing from tables", self.opcode))?;
        Ok(1 + def.args.iter().map(|a| a.byte_width()).sum::<u32>())
    }
}

/// One test invocation inside a condition: opcode plus argument values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCall {
    /// The test opcode byte
    pub opcode: u8,
    /// Argument values, in encoding order
    pub args: Vec<u16>,
}

impl TestCall {
    /// Returns the encoded size of this test call in bytes.
    ///
    /// Variadic tests carry a run-time argument count byte before their arguments.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the opcode is absent from the tables.
    pub fn byte_size(&self, tables: &CodeTables) -> Result<u32> {
        let def = tables
            .test(self.opcode)
            .ok_or_else(|| internal_error!("test opcode {:#04x} missing from tables", self.opcode))?;

        let args_size = if def.variadic {
            let per_arg = def.args.first().map_or(1, |a| a.byte_width());
            1 + per_arg * self.args.len() as u32
        } else {
            def.args.iter().map(|a| a.byte_width()).sum::<u32>()
        };
        Ok(1 + args_size)
    }
}

/// A single test term within a clause, optionally negated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseTerm {
    /// `true` if the term is the negation of its test
    pub negated: bool,
    /// The test being evaluated
    pub test: TestCall,
}

impl ClauseTerm {
    fn byte_size(&self, tables: &CodeTables) -> Result<u32> {
        let not = if self.negated { NOT_MARKER_SIZE } else { 0 };
        Ok(not + self.test.byte_size(tables)?)
    }
}

/// One AND-group of a condition.
///
/// A condition is an implicit AND over its clauses; each clause is either a single
/// term or an OR over terms. This is exactly the nesting depth the bytecode can
/// encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// A single (possibly negated) test
    Single(ClauseTerm),
    /// An OR group over two or more (possibly negated) tests
    Any(Vec<ClauseTerm>),
}

impl Clause {
    /// Returns the encoded size of this clause in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if a contained test opcode is absent from
    /// the tables.
    pub fn byte_size(&self, tables: &CodeTables) -> Result<u32> {
        match self {
            Clause::Single(term) => term.byte_size(tables),
            Clause::Any(terms) => {
                let mut size = 2 * OR_MARKER_SIZE;
                for term in terms {
                    size += term.byte_size(tables)?;
                }
                Ok(size)
            }
        }
    }

    /// Iterates the terms of this clause in encoding order.
    pub fn terms(&self) -> impl Iterator<Item = &ClauseTerm> {
        match self {
            Clause::Single(term) => std::slice::from_ref(term).iter(),
            Clause::Any(terms) => terms.iter(),
        }
    }
}

/// The payload of an instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstructionKind {
    /// An action command
    Command(Command),
    /// A condition: evaluate the clauses; on failure jump to `skip_to`, on success
    /// fall through to the next instruction
    Condition {
        /// The AND-of-clauses boolean payload
        clauses: Vec<Clause>,
        /// Absolute address control transfers to when the condition fails
        skip_to: Address,
    },
    /// An unconditional jump
    Goto {
        /// Absolute jump target address
        target: Address,
    },
}

impl InstructionKind {
    /// Returns the encoded size of this instruction in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if a contained opcode is absent from the
    /// tables.
    pub fn byte_size(&self, tables: &CodeTables) -> Result<u32> {
        match self {
            InstructionKind::Command(command) => command.byte_size(tables),
            InstructionKind::Condition { clauses, .. } => {
                let mut size = 2 * IF_MARKER_SIZE + SKIP_OFFSET_SIZE;
                for clause in clauses {
                    size += clause.byte_size(tables)?;
                }
                Ok(size)
            }
            InstructionKind::Goto { .. } => Ok(GOTO_SIZE),
        }
    }
}

/// One addressed instruction of a logic resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// The byte address of this instruction
    pub address: Address,
    /// The instruction payload
    pub kind: InstructionKind,
}

impl Instruction {
    /// Returns the address this instruction transfers control to, if it is a jump.
    ///
    /// For conditions this is the skip target taken when the condition fails.
    #[must_use]
    pub fn jump_target(&self) -> Option<Address> {
        match &self.kind {
            InstructionKind::Command(_) => None,
            InstructionKind::Condition { skip_to, .. } => Some(*skip_to),
            InstructionKind::Goto { target } => Some(*target),
        }
    }
}
