//! Typed logic bytecode: instructions, code tables, labels.
//!
//! This module defines the engine's view of logic bytecode. Raw byte decode/encode is
//! an external collaborator; the engine only ever sees *typed* instructions carrying
//! their byte addresses, plus the caller-supplied [`CodeTables`] describing which
//! opcodes exist and what arguments they take. From the argument kinds the engine
//! derives instruction byte sizes, which is all the compiler needs to stamp addresses
//! without owning the byte-level writer.
//!
//! # Key Types
//! - [`Instruction`] / [`InstructionKind`] - an addressed command, condition, or goto
//! - [`Command`], [`TestCall`], [`Clause`] - the building blocks of instructions
//! - [`CodeTables`] - the opcode table contract ((opcode) → name, argument kinds)
//! - [`Label`] / [`LabelTable`] - jump-target bookkeeping

mod codes;
mod instruction;
mod labels;

pub use codes::{ArgKind, CodeTables, CommandDef, TestDef};
pub use instruction::{Address, Clause, ClauseTerm, Command, Instruction, InstructionKind, TestCall};
pub use labels::{Label, LabelTable};
