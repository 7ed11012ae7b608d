#![doc(html_no_source)]
#![deny(missing_docs)]

//! # logicscript
//!
//! A control-flow engine for translating between LogicScript, a human-readable
//! scripting language, and the addressed, jump-based bytecode of a legacy
//! adventure-game interpreter's logic resources, in both directions: decompiling
//! bytecode into structured source and compiling source back into spec-exact
//! bytecode.
//!
//! The hard part, and the whole of this crate, is the graph layer shared by both
//! directions: building a control-flow graph of basic blocks, computing dominator and
//! post-dominator trees over it, rewriting the graph, and converting between
//! unstructured (label/goto/skip) and structured (if/else) control flow while
//! preserving exact branch semantics.
//!
//! ## What this crate is not
//!
//! Statement-level text parsing, raw byte decode/encode, resource containers,
//! compression, text encryption and user-facing tooling are external collaborators.
//! The engine consumes *typed* instructions and statement trees and produces the
//! same; see [`bytecode::CodeTables`] for the one piece of data callers must supply.
//!
//! ## Quick Start
//!
//! ```rust
//! use logicscript::prelude::*;
//!
//! let tables = CodeTables::fixture();
//! let mut diagnostics = Diagnostics::new();
//!
//! // Compile structured statements into addressed bytecode instructions
//! let source = vec![
//!     Stmt::command("assignn", vec![1, 5]),
//!     Stmt::if_then(
//!         BooleanExpression::test("equaln", vec![1, 5]),
//!         vec![Stmt::command("printv", vec![1])],
//!     ),
//!     Stmt::command("return", vec![]),
//! ];
//! let instructions = compile(&source, &tables, &mut diagnostics)?
//!     .expect("no user errors in this source");
//!
//! // And back into structured statements
//! let roundtripped = decompile(&instructions, &tables, &mut diagnostics)?;
//! assert!(!diagnostics.has_errors());
//! # Ok::<(), logicscript::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Leaves first:
//!
//! - [`utils::graph`] - generic directed graph, guarded traversal, and the SEMI-NCA
//!   dominator engine (reused unchanged, over a reversed view, for post-dominance)
//! - [`bytecode`] - typed instructions, the code-table contract, jump labels
//! - [`logic`] - surface boolean expressions and the propositional normalizer
//! - [`ast`] - the unstructured control-flow AST, built from bytecode or from source
//! - [`cfg`] - the basic-block graph, its invariants, and the fixed-point optimizer
//! - [`decompiler`] - the dominance-driven structuring code generator
//! - [`compiler`] - the depth-first linearizer and its explicit context
//!
//! ## Error Handling
//!
//! Two tiers, strictly separated. Problems in user-written source (unknown names,
//! wrong arity, an expression too complex to encode, an undefined label) collect
//! into [`diagnostics::Diagnostics`] and never abort the engine. Violated engine
//! invariants abort immediately with [`Error`]; nothing tries to limp past a graph
//! that has already gone inconsistent.
//!
//! ## Concurrency
//!
//! The engine is fully single-threaded and synchronous. Every compile/decompile call
//! owns its graphs; nothing escapes except the read-only inputs the caller supplies,
//! so concurrent invocations over different resources are naturally safe.

#[macro_use]
pub(crate) mod error;

pub mod ast;
pub mod bytecode;
pub mod cfg;
pub mod compiler;
pub mod decompiler;
pub mod diagnostics;
pub mod logic;
pub mod prelude;
pub mod utils;

pub use error::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

use bytecode::{CodeTables, Instruction, LabelTable};
use decompiler::Stmt;
use diagnostics::Diagnostics;

/// Decompiles an addressed instruction stream into structured statements.
///
/// Runs the full decompile pipeline: label scan, AST construction, basic-block graph
/// construction, fixed-point optimization, and dominance-driven structuring. The
/// returned statements use source-level names resolved through `tables`; opcodes the
/// tables do not know are rendered as placeholders with a warning diagnostic.
///
/// An empty stream decompiles to an empty statement list.
///
/// # Errors
///
/// Returns [`Error`] for violated engine invariants or for streams that break the
/// input contract (overlapping or unsorted addresses, jumps into the middle of an
/// instruction). User-level findings go into `diagnostics`.
pub fn decompile(
    instructions: &[Instruction],
    tables: &CodeTables,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Stmt>> {
    let Some(last) = instructions.last() else {
        return Ok(Vec::new());
    };
    let end_address = last.address + last.kind.byte_size(tables)?;

    let labels = LabelTable::scan(instructions);
    let ast = ast::builder::build_ast(instructions, &labels, end_address)?;
    let mut blocks = cfg::build_blocks(&ast)?;
    cfg::optimize(&mut blocks)?;
    decompiler::structure(&blocks, tables, diagnostics)
}

/// Compiles structured statements into an address-stamped instruction stream.
///
/// Runs the full compile pipeline: lowering (with name resolution and propositional
/// normalization), basic-block graph construction, and depth-first linearization
/// with post-dominator-guided skip placement.
///
/// Returns `Ok(None)` when the sink holds error diagnostics after lowering: the
/// statements could not all be translated, and emitting a partial resource would be
/// worse than emitting none. Callers compiling several resources keep going with the
/// rest. The sink is meant to be fresh per call.
///
/// An empty statement list (or one containing only labels) compiles to an empty
/// stream.
///
/// # Errors
///
/// Returns [`Error`] only for violated engine invariants; everything attributable to
/// the source lands in `diagnostics`.
pub fn compile(
    statements: &[Stmt],
    tables: &CodeTables,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Vec<Instruction>>> {
    let ast = ast::lowering::lower_statements(statements, tables, diagnostics)?;
    if diagnostics.has_errors() {
        return Ok(None);
    }
    if ast.root().is_none() {
        return Ok(Some(Vec::new()));
    }

    let blocks = cfg::build_blocks(&ast)?;
    let instructions = compiler::linearize(&blocks, tables)?;
    Ok(Some(instructions))
}
