//! Convenient re-exports of the most commonly used types and entry points.
//!
//! ```rust
//! use logicscript::prelude::*;
//!
//! let tables = CodeTables::fixture();
//! let mut diagnostics = Diagnostics::new();
//! let instructions = compile(
//!     &[Stmt::command("return", vec![])],
//!     &tables,
//!     &mut diagnostics,
//! )?
//! .expect("no user errors");
//! assert_eq!(instructions.len(), 1);
//! # Ok::<(), logicscript::Error>(())
//! ```

/// The error type for engine-invariant failures
pub use crate::Error;

/// The crate-wide result alias
pub use crate::Result;

/// The two pipeline entry points
pub use crate::{compile, decompile};

/// The code-table input contract and the typed instruction model
pub use crate::bytecode::{
    Address, Clause, ClauseTerm, CodeTables, Command, Instruction, InstructionKind, Label,
    LabelTable, TestCall,
};

/// User-facing diagnostics
pub use crate::diagnostics::{Diagnostic, Diagnostics, Severity};

/// The structured statement model
pub use crate::decompiler::{CommandCall, Stmt};

/// Surface boolean expressions and their strict normal form
pub use crate::logic::{
    normalize, BooleanExpression, ComparisonOp, ComparisonOperand, StrictBooleanExpression,
};
