use thiserror::Error;

macro_rules! internal_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Internal {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Internal {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Everything in this enum is *fatal*: it signals a defect in the engine or in the data handed
/// to it by the surrounding tooling, never a problem with user-written source. Problems with
/// user source (unknown commands, bad arity, unencodable expressions) are collected as
/// [`crate::diagnostics::Diagnostic`] values instead and never surface through this type.
///
/// # Error Categories
///
/// ## Input Contract Errors
/// - [`Error::Empty`] - Empty input provided where instructions or statements were expected
/// - [`Error::InvalidTables`] - The caller-supplied code tables are inconsistent
///
/// ## Graph Errors
/// - [`Error::GraphError`] - Graph construction or query on nodes that do not exist
///
/// ## Engine Invariant Violations
/// - [`Error::Internal`] - An internal invariant did not hold (unlabeled jump target,
///   inconsistent inbound-edge bookkeeping, conflicting address assignment, ...). These
///   abort the current operation immediately; degrading silently would corrupt output
///   bytecode or source.
#[derive(Error, Debug)]
pub enum Error {
    /// Provided input was empty.
    ///
    /// Returned when an empty instruction stream or statement list is handed to a
    /// pipeline entry point that needs at least one element to establish a graph root.
    #[error("Provided input was empty")]
    Empty,

    /// The caller-supplied code tables are inconsistent.
    ///
    /// The command/test tables are an input contract (see [`crate::bytecode::CodeTables`]);
    /// duplicate opcodes or duplicate names within one table make lookups ambiguous and
    /// are rejected up front.
    #[error("Invalid code tables: {0}")]
    InvalidTables(String),

    /// Graph construction or query error.
    ///
    /// Covers structural graph failures: adding an edge whose endpoint does not exist,
    /// querying a dominator tree for a node it never saw, or asking a block graph for a
    /// block that was removed. A query for an absent node always means the *caller* of
    /// the graph layer constructed something inconsistent, so this is not recoverable.
    #[error("{0}")]
    GraphError(String),

    /// An internal engine invariant was violated.
    ///
    /// This indicates a defect in the control-flow engine itself, not in user input:
    /// an unlabeled jump target at emission time, a second outward edge of a kind that
    /// already has one, an address assigned twice, a jump resolving into unassigned
    /// address space. The source location where the violation was detected is included
    /// for debugging.
    ///
    /// # Fields
    ///
    /// * `message` - Description of the violated invariant
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Internal - {file}:{line}: {message}")]
    Internal {
        /// The message to be printed for the Internal error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },
}
