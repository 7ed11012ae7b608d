//! Decompile direction: structured source out of an optimized block graph.
//!
//! # Key Components
//!
//! - [`Stmt`] / [`CommandCall`] - the structured statement model, shared with the
//!   compile direction so round trips stay inside one vocabulary
//! - [`structure`] - the dominance-driven structuring code generator

pub mod statements;
mod structurer;

pub use statements::{CommandCall, Stmt};
pub use structurer::structure;
