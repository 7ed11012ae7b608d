//! Compile direction: an address-stamped instruction stream out of a block graph.
//!
//! # Key Components
//!
//! - [`CompilerContext`] - explicit per-compilation state: pending instructions in
//!   label form, invented labels, layout and cleanup passes
//! - [`linearize`] - the depth-first, compile-once linearizer

mod context;
mod linearize;

pub use context::CompilerContext;
pub use linearize::linearize;
