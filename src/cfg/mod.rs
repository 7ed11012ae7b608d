//! Basic-block graph construction, invariants, and simplification.
//!
//! The block graph is the engine's central structure: both translation directions
//! build one (from bytecode via the AST, or from source via lowering), and both make
//! their control-flow decisions by querying its dominator and post-dominator trees.
//!
//! # Key Components
//!
//! - [`BasicBlock`] / [`BlockKind`] - linear command runs and conditional splits
//! - [`BlockGraph`] - the arena with edge/inbound-set maintaining primitives
//! - [`ReverseBlockView`] / [`PostDominatorTree`] - the reversed, virtually-rooted
//!   view that turns the dominator engine into a post-dominator engine
//! - [`build_blocks`] - AST → block graph
//! - [`optimize`] - fixed-point empty-block elision and linear-run concatenation
//!
//! # Invariants
//!
//! Every reachable block's inbound-edge set is exactly the set of live inbound edges;
//! a block never has two outward edges of the same kind; blocks are constructed once
//! and looked up by stable id. The primitives enforce all three; violating callers
//! get an internal error, not a silently corrupted graph.

mod block;
mod builder;
mod graph;
mod optimize;

pub use block::{BasicBlock, BlockEdge, BlockEdgeKind, BlockId, BlockKind};
pub use builder::build_blocks;
pub use graph::{BlockGraph, PostDominatorTree, ReverseBlockView};
pub use optimize::optimize;
