//! Graph algorithms operating over the abstraction traits.
//!
//! - [`traversal`] - guarded depth-first traversal and postorder
//! - [`dominators`] - SEMI-NCA dominator tree computation
//!
//! All algorithms take any graph implementing the required traits; none is tied to the
//! basic-block graph.

pub mod dominators;
pub mod traversal;

pub use dominators::{compute_dominators, DominatorTree};
pub use traversal::{dfs, postorder};
