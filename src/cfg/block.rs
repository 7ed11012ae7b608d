//! Basic block and edge types.
//!
//! A basic block is a maximal straight-line run with one entry and one exit: either a
//! [`BlockKind::SinglePath`] of commands ending in a fall-through, or a
//! [`BlockKind::IfExit`] ending in a conditional split. Outward edges are *typed*
//! (`Next` for fall-through, `Then`/`Else` for the two sides of a split) and a block
//! never carries two outward edges of the same kind.

use std::fmt;

use crate::{
    ast::AstNodeId,
    bytecode::{Clause, Command},
    utils::graph::NodeId,
};

/// A strongly-typed identifier for basic blocks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockId(pub(in crate::cfg) usize);

impl BlockId {
    /// Returns the raw 0-based arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Converts to the generic graph node id with the same index.
    #[must_use]
    pub const fn as_node(self) -> NodeId {
        NodeId::new(self.0)
    }

    /// Converts from a generic graph node id with the same index.
    #[must_use]
    pub const fn from_node(node: NodeId) -> Self {
        BlockId(node.index())
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// The kind of a typed block edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockEdgeKind {
    /// Fall-through out of a single-path block
    Next,
    /// The condition-holds side of a split
    Then,
    /// The condition-fails side of a split
    Else,
}

impl fmt::Display for BlockEdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockEdgeKind::Next => write!(f, "next"),
            BlockEdgeKind::Then => write!(f, "then"),
            BlockEdgeKind::Else => write!(f, "else"),
        }
    }
}

/// One typed edge between two blocks, referencing both endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockEdge {
    /// The block the edge leaves
    pub source: BlockId,
    /// The block the edge enters
    pub target: BlockId,
    /// The edge type
    pub kind: BlockEdgeKind,
}

/// The payload of a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// A linear command run ending in an (optional) fall-through.
    SinglePath {
        /// The commands executed in order
        commands: Vec<Command>,
        /// Fall-through target; `None` when control flows off the end
        next: Option<BlockId>,
    },
    /// A conditional split.
    IfExit {
        /// The AND-of-clauses condition payload
        clauses: Vec<Clause>,
        /// Target when the condition holds; `None` when that path ends the resource
        then_branch: Option<BlockId>,
        /// Target when the condition fails; `None` when that path ends the resource
        else_branch: Option<BlockId>,
    },
}

/// One basic block: payload, label, inbound-edge set, and a diagnostic back-link to
/// the AST node it came from.
///
/// The inbound-edge set (`entry_points`) is exactly the set of live edges entering
/// this block. It is maintained *only* by [`crate::cfg::BlockGraph`]'s
/// attach/detach/redirect/remove primitives; the fields are module-private so no
/// other code can desynchronize the bookkeeping.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub(in crate::cfg) kind: BlockKind,
    pub(in crate::cfg) label: Option<String>,
    pub(in crate::cfg) entry_points: Vec<BlockEdge>,
    pub(in crate::cfg) source: Option<AstNodeId>,
}

impl BasicBlock {
    /// Returns the block payload.
    #[must_use]
    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    /// Returns this block's label, if it is a jump target.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Returns the live inbound edges of this block.
    #[must_use]
    pub fn entry_points(&self) -> &[BlockEdge] {
        &self.entry_points
    }

    /// Returns the AST node this block was built from, for diagnostics.
    #[must_use]
    pub fn source(&self) -> Option<AstNodeId> {
        self.source
    }

    /// Returns `true` for a single-path (non-splitting) block.
    #[must_use]
    pub fn is_single_path(&self) -> bool {
        matches!(self.kind, BlockKind::SinglePath { .. })
    }

    /// Returns the commands of a single-path block, or an empty slice for a split.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        match &self.kind {
            BlockKind::SinglePath { commands, .. } => commands,
            BlockKind::IfExit { .. } => &[],
        }
    }

    /// Returns the outward edge of the given kind, if present.
    #[must_use]
    pub fn outward(&self, kind: BlockEdgeKind) -> Option<BlockId> {
        match (&self.kind, kind) {
            (BlockKind::SinglePath { next, .. }, BlockEdgeKind::Next) => *next,
            (BlockKind::IfExit { then_branch, .. }, BlockEdgeKind::Then) => *then_branch,
            (BlockKind::IfExit { else_branch, .. }, BlockEdgeKind::Else) => *else_branch,
            _ => None,
        }
    }

    /// Returns all outward edges of this block in `Next`/`Then`/`Else` order.
    pub(in crate::cfg) fn outward_edges(&self, id: BlockId) -> Vec<BlockEdge> {
        let mut edges = Vec::with_capacity(2);
        for kind in [BlockEdgeKind::Next, BlockEdgeKind::Then, BlockEdgeKind::Else] {
            if let Some(target) = self.outward(kind) {
                edges.push(BlockEdge {
                    source: id,
                    target,
                    kind,
                });
            }
        }
        edges
    }

    /// Returns `true` if control can fall off the end of the resource through this
    /// block (a missing fall-through or a missing split branch).
    #[must_use]
    pub fn is_exit(&self) -> bool {
        match &self.kind {
            BlockKind::SinglePath { next, .. } => next.is_none(),
            BlockKind::IfExit {
                then_branch,
                else_branch,
                ..
            } => then_branch.is_none() || else_branch.is_none(),
        }
    }
}
