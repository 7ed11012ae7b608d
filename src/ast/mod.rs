//! Unstructured control-flow AST shared by both translation directions.
//!
//! The AST is a *graph*, not a tree: convergent continuations share nodes and cycles
//! (loops) are legal. Nodes live in an arena addressed by stable [`AstNodeId`]s and,
//! for the decompile direction, are additionally looked up by originating byte
//! address, so identity is shared and recursive construction over cyclic control flow
//! terminates.
//!
//! Three node shapes exist, mirroring the three instruction kinds: a command with a
//! `next` continuation, an if with `then`/`else` continuations, and a goto. A missing
//! continuation means control flows off the end of the resource.
//!
//! - [`builder`] constructs the AST from an addressed instruction stream
//! - [`lowering`] constructs it from structured source statements

pub mod builder;
pub mod lowering;

use std::collections::HashMap;
use std::fmt;

use crate::{
    bytecode::{Address, Clause, Command},
    Result,
};

/// A strongly-typed identifier for AST nodes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AstNodeId(usize);

impl AstNodeId {
    /// Returns the raw 0-based arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for AstNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AstNodeId({})", self.0)
    }
}

impl fmt::Display for AstNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a{}", self.0)
    }
}

/// One node of the unstructured control-flow AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
    /// A straight-line command with an optional continuation.
    Command {
        /// The command itself
        command: Command,
        /// Label naming this position, if it is a jump target
        label: Option<String>,
        /// The following node; `None` when control flows off the end
        next: Option<AstNodeId>,
    },
    /// A conditional split.
    If {
        /// The AND-of-clauses condition payload
        clauses: Vec<Clause>,
        /// Continuation when the condition holds
        then_branch: Option<AstNodeId>,
        /// Continuation when the condition fails
        else_branch: Option<AstNodeId>,
        /// Label naming this position, if it is a jump target
        label: Option<String>,
    },
    /// An unconditional jump.
    Goto {
        /// The jump target; `None` means a jump past the end of the resource
        target: Option<AstNodeId>,
        /// Label naming this position, if it is a jump target
        label: Option<String>,
    },
}

impl AstNode {
    /// Returns this node's label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            AstNode::Command { label, .. }
            | AstNode::If { label, .. }
            | AstNode::Goto { label, .. } => label.as_deref(),
        }
    }
}

/// Arena of AST nodes with address-keyed identity.
///
/// Every node is constructed exactly once per logical address and subsequently looked
/// up, never re-created. Edge slots are write-once: setting a continuation that is
/// already present is an internal invariant violation, because it would silently
/// rewire control flow.
#[derive(Debug, Clone, Default)]
pub struct AstGraph {
    nodes: Vec<AstNode>,
    by_address: HashMap<Address, AstNodeId>,
    root: Option<AstNodeId>,
}

impl AstGraph {
    /// Creates an empty AST graph.
    #[must_use]
    pub fn new() -> Self {
        AstGraph {
            nodes: Vec::new(),
            by_address: HashMap::new(),
            root: None,
        }
    }

    /// Adds a node registered under its originating byte address.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if a node already exists at that address;
    /// node identity must be unique per address.
    pub fn add_at(&mut self, address: Address, node: AstNode) -> Result<AstNodeId> {
        if self.by_address.contains_key(&address) {
            return Err(internal_error!(
                "AST node at address {address:#06x} constructed twice"
            ));
        }
        let id = AstNodeId(self.nodes.len());
        self.nodes.push(node);
        self.by_address.insert(address, id);
        Ok(id)
    }

    /// Adds a node with no originating address (fabricated else-gotos, lowered source).
    pub fn add_synthetic(&mut self, node: AstNode) -> AstNodeId {
        let id = AstNodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Returns the node previously registered at the given address, if any.
    #[must_use]
    pub fn lookup(&self, address: Address) -> Option<AstNodeId> {
        self.by_address.get(&address).copied()
    }

    /// Returns the node with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if the id is outside the arena.
    pub fn node(&self, id: AstNodeId) -> Result<&AstNode> {
        self.nodes.get(id.0).ok_or_else(|| {
            crate::Error::GraphError(format!(
                "AST node {} outside arena of {} nodes",
                id,
                self.nodes.len()
            ))
        })
    }

    /// Returns the number of nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the arena holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the root node the graph is entered through.
    #[must_use]
    pub fn root(&self) -> Option<AstNodeId> {
        self.root
    }

    /// Sets the root node.
    pub fn set_root(&mut self, id: AstNodeId) {
        self.root = Some(id);
    }

    /// Sets the `next` continuation of a command node.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the node is not a command or its
    /// continuation is already set.
    pub fn set_next(&mut self, id: AstNodeId, next_id: AstNodeId) -> Result<()> {
        match self.node_mut(id)? {
            AstNode::Command { next, .. } => {
                if next.is_some() {
                    return Err(internal_error!(
                        "second next edge on command node {id}"
                    ));
                }
                *next = Some(next_id);
                Ok(())
            }
            _ => Err(internal_error!("set_next on non-command node {id}")),
        }
    }

    /// Sets the `then` continuation of an if node.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the node is not an if or the branch is
    /// already set.
    pub fn set_then(&mut self, id: AstNodeId, branch: AstNodeId) -> Result<()> {
        match self.node_mut(id)? {
            AstNode::If { then_branch, .. } => {
                if then_branch.is_some() {
                    return Err(internal_error!("second then edge on if node {id}"));
                }
                *then_branch = Some(branch);
                Ok(())
            }
            _ => Err(internal_error!("set_then on non-if node {id}")),
        }
    }

    /// Sets the `else` continuation of an if node.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the node is not an if or the branch is
    /// already set.
    pub fn set_else(&mut self, id: AstNodeId, branch: AstNodeId) -> Result<()> {
        match self.node_mut(id)? {
            AstNode::If { else_branch, .. } => {
                if else_branch.is_some() {
                    return Err(internal_error!("second else edge on if node {id}"));
                }
                *else_branch = Some(branch);
                Ok(())
            }
            _ => Err(internal_error!("set_else on non-if node {id}")),
        }
    }

    /// Sets the target of a goto node.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Internal`] if the node is not a goto or its target is
    /// already set.
    pub fn set_goto_target(&mut self, id: AstNodeId, target_id: AstNodeId) -> Result<()> {
        match self.node_mut(id)? {
            AstNode::Goto { target, .. } => {
                if target.is_some() {
                    return Err(internal_error!("second target edge on goto node {id}"));
                }
                *target = Some(target_id);
                Ok(())
            }
            _ => Err(internal_error!("set_goto_target on non-goto node {id}")),
        }
    }

    /// Attaches a label name to a node, keeping an existing one if present.
    ///
    /// Two source labels naming the same position alias; the first name wins.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::GraphError`] if the id is outside the arena.
    pub fn set_label(&mut self, id: AstNodeId, name: &str) -> Result<()> {
        match self.node_mut(id)? {
            AstNode::Command { label, .. }
            | AstNode::If { label, .. }
            | AstNode::Goto { label, .. } => {
                if label.is_none() {
                    *label = Some(name.to_string());
                }
                Ok(())
            }
        }
    }

    fn node_mut(&mut self, id: AstNodeId) -> Result<&mut AstNode> {
        let len = self.nodes.len();
        self.nodes.get_mut(id.0).ok_or_else(|| {
            crate::Error::GraphError(format!("AST node {id} outside arena of {len} nodes"))
        })
    }
}
