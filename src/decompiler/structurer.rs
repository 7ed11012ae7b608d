//! Dominance-driven structuring code generation.
//!
//! Walks the optimized block graph and decides, edge by edge, whether control flow
//! can be expressed as nesting or must stay an explicit goto:
//!
//! - a fall-through edge inlines iff the block dominates the target *and* the target
//!   post-dominates the block; otherwise the target is deferred to a work queue and
//!   emitted later under its own label;
//! - a split branch is emitted inline when its target is dominated by the if block;
//!   a branch escaping that dominance region compiles to a goto;
//! - the *else-unrolling* heuristic hoists the else branch out of `else {}` into the
//!   following statement stream whenever the else target post-dominates the if block
//!   and every node reached via the then branch's continuation is dominated by that
//!   else target, recovering the early-exit idiom (`if (c) { ...; return; } rest`)
//!   as flat code;
//! - each block is emitted once; a cycle encountered again compiles to a goto to its
//!   existing label.
//!
//! The immediate post-dominator of an if block serves as "where control must
//! reconverge". That proxy is not proven complete for graphs with several
//! simultaneous early exits or irreducible cross-jumps; it is a documented heuristic
//! boundary, and the round-trip corpus in `tests/` is the behavior-preservation gate
//! for any change to it. When a rule declines, the fallback is always an explicit
//! goto, which is behavior-correct by construction.
//!
//! A jump target without a label here is fatal: the graph violated an assumed
//! invariant upstream, and emitting anything would silently change program behavior.

use std::collections::{HashSet, VecDeque};

use crate::{
    bytecode::{Clause, CodeTables, Command},
    cfg::{BlockGraph, BlockId, BlockKind, PostDominatorTree},
    decompiler::statements::{CommandCall, Stmt},
    diagnostics::Diagnostics,
    logic::{expression_from_clauses, BooleanExpression},
    utils::graph::{algorithms::DominatorTree, Successors},
    Result,
};

/// Emits structured statements for an optimized block graph.
///
/// # Errors
///
/// Returns [`crate::Error::Internal`] when a jump target carries no label, and
/// propagates graph errors for queries on blocks that do not exist; both signal
/// engine defects, never bad user input.
pub fn structure(
    graph: &BlockGraph,
    tables: &CodeTables,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<Stmt>> {
    let structurer = Structurer {
        dominators: graph.dominators(),
        post_dominators: PostDominatorTree::compute(graph),
        graph,
        tables,
        diagnostics,
        emitted: HashSet::new(),
        queue: VecDeque::new(),
    };
    structurer.run()
}

struct Structurer<'a> {
    graph: &'a BlockGraph,
    tables: &'a CodeTables,
    diagnostics: &'a mut Diagnostics,
    /// Built once per block graph and cached for the lifetime of code generation
    dominators: DominatorTree,
    post_dominators: PostDominatorTree,
    emitted: HashSet<BlockId>,
    /// Escaped jump targets awaiting top-level emission under their own label
    queue: VecDeque<BlockId>,
}

impl Structurer<'_> {
    fn run(mut self) -> Result<Vec<Stmt>> {
        let mut output = Vec::new();
        self.emit_region(Some(self.graph.entry_block()), None, &mut output)?;

        while let Some(block) = self.queue.pop_front() {
            if self.emitted.contains(&block) {
                continue;
            }
            tracing::trace!(%block, "emitting deferred jump target");
            self.emit_region(Some(block), None, &mut output)?;
        }

        // Cosmetic post-passes; each preserves behavior on its own, so the combined
        // fixed point does too
        loop {
            let mut changed = drop_unreferenced_labels(&mut output);
            changed |= collapse_redundant_gotos(&mut output);
            changed |= rewrite_empty_then(&mut output);
            if !changed {
                break;
            }
        }
        Ok(output)
    }

    /// Emits the region starting at `start`, stopping (without emitting it) when the
    /// walk reaches `stop`.
    fn emit_region(
        &mut self,
        start: Option<BlockId>,
        stop: Option<BlockId>,
        out: &mut Vec<Stmt>,
    ) -> Result<()> {
        let mut cursor = start;
        while let Some(block) = cursor {
            if Some(block) == stop {
                return Ok(());
            }
            if self.emitted.contains(&block) {
                out.push(Stmt::Goto(self.require_label(block)?));
                return Ok(());
            }
            self.emitted.insert(block);

            if let Some(label) = self.graph.block(block)?.label() {
                out.push(Stmt::Label(label.to_string()));
            }

            match self.graph.block(block)?.kind().clone() {
                BlockKind::SinglePath { commands, next } => {
                    for command in &commands {
                        let call = self.command_call(command);
                        out.push(Stmt::Command(call));
                    }
                    let Some(target) = next else { return Ok(()) };
                    if Some(target) == stop
                        || (self.dominates(block, target)?
                            && self.post_dominates(target, block)?)
                    {
                        cursor = Some(target);
                    } else {
                        out.push(Stmt::Goto(self.require_label(target)?));
                        self.queue.push_back(target);
                        return Ok(());
                    }
                }
                BlockKind::IfExit {
                    clauses,
                    then_branch,
                    else_branch,
                } => {
                    cursor = self.emit_if(block, &clauses, then_branch, else_branch, out)?;
                }
            }
        }
        Ok(())
    }

    /// Emits one conditional split and returns where the outer walk continues.
    fn emit_if(
        &mut self,
        block: BlockId,
        clauses: &[Clause],
        then_branch: Option<BlockId>,
        else_branch: Option<BlockId>,
        out: &mut Vec<Stmt>,
    ) -> Result<Option<BlockId>> {
        let condition = expression_from_clauses(clauses, self.tables, self.diagnostics);

        if let Some(else_target) = else_branch {
            if self.can_unroll_else(block, then_branch, else_target)? {
                tracing::trace!(%block, else_target = %else_target, "unrolling else branch");
                let mut then_body = Vec::new();
                self.emit_branch(block, then_branch, Some(else_target), &mut then_body)?;
                out.push(Stmt::If {
                    condition,
                    then_body,
                    else_body: Vec::new(),
                });
                return Ok(Some(else_target));
            }
        }

        let reconvergence = self.post_dominators.immediate(block)?;
        let mut then_body = Vec::new();
        self.emit_branch(block, then_branch, reconvergence, &mut then_body)?;
        let mut else_body = Vec::new();
        self.emit_branch(block, else_branch, reconvergence, &mut else_body)?;
        out.push(Stmt::If {
            condition,
            then_body,
            else_body,
        });
        Ok(reconvergence)
    }

    /// Emits one branch of a split, inline when dominance allows, as a goto when the
    /// branch escapes the if block's region.
    fn emit_branch(
        &mut self,
        if_block: BlockId,
        target: Option<BlockId>,
        stop: Option<BlockId>,
        out: &mut Vec<Stmt>,
    ) -> Result<()> {
        let Some(target) = target else { return Ok(()) };
        if Some(target) == stop {
            return Ok(());
        }
        if self.emitted.contains(&target) {
            out.push(Stmt::Goto(self.require_label(target)?));
            return Ok(());
        }
        if self.dominates(if_block, target)? {
            self.emit_region(Some(target), stop, out)
        } else {
            out.push(Stmt::Goto(self.require_label(target)?));
            self.queue.push_back(target);
            Ok(())
        }
    }

    /// Decides whether the else branch can be hoisted out of `else {}` into the
    /// statement stream following the if.
    ///
    /// Requires the else target to post-dominate the if block, and every node the
    /// then branch reaches without crossing the else target to stay dominated by the
    /// if block; anything escaping sideways could be entered from outside the
    /// hoisted layout.
    fn can_unroll_else(
        &self,
        block: BlockId,
        then_branch: Option<BlockId>,
        else_target: BlockId,
    ) -> Result<bool> {
        if !self.post_dominates(else_target, block)? {
            return Ok(false);
        }
        let Some(then_target) = then_branch else {
            return Ok(true);
        };

        let mut stack = vec![then_target];
        let mut seen: HashSet<BlockId> = HashSet::new();
        seen.insert(then_target);
        while let Some(node) = stack.pop() {
            if node == else_target {
                continue;
            }
            if !self.dominates(block, node)? {
                return Ok(false);
            }
            for successor in self.graph.successors(node.as_node()) {
                let successor = BlockId::from_node(successor);
                if seen.insert(successor) {
                    stack.push(successor);
                }
            }
        }
        Ok(true)
    }

    fn dominates(&self, a: BlockId, b: BlockId) -> Result<bool> {
        self.dominators.dominates(a.as_node(), b.as_node())
    }

    fn post_dominates(&self, a: BlockId, b: BlockId) -> Result<bool> {
        self.post_dominators.post_dominates(a, b)
    }

    fn require_label(&self, block: BlockId) -> Result<String> {
        match self.graph.block(block)?.label() {
            Some(label) => Ok(label.to_string()),
            None => Err(internal_error!("no label found for jump target {block}")),
        }
    }

    fn command_call(&mut self, command: &Command) -> CommandCall {
        let name = match self.tables.command(command.opcode) {
            Some(def) => def.name.clone(),
            None => {
                self.diagnostics.warning(
                    format!("unknown command opcode {:#04x}", command.opcode),
                    None,
                );
                format!("cmd_0x{:02x}", command.opcode)
            }
        };
        CommandCall {
            name,
            args: command.args.clone(),
        }
    }
}

/// Removes label statements no goto in the whole output references.
fn drop_unreferenced_labels(output: &mut Vec<Stmt>) -> bool {
    let mut referenced = HashSet::new();
    collect_goto_targets(output, &mut referenced);
    remove_unreferenced(output, &referenced)
}

fn collect_goto_targets(statements: &[Stmt], referenced: &mut HashSet<String>) {
    for statement in statements {
        match statement {
            Stmt::Goto(name) => {
                referenced.insert(name.clone());
            }
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                collect_goto_targets(then_body, referenced);
                collect_goto_targets(else_body, referenced);
            }
            Stmt::Label(_) | Stmt::Command(_) => {}
        }
    }
}

fn remove_unreferenced(statements: &mut Vec<Stmt>, referenced: &HashSet<String>) -> bool {
    let before = statements.len();
    statements.retain(|s| !matches!(s, Stmt::Label(name) if !referenced.contains(name)));
    let mut changed = statements.len() != before;

    for statement in statements.iter_mut() {
        if let Stmt::If {
            then_body,
            else_body,
            ..
        } = statement
        {
            changed |= remove_unreferenced(then_body, referenced);
            changed |= remove_unreferenced(else_body, referenced);
        }
    }
    changed
}

/// Drops a goto immediately followed by its own target label, or by another goto to
/// the same target.
fn collapse_redundant_gotos(statements: &mut Vec<Stmt>) -> bool {
    let mut changed = false;
    let mut index = 0;
    while index < statements.len() {
        let redundant = match (&statements[index], statements.get(index + 1)) {
            (Stmt::Goto(target), Some(Stmt::Label(label))) => target == label,
            (Stmt::Goto(target), Some(Stmt::Goto(other))) => target == other,
            _ => false,
        };
        if redundant {
            statements.remove(index);
            changed = true;
        } else {
            index += 1;
        }
    }

    for statement in statements.iter_mut() {
        if let Stmt::If {
            then_body,
            else_body,
            ..
        } = statement
        {
            changed |= collapse_redundant_gotos(then_body);
            changed |= collapse_redundant_gotos(else_body);
        }
    }
    changed
}

/// Rewrites `if (c) {} else { body }` into `if (!c) { body }`.
fn rewrite_empty_then(statements: &mut [Stmt]) -> bool {
    let mut changed = false;
    for statement in statements.iter_mut() {
        if let Stmt::If {
            condition,
            then_body,
            else_body,
        } = statement
        {
            if then_body.is_empty() && !else_body.is_empty() {
                *condition = negate(condition.clone());
                std::mem::swap(then_body, else_body);
                changed = true;
            }
            changed |= rewrite_empty_then(then_body);
            changed |= rewrite_empty_then(else_body);
        }
    }
    changed
}

fn negate(condition: BooleanExpression) -> BooleanExpression {
    match condition {
        BooleanExpression::Not(inner) => *inner,
        other => BooleanExpression::not(other),
    }
}
