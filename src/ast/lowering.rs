//! Compile-direction AST construction from structured statements.
//!
//! Lowering walks statement bodies back-to-front so every statement can link its
//! continuation directly: the node for a statement is created after the node for
//! whatever follows it. If bodies converge on the continuation of the enclosing
//! statement list, which is exactly the node sharing the block builder expects.
//!
//! All user-facing problems found here (unknown command or test names, wrong
//! arity, unencodable conditions, undefined or duplicate labels) are reported as
//! diagnostics against the offending statement (by preorder index) and lowering
//! continues, so one bad statement does not hide errors in the rest of the source.

use std::collections::HashMap;

use crate::{
    ast::{AstGraph, AstNode, AstNodeId},
    bytecode::{CodeTables, Command},
    decompiler::statements::Stmt,
    diagnostics::Diagnostics,
    logic::normalize,
    Result,
};

/// Lowers structured statements into the unstructured control-flow AST.
///
/// Statement-level problems are reported into `diagnostics`; the graph returned for a
/// source with error diagnostics is structurally valid but incomplete and must not be
/// compiled further.
///
/// # Errors
///
/// Returns [`crate::Error`] only for engine defects; user-source problems land in
/// `diagnostics`.
pub fn lower_statements(
    statements: &[Stmt],
    tables: &CodeTables,
    diagnostics: &mut Diagnostics,
) -> Result<AstGraph> {
    let mut lowerer = Lowerer {
        tables,
        diagnostics,
        graph: AstGraph::new(),
        labels: HashMap::new(),
        pending_gotos: Vec::new(),
    };

    let entry = lowerer.lower_body(statements, 0, None)?;
    if let Some(entry) = entry {
        lowerer.graph.set_root(entry);
    }
    lowerer.resolve_gotos()?;

    tracing::trace!(
        statements = statements.len(),
        nodes = lowerer.graph.len(),
        "statements lowered"
    );
    Ok(lowerer.graph)
}

struct Lowerer<'a> {
    tables: &'a CodeTables,
    diagnostics: &'a mut Diagnostics,
    graph: AstGraph,
    /// Resolved label bindings; `None` marks a label at the very end of the program
    /// (a goto to it is a jump off the end).
    labels: HashMap<String, Option<AstNodeId>>,
    /// Goto nodes whose label was not yet resolvable, with the referenced name and
    /// the goto's statement index.
    pending_gotos: Vec<(AstNodeId, String, usize)>,
}

impl Lowerer<'_> {
    /// Lowers one statement body, returning its entry node.
    ///
    /// `base` is the preorder index of the body's first statement; `cont` is where
    /// control goes after the body ends.
    fn lower_body(
        &mut self,
        statements: &[Stmt],
        base: usize,
        cont: Option<AstNodeId>,
    ) -> Result<Option<AstNodeId>> {
        // Preorder index of each statement in this body
        let mut offsets = Vec::with_capacity(statements.len());
        let mut offset = base;
        for statement in statements {
            offsets.push(offset);
            offset += statement.weight();
        }

        let mut current = cont;
        for (statement, &index) in statements.iter().zip(offsets.iter()).rev() {
            current = self.lower_statement(statement, index, current)?;
        }
        Ok(current)
    }

    /// Lowers one statement given the entry of everything that follows it.
    fn lower_statement(
        &mut self,
        statement: &Stmt,
        index: usize,
        following: Option<AstNodeId>,
    ) -> Result<Option<AstNodeId>> {
        match statement {
            Stmt::Command(call) => {
                let Some(def) = self.tables.command_by_name(&call.name) else {
                    self.diagnostics
                        .error(format!("unknown command '{}'", call.name), Some(index));
                    return Ok(following);
                };
                if call.args.len() != def.args.len() {
                    self.diagnostics.error(
                        format!(
                            "command '{}' takes {} argument(s), {} supplied",
                            call.name,
                            def.args.len(),
                            call.args.len()
                        ),
                        Some(index),
                    );
                    return Ok(following);
                }

                let id = self.graph.add_synthetic(AstNode::Command {
                    command: Command {
                        opcode: def.opcode,
                        args: call.args.clone(),
                    },
                    label: None,
                    next: following,
                });
                Ok(Some(id))
            }
            Stmt::If {
                condition,
                then_body,
                else_body,
            } => {
                let then_base = index + 1;
                let else_base = then_base + then_body.iter().map(Stmt::weight).sum::<usize>();

                // Both branches converge on the continuation of the enclosing body
                let then_entry = self.lower_body(then_body, then_base, following)?;
                let else_entry = self.lower_body(else_body, else_base, following)?;

                let clauses = match normalize(condition, self.tables) {
                    Ok(strict) => strict.to_clauses(),
                    Err(err) => {
                        self.diagnostics.error(err.to_string(), Some(index));
                        // The bodies were still lowered for their own diagnostics and
                        // label bindings; without an encodable condition the if itself
                        // cannot exist.
                        return Ok(following);
                    }
                };

                let id = self.graph.add_synthetic(AstNode::If {
                    clauses,
                    then_branch: then_entry,
                    else_branch: else_entry,
                    label: None,
                });
                Ok(Some(id))
            }
            Stmt::Goto(name) => {
                let id = self.graph.add_synthetic(AstNode::Goto {
                    target: None,
                    label: None,
                });
                self.pending_gotos.push((id, name.clone(), index));
                Ok(Some(id))
            }
            Stmt::Label(name) => {
                if self.labels.contains_key(name) {
                    self.diagnostics
                        .error(format!("duplicate label '{name}'"), Some(index));
                    return Ok(following);
                }
                self.labels.insert(name.clone(), following);
                if let Some(target) = following {
                    self.graph.set_label(target, name)?;
                }
                Ok(following)
            }
        }
    }

    /// Resolves every pending goto against the collected label bindings.
    fn resolve_gotos(&mut self) -> Result<()> {
        for (id, name, index) in std::mem::take(&mut self.pending_gotos) {
            match self.labels.get(&name) {
                // A label at the very end of the program: the goto jumps off the
                // end, which is a goto node with no target.
                Some(None) => {}
                Some(Some(target)) => self.graph.set_goto_target(id, *target)?,
                None => {
                    self.diagnostics
                        .error(format!("undefined label '{name}'"), Some(index));
                }
            }
        }
        Ok(())
    }
}
