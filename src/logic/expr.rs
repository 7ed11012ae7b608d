//! Surface boolean expression trees.
//!
//! This is the shape in which conditions arrive from the source parser and in which
//! the decompiler re-emits them: tests by *name*, arbitrary nesting, and comparison
//! operators that have not yet been resolved to concrete test opcodes.

use strum::Display;

use crate::{
    bytecode::{Clause, CodeTables},
    diagnostics::Diagnostics,
};

/// A test invocation at the source level: name plus argument values.
///
/// Name → opcode resolution happens during normalization, so unknown names surface as
/// diagnostics rather than being baked into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceTest {
    /// The test name as written in source
    pub name: String,
    /// Argument values, in source order
    pub args: Vec<u16>,
}

/// A comparison operator in the surface language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ComparisonOp {
    /// `==`
    #[strum(serialize = "==")]
    Eq,
    /// `!=`
    #[strum(serialize = "!=")]
    Ne,
    /// `<`
    #[strum(serialize = "<")]
    Lt,
    /// `>`
    #[strum(serialize = ">")]
    Gt,
    /// `<=`
    #[strum(serialize = "<=")]
    Le,
    /// `>=`
    #[strum(serialize = ">=")]
    Ge,
}

impl ComparisonOp {
    /// Returns the operator with its operands swapped (`a < b` ⇔ `b > a`).
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            ComparisonOp::Eq => ComparisonOp::Eq,
            ComparisonOp::Ne => ComparisonOp::Ne,
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::Le => ComparisonOp::Ge,
            ComparisonOp::Ge => ComparisonOp::Le,
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperand {
    /// A variable index
    Var(u8),
    /// An immediate number
    Num(u8),
}

/// A surface boolean expression.
///
/// This tree is richer than what the bytecode can encode; see
/// [`normalize`](crate::logic::normalize) for the reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanExpression {
    /// A test invocation by name
    Test(SurfaceTest),
    /// Logical negation
    Not(Box<BooleanExpression>),
    /// Conjunction of subexpressions
    And(Vec<BooleanExpression>),
    /// Disjunction of subexpressions
    Or(Vec<BooleanExpression>),
    /// A comparison that desugars into an equality/less-than/greater-than test
    Comparison {
        /// The operator
        op: ComparisonOp,
        /// Left operand as written
        left: ComparisonOperand,
        /// Right operand as written
        right: ComparisonOperand,
    },
}

impl BooleanExpression {
    /// Convenience constructor for a named test.
    #[must_use]
    pub fn test(name: impl Into<String>, args: Vec<u16>) -> Self {
        BooleanExpression::Test(SurfaceTest {
            name: name.into(),
            args,
        })
    }

    /// Convenience constructor for a negation.
    #[must_use]
    pub fn not(inner: BooleanExpression) -> Self {
        BooleanExpression::Not(Box::new(inner))
    }

    /// Convenience constructor for a comparison.
    #[must_use]
    pub fn comparison(op: ComparisonOp, left: ComparisonOperand, right: ComparisonOperand) -> Self {
        BooleanExpression::Comparison { op, left, right }
    }
}

/// Rebuilds a surface expression from encoded condition clauses.
///
/// This is the decompile-direction inverse of normalization: clauses form an implicit
/// AND, OR groups become [`BooleanExpression::Or`], negated terms become
/// [`BooleanExpression::Not`]. Test opcodes are resolved back to names through the
/// tables; an opcode the tables do not know is rendered as `test_0x<op>` and reported
/// as a warning, since the bytecode itself may still be meaningful to the interpreter.
#[must_use]
pub fn expression_from_clauses(
    clauses: &[Clause],
    tables: &CodeTables,
    diagnostics: &mut Diagnostics,
) -> BooleanExpression {
    let mut parts: Vec<BooleanExpression> = Vec::with_capacity(clauses.len());

    for clause in clauses {
        let mut terms: Vec<BooleanExpression> = Vec::new();
        for term in clause.terms() {
            let name = match tables.test(term.test.opcode) {
                Some(def) => def.name.clone(),
                None => {
                    diagnostics.warning(
                        format!("unknown test opcode {:#04x}", term.test.opcode),
                        None,
                    );
                    format!("test_0x{:02x}", term.test.opcode)
                }
            };
            let test = BooleanExpression::Test(SurfaceTest {
                name,
                args: term.test.args.clone(),
            });
            terms.push(if term.negated {
                BooleanExpression::not(test)
            } else {
                test
            });
        }

        parts.push(match clause {
            Clause::Single(_) => terms.remove(0),
            Clause::Any(_) => BooleanExpression::Or(terms),
        });
    }

    if parts.len() == 1 {
        parts.remove(0)
    } else {
        BooleanExpression::And(parts)
    }
}
