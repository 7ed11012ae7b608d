//! Propositional normalization to the encodable one-level form.
//!
//! The clause encoding accepts exactly one shape: an AND over groups, each group a
//! single (possibly negated) test or an OR over (possibly negated) tests. This module
//! reduces arbitrary surface expressions into that shape:
//!
//! 1. comparisons desugar into equality/less-than/greater-than test calls with operand
//!    order normalized (`5 < a` becomes `a > 5` before resolution);
//! 2. negation is pushed down to the tests by De Morgan collapse, cancelling double
//!    negation on the way;
//! 3. nested conjunctions/disjunctions of the same operator flatten;
//! 4. an OR sitting over an AND is distributed only in the simple two-operand case
//!    where everything involved is already an irreducible term. Arbitrary-depth
//!    distribution is deliberately not attempted: the bytecode cannot represent what
//!    it would produce in general, and silently exploding the expression would hide
//!    the cost from the author. Such expressions are reported as
//!    [`NormalizeError::TooComplex`] instead of being mis-encoded.

use std::fmt;

use crate::{
    bytecode::{Clause, ClauseTerm, CodeTables, TestCall},
    logic::expr::{BooleanExpression, ComparisonOp, ComparisonOperand},
};

/// Why an expression could not be normalized.
///
/// All of these are user-facing: the caller converts them into diagnostics against the
/// offending statement. None of them aborts compilation of other statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A test name is absent from the code tables.
    UnknownTest(String),
    /// A test was invoked with the wrong number of arguments.
    ArityMismatch {
        /// The test name as written
        name: String,
        /// Number of arguments the tables declare
        expected: usize,
        /// Number of arguments supplied
        got: usize,
    },
    /// Both sides of a comparison are constants.
    ConstantComparison,
    /// The expression requires nesting the clause encoding cannot represent.
    TooComplex,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::UnknownTest(name) => write!(f, "unknown test '{name}'"),
            NormalizeError::ArityMismatch {
                name,
                expected,
                got,
            } => write!(
                f,
                "test '{name}' takes {expected} argument(s), {got} supplied"
            ),
            NormalizeError::ConstantComparison => {
                write!(f, "comparison between two constants has no test encoding")
            }
            NormalizeError::TooComplex => write!(
                f,
                "expression too complex to encode: AND/OR nesting exceeds one level"
            ),
        }
    }
}

/// A single (possibly negated) test in strict form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrictTerm {
    /// The test itself
    Test(TestCall),
    /// The negation of the test
    Not(TestCall),
}

impl StrictTerm {
    fn to_clause_term(&self) -> ClauseTerm {
        match self {
            StrictTerm::Test(test) => ClauseTerm {
                negated: false,
                test: test.clone(),
            },
            StrictTerm::Not(test) => ClauseTerm {
                negated: true,
                test: test.clone(),
            },
        }
    }
}

/// One conjunct of a strict AND: a term or an OR of terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrictAndTerm {
    /// A positive test
    Test(TestCall),
    /// A negated test
    Not(TestCall),
    /// An OR group of terms
    Or(Vec<StrictTerm>),
}

/// A boolean expression in the one-level normal form the clause encoding accepts.
///
/// The invariant (AND never nests inside OR and vice versa beyond one level) holds
/// by construction: the variants simply cannot express anything deeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrictBooleanExpression {
    /// A single positive test
    Test(TestCall),
    /// A single negated test
    Not(TestCall),
    /// An OR over (possibly negated) tests
    Or(Vec<StrictTerm>),
    /// An AND over terms and OR groups
    And(Vec<StrictAndTerm>),
}

impl StrictBooleanExpression {
    /// Converts the strict form into encoded condition clauses.
    #[must_use]
    pub fn to_clauses(&self) -> Vec<Clause> {
        match self {
            StrictBooleanExpression::Test(test) => vec![Clause::Single(ClauseTerm {
                negated: false,
                test: test.clone(),
            })],
            StrictBooleanExpression::Not(test) => vec![Clause::Single(ClauseTerm {
                negated: true,
                test: test.clone(),
            })],
            StrictBooleanExpression::Or(terms) => vec![Clause::Any(
                terms.iter().map(StrictTerm::to_clause_term).collect(),
            )],
            StrictBooleanExpression::And(items) => items
                .iter()
                .map(|item| match item {
                    StrictAndTerm::Test(test) => Clause::Single(ClauseTerm {
                        negated: false,
                        test: test.clone(),
                    }),
                    StrictAndTerm::Not(test) => Clause::Single(ClauseTerm {
                        negated: true,
                        test: test.clone(),
                    }),
                    StrictAndTerm::Or(terms) => {
                        Clause::Any(terms.iter().map(StrictTerm::to_clause_term).collect())
                    }
                })
                .collect(),
        }
    }
}

/// Intermediate negation-normal form: only terms, ANDs and ORs.
#[derive(Debug, Clone)]
enum Node {
    Term(bool, TestCall),
    And(Vec<Node>),
    Or(Vec<Node>),
}

/// Normalizes a surface expression into the strict one-level form.
///
/// # Errors
///
/// Returns a [`NormalizeError`] when the expression refers to an unknown test, uses a
/// test with the wrong arity, compares two constants, or requires AND/OR nesting
/// beyond what the encoding can represent. These are user-facing; the caller reports
/// them as diagnostics.
pub fn normalize(
    expr: &BooleanExpression,
    tables: &CodeTables,
) -> Result<StrictBooleanExpression, NormalizeError> {
    let resolved = resolve(expr, tables)?;
    let flat = flatten(resolved);
    structure(flat)
}

/// Resolves names and comparisons, pushing negation down to the tests.
///
/// The `negate` flag threads De Morgan through the recursion instead of rewriting the
/// tree twice.
fn resolve(expr: &BooleanExpression, tables: &CodeTables) -> Result<Node, NormalizeError> {
    fn go(
        expr: &BooleanExpression,
        tables: &CodeTables,
        negate: bool,
    ) -> Result<Node, NormalizeError> {
        match expr {
            BooleanExpression::Test(test) => {
                let def = tables
                    .test_by_name(&test.name)
                    .ok_or_else(|| NormalizeError::UnknownTest(test.name.clone()))?;
                let arity_ok = if def.variadic {
                    !test.args.is_empty()
                } else {
                    test.args.len() == def.args.len()
                };
                if !arity_ok {
                    return Err(NormalizeError::ArityMismatch {
                        name: test.name.clone(),
                        expected: def.args.len(),
                        got: test.args.len(),
                    });
                }
                Ok(Node::Term(
                    negate,
                    TestCall {
                        opcode: def.opcode,
                        args: test.args.clone(),
                    },
                ))
            }
            BooleanExpression::Not(inner) => go(inner, tables, !negate),
            BooleanExpression::And(items) => {
                let children = items
                    .iter()
                    .map(|item| go(item, tables, negate))
                    .collect::<Result<Vec<Node>, NormalizeError>>()?;
                // De Morgan: ¬(a ∧ b) = ¬a ∨ ¬b
                Ok(if negate {
                    Node::Or(children)
                } else {
                    Node::And(children)
                })
            }
            BooleanExpression::Or(items) => {
                let children = items
                    .iter()
                    .map(|item| go(item, tables, negate))
                    .collect::<Result<Vec<Node>, NormalizeError>>()?;
                Ok(if negate {
                    Node::And(children)
                } else {
                    Node::Or(children)
                })
            }
            BooleanExpression::Comparison { op, left, right } => {
                let (negated, test) = desugar_comparison(*op, *left, *right, tables)?;
                Ok(Node::Term(negated != negate, test))
            }
        }
    }

    go(expr, tables, false)
}

/// Desugars one comparison into a (possibly negated) native test call.
///
/// Operand order is normalized first: a constant on the left flips the operator so
/// the variable always leads, matching the native test signatures.
fn desugar_comparison(
    op: ComparisonOp,
    left: ComparisonOperand,
    right: ComparisonOperand,
    tables: &CodeTables,
) -> Result<(bool, TestCall), NormalizeError> {
    let lookup = |name: &str| -> Result<u8, NormalizeError> {
        tables
            .test_by_name(name)
            .map(|def| def.opcode)
            .ok_or_else(|| NormalizeError::UnknownTest(name.to_string()))
    };

    match (left, right) {
        (ComparisonOperand::Num(_), ComparisonOperand::Num(_)) => {
            Err(NormalizeError::ConstantComparison)
        }
        (ComparisonOperand::Num(n), ComparisonOperand::Var(v)) => desugar_comparison(
            op.flipped(),
            ComparisonOperand::Var(v),
            ComparisonOperand::Num(n),
            tables,
        ),
        (ComparisonOperand::Var(v), ComparisonOperand::Num(n)) => {
            let (name, negated) = match op {
                ComparisonOp::Eq => ("equaln", false),
                ComparisonOp::Ne => ("equaln", true),
                ComparisonOp::Lt => ("lessn", false),
                ComparisonOp::Ge => ("lessn", true),
                ComparisonOp::Gt => ("greatern", false),
                ComparisonOp::Le => ("greatern", true),
            };
            Ok((
                negated,
                TestCall {
                    opcode: lookup(name)?,
                    args: vec![u16::from(v), u16::from(n)],
                },
            ))
        }
        (ComparisonOperand::Var(a), ComparisonOperand::Var(b)) => {
            let (name, negated) = match op {
                ComparisonOp::Eq => ("equalv", false),
                ComparisonOp::Ne => ("equalv", true),
                ComparisonOp::Lt => ("lessv", false),
                ComparisonOp::Ge => ("lessv", true),
                ComparisonOp::Gt => ("greaterv", false),
                ComparisonOp::Le => ("greaterv", true),
            };
            Ok((
                negated,
                TestCall {
                    opcode: lookup(name)?,
                    args: vec![u16::from(a), u16::from(b)],
                },
            ))
        }
    }
}

/// Flattens same-operator nesting and unwraps singletons.
fn flatten(node: Node) -> Node {
    match node {
        Node::Term(negated, test) => Node::Term(negated, test),
        Node::And(items) => {
            let mut flat = Vec::with_capacity(items.len());
            for item in items {
                match flatten(item) {
                    Node::And(inner) => flat.extend(inner),
                    other => flat.push(other),
                }
            }
            if flat.len() == 1 {
                flat.remove(0)
            } else {
                Node::And(flat)
            }
        }
        Node::Or(items) => {
            let mut flat = Vec::with_capacity(items.len());
            for item in items {
                match flatten(item) {
                    Node::Or(inner) => flat.extend(inner),
                    other => flat.push(other),
                }
            }
            if flat.len() == 1 {
                flat.remove(0)
            } else {
                Node::Or(flat)
            }
        }
    }
}

/// Shapes a flattened NNF node into the strict form, distributing where allowed.
fn structure(node: Node) -> Result<StrictBooleanExpression, NormalizeError> {
    match node {
        Node::Term(false, test) => Ok(StrictBooleanExpression::Test(test)),
        Node::Term(true, test) => Ok(StrictBooleanExpression::Not(test)),
        Node::Or(items) => match structure_or(items)? {
            OrShape::Terms(terms) => Ok(StrictBooleanExpression::Or(terms)),
            OrShape::Distributed(groups) => Ok(StrictBooleanExpression::And(
                groups.into_iter().map(StrictAndTerm::Or).collect(),
            )),
        },
        Node::And(items) => {
            let mut conjuncts: Vec<StrictAndTerm> = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Node::Term(false, test) => conjuncts.push(StrictAndTerm::Test(test)),
                    Node::Term(true, test) => conjuncts.push(StrictAndTerm::Not(test)),
                    Node::Or(or_items) => match structure_or(or_items)? {
                        OrShape::Terms(terms) => conjuncts.push(StrictAndTerm::Or(terms)),
                        OrShape::Distributed(groups) => {
                            conjuncts.extend(groups.into_iter().map(StrictAndTerm::Or));
                        }
                    },
                    // flatten() removed And-in-And
                    Node::And(_) => return Err(NormalizeError::TooComplex),
                }
            }
            Ok(StrictBooleanExpression::And(conjuncts))
        }
    }
}

/// The two encodable outcomes of shaping an OR.
enum OrShape {
    /// A plain OR group
    Terms(Vec<StrictTerm>),
    /// OR-over-AND distributed into several OR groups (an implicit AND of them)
    Distributed(Vec<Vec<StrictTerm>>),
}

fn structure_or(items: Vec<Node>) -> Result<OrShape, NormalizeError> {
    let all_terms = items.iter().all(|item| matches!(item, Node::Term(..)));
    if all_terms {
        return Ok(OrShape::Terms(items.into_iter().map(as_term).collect()));
    }

    // Distribution is attempted only in the simple case: exactly two operands, one an
    // irreducible term, the other an AND of irreducible terms.
    // t ∨ (a ∧ b) = (t ∨ a) ∧ (t ∨ b)
    if items.len() == 2 {
        let (term_node, and_node) = match (&items[0], &items[1]) {
            (Node::Term(..), Node::And(_)) => (items[0].clone(), items[1].clone()),
            (Node::And(_), Node::Term(..)) => (items[1].clone(), items[0].clone()),
            _ => return Err(NormalizeError::TooComplex),
        };
        let Node::And(and_items) = and_node else {
            return Err(NormalizeError::TooComplex);
        };
        if !and_items.iter().all(|item| matches!(item, Node::Term(..))) {
            return Err(NormalizeError::TooComplex);
        }

        let term = as_term(term_node);
        let groups = and_items
            .into_iter()
            .map(|conjunct| vec![term.clone(), as_term(conjunct)])
            .collect();
        return Ok(OrShape::Distributed(groups));
    }

    Err(NormalizeError::TooComplex)
}

fn as_term(node: Node) -> StrictTerm {
    match node {
        Node::Term(false, test) => StrictTerm::Test(test),
        Node::Term(true, test) => StrictTerm::Not(test),
        // callers checked the shape
        Node::And(_) | Node::Or(_) => unreachable!("as_term on non-term node"),
    }
}
