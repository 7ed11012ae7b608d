//! Boolean expressions and the propositional normalizer.
//!
//! The surface language allows arbitrarily nested `&&` / `||` / `!` and comparison
//! operators; the bytecode can only encode one level: an AND of groups, each group a
//! single (possibly negated) test or an OR of (possibly negated) tests. This module
//! owns both shapes and the reduction between them:
//!
//! - [`BooleanExpression`] - the rich surface tree the parser produces
//! - [`StrictBooleanExpression`] - the one-level normal form the clause encoding accepts
//! - [`normalize`] - the reduction, with De Morgan collapse and the one simple
//!   OR-over-AND distribution; anything deeper is reported, never mis-encoded

mod expr;
mod normalize;

pub use expr::{
    expression_from_clauses, BooleanExpression, ComparisonOp, ComparisonOperand, SurfaceTest,
};
pub use normalize::{
    normalize, NormalizeError, StrictAndTerm, StrictBooleanExpression, StrictTerm,
};
