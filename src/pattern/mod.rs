//! Pattern algebra: the query tree handed over by a parser, plus the
//! structural properties and rendering the rewriter and compiler build on.
//!
//! - `ast`: node types and constructor helpers
//! - `constraint`: boolean expressions over capture groups
//! - `properties`: lengths, contracts, emptiness and inversion
//! - `display`: diagnostic rendering

pub mod ast;
pub mod constraint;
pub mod display;
pub mod properties;

pub use ast::{Direction, FilterOp, Pattern, RelationDirection, Sensitivity, TagKind};
pub use constraint::{CompareOp, ConstraintExpr, ConstraintValue};
