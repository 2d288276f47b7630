//! Boolean expressions over capture groups, used by constraint patterns.
//!
//! Expressions are written against capture names (`ConstraintExpr<String>`)
//! and bound to capture slots (`ConstraintExpr<usize>`) at compile time, so
//! evaluation per hit is a plain slot lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn apply(self, a: i64, b: i64) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// An integer-valued operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintValue<C = String> {
    Start(C),
    End(C),
    Length(C),
    Int(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstraintExpr<C = String> {
    Compare { left: ConstraintValue<C>, op: CompareOp, right: ConstraintValue<C> },
    Defined(C),
    And(Vec<ConstraintExpr<C>>),
    Or(Vec<ConstraintExpr<C>>),
    Not(Box<ConstraintExpr<C>>),
}

impl<C> ConstraintValue<C> {
    fn map<D, E>(&self, f: &mut impl FnMut(&C) -> Result<D, E>) -> Result<ConstraintValue<D>, E> {
        Ok(match self {
            ConstraintValue::Start(c) => ConstraintValue::Start(f(c)?),
            ConstraintValue::End(c) => ConstraintValue::End(f(c)?),
            ConstraintValue::Length(c) => ConstraintValue::Length(f(c)?),
            ConstraintValue::Int(i) => ConstraintValue::Int(*i),
        })
    }

    fn capture(&self) -> Option<&C> {
        match self {
            ConstraintValue::Start(c) | ConstraintValue::End(c) | ConstraintValue::Length(c) => Some(c),
            ConstraintValue::Int(_) => None,
        }
    }
}

impl<C> ConstraintExpr<C> {
    pub fn compare(left: ConstraintValue<C>, op: CompareOp, right: ConstraintValue<C>) -> Self {
        ConstraintExpr::Compare { left, op, right }
    }

    /// Replace every capture reference, failing on the first reference `f` rejects.
    pub fn try_map<D, E>(&self, f: &mut impl FnMut(&C) -> Result<D, E>) -> Result<ConstraintExpr<D>, E> {
        Ok(match self {
            ConstraintExpr::Compare { left, op, right } => ConstraintExpr::Compare {
                left: left.map(f)?,
                op: *op,
                right: right.map(f)?,
            },
            ConstraintExpr::Defined(c) => ConstraintExpr::Defined(f(c)?),
            ConstraintExpr::And(cl) => {
                ConstraintExpr::And(cl.iter().map(|e| e.try_map(&mut *f)).collect::<Result<_, _>>()?)
            }
            ConstraintExpr::Or(cl) => {
                ConstraintExpr::Or(cl.iter().map(|e| e.try_map(&mut *f)).collect::<Result<_, _>>()?)
            }
            ConstraintExpr::Not(e) => ConstraintExpr::Not(Box::new(e.try_map(f)?)),
        })
    }

    /// All capture references, in order of appearance.
    pub fn captures(&self) -> Vec<&C> {
        let mut out = Vec::new();
        self.collect_captures(&mut out);
        out
    }

    fn collect_captures<'a>(&'a self, out: &mut Vec<&'a C>) {
        match self {
            ConstraintExpr::Compare { left, right, .. } => {
                out.extend(left.capture());
                out.extend(right.capture());
            }
            ConstraintExpr::Defined(c) => out.push(c),
            ConstraintExpr::And(cl) | ConstraintExpr::Or(cl) => {
                for e in cl {
                    e.collect_captures(out);
                }
            }
            ConstraintExpr::Not(e) => e.collect_captures(out),
        }
    }
}

impl ConstraintValue<usize> {
    fn evaluate(&self, captures: &[Option<Span>]) -> Option<i64> {
        let span = |slot: &usize| captures.get(*slot).copied().flatten();
        match self {
            ConstraintValue::Start(s) => span(s).map(|sp| sp.start as i64),
            ConstraintValue::End(s) => span(s).map(|sp| sp.end as i64),
            ConstraintValue::Length(s) => span(s).map(|sp| sp.length() as i64),
            ConstraintValue::Int(i) => Some(*i),
        }
    }
}

impl ConstraintExpr<usize> {
    /// Evaluate against the capture slots of one hit.
    ///
    /// A comparison involving an unset capture is false.
    pub fn evaluate(&self, captures: &[Option<Span>]) -> bool {
        match self {
            ConstraintExpr::Compare { left, op, right } => {
                match (left.evaluate(captures), right.evaluate(captures)) {
                    (Some(a), Some(b)) => op.apply(a, b),
                    _ => false,
                }
            }
            ConstraintExpr::Defined(slot) => matches!(captures.get(*slot), Some(Some(_))),
            ConstraintExpr::And(cl) => cl.iter().all(|e| e.evaluate(captures)),
            ConstraintExpr::Or(cl) => cl.iter().any(|e| e.evaluate(captures)),
            ConstraintExpr::Not(e) => !e.evaluate(captures),
        }
    }
}

impl<C: fmt::Display> fmt::Display for ConstraintValue<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintValue::Start(c) => write!(f, "start({})", c),
            ConstraintValue::End(c) => write!(f, "end({})", c),
            ConstraintValue::Length(c) => write!(f, "length({})", c),
            ConstraintValue::Int(i) => write!(f, "{}", i),
        }
    }
}

impl<C: fmt::Display> fmt::Display for ConstraintExpr<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintExpr::Compare { left, op, right } => write!(f, "{} {} {}", left, op.symbol(), right),
            ConstraintExpr::Defined(c) => write!(f, "defined({})", c),
            ConstraintExpr::And(cl) | ConstraintExpr::Or(cl) => {
                let sep = if matches!(self, ConstraintExpr::And(_)) { " & " } else { " | " };
                write!(f, "(")?;
                for (i, e) in cl.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", sep)?;
                    }
                    write!(f, "{}", e)?;
                }
                write!(f, ")")
            }
            ConstraintExpr::Not(e) => write!(f, "!{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(expr: &ConstraintExpr) -> ConstraintExpr<usize> {
        let names = ["a", "b"];
        expr.try_map(&mut |c: &String| {
            names
                .iter()
                .position(|n| *n == c.as_str())
                .ok_or_else(|| c.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_compare_positions() {
        let expr = ConstraintExpr::compare(
            ConstraintValue::End("a".to_string()),
            CompareOp::Le,
            ConstraintValue::Start("b".to_string()),
        );
        let e = bound(&expr);
        assert!(e.evaluate(&[Some(Span::new(0, 1)), Some(Span::new(2, 3))]));
        assert!(!e.evaluate(&[Some(Span::new(0, 3)), Some(Span::new(2, 3))]));
        // unset capture makes the comparison false
        assert!(!e.evaluate(&[Some(Span::new(0, 1)), None]));
        assert_eq!(expr.to_string(), "end(a) <= start(b)");
    }

    #[test]
    fn test_boolean_combinators() {
        let expr = ConstraintExpr::Or(vec![
            ConstraintExpr::Not(Box::new(ConstraintExpr::Defined("a".to_string()))),
            ConstraintExpr::compare(
                ConstraintValue::Length("a".to_string()),
                CompareOp::Eq,
                ConstraintValue::Int(2),
            ),
        ]);
        let e = bound(&expr);
        assert!(e.evaluate(&[None, None]));
        assert!(e.evaluate(&[Some(Span::new(1, 3)), None]));
        assert!(!e.evaluate(&[Some(Span::new(1, 2)), None]));
    }

    #[test]
    fn test_unknown_capture_is_reported() {
        let expr = ConstraintExpr::Defined("zzz".to_string());
        let result: Result<ConstraintExpr<usize>, String> =
            expr.try_map(&mut |c: &String| Err(c.clone()));
        assert_eq!(result.unwrap_err(), "zzz");
        assert_eq!(expr.captures(), vec![&"zzz".to_string()]);
    }
}
