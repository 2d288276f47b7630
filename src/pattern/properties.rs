//! Structural properties of patterns that the rewriter and compiler rely on.

use crate::pattern::ast::{Direction, FilterOp, Pattern, TagKind};
use crate::types::guarantees::{mul_max, Guarantees, SortOrder};

impl Pattern {
    /// Contract of the hits this pattern produces once compiled.
    ///
    /// Mirrors what the plan compiler builds: children that must be sorted for
    /// an operator are assumed sorted, nothing else is.
    pub fn guarantees(&self) -> Guarantees {
        match self {
            Pattern::Term { .. }
            | Pattern::Regex { .. }
            | Pattern::Prefix { .. }
            | Pattern::Wildcard { .. }
            | Pattern::Not(_) => Guarantees::TERM,
            Pattern::WithSensitivity { clause, .. } => clause.guarantees(),
            Pattern::AnyToken { min, max } => any_token_guarantees(*min, *max),
            Pattern::Tag { kind: TagKind::Element, .. } => Guarantees {
                start_sorted: true,
                end_sorted: false,
                unique_start: false,
                unique_end: false,
                unique: true,
                length_min: 0,
                length_max: None,
            },
            Pattern::Tag { .. } => Guarantees {
                start_sorted: true,
                end_sorted: true,
                unique_start: false,
                unique_end: false,
                unique: false,
                length_min: 0,
                length_max: Some(0),
            },
            Pattern::Sequence(clauses) => {
                let mut iter = clauses.iter().map(|c| c.guarantees());
                let Some(first) = iter.next() else {
                    return Guarantees::unordered(0, Some(0));
                };
                iter.fold(first, |left, right| {
                    let left = ensure(left, SortOrder::EndPoint, false);
                    let right = ensure(right, SortOrder::StartPoint, false);
                    Guarantees::sequence(&left, &right)
                })
            }
            Pattern::Repetition { clause, min, max } => repetition_guarantees(&clause.guarantees(), *min, *max),
            Pattern::And(clauses) => {
                let gs: Vec<_> = clauses
                    .iter()
                    .map(|c| ensure(c.guarantees(), SortOrder::StartPoint, true))
                    .collect();
                Guarantees::intersection(&gs)
            }
            Pattern::AndNot { include, .. } => {
                let gs: Vec<_> = include
                    .iter()
                    .map(|c| ensure(c.guarantees(), SortOrder::StartPoint, true))
                    .collect();
                if let [only] = gs.as_slice() {
                    *only
                } else {
                    Guarantees::intersection(&gs)
                }
            }
            Pattern::Or(clauses) => {
                let gs: Vec<_> = clauses
                    .iter()
                    .map(|c| ensure(c.guarantees(), SortOrder::StartPoint, false))
                    .collect();
                Guarantees::union(&gs)
            }
            Pattern::PositionFilter { producer, .. } => ensure(producer.guarantees(), SortOrder::StartPoint, false),
            Pattern::NGramFilter { min, max, .. } => Guarantees {
                start_sorted: true,
                unique: true,
                ..Guarantees::unordered((*min).max(1), *max)
            },
            Pattern::Expansion { clause, direction, min, max } => {
                Guarantees::expansion(&clause.guarantees(), *direction == Direction::Left, *min, *max)
            }
            Pattern::Capture { clause, .. } | Pattern::Constraint { clause, .. } => clause.guarantees(),
            Pattern::Relation { capture, .. } => relation_guarantees(capture.is_some()),
        }
    }

    pub fn length_min(&self) -> u32 {
        self.guarantees().length_min
    }

    pub fn length_max(&self) -> Option<u32> {
        self.guarantees().length_max
    }

    /// The length shared by every hit, if there is one.
    pub fn constant_length(&self) -> Option<u32> {
        let g = self.guarantees();
        g.fixed_length().then_some(g.length_min)
    }

    pub fn produces_single_tokens(&self) -> bool {
        self.constant_length() == Some(1)
    }

    /// Can this pattern match the empty sequence?
    ///
    /// Cursors never produce empty hits for such patterns; the sequence
    /// rewrite builds explicit alternatives instead.
    pub fn matches_empty(&self) -> bool {
        match self {
            Pattern::Repetition { clause, min, .. } => *min == 0 || clause.matches_empty(),
            Pattern::AnyToken { min, .. } => *min == 0,
            Pattern::Sequence(cl) | Pattern::And(cl) => cl.iter().all(|c| c.matches_empty()),
            Pattern::Or(cl) => cl.iter().any(|c| c.matches_empty()),
            Pattern::Expansion { clause, min, .. } => *min == 0 && clause.matches_empty(),
            Pattern::WithSensitivity { clause, .. }
            | Pattern::Capture { clause, .. }
            | Pattern::Constraint { clause, .. } => clause.matches_empty(),
            Pattern::PositionFilter { producer, .. } => producer.matches_empty(),
            _ => false,
        }
    }

    /// The same pattern without its empty match.
    pub fn no_empty(&self) -> Pattern {
        if !self.matches_empty() {
            return self.clone();
        }
        match self {
            Pattern::Repetition { clause, min, max } => {
                if clause.matches_empty() {
                    // any non-empty match uses between one and `max` non-empty clause matches
                    Pattern::rep(clause.no_empty(), 1, *max)
                } else {
                    Pattern::rep((**clause).clone(), (*min).max(1), *max)
                }
            }
            Pattern::AnyToken { max, .. } => Pattern::any(1, *max),
            Pattern::Or(cl) => Pattern::Or(cl.iter().map(|c| c.no_empty()).collect()),
            Pattern::And(cl) => Pattern::And(cl.iter().map(|c| c.no_empty()).collect()),
            Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } => {
                Pattern::PositionFilter {
                    producer: Box::new(producer.no_empty()),
                    filter: filter.clone(),
                    op: *op,
                    invert: *invert,
                    adjust_left: *adjust_left,
                    adjust_right: *adjust_right,
                }
            }
            Pattern::Expansion { clause, direction, min, max } => {
                Pattern::expand(clause.no_empty(), *direction, *min, *max)
            }
            Pattern::WithSensitivity { sensitivity, clause } => clause.no_empty().sensitive(*sensitivity),
            Pattern::Capture { clause, name } => Pattern::capture(clause.no_empty(), name),
            Pattern::Constraint { clause, expr } => Pattern::constrained(clause.no_empty(), expr.clone()),
            other => other.clone(),
        }
    }

    /// Is this a negated single-token clause (`[!x]`)?
    pub fn is_single_token_not(&self) -> bool {
        matches!(self, Pattern::Not(_))
    }

    /// May `Not(self)` be replaced by [`Pattern::inverted`] without loss?
    pub fn okay_to_invert(&self) -> bool {
        match self {
            Pattern::Not(_) => true,
            Pattern::AndNot { include, exclude } => include
                .iter()
                .chain(exclude.iter())
                .all(|c| c.produces_single_tokens()),
            _ => false,
        }
    }

    /// The complement of this pattern, in its simplest known form.
    pub fn inverted(&self) -> Pattern {
        match self {
            Pattern::Not(clause) => (**clause).clone(),
            Pattern::AndNot { include, exclude } if self.okay_to_invert() => {
                let mut cl: Vec<Pattern> = include.iter().map(|c| c.inverted()).collect();
                cl.extend(exclude.iter().cloned());
                Pattern::Or(cl)
            }
            other => Pattern::not(other.clone()),
        }
    }

    /// Recognize a run of negated tokens: `[!x]`, `[!x]{n,m}` or its rewritten
    /// form `POSFILTER(ANYTOKEN(n,m), x, NOTCONTAINING)`.
    ///
    /// Returns the positive clause and the run's length range.
    pub fn negative_token_run(&self) -> Option<(&Pattern, u32, Option<u32>)> {
        match self {
            Pattern::Not(inner) => Some((inner, 1, Some(1))),
            Pattern::Repetition { clause, min, max } if *min > 0 => match &**clause {
                Pattern::Not(inner) => Some((inner, *min, *max)),
                _ => None,
            },
            Pattern::PositionFilter {
                producer,
                filter,
                op: FilterOp::Containing,
                invert: true,
                adjust_left: 0,
                adjust_right: 0,
            } => match &**producer {
                Pattern::AnyToken { min, max } if *min > 0 => Some((filter, *min, *max)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Contract of a stream after the compiler sorts it if needed.
pub(crate) fn ensure(g: Guarantees, order: SortOrder, dedup: bool) -> Guarantees {
    if g.is_sorted(order) && (!dedup || g.unique) {
        g
    } else {
        g.sorted(order, dedup)
    }
}

pub(crate) fn any_token_guarantees(min: u32, max: Option<u32>) -> Guarantees {
    let exact = max == Some(min);
    Guarantees {
        start_sorted: true,
        end_sorted: exact,
        unique_start: exact,
        unique_end: exact,
        unique: true,
        length_min: min.max(1),
        length_max: max,
    }
}

/// Relation hits are sorted per document. Only uncaptured relations are
/// deduplicated, since a captured hit also carries its relation.
pub(crate) fn relation_guarantees(captured: bool) -> Guarantees {
    Guarantees {
        start_sorted: true,
        unique: !captured,
        ..Guarantees::unordered(0, None)
    }
}

pub(crate) fn repetition_guarantees(child: &Guarantees, min: u32, max: Option<u32>) -> Guarantees {
    let min = min.max(1);
    if max == Some(min) {
        if min == 1 {
            return *child;
        }
        // a chain of `min - 1` sequence joins
        let right = ensure(*child, SortOrder::StartPoint, false);
        let mut g = *child;
        for _ in 1..min {
            g = Guarantees::sequence(&ensure(g, SortOrder::EndPoint, false), &right);
        }
        return g;
    }
    Guarantees {
        start_sorted: true,
        end_sorted: false,
        unique_start: false,
        unique_end: false,
        unique: max.is_none(),
        length_min: child.length_min.saturating_mul(min),
        length_max: mul_max(child.length_max, max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        let p = Pattern::seq(vec![Pattern::term("a"), Pattern::any(1, Some(3))]);
        assert_eq!(p.length_min(), 2);
        assert_eq!(p.length_max(), Some(4));
        assert_eq!(p.constant_length(), None);
        assert_eq!(Pattern::rep(Pattern::term("a"), 2, Some(2)).constant_length(), Some(2));
        assert_eq!(Pattern::rep(Pattern::term("a"), 1, None).length_max(), None);
    }

    #[test]
    fn test_matches_empty_and_no_empty() {
        let opt = Pattern::rep(Pattern::term("a"), 0, Some(1));
        assert!(opt.matches_empty());
        assert_eq!(opt.no_empty(), Pattern::rep(Pattern::term("a"), 1, Some(1)));
        assert!(!Pattern::term("a").matches_empty());
        assert!(Pattern::seq(vec![opt.clone(), Pattern::any(0, None)]).matches_empty());
        assert!(!Pattern::seq(vec![opt, Pattern::term("b")]).matches_empty());
    }

    #[test]
    fn test_inversion() {
        let a = Pattern::term("a");
        let b = Pattern::term("b");
        assert_eq!(Pattern::not(a.clone()).inverted(), a);
        let and_not = Pattern::and_not(vec![a.clone()], vec![b.clone()]);
        assert!(and_not.okay_to_invert());
        assert_eq!(and_not.inverted(), Pattern::or(vec![Pattern::not(a.clone()), b]));
        assert!(!a.okay_to_invert());
        assert_eq!(a.inverted(), Pattern::not(a));
    }

    #[test]
    fn test_negative_token_run() {
        let a = Pattern::term("a");
        let run = Pattern::rep(Pattern::not(a.clone()), 2, Some(3));
        assert_eq!(run.negative_token_run(), Some((&a, 2, Some(3))));
        let filter = Pattern::position_filter_not(Pattern::any(1, Some(4)), a.clone(), FilterOp::Containing);
        assert_eq!(filter.negative_token_run(), Some((&a, 1, Some(4))));
        assert_eq!(a.negative_token_run(), None);
    }

    #[test]
    fn test_sequence_guarantees_follow_join_contract() {
        let fixed = Pattern::seq(vec![Pattern::term("a"), Pattern::term("b")]);
        let g = fixed.guarantees();
        assert!(g.start_sorted && g.end_sorted && g.unique);
        assert_eq!(g.length_min, 2);

        let varying = Pattern::seq(vec![Pattern::rep(Pattern::term("a"), 1, None), Pattern::term("b")]);
        let g = varying.guarantees();
        assert!(g.end_sorted);
        assert_eq!(g.length_max, None);
    }
}
