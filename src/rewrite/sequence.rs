//! Sequence rewriting: tag pairing, adjacent clause combination and
//! alternatives for clauses that may match nothing

use crate::pattern::{Direction, FilterOp, Pattern, TagKind};
use crate::types::guarantees::add_max;

pub(super) fn rewrite_sequence(clauses: Vec<Pattern>) -> Pattern {
    let parts = flatten(clauses);
    let parts = pair_tags(parts);
    let parts = combine_adjacent(parts);
    if parts.len() == 1 || !parts.iter().any(|p| p.matches_empty()) {
        return sequence_of(parts);
    }
    let mut alternatives: Vec<Pattern> = Vec::new();
    for alternative in alternatives_of(&parts) {
        let alternative = sequence_of(alternative);
        if !alternatives.contains(&alternative) {
            alternatives.push(alternative);
        }
    }
    let either = sequence_of_or(alternatives);
    if parts.iter().all(|p| p.matches_empty()) {
        // the all-skipped alternative stays available to an enclosing sequence
        return Pattern::rep(either, 0, Some(1));
    }
    either
}

fn sequence_of(mut parts: Vec<Pattern>) -> Pattern {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        Pattern::Sequence(parts)
    }
}

fn sequence_of_or(mut alternatives: Vec<Pattern>) -> Pattern {
    if alternatives.len() == 1 {
        alternatives.remove(0)
    } else {
        Pattern::Or(alternatives)
    }
}

fn flatten(clauses: Vec<Pattern>) -> Vec<Pattern> {
    let mut out = Vec::with_capacity(clauses.len());
    for clause in clauses {
        match clause {
            Pattern::Sequence(inner) => out.extend(flatten(inner)),
            other => out.push(other),
        }
    }
    out
}

/// Collapse `<s> ... </s>` into a position filter over the `s` elements
fn pair_tags(parts: Vec<Pattern>) -> Vec<Pattern> {
    let mut out: Vec<Pattern> = Vec::with_capacity(parts.len());
    // open start tags: index into `out` and element name
    let mut open: Vec<(usize, String)> = Vec::new();
    for part in parts {
        match &part {
            Pattern::Tag { name, kind: TagKind::Start, .. } => {
                open.push((out.len(), name.clone()));
                out.push(part);
            }
            Pattern::Tag { name, kind: TagKind::End, .. } => {
                let Some(k) = open.iter().rposition(|(_, n)| n == name) else {
                    out.push(part);
                    continue;
                };
                let at = open[k].0;
                open.truncate(k);
                let mut inner = out.split_off(at);
                let start = inner.remove(0);
                match pair(&start, &inner) {
                    Some(filter) => out.push(filter),
                    None => {
                        out.push(start);
                        out.extend(inner);
                        out.push(part);
                    }
                }
            }
            _ => out.push(part),
        }
    }
    out
}

fn is_any_run(p: &Pattern) -> bool {
    matches!(p, Pattern::AnyToken { min: 0, max: None })
}

fn pair(start: &Pattern, inner: &[Pattern]) -> Option<Pattern> {
    let Pattern::Tag { name, attrs, .. } = start else {
        return None;
    };
    if inner.is_empty() {
        return None;
    }
    let leading = is_any_run(&inner[0]);
    let trailing = inner.len() > usize::from(leading) && is_any_run(&inner[inner.len() - 1]);
    let search = &inner[usize::from(leading)..inner.len() - usize::from(trailing)];
    let element = Pattern::Tag { name: name.clone(), attrs: attrs.clone(), kind: TagKind::Element };
    if search.is_empty() {
        // <s> []* </s>: every element
        return Some(element);
    }
    let op = match (leading, trailing) {
        (true, true) => FilterOp::Containing,
        (false, true) => FilterOp::ContainingAtStart,
        (true, false) => FilterOp::ContainingAtEnd,
        (false, false) => FilterOp::Matches,
    };
    Some(Pattern::position_filter(element, sequence_of(search.to_vec()), op))
}

/// Merge each clause with its predecessor while some combination applies
fn combine_adjacent(parts: Vec<Pattern>) -> Vec<Pattern> {
    let mut out: Vec<Pattern> = Vec::with_capacity(parts.len());
    for part in parts {
        let mut current = part;
        while let Some(combined) = out.last().and_then(|prev| combine(prev, &current)) {
            out.pop();
            current = combined;
        }
        out.push(current);
    }
    out
}

/// `(clause, min, max)` of a repetition; any other pattern repeats once
fn repeated(p: &Pattern) -> (&Pattern, u32, Option<u32>) {
    match p {
        Pattern::Repetition { clause, min, max } => (clause, *min, *max),
        other => (other, 1, Some(1)),
    }
}

/// Length of every hit of a clause that never matches empty
fn fixed_length(p: &Pattern) -> Option<u32> {
    if p.matches_empty() {
        None
    } else {
        p.constant_length()
    }
}

/// A single pattern equivalent to `prev` followed by `next`, if one is known
fn combine(prev: &Pattern, next: &Pattern) -> Option<Pattern> {
    // rep(x) x, x rep(x), rep(x) rep(x), x x
    let (prev_clause, prev_min, prev_max) = repeated(prev);
    let (next_clause, next_min, next_max) = repeated(next);
    if prev_clause == next_clause && !matches!(prev_clause, Pattern::AnyToken { .. }) {
        return Some(Pattern::rep(prev_clause.clone(), prev_min + next_min, add_max(prev_max, next_max)));
    }

    match (prev, next) {
        (Pattern::AnyToken { min: a, max: b }, Pattern::AnyToken { min: c, max: d }) => {
            return Some(Pattern::any(a + c, add_max(*b, *d)));
        }
        (Pattern::AnyToken { min, max }, x) if !x.matches_empty() => {
            return Some(Pattern::expand(x.clone(), Direction::Left, *min, *max));
        }
        (x, Pattern::AnyToken { min, max }) if !x.matches_empty() => {
            return Some(Pattern::expand(x.clone(), Direction::Right, *min, *max));
        }
        (Pattern::Expansion { clause, direction: Direction::Left, min, max }, x)
            if Some(*min) != *max && !x.matches_empty() =>
        {
            let inner = Pattern::seq(vec![(**clause).clone(), x.clone()]);
            return Some(Pattern::expand(inner, Direction::Left, *min, *max));
        }
        (x, Pattern::Expansion { clause, direction: Direction::Right, min, max })
            if Some(*min) != *max && !x.matches_empty() =>
        {
            let inner = Pattern::seq(vec![x.clone(), (**clause).clone()]);
            return Some(Pattern::expand(inner, Direction::Right, *min, *max));
        }
        _ => {}
    }

    if let (Some(len), false) = (fixed_length(next), prev.matches_empty()) {
        if let Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } = prev {
            return Some(Pattern::PositionFilter {
                producer: Box::new(Pattern::seq(vec![(**producer).clone(), next.clone()])),
                filter: filter.clone(),
                op: *op,
                invert: *invert,
                adjust_left: *adjust_left,
                adjust_right: adjust_right - len as i32,
            });
        }
    }
    if let (Some(len), false) = (fixed_length(prev), next.matches_empty()) {
        if let Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } = next {
            return Some(Pattern::PositionFilter {
                producer: Box::new(Pattern::seq(vec![prev.clone(), (**producer).clone()])),
                filter: filter.clone(),
                op: *op,
                invert: *invert,
                adjust_left: adjust_left + len as i32,
                adjust_right: *adjust_right,
            });
        }
    }

    // a negated run next to a fixed-length clause: expand the clause over the
    // run and reject windows where the negated pattern occurs
    if let (Some(len), Some((inner, min, max))) = (fixed_length(prev), next.negative_token_run()) {
        return Some(Pattern::PositionFilter {
            producer: Box::new(Pattern::expand(prev.clone(), Direction::Right, min, max)),
            filter: Box::new(inner.clone()),
            op: FilterOp::Containing,
            invert: true,
            adjust_left: len as i32,
            adjust_right: 0,
        });
    }
    if let (Some((inner, min, max)), Some(len)) = (prev.negative_token_run(), fixed_length(next)) {
        return Some(Pattern::PositionFilter {
            producer: Box::new(Pattern::expand(next.clone(), Direction::Left, min, max)),
            filter: Box::new(inner.clone()),
            op: FilterOp::Containing,
            invert: true,
            adjust_left: 0,
            adjust_right: -(len as i32),
        });
    }
    None
}

/// Every way of keeping or eliding the clauses that may match nothing;
/// kept clauses never match empty and the all-elided alternative is left out
fn alternatives_of(parts: &[Pattern]) -> Vec<Vec<Pattern>> {
    let Some((head, tail)) = parts.split_first() else {
        return Vec::new();
    };
    let head_kept = head.no_empty();
    if tail.is_empty() {
        return vec![vec![head_kept]];
    }
    let tail_alternatives = alternatives_of(tail);
    let mut out = Vec::with_capacity(tail_alternatives.len() * 2 + 1);
    for alternative in tail_alternatives {
        let mut with_head = Vec::with_capacity(alternative.len() + 1);
        with_head.push(head_kept.clone());
        with_head.extend(alternative.iter().cloned());
        out.push(with_head);
        if head.matches_empty() {
            out.push(alternative);
        }
    }
    if tail.iter().all(|p| p.matches_empty()) {
        out.push(vec![head_kept]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(v: &str) -> Pattern {
        Pattern::term(v)
    }

    #[test]
    fn test_alternatives_order() {
        let opt = |p: Pattern| Pattern::rep(p, 0, Some(1));
        let once = |p: Pattern| Pattern::rep(p, 1, Some(1));
        let alts = alternatives_of(&[opt(t("a")), t("b"), opt(t("c"))]);
        assert_eq!(
            alts,
            vec![
                vec![once(t("a")), t("b"), once(t("c"))],
                vec![t("b"), once(t("c"))],
                vec![once(t("a")), t("b")],
                vec![t("b")],
            ]
        );
    }

    #[test]
    fn test_all_optional_never_yields_empty_alternative() {
        let alts = alternatives_of(&[Pattern::rep(t("a"), 0, Some(1)), Pattern::rep(t("b"), 0, Some(1))]);
        assert_eq!(alts.len(), 3);
        assert!(alts.iter().all(|alt| !alt.is_empty()));
    }

    #[test]
    fn test_optional_sequence_stays_optional() {
        let opt = |p: Pattern| Pattern::rep(p, 0, Some(1));
        let once = |p: Pattern| Pattern::rep(p, 1, Some(1));
        let p = rewrite_sequence(vec![opt(t("a")), opt(t("b"))]);
        assert!(p.matches_empty());
        let either = Pattern::or(vec![Pattern::seq(vec![once(t("a")), once(t("b"))]), once(t("b")), once(t("a"))]);
        assert_eq!(p, opt(either.clone()));

        // the enclosing sequence can still skip it
        let outer = rewrite_sequence(vec![p, t("c")]);
        assert_eq!(outer, Pattern::or(vec![Pattern::seq(vec![once(either), t("c")]), t("c")]));
    }

    #[test]
    fn test_pair_tags_chooses_operation() {
        let start = || Pattern::tag("s", TagKind::Start);
        let end = || Pattern::tag("s", TagKind::End);
        let any = || Pattern::any(0, None);
        let cases = [
            (vec![start(), any(), t("a"), any(), end()], FilterOp::Containing),
            (vec![start(), t("a"), any(), end()], FilterOp::ContainingAtStart),
            (vec![start(), any(), t("a"), end()], FilterOp::ContainingAtEnd),
            (vec![start(), t("a"), end()], FilterOp::Matches),
        ];
        for (parts, op) in cases {
            assert_eq!(pair_tags(parts), vec![Pattern::position_filter(Pattern::element("s"), t("a"), op)]);
        }
    }

    #[test]
    fn test_unmatched_tags_stay() {
        let parts = vec![Pattern::tag("s", TagKind::Start), t("a"), Pattern::tag("p", TagKind::End)];
        assert_eq!(pair_tags(parts.clone()), parts);
    }

    #[test]
    fn test_combination_retries_predecessor() {
        let parts = combine_adjacent(vec![t("a"), t("b"), t("c"), Pattern::any(1, Some(2))]);
        let inner = Pattern::seq(vec![t("a"), Pattern::seq(vec![t("b"), t("c")])]);
        assert_eq!(parts, vec![Pattern::expand(inner, Direction::Right, 1, Some(2))]);
    }

    #[test]
    fn test_optional_expansion_is_not_combined() {
        let opt = Pattern::rep(t("a"), 0, Some(1));
        assert_eq!(combine(&Pattern::any(2, Some(2)), &opt), None);
        assert_eq!(combine(&Pattern::any(2, Some(2)), &Pattern::any(0, Some(1))), Some(Pattern::any(2, Some(3))));
    }
}
