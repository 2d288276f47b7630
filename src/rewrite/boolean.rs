//! Boolean combinations of clauses

use crate::pattern::Pattern;

fn push_unique(out: &mut Vec<Pattern>, p: Pattern) {
    if !out.contains(&p) {
        out.push(p);
    }
}

/// `Not(x)` over a single-token `x`: excluding it is the same as subtracting `x`'s hits
fn token_negation(p: &Pattern) -> bool {
    match p {
        Pattern::Not(inner) => inner.produces_single_tokens(),
        _ => false,
    }
}

fn single_or(mut clauses: Vec<Pattern>, wrap: fn(Vec<Pattern>) -> Pattern) -> Pattern {
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        wrap(clauses)
    }
}

pub(super) fn rewrite_or(clauses: Vec<Pattern>) -> Pattern {
    let mut flat = Vec::with_capacity(clauses.len());
    for clause in clauses {
        match clause {
            Pattern::Or(inner) => inner.into_iter().for_each(|c| push_unique(&mut flat, c)),
            other => push_unique(&mut flat, other),
        }
    }
    if flat.len() > 1 && flat.iter().all(token_negation) {
        // [!a | !b] == ![a & b]
        return Pattern::not(Pattern::And(flat.iter().map(|c| c.inverted()).collect()));
    }
    single_or(flat, Pattern::Or)
}

/// Positive clauses and excluded single-token clauses of a conjunction
#[derive(Default)]
struct Conjunction {
    positive: Vec<Pattern>,
    exclude: Vec<Pattern>,
    negated: bool,
}

impl Conjunction {
    /// Sort one clause, descending into nested conjunctions
    fn add(&mut self, clause: Pattern) {
        match clause {
            Pattern::And(inner) => inner.into_iter().for_each(|c| self.add(c)),
            Pattern::AndNot { include, exclude } => {
                include.into_iter().for_each(|c| self.add(c));
                exclude.into_iter().for_each(|c| push_unique(&mut self.exclude, c));
                self.negated = true;
            }
            Pattern::Not(inner) if inner.produces_single_tokens() => {
                push_unique(&mut self.exclude, *inner);
                self.negated = true;
            }
            other => push_unique(&mut self.positive, other),
        }
    }
}

pub(super) fn rewrite_and(clauses: Vec<Pattern>) -> Pattern {
    let mut conjunction = Conjunction::default();
    clauses.into_iter().for_each(|c| conjunction.add(c));
    let Conjunction { mut positive, exclude, negated } = conjunction;
    drop_redundant_any_tokens(&mut positive);

    if positive.is_empty() {
        // [!a & !b] == ![a | b]
        return Pattern::not(single_or(exclude, Pattern::Or));
    }
    if !negated {
        return single_or(positive, Pattern::And);
    }
    Pattern::and_not(positive, exclude)
}

/// An any-token clause adds nothing when every other positive clause's length fits its range
fn drop_redundant_any_tokens(positive: &mut Vec<Pattern>) {
    let others: Vec<(u32, Option<u32>)> = positive
        .iter()
        .filter(|c| !matches!(c, Pattern::AnyToken { .. }))
        .map(|c| (c.length_min(), c.length_max()))
        .collect();
    if others.is_empty() {
        return;
    }
    positive.retain(|c| match c {
        Pattern::AnyToken { min, max } => !others.iter().all(|&(lo, hi)| {
            lo >= (*min).max(1)
                && match (hi, max) {
                    (_, None) => true,
                    (Some(hi), Some(max)) => hi <= *max,
                    (None, Some(_)) => false,
                }
        }),
        _ => true,
    });
}

pub(super) fn rewrite_and_not(include: Vec<Pattern>, exclude: Vec<Pattern>) -> Pattern {
    if exclude.is_empty() {
        return rewrite_and(include);
    }
    let mut conjunction = Conjunction::default();
    include.into_iter().for_each(|c| conjunction.add(c));
    let Conjunction { positive, exclude: mut negative, .. } = conjunction;
    for clause in exclude {
        match clause {
            Pattern::Or(inner) => inner.into_iter().for_each(|c| push_unique(&mut negative, c)),
            other => push_unique(&mut negative, other),
        }
    }
    if positive.is_empty() {
        return Pattern::not(single_or(negative, Pattern::Or));
    }
    Pattern::and_not(positive, negative)
}

pub(super) fn rewrite_not(clause: Pattern) -> Pattern {
    if clause.okay_to_invert() {
        clause.inverted()
    } else {
        Pattern::not(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(v: &str) -> Pattern {
        Pattern::term(v)
    }

    #[test]
    fn test_or_flattens_and_deduplicates() {
        let p = rewrite_or(vec![t("a"), Pattern::or(vec![t("b"), t("a")]), t("c")]);
        assert_eq!(p, Pattern::or(vec![t("a"), t("b"), t("c")]));
        assert_eq!(rewrite_or(vec![t("a"), t("a")]), t("a"));
    }

    #[test]
    fn test_and_splits_positive_and_negative() {
        let p = rewrite_and(vec![t("a"), Pattern::and(vec![t("b"), Pattern::not(t("c"))])]);
        assert_eq!(p, Pattern::and_not(vec![t("a"), t("b")], vec![t("c")]));

        let deep = rewrite_and(vec![
            t("a"),
            Pattern::and(vec![Pattern::and(vec![Pattern::not(t("c")), t("b")])]),
            Pattern::and_not(vec![Pattern::not(t("d"))], vec![t("e")]),
        ]);
        assert_eq!(deep, Pattern::and_not(vec![t("a"), t("b")], vec![t("c"), t("d"), t("e")]));
    }

    #[test]
    fn test_redundant_any_token_dropped() {
        assert_eq!(rewrite_and(vec![Pattern::any(1, Some(1)), t("a")]), t("a"));
        let long = Pattern::rep(t("a"), 1, None);
        let kept = rewrite_and(vec![Pattern::any(1, Some(3)), long.clone()]);
        assert_eq!(kept, Pattern::and(vec![Pattern::any(1, Some(3)), long]));
    }

    #[test]
    fn test_and_not_normalizes_its_lists() {
        let p = rewrite_and_not(vec![t("a"), Pattern::not(t("b"))], vec![Pattern::or(vec![t("c"), t("d")])]);
        assert_eq!(p, Pattern::and_not(vec![t("a")], vec![t("b"), t("c"), t("d")]));
        assert_eq!(rewrite_and_not(vec![t("a")], vec![]), t("a"));
    }

    #[test]
    fn test_not_inverts_when_allowed() {
        assert_eq!(rewrite_not(Pattern::not(t("a"))), t("a"));
        assert_eq!(rewrite_not(t("a")), Pattern::not(t("a")));
    }
}
