//! Repetition simplification

use crate::pattern::{FilterOp, Pattern};

pub(super) fn rewrite_repetition(clause: Pattern, min: u32, max: Option<u32>) -> Pattern {
    if min == 1 && max == Some(1) {
        return clause;
    }
    if clause.matches_empty() {
        // empty repetitions pad the count: only the non-empty ones matter
        return Pattern::rep(clause.no_empty(), 0, max);
    }
    match clause {
        Pattern::AnyToken { min: 1, max: Some(1) } => Pattern::any(min, max),
        Pattern::AnyToken { min: n, max: Some(m) } if n == m && max == Some(min) => {
            let total = n.saturating_mul(min);
            Pattern::any(total, Some(total))
        }
        Pattern::Not(inner) if min > 0 => {
            Pattern::position_filter_not(Pattern::any(min, max), *inner, FilterOp::Containing)
        }
        Pattern::Repetition { clause: inner, min: inner_min, max: inner_max } => {
            match (inner_max, max) {
                (None, None) if inner_min <= 1 && min <= 1 => Pattern::rep(*inner, inner_min * min, None),
                (Some(a), Some(b)) if a == inner_min && b == min => {
                    let total = a.saturating_mul(b);
                    Pattern::rep(*inner, total, Some(total))
                }
                _ => Pattern::rep(
                    Pattern::Repetition { clause: inner, min: inner_min, max: inner_max },
                    min,
                    max,
                ),
            }
        }
        other => Pattern::rep(other, min, max),
    }
}
