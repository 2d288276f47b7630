//! Position filters and expansions

use crate::pattern::{Direction, FilterOp, Pattern};
use crate::types::guarantees::add_max;

pub(super) fn rewrite_position_filter(
    producer: Pattern,
    filter: Pattern,
    op: FilterOp,
    invert: bool,
    adjust_left: i32,
    adjust_right: i32,
) -> Pattern {
    match producer {
        // n-grams standing in relation `op` to the filter: generated around filter hits
        Pattern::AnyToken { min, max } if !invert && adjust_left == 0 && adjust_right == 0 => {
            Pattern::ngrams(filter, op, min, max)
        }
        producer => Pattern::PositionFilter {
            producer: Box::new(producer),
            filter: Box::new(filter),
            op,
            invert,
            adjust_left,
            adjust_right,
        },
    }
}

pub(super) fn rewrite_expansion(clause: Pattern, direction: Direction, min: u32, max: Option<u32>) -> Pattern {
    if min == 0 && max == Some(0) {
        return clause;
    }
    if clause.matches_empty() {
        // the expansion of an empty clause match is a run of any tokens
        return Pattern::or(vec![
            Pattern::expand(clause.no_empty(), direction, min, max),
            Pattern::any(min, max),
        ]);
    }
    match clause {
        Pattern::Expansion { clause: inner, direction: inner_direction, min: inner_min, max: inner_max }
            if inner_direction == direction =>
        {
            Pattern::expand(*inner, direction, inner_min + min, add_max(inner_max, max))
        }
        Pattern::AnyToken { min: any_min, max: any_max } => Pattern::any(any_min + min, add_max(any_max, max)),
        clause => Pattern::expand(clause, direction, min, max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_token_producer_becomes_ngrams() {
        let filter = Pattern::term("a");
        let p = rewrite_position_filter(Pattern::any(2, Some(4)), filter.clone(), FilterOp::Containing, false, 0, 0);
        assert_eq!(p, Pattern::ngrams(filter.clone(), FilterOp::Containing, 2, Some(4)));

        let inverted = rewrite_position_filter(Pattern::any(2, Some(4)), filter.clone(), FilterOp::Containing, true, 0, 0);
        assert_eq!(
            inverted,
            Pattern::position_filter_not(Pattern::any(2, Some(4)), filter, FilterOp::Containing)
        );
    }

    #[test]
    fn test_nested_expansions_add() {
        let inner = Pattern::expand(Pattern::term("a"), Direction::Right, 1, Some(2));
        assert_eq!(
            rewrite_expansion(inner.clone(), Direction::Right, 3, Some(4)),
            Pattern::expand(Pattern::term("a"), Direction::Right, 4, Some(6))
        );
        assert_eq!(
            rewrite_expansion(inner.clone(), Direction::Left, 1, Some(1)),
            Pattern::expand(inner, Direction::Left, 1, Some(1))
        );
        assert_eq!(rewrite_expansion(Pattern::term("a"), Direction::Left, 0, Some(0)), Pattern::term("a"));
        assert_eq!(rewrite_expansion(Pattern::any(1, Some(1)), Direction::Left, 0, None), Pattern::any(1, None));
    }
}
