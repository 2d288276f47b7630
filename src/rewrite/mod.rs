//! Pattern rewriter
//!
//! Turns a parsed pattern into the simplest equivalent tree the compiler
//! knows how to execute efficiently. The driver validates the whole tree
//! once, then applies the node rules bottom-up, one rule per node per pass,
//! until a pass changes nothing.
//!
//! - `leaf`: regex specialization and sensitivity push-down
//! - `boolean`: `And`/`Or`/`Not`/`AndNot` normalization
//! - `repetition`: repetition simplification
//! - `sequence`: tag pairing, adjacent clause combination, empty-match alternatives
//! - `position`: position filters, n-gram filters and expansions

mod boolean;
mod leaf;
mod position;
mod repetition;
mod sequence;

#[cfg(test)]
mod tests;

pub(crate) use leaf::regex_body;

use crate::engine::constants::DEFAULT_MAX_REWRITE_PASSES;
use crate::error::PatternError;
use crate::index::TermMatcher;
use crate::pattern::Pattern;

/// Rewrite with the default pass budget
pub fn rewrite(pattern: &Pattern) -> Result<Pattern, PatternError> {
    rewrite_with_budget(pattern, DEFAULT_MAX_REWRITE_PASSES)
}

/// Validate `pattern`, then rewrite it to a fixed point within `max_passes` passes
pub fn rewrite_with_budget(pattern: &Pattern, max_passes: usize) -> Result<Pattern, PatternError> {
    validate(pattern)?;
    let mut current = pattern.clone();
    for pass in 1..=max_passes {
        let mut next = rewrite_node(&current);
        if next.matches_empty() {
            // a hit is never empty: keep only the non-empty matches
            next = next.no_empty();
        }
        if next == current {
            log::debug!("Rewrite reached a fixed point after {} pass(es): {}", pass, current);
            return Ok(current);
        }
        log::debug!("Rewrite pass {}: {}", pass, next);
        current = next;
    }
    Err(PatternError::RewriteBudgetExceeded(max_passes))
}

/// Reject malformed patterns before any rule runs
pub fn validate(pattern: &Pattern) -> Result<(), PatternError> {
    let declared = pattern.capture_names();
    validate_node(pattern, &declared)
}

fn validate_node(pattern: &Pattern, declared: &[String]) -> Result<(), PatternError> {
    match pattern {
        Pattern::Repetition { min, max, .. } | Pattern::AnyToken { min, max } => {
            if let Some(max) = *max {
                if max == 0 {
                    return Err(PatternError::ZeroMaximum(pattern.kind_name()));
                }
                if *min > max {
                    return Err(PatternError::InvalidRepetition { min: *min, max });
                }
            }
        }
        Pattern::Expansion { min, max: Some(max), .. } if min > max => {
            return Err(PatternError::InvalidExpansion { min: *min, max: *max });
        }
        Pattern::NGramFilter { min, max: Some(max), .. } if min > max => {
            return Err(PatternError::InvalidNGrams { min: *min, max: *max });
        }
        Pattern::Sequence(cl) | Pattern::And(cl) | Pattern::Or(cl) if cl.is_empty() => {
            return Err(PatternError::EmptyClauses(pattern.kind_name()));
        }
        Pattern::AndNot { include, .. } if include.is_empty() => {
            return Err(PatternError::EmptyClauses(pattern.kind_name()));
        }
        Pattern::Regex { pattern: body, .. } => {
            let (_, body) = leaf::strip_markers(body);
            TermMatcher::Regex(body.to_string()).compile()?;
        }
        Pattern::Relation { rel_type, capture, .. } => {
            TermMatcher::Regex(rel_type.clone()).compile()?;
            if capture.as_ref().is_some_and(|name| name.is_empty()) {
                return Err(PatternError::EmptyCaptureName);
            }
        }
        Pattern::Constraint { expr, .. } => {
            if let Some(unknown) = expr.captures().into_iter().find(|c| !declared.contains(*c)) {
                return Err(PatternError::UnknownCapture(unknown.clone()));
            }
        }
        _ => {}
    }
    pattern.children().into_iter().try_for_each(|c| validate_node(c, declared))
}

/// One bottom-up pass: children first, then at most one rule for the node itself
fn rewrite_node(pattern: &Pattern) -> Pattern {
    let rebuilt = map_children(pattern, &mut rewrite_node);
    apply_rules(rebuilt)
}

fn apply_rules(pattern: Pattern) -> Pattern {
    match pattern {
        Pattern::Regex { field, pattern, sensitivity } => leaf::specialize_regex(field, &pattern, sensitivity),
        Pattern::Wildcard { field, pattern, sensitivity } => leaf::specialize_wildcard(field, pattern, sensitivity),
        Pattern::WithSensitivity { sensitivity, clause } => leaf::push_down(sensitivity, *clause),
        Pattern::Sequence(clauses) => sequence::rewrite_sequence(clauses),
        Pattern::Repetition { clause, min, max } => repetition::rewrite_repetition(*clause, min, max),
        Pattern::And(clauses) => boolean::rewrite_and(clauses),
        Pattern::AndNot { include, exclude } => boolean::rewrite_and_not(include, exclude),
        Pattern::Or(clauses) => boolean::rewrite_or(clauses),
        Pattern::Not(clause) => boolean::rewrite_not(*clause),
        Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } => {
            position::rewrite_position_filter(*producer, *filter, op, invert, adjust_left, adjust_right)
        }
        Pattern::Expansion { clause, direction, min, max } => {
            position::rewrite_expansion(*clause, direction, min, max)
        }
        other => other,
    }
}

/// Rebuild `pattern` with every direct child replaced by `f(child)`
pub(crate) fn map_children(pattern: &Pattern, f: &mut impl FnMut(&Pattern) -> Pattern) -> Pattern {
    match pattern {
        Pattern::Term { .. }
        | Pattern::Regex { .. }
        | Pattern::Prefix { .. }
        | Pattern::Wildcard { .. }
        | Pattern::AnyToken { .. }
        | Pattern::Tag { .. }
        | Pattern::Relation { .. } => pattern.clone(),
        Pattern::WithSensitivity { sensitivity, clause } => Pattern::WithSensitivity {
            sensitivity: *sensitivity,
            clause: Box::new(f(clause)),
        },
        Pattern::Sequence(cl) => Pattern::Sequence(cl.iter().map(&mut *f).collect()),
        Pattern::And(cl) => Pattern::And(cl.iter().map(&mut *f).collect()),
        Pattern::Or(cl) => Pattern::Or(cl.iter().map(&mut *f).collect()),
        Pattern::AndNot { include, exclude } => Pattern::AndNot {
            include: include.iter().map(&mut *f).collect(),
            exclude: exclude.iter().map(&mut *f).collect(),
        },
        Pattern::Repetition { clause, min, max } => Pattern::Repetition {
            clause: Box::new(f(clause)),
            min: *min,
            max: *max,
        },
        Pattern::Not(clause) => Pattern::Not(Box::new(f(clause))),
        Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } => {
            Pattern::PositionFilter {
                producer: Box::new(f(producer)),
                filter: Box::new(f(filter)),
                op: *op,
                invert: *invert,
                adjust_left: *adjust_left,
                adjust_right: *adjust_right,
            }
        }
        Pattern::NGramFilter { clause, op, min, max } => Pattern::NGramFilter {
            clause: Box::new(f(clause)),
            op: *op,
            min: *min,
            max: *max,
        },
        Pattern::Expansion { clause, direction, min, max } => Pattern::Expansion {
            clause: Box::new(f(clause)),
            direction: *direction,
            min: *min,
            max: *max,
        },
        Pattern::Capture { clause, name } => Pattern::Capture { clause: Box::new(f(clause)), name: name.clone() },
        Pattern::Constraint { clause, expr } => Pattern::Constraint {
            clause: Box::new(f(clause)),
            expr: expr.clone(),
        },
    }
}
