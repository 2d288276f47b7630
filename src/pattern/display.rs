//! Diagnostic rendering of pattern trees.

use std::fmt;

use crate::pattern::ast::{Direction, Pattern, Sensitivity, TagKind};
use crate::types::guarantees::max_to_string;
use crate::types::RelationSpanMode;

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Pattern]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn sensitivity_suffix(s: Sensitivity) -> &'static str {
    match s {
        Sensitivity::Default => "",
        Sensitivity::Sensitive => ", s",
        Sensitivity::Insensitive => ", i",
    }
}

pub(crate) fn span_mode_name(mode: RelationSpanMode) -> &'static str {
    match mode {
        RelationSpanMode::Source => "SOURCE",
        RelationSpanMode::Target => "TARGET",
        RelationSpanMode::Full => "FULL",
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "L"),
            Direction::Right => write!(f, "R"),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Term { field, value, sensitivity } => {
                write!(f, "TERM({}:{}{})", field, value, sensitivity_suffix(*sensitivity))
            }
            Pattern::Regex { field, pattern, sensitivity } => {
                write!(f, "REGEX({}:^{}${})", field, pattern, sensitivity_suffix(*sensitivity))
            }
            Pattern::Prefix { field, prefix, sensitivity } => {
                write!(f, "PREFIX({}:{}{})", field, prefix, sensitivity_suffix(*sensitivity))
            }
            Pattern::Wildcard { field, pattern, sensitivity } => {
                write!(f, "WILDCARD({}:{}{})", field, pattern, sensitivity_suffix(*sensitivity))
            }
            Pattern::WithSensitivity { sensitivity, clause } => match sensitivity {
                Sensitivity::Sensitive => write!(f, "SENSITIVE({})", clause),
                Sensitivity::Insensitive => write!(f, "INSENSITIVE({})", clause),
                Sensitivity::Default => write!(f, "{}", clause),
            },
            Pattern::Sequence(cl) => {
                write!(f, "SEQ(")?;
                write_list(f, cl)?;
                write!(f, ")")
            }
            Pattern::Repetition { clause, min, max } => {
                write!(f, "REP({}, {}, {})", clause, min, max_to_string(*max))
            }
            Pattern::AnyToken { min, max } => write!(f, "ANYTOKEN({}, {})", min, max_to_string(*max)),
            Pattern::Tag { name, attrs, kind } => {
                let mut tags = format!("TAGS({}", name);
                for (k, v) in attrs {
                    tags.push_str(&format!(", {}={}", k, v));
                }
                tags.push(')');
                match kind {
                    TagKind::Element => write!(f, "{}", tags),
                    TagKind::Start => write!(f, "EDGE({}, L)", tags),
                    TagKind::End => write!(f, "EDGE({}, R)", tags),
                }
            }
            Pattern::And(cl) => {
                write!(f, "AND(")?;
                write_list(f, cl)?;
                write!(f, ")")
            }
            Pattern::AndNot { include, exclude } => {
                write!(f, "ANDNOT([")?;
                write_list(f, include)?;
                write!(f, "], [")?;
                write_list(f, exclude)?;
                write!(f, "])")
            }
            Pattern::Or(cl) => {
                write!(f, "OR(")?;
                write_list(f, cl)?;
                write!(f, ")")
            }
            Pattern::Not(clause) => write!(f, "NOT({})", clause),
            Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } => {
                let not = if *invert { "NOT" } else { "" };
                write!(f, "POSFILTER({}, {}, {}{}", producer, filter, not, op.name())?;
                if *adjust_left != 0 || *adjust_right != 0 {
                    write!(f, ", {}, {}", adjust_left, adjust_right)?;
                }
                write!(f, ")")
            }
            Pattern::NGramFilter { clause, op, min, max } => {
                write!(f, "FILTERNGRAMS({}, {}, {}, {})", clause, op.name(), min, max_to_string(*max))
            }
            Pattern::Expansion { clause, direction, min, max } => {
                write!(f, "EXPAND({}, {}, {}, {})", clause, direction, min, max_to_string(*max))
            }
            Pattern::Capture { clause, name } => write!(f, "CAPTURE({}, {})", clause, name),
            Pattern::Constraint { clause, expr } => write!(f, "CONSTRAINT({}, {})", clause, expr),
            Pattern::Relation { rel_type, direction, span_mode, capture } => {
                write!(f, "REL({}, {}, {}", rel_type, direction.name(), span_mode_name(*span_mode))?;
                if let Some(name) = capture {
                    write!(f, ", {}", name)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::ast::{FilterOp, RelationDirection};

    #[test]
    fn test_render_nested() {
        let p = Pattern::PositionFilter {
            producer: Box::new(Pattern::expand(Pattern::term("b"), Direction::Right, 1, Some(1))),
            filter: Box::new(Pattern::term("a")),
            op: FilterOp::Containing,
            invert: true,
            adjust_left: 1,
            adjust_right: 0,
        };
        assert_eq!(
            p.to_string(),
            "POSFILTER(EXPAND(TERM(word:b), R, 1, 1), TERM(word:a), NOTCONTAINING, 1, 0)"
        );
    }

    #[test]
    fn test_render_leaves() {
        assert_eq!(Pattern::rep(Pattern::term("a"), 1, None).to_string(), "REP(TERM(word:a), 1, INF)");
        assert_eq!(
            Pattern::tag_with_attrs("s", &[("test", "1")], TagKind::Element).to_string(),
            "TAGS(s, test=1)"
        );
        assert_eq!(Pattern::tag("s", TagKind::Start).to_string(), "EDGE(TAGS(s), L)");
        assert_eq!(
            Pattern::and_not(vec![Pattern::term("a")], vec![Pattern::term("c")]).to_string(),
            "ANDNOT([TERM(word:a)], [TERM(word:c)])"
        );
        assert_eq!(
            Pattern::captured_relation("nsubj|obj", RelationDirection::Forward, RelationSpanMode::Target, "r")
                .to_string(),
            "REL(nsubj|obj, FORWARD, TARGET, r)"
        );
    }
}
