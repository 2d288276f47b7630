use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::engine::constants::DEFAULT_FIELD;
use crate::pattern::constraint::ConstraintExpr;
use crate::types::{Relation, RelationSpanMode};

/// Case/diacritics sensitivity of a term-like leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Sensitivity {
    /// Not set explicitly; the engine default applies.
    #[default]
    Default,
    Sensitive,
    Insensitive,
}

impl Sensitivity {
    /// Resolve `Default` against the configured default.
    pub fn resolve(self, default_sensitive: bool) -> Sensitivity {
        match self {
            Sensitivity::Default if default_sensitive => Sensitivity::Sensitive,
            Sensitivity::Default => Sensitivity::Insensitive,
            other => other,
        }
    }
}

/// Side of a clause that an expansion (or edge) applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

/// Which part of an XML-like element a tag pattern denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    /// `<s>`: the position where the element starts.
    Start,
    /// `</s>`: the position where the element ends.
    End,
    /// `<s/>`: the whole element.
    Element,
}

/// Relationship between a producer hit and a filter hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Matches,
    Containing,
    ContainingAtStart,
    ContainingAtEnd,
    Within,
    StartsAt,
    EndsAt,
}

impl FilterOp {
    pub fn name(self) -> &'static str {
        match self {
            FilterOp::Matches => "MATCHES",
            FilterOp::Containing => "CONTAINING",
            FilterOp::ContainingAtStart => "CONTAINING_AT_START",
            FilterOp::ContainingAtEnd => "CONTAINING_AT_END",
            FilterOp::Within => "WITHIN",
            FilterOp::StartsAt => "STARTS_AT",
            FilterOp::EndsAt => "ENDS_AT",
        }
    }

    /// Does a filter hit `(fs, fe)` satisfy this operation for the (adjusted) producer window `(ps, pe)`?
    pub fn accepts(self, ps: i64, pe: i64, fs: i64, fe: i64) -> bool {
        match self {
            FilterOp::Containing => fs >= ps && fe <= pe,
            FilterOp::ContainingAtStart => fs == ps && fe <= pe,
            FilterOp::ContainingAtEnd => fs >= ps && fe == pe,
            FilterOp::Within => fs <= ps && fe >= pe,
            FilterOp::StartsAt => fs == ps,
            FilterOp::EndsAt => fe == pe,
            FilterOp::Matches => fs == ps && fe == pe,
        }
    }
}

/// Which relations of a type a relation pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationDirection {
    /// Root relations only.
    Root,
    /// Source starts at or before the target.
    Forward,
    /// Source starts at or after the target.
    Backward,
    /// Every relation, root relations included.
    Both,
}

impl RelationDirection {
    pub fn name(self) -> &'static str {
        match self {
            RelationDirection::Root => "ROOT",
            RelationDirection::Forward => "FORWARD",
            RelationDirection::Backward => "BACKWARD",
            RelationDirection::Both => "BOTH",
        }
    }

    pub fn accepts(self, relation: &Relation) -> bool {
        match (self, relation.source) {
            (RelationDirection::Both, _) => true,
            (RelationDirection::Root, source) => source.is_none(),
            (RelationDirection::Forward, Some(s)) => s.start <= relation.target.start,
            (RelationDirection::Backward, Some(s)) => s.start >= relation.target.start,
            (_, None) => false,
        }
    }
}

/// Suffix of the capture slot holding a captured relation's source
pub const RELATION_SOURCE_SUFFIX: &str = ":source";
/// Suffix of the capture slot holding a captured relation's target
pub const RELATION_TARGET_SUFFIX: &str = ":target";

/// A query pattern tree.
///
/// Produced by a parser (or built directly with the constructor helpers),
/// normalized by [`crate::rewrite::rewrite`] and turned into an executable
/// plan by [`crate::compiler::compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Term { field: String, value: String, sensitivity: Sensitivity },
    Regex { field: String, pattern: String, sensitivity: Sensitivity },
    Prefix { field: String, prefix: String, sensitivity: Sensitivity },
    /// Glob-style term pattern with `*` and `?`.
    Wildcard { field: String, pattern: String, sensitivity: Sensitivity },
    WithSensitivity { sensitivity: Sensitivity, clause: Box<Pattern> },
    Sequence(Vec<Pattern>),
    Repetition { clause: Box<Pattern>, min: u32, max: Option<u32> },
    AnyToken { min: u32, max: Option<u32> },
    Tag { name: String, attrs: BTreeMap<String, String>, kind: TagKind },
    And(Vec<Pattern>),
    AndNot { include: Vec<Pattern>, exclude: Vec<Pattern> },
    Or(Vec<Pattern>),
    Not(Box<Pattern>),
    PositionFilter {
        producer: Box<Pattern>,
        filter: Box<Pattern>,
        op: FilterOp,
        invert: bool,
        adjust_left: i32,
        adjust_right: i32,
    },
    NGramFilter { clause: Box<Pattern>, op: FilterOp, min: u32, max: Option<u32> },
    Expansion { clause: Box<Pattern>, direction: Direction, min: u32, max: Option<u32> },
    Capture { clause: Box<Pattern>, name: String },
    Constraint { clause: Box<Pattern>, expr: ConstraintExpr },
    /// Relations whose type fully matches the `rel_type` regex.
    ///
    /// A named relation binds three capture slots: `name` (the full span),
    /// `name:source` and `name:target`.
    Relation {
        rel_type: String,
        direction: RelationDirection,
        span_mode: RelationSpanMode,
        capture: Option<String>,
    },
}

impl Pattern {
    pub fn term(value: &str) -> Self {
        Self::term_in(DEFAULT_FIELD, value)
    }

    pub fn term_in(field: &str, value: &str) -> Self {
        Pattern::Term {
            field: field.to_string(),
            value: value.to_string(),
            sensitivity: Sensitivity::Default,
        }
    }

    pub fn regex(pattern: &str) -> Self {
        Self::regex_in(DEFAULT_FIELD, pattern)
    }

    pub fn regex_in(field: &str, pattern: &str) -> Self {
        Pattern::Regex {
            field: field.to_string(),
            pattern: pattern.to_string(),
            sensitivity: Sensitivity::Default,
        }
    }

    pub fn prefix_in(field: &str, prefix: &str) -> Self {
        Pattern::Prefix {
            field: field.to_string(),
            prefix: prefix.to_string(),
            sensitivity: Sensitivity::Default,
        }
    }

    pub fn wildcard_in(field: &str, pattern: &str) -> Self {
        Pattern::Wildcard {
            field: field.to_string(),
            pattern: pattern.to_string(),
            sensitivity: Sensitivity::Default,
        }
    }

    pub fn sensitive(self, sensitivity: Sensitivity) -> Self {
        Pattern::WithSensitivity { sensitivity, clause: Box::new(self) }
    }

    pub fn seq(clauses: Vec<Pattern>) -> Self {
        Pattern::Sequence(clauses)
    }

    pub fn rep(clause: Pattern, min: u32, max: Option<u32>) -> Self {
        Pattern::Repetition { clause: Box::new(clause), min, max }
    }

    pub fn any(min: u32, max: Option<u32>) -> Self {
        Pattern::AnyToken { min, max }
    }

    pub fn and(clauses: Vec<Pattern>) -> Self {
        Pattern::And(clauses)
    }

    pub fn and_not(include: Vec<Pattern>, exclude: Vec<Pattern>) -> Self {
        Pattern::AndNot { include, exclude }
    }

    pub fn or(clauses: Vec<Pattern>) -> Self {
        Pattern::Or(clauses)
    }

    pub fn not(clause: Pattern) -> Self {
        Pattern::Not(Box::new(clause))
    }

    pub fn tag(name: &str, kind: TagKind) -> Self {
        Pattern::Tag { name: name.to_string(), attrs: BTreeMap::new(), kind }
    }

    pub fn tag_with_attrs(name: &str, attrs: &[(&str, &str)], kind: TagKind) -> Self {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Pattern::Tag { name: name.to_string(), attrs, kind }
    }

    pub fn element(name: &str) -> Self {
        Self::tag(name, TagKind::Element)
    }

    pub fn position_filter(producer: Pattern, filter: Pattern, op: FilterOp) -> Self {
        Pattern::PositionFilter {
            producer: Box::new(producer),
            filter: Box::new(filter),
            op,
            invert: false,
            adjust_left: 0,
            adjust_right: 0,
        }
    }

    /// Position filter that keeps producer hits with no qualifying filter hit.
    pub fn position_filter_not(producer: Pattern, filter: Pattern, op: FilterOp) -> Self {
        Pattern::PositionFilter {
            producer: Box::new(producer),
            filter: Box::new(filter),
            op,
            invert: true,
            adjust_left: 0,
            adjust_right: 0,
        }
    }

    pub fn ngrams(clause: Pattern, op: FilterOp, min: u32, max: Option<u32>) -> Self {
        Pattern::NGramFilter { clause: Box::new(clause), op, min, max }
    }

    pub fn expand(clause: Pattern, direction: Direction, min: u32, max: Option<u32>) -> Self {
        Pattern::Expansion { clause: Box::new(clause), direction, min, max }
    }

    pub fn capture(clause: Pattern, name: &str) -> Self {
        Pattern::Capture { clause: Box::new(clause), name: name.to_string() }
    }

    pub fn constrained(clause: Pattern, expr: ConstraintExpr) -> Self {
        Pattern::Constraint { clause: Box::new(clause), expr }
    }

    pub fn relation(rel_type: &str, direction: RelationDirection, span_mode: RelationSpanMode) -> Self {
        Pattern::Relation { rel_type: rel_type.to_string(), direction, span_mode, capture: None }
    }

    /// Relation pattern that captures every matched relation under `name`
    pub fn captured_relation(
        rel_type: &str,
        direction: RelationDirection,
        span_mode: RelationSpanMode,
        name: &str,
    ) -> Self {
        Pattern::Relation {
            rel_type: rel_type.to_string(),
            direction,
            span_mode,
            capture: Some(name.to_string()),
        }
    }

    /// Short name of the node kind, used in errors and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Pattern::Term { .. } => "term",
            Pattern::Regex { .. } => "regex",
            Pattern::Prefix { .. } => "prefix",
            Pattern::Wildcard { .. } => "wildcard",
            Pattern::WithSensitivity { .. } => "sensitivity",
            Pattern::Sequence(_) => "sequence",
            Pattern::Repetition { .. } => "repetition",
            Pattern::AnyToken { .. } => "any-token",
            Pattern::Tag { .. } => "tag",
            Pattern::And(_) => "and",
            Pattern::AndNot { .. } => "and-not",
            Pattern::Or(_) => "or",
            Pattern::Not(_) => "not",
            Pattern::PositionFilter { .. } => "position filter",
            Pattern::NGramFilter { .. } => "n-gram filter",
            Pattern::Expansion { .. } => "expansion",
            Pattern::Capture { .. } => "capture",
            Pattern::Constraint { .. } => "constraint",
            Pattern::Relation { .. } => "relation",
        }
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(|c| c.size()).sum::<usize>()
    }

    /// Direct children, in order.
    pub fn children(&self) -> Vec<&Pattern> {
        match self {
            Pattern::Term { .. }
            | Pattern::Regex { .. }
            | Pattern::Prefix { .. }
            | Pattern::Wildcard { .. }
            | Pattern::AnyToken { .. }
            | Pattern::Tag { .. }
            | Pattern::Relation { .. } => Vec::new(),
            Pattern::Sequence(cl) | Pattern::And(cl) | Pattern::Or(cl) => cl.iter().collect(),
            Pattern::AndNot { include, exclude } => include.iter().chain(exclude.iter()).collect(),
            Pattern::PositionFilter { producer, filter, .. } => vec![producer, filter],
            Pattern::WithSensitivity { clause, .. }
            | Pattern::Repetition { clause, .. }
            | Pattern::Not(clause)
            | Pattern::NGramFilter { clause, .. }
            | Pattern::Expansion { clause, .. }
            | Pattern::Capture { clause, .. }
            | Pattern::Constraint { clause, .. } => vec![clause],
        }
    }

    /// Names of all captures declared in the tree, in pre-order, without duplicates.
    pub fn capture_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_capture_names(&mut names);
        names
    }

    fn collect_capture_names(&self, names: &mut Vec<String>) {
        let mut declare = |name: String| {
            if !names.contains(&name) {
                names.push(name);
            }
        };
        match self {
            Pattern::Capture { name, .. } => declare(name.clone()),
            Pattern::Relation { capture: Some(name), .. } => {
                declare(name.clone());
                declare(format!("{}{}", name, RELATION_SOURCE_SUFFIX));
                declare(format!("{}{}", name, RELATION_TARGET_SUFFIX));
            }
            _ => {}
        }
        for child in self.children() {
            child.collect_capture_names(names);
        }
    }
}
