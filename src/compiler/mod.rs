//! Plan compiler
//!
//! Maps a rewritten [`Pattern`] onto a tree of [`QueryNode`]s, one node per
//! pattern node, choosing concrete cursors from the children's declared
//! contracts. A sorting node is inserted only where a parent needs an order
//! or uniqueness its child does not declare.

pub mod nodes;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::engine::config::EngineConfig;
use crate::engine::constants::DEFAULT_MAX_TERM_EXPANSIONS;
use crate::error::PatternError;
use crate::index::{SegmentIndex, TermMatcher};
use crate::pattern::ast::{RELATION_SOURCE_SUFFIX, RELATION_TARGET_SUFFIX};
use crate::pattern::{Direction, FilterOp, Pattern, Sensitivity, TagKind};
use crate::rewrite::regex_body;
use crate::spans::relations::RelationSlots;
use crate::spans::{BoxCursor, CursorResult};
use crate::types::SortOrder;

pub use nodes::{CursorContext, NodeRef, QueryNode};
use nodes::*;

/// Settings the compiler takes from the engine configuration
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub default_sensitive: bool,
    pub max_term_expansions: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { default_sensitive: false, max_term_expansions: DEFAULT_MAX_TERM_EXPANSIONS }
    }
}

impl From<&EngineConfig> for CompileOptions {
    fn from(config: &EngineConfig) -> Self {
        Self { default_sensitive: config.default_sensitive, max_term_expansions: config.max_term_expansions }
    }
}

/// Capture names and the hit slots they are bound to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureRegistry {
    names: Vec<String>,
}

impl CaptureRegistry {
    /// Slot of `name`, registering it if new
    pub fn register(&mut self, name: &str) -> usize {
        match self.slot(name) {
            Some(slot) => slot,
            None => {
                self.names.push(name.to_string());
                self.names.len() - 1
            }
        }
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// An executable plan: a start-sorted, unique root node and its capture slots
pub struct CompiledQuery {
    root: NodeRef,
    captures: CaptureRegistry,
}

impl CompiledQuery {
    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn captures(&self) -> &CaptureRegistry {
        &self.captures
    }

    /// Cursor tree over one segment
    pub fn create_cursor<'a>(&self, segment: &'a dyn SegmentIndex) -> CursorResult<Option<BoxCursor<'a>>> {
        self.root.create_cursor(&CursorContext::new(segment, self.captures.len()))
    }
}

/// Compile a rewritten pattern
pub fn compile(pattern: &Pattern, options: &CompileOptions) -> Result<CompiledQuery, PatternError> {
    PlanCompiler::new(options.clone()).compile(pattern)
}

/// Wrap `node` in a sorting node unless it already declares `order` (and uniqueness, if asked)
pub fn ensure(node: NodeRef, order: SortOrder, dedup: bool) -> NodeRef {
    let g = node.guarantees();
    if g.is_sorted(order) && (!dedup || g.unique) {
        node
    } else {
        Arc::new(SortedNode::new(node, order, dedup))
    }
}

pub struct PlanCompiler {
    options: CompileOptions,
    captures: CaptureRegistry,
}

impl PlanCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self { options, captures: CaptureRegistry::default() }
    }

    pub fn compile(mut self, pattern: &Pattern) -> Result<CompiledQuery, PatternError> {
        for name in pattern.capture_names() {
            self.captures.register(&name);
        }
        let root = self.compile_pattern(pattern)?;
        let root = ensure(root, SortOrder::StartPoint, true);
        log::debug!("Compiled plan: {}", root);
        Ok(CompiledQuery { root, captures: self.captures })
    }

    fn compile_pattern(&self, pattern: &Pattern) -> Result<NodeRef, PatternError> {
        let node: NodeRef = match pattern {
            Pattern::Term { field, value, sensitivity } => {
                Arc::new(TermNode::new(field, value, sensitivity.resolve(self.options.default_sensitive)))
            }
            Pattern::Regex { field, pattern, sensitivity } => {
                let (marker, body) = regex_body(pattern);
                let sensitivity = marker.unwrap_or(*sensitivity);
                self.multi_term(field, TermMatcher::Regex(body.to_string()), sensitivity)?
            }
            Pattern::Prefix { field, prefix, sensitivity } => {
                self.multi_term(field, TermMatcher::Prefix(prefix.clone()), *sensitivity)?
            }
            Pattern::Wildcard { field, pattern, sensitivity } => {
                self.multi_term(field, TermMatcher::Wildcard(pattern.clone()), *sensitivity)?
            }
            Pattern::WithSensitivity { .. } => return Err(PatternError::NotRewritten(pattern.kind_name())),
            Pattern::Sequence(clauses) => {
                let mut nodes = clauses.iter().map(|c| self.compile_pattern(c));
                let first = nodes.next().ok_or(PatternError::EmptyClauses(pattern.kind_name()))??;
                nodes.try_fold(first, |left, right| Ok::<_, PatternError>(sequence(left, right?)))?
            }
            Pattern::Repetition { clause, min, max } => repetition(self.compile_pattern(clause)?, *min, *max),
            Pattern::AnyToken { min, max } => Arc::new(AnyTokenNode::new(*min, *max)),
            Pattern::Tag { name, attrs, kind } => {
                let mut element: NodeRef = Arc::new(TagNode::new(name));
                for (attr, value) in attrs {
                    let marker: NodeRef = Arc::new(AttributeNode::new(attr, value));
                    element = Arc::new(PositionFilterNode::new(element, marker, FilterOp::StartsAt, false));
                }
                match kind {
                    TagKind::Element => element,
                    TagKind::Start => {
                        Arc::new(EdgeNode::new(ensure(element, SortOrder::StartPoint, false), Direction::Left))
                    }
                    TagKind::End => {
                        Arc::new(EdgeNode::new(ensure(element, SortOrder::EndPoint, false), Direction::Right))
                    }
                }
            }
            Pattern::And(clauses) => self.and(clauses)?,
            Pattern::AndNot { include, exclude } => {
                let producer = self.and(include)?;
                if exclude.is_empty() {
                    producer
                } else {
                    let filter = self.or(exclude)?;
                    Arc::new(PositionFilterNode::new(
                        ensure(producer, SortOrder::StartPoint, false),
                        filter,
                        FilterOp::Matches,
                        true,
                    ))
                }
            }
            Pattern::Or(clauses) => self.or(clauses)?,
            Pattern::Not(clause) => Arc::new(NotNode::new(self.compile_pattern(clause)?)),
            Pattern::PositionFilter { producer, filter, op, invert, adjust_left, adjust_right } => {
                let producer = ensure(self.compile_pattern(producer)?, SortOrder::StartPoint, false);
                let filter = self.compile_pattern(filter)?;
                Arc::new(PositionFilterNode::new(producer, filter, *op, *invert).adjusted(*adjust_left, *adjust_right))
            }
            Pattern::NGramFilter { clause, op, min, max } => {
                Arc::new(NGramNode::new(self.compile_pattern(clause)?, *op, *min, *max))
            }
            Pattern::Expansion { clause, direction, min, max } => {
                Arc::new(ExpansionNode::new(self.compile_pattern(clause)?, *direction, *min, *max))
            }
            Pattern::Capture { clause, name } => {
                let slot = self.captures.slot(name).ok_or_else(|| PatternError::UnknownCapture(name.clone()))?;
                Arc::new(CaptureNode::new(self.compile_pattern(clause)?, name, slot))
            }
            Pattern::Constraint { clause, expr } => {
                let bound = expr.try_map(&mut |name: &String| {
                    self.captures.slot(name).ok_or_else(|| PatternError::UnknownCapture(name.clone()))
                })?;
                Arc::new(ConstraintNode::new(self.compile_pattern(clause)?, bound))
            }
            Pattern::Relation { rel_type, direction, span_mode, capture } => {
                let matcher = TermMatcher::Regex(rel_type.clone());
                matcher.compile()?;
                let capture = match capture {
                    Some(name) => Some((name.clone(), self.relation_slots(name)?)),
                    None => None,
                };
                Arc::new(RelationNode::new(
                    matcher,
                    *direction,
                    *span_mode,
                    capture,
                    self.options.max_term_expansions,
                ))
            }
        };
        Ok(node)
    }

    fn multi_term(
        &self,
        field: &str,
        matcher: TermMatcher,
        sensitivity: Sensitivity,
    ) -> Result<NodeRef, PatternError> {
        // surface syntax errors here rather than per segment
        matcher.compile()?;
        Ok(Arc::new(MultiTermNode::new(
            field,
            matcher,
            sensitivity.resolve(self.options.default_sensitive),
            self.options.max_term_expansions,
        )))
    }

    fn relation_slots(&self, name: &str) -> Result<RelationSlots, PatternError> {
        let slot = |name: String| self.captures.slot(&name).ok_or(PatternError::UnknownCapture(name));
        Ok(RelationSlots {
            full: slot(name.to_string())?,
            source: slot(format!("{}{}", name, RELATION_SOURCE_SUFFIX))?,
            target: slot(format!("{}{}", name, RELATION_TARGET_SUFFIX))?,
        })
    }

    fn and(&self, clauses: &[Pattern]) -> Result<NodeRef, PatternError> {
        let mut nodes = clauses
            .iter()
            .map(|c| Ok(ensure(self.compile_pattern(c)?, SortOrder::StartPoint, true)))
            .collect::<Result<Vec<_>, PatternError>>()?;
        match nodes.len() {
            0 => Err(PatternError::EmptyClauses("and")),
            1 => Ok(nodes.remove(0)),
            _ => Ok(Arc::new(AndNode::new(nodes))),
        }
    }

    fn or(&self, clauses: &[Pattern]) -> Result<NodeRef, PatternError> {
        let nodes = clauses
            .iter()
            .map(|c| self.compile_pattern(c))
            .collect::<Result<Vec<_>, PatternError>>()?;
        union(nodes).ok_or(PatternError::EmptyClauses("or"))
    }
}

/// Join two nodes, sorting each side for the merge where needed
fn sequence(left: NodeRef, right: NodeRef) -> NodeRef {
    let left = ensure(left, SortOrder::EndPoint, false);
    let right = ensure(right, SortOrder::StartPoint, false);
    Arc::new(SequenceNode::new(left, right))
}

fn union(mut nodes: Vec<NodeRef>) -> Option<NodeRef> {
    match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(Arc::new(OrNode::new(
            nodes.into_iter().map(|n| ensure(n, SortOrder::StartPoint, false)).collect(),
        ))),
    }
}

/// `n` adjacent hits of `clause`
fn chain(clause: &NodeRef, n: u32) -> NodeRef {
    let mut node = clause.clone();
    for _ in 1..n {
        node = sequence(node, clause.clone());
    }
    node
}

/// Repetitions never match empty: a minimum of 0 counts as 1
fn repetition(clause: NodeRef, min: u32, max: Option<u32>) -> NodeRef {
    let min = min.max(1);
    match max {
        None => Arc::new(RepetitionNode::new(clause, min)),
        Some(max) if max <= min => chain(&clause, min),
        Some(max) => {
            let chains = (min..=max).map(|n| chain(&clause, n)).collect();
            union(chains).unwrap_or(clause)
        }
    }
}
