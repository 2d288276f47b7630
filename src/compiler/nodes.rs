//! Executable query nodes
//!
//! One node kind per cursor kind. A node is immutable and shared between
//! segments: every call to [`QueryNode::create_cursor`] builds a fresh cursor
//! tree over one segment.

use std::fmt;
use std::sync::Arc;

use crate::index::{Postings, SegmentIndex, TermMatcher, UnionPostings};
use crate::pattern::display::span_mode_name;
use crate::pattern::properties::{any_token_guarantees, relation_guarantees, repetition_guarantees};
use crate::pattern::{ConstraintExpr, Direction, FilterOp, RelationDirection, Sensitivity};
use crate::spans::and::AndCursor;
use crate::spans::any_token::AnyTokenCursor;
use crate::spans::capture::CaptureCursor;
use crate::spans::constraint::ConstraintCursor;
use crate::spans::edge::EdgeCursor;
use crate::spans::expansion::ExpansionCursor;
use crate::spans::ngrams::NGramCursor;
use crate::spans::not::NotCursor;
use crate::spans::or::OrCursor;
use crate::spans::position_filter::PositionFilterCursor;
use crate::spans::relations::{RelationSlots, RelationsCursor};
use crate::spans::repetition::RepetitionCursor;
use crate::spans::sequence::{SequenceCursor, SimpleSequenceCursor};
use crate::spans::sorted::SortedCursor;
use crate::spans::term::TermCursor;
use crate::spans::{BoxCursor, CursorResult};
use crate::types::guarantees::max_to_string;
use crate::types::{Guarantees, RelationSpanMode, SortOrder};

/// What a cursor needs from its surroundings while it is built
#[derive(Clone, Copy)]
pub struct CursorContext<'a> {
    pub segment: &'a dyn SegmentIndex,
    /// Number of capture slots every hit carries
    pub capture_count: usize,
}

impl<'a> CursorContext<'a> {
    pub fn new(segment: &'a dyn SegmentIndex, capture_count: usize) -> Self {
        Self { segment, capture_count }
    }
}

/// A compiled pattern node
pub trait QueryNode: fmt::Display + Send + Sync {
    /// Contract of every cursor this node creates
    fn guarantees(&self) -> Guarantees;

    /// Cursor over one segment; `None` when the node cannot have hits there
    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>>;

    fn children(&self) -> Vec<&NodeRef> {
        Vec::new()
    }
}

pub type NodeRef = Arc<dyn QueryNode>;

fn sensitivity_suffix(sensitivity: Sensitivity) -> &'static str {
    match sensitivity {
        Sensitivity::Sensitive => "s",
        _ => "i",
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, name: &str, nodes: &[NodeRef]) -> fmt::Result {
    write!(f, "{}(", name)?;
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", node)?;
    }
    write!(f, ")")
}

/// One exact term of a token field
pub struct TermNode {
    field: String,
    value: String,
    sensitivity: Sensitivity,
}

impl TermNode {
    pub fn new(field: &str, value: &str, sensitivity: Sensitivity) -> Self {
        Self { field: field.to_string(), value: value.to_string(), sensitivity }
    }
}

impl QueryNode for TermNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees::TERM
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(postings) = ctx.segment.term_postings(&self.field, self.sensitivity, &self.value)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(TermCursor::new(postings, ctx.segment)?)))
    }
}

impl fmt::Display for TermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TERM({}:{}, {})", self.field, self.value, sensitivity_suffix(self.sensitivity))
    }
}

/// Every term of a token field a matcher accepts, merged into one stream
pub struct MultiTermNode {
    field: String,
    matcher: TermMatcher,
    sensitivity: Sensitivity,
    max_expansions: usize,
}

impl MultiTermNode {
    pub fn new(field: &str, matcher: TermMatcher, sensitivity: Sensitivity, max_expansions: usize) -> Self {
        Self { field: field.to_string(), matcher, sensitivity, max_expansions }
    }
}

impl QueryNode for MultiTermNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees::TERM
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let mut terms =
            ctx.segment
                .matching_terms(&self.field, self.sensitivity, &self.matcher, self.max_expansions)?;
        if terms.len() > self.max_expansions {
            log::warn!(
                "{} matches more than {} terms in field '{}'; only the first {} are searched",
                self,
                self.max_expansions,
                self.field,
                self.max_expansions
            );
            terms.truncate(self.max_expansions);
        }
        log::trace!("{} expanded to {} terms", self, terms.len());

        let mut streams: Vec<Box<dyn Postings + 'a>> = Vec::with_capacity(terms.len());
        for term in &terms {
            if let Some(postings) = ctx.segment.term_postings(&self.field, self.sensitivity, term)? {
                streams.push(postings);
            }
        }
        let postings: Box<dyn Postings + 'a> = match streams.len() {
            0 => return Ok(None),
            1 => streams.remove(0),
            _ => Box::new(UnionPostings::new(streams)),
        };
        Ok(Some(Box::new(TermCursor::new(postings, ctx.segment)?)))
    }
}

impl fmt::Display for MultiTermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, text) = match &self.matcher {
            TermMatcher::Regex(body) => ("REGEX", body),
            TermMatcher::Prefix(prefix) => ("PREFIX", prefix),
            TermMatcher::Wildcard(glob) => ("WILDCARD", glob),
        };
        write!(f, "{}({}:{}, {})", name, self.field, text, sensitivity_suffix(self.sensitivity))
    }
}

/// Whole elements of one tag
pub struct TagNode {
    name: String,
}

impl TagNode {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }
}

impl QueryNode for TagNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees {
            start_sorted: true,
            unique: true,
            ..Guarantees::unordered(0, None)
        }
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(postings) = ctx.segment.tag_postings(&self.name)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(TermCursor::new(postings, ctx.segment)?)))
    }
}

impl fmt::Display for TagNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TAGS({})", self.name)
    }
}

/// Zero-width markers at the start of every element carrying `attr="value"`
pub struct AttributeNode {
    attr: String,
    value: String,
}

impl AttributeNode {
    pub fn new(attr: &str, value: &str) -> Self {
        Self { attr: attr.to_string(), value: value.to_string() }
    }
}

impl QueryNode for AttributeNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees {
            start_sorted: true,
            end_sorted: true,
            ..Guarantees::unordered(0, Some(0))
        }
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(postings) = ctx.segment.attribute_postings(&self.attr, &self.value)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(TermCursor::new(postings, ctx.segment)?)))
    }
}

impl fmt::Display for AttributeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ATTR({}={})", self.attr, self.value)
    }
}

/// Relations of every type a matcher accepts
pub struct RelationNode {
    matcher: TermMatcher,
    direction: RelationDirection,
    span_mode: RelationSpanMode,
    capture: Option<(String, RelationSlots)>,
    max_expansions: usize,
}

impl RelationNode {
    pub fn new(
        matcher: TermMatcher,
        direction: RelationDirection,
        span_mode: RelationSpanMode,
        capture: Option<(String, RelationSlots)>,
        max_expansions: usize,
    ) -> Self {
        Self { matcher, direction, span_mode, capture, max_expansions }
    }
}

impl QueryNode for RelationNode {
    fn guarantees(&self) -> Guarantees {
        relation_guarantees(self.capture.is_some())
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let mut types = ctx.segment.relation_types(&self.matcher, self.max_expansions)?;
        if types.len() > self.max_expansions {
            log::warn!(
                "{} matches more than {} relation types; only the first {} are searched",
                self,
                self.max_expansions,
                self.max_expansions
            );
            types.truncate(self.max_expansions);
        }
        log::trace!("{} expanded to {} relation types", self, types.len());

        let mut streams = Vec::with_capacity(types.len());
        for rel_type in &types {
            if let Some(relations) = ctx.segment.relation_postings(rel_type)? {
                streams.push(relations);
            }
        }
        if streams.is_empty() {
            return Ok(None);
        }
        let slots = self.capture.as_ref().map(|(_, slots)| *slots);
        let cursor =
            RelationsCursor::new(streams, ctx.segment, self.direction, self.span_mode, slots, ctx.capture_count)?;
        Ok(Some(Box::new(cursor)))
    }
}

impl fmt::Display for RelationNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "REL({}, {}, {}",
            self.matcher.regex_body(),
            self.direction.name(),
            span_mode_name(self.span_mode)
        )?;
        if let Some((name, slots)) = &self.capture {
            write!(f, ", {}#{}", name, slots.full)?;
        }
        write!(f, ")")
    }
}

/// Leading or trailing edges of a clause sorted by that edge
pub struct EdgeNode {
    clause: NodeRef,
    edge: Direction,
}

impl EdgeNode {
    pub fn new(clause: NodeRef, edge: Direction) -> Self {
        Self { clause, edge }
    }
}

impl QueryNode for EdgeNode {
    fn guarantees(&self) -> Guarantees {
        let g = self.clause.guarantees();
        let unique = match self.edge {
            Direction::Left => g.unique_start,
            Direction::Right => g.unique_end,
        };
        Guarantees {
            start_sorted: true,
            end_sorted: true,
            unique_start: unique,
            unique_end: unique,
            unique,
            length_min: 0,
            length_max: Some(0),
        }
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        Ok(self
            .clause
            .create_cursor(ctx)?
            .map(|clause| Box::new(EdgeCursor::new(clause, self.edge)) as BoxCursor<'a>))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for EdgeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.edge {
            Direction::Left => "L",
            Direction::Right => "R",
        };
        write!(f, "EDGE({}, {})", self.clause, side)
    }
}

pub struct AnyTokenNode {
    min: u32,
    max: Option<u32>,
}

impl AnyTokenNode {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }
}

impl QueryNode for AnyTokenNode {
    fn guarantees(&self) -> Guarantees {
        any_token_guarantees(self.min, self.max)
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        Ok(Some(Box::new(AnyTokenCursor::new(ctx.segment, self.min, self.max)?)))
    }
}

impl fmt::Display for AnyTokenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ANYTOKEN({}, {})", self.min, max_to_string(self.max))
    }
}

/// Tokens not covered by any clause hit
pub struct NotNode {
    clause: NodeRef,
}

impl NotNode {
    pub fn new(clause: NodeRef) -> Self {
        Self { clause }
    }
}

impl QueryNode for NotNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees::TERM
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let clause = self.clause.create_cursor(ctx)?;
        Ok(Some(Box::new(NotCursor::new(clause, ctx.segment)?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for NotNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NOT({})", self.clause)
    }
}

/// Join of an end-sorted left side with a start-sorted right side
pub struct SequenceNode {
    left: NodeRef,
    right: NodeRef,
    /// Both sides are unique on the joined edge: use the one-to-one merge
    simple: bool,
}

impl SequenceNode {
    pub fn new(left: NodeRef, right: NodeRef) -> Self {
        let (l, r) = (left.guarantees(), right.guarantees());
        let simple = l.end_sorted && l.unique_end && r.start_sorted && r.unique_start;
        Self { left, right, simple }
    }
}

impl QueryNode for SequenceNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees::sequence(&self.left.guarantees(), &self.right.guarantees())
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(left) = self.left.create_cursor(ctx)? else {
            return Ok(None);
        };
        let Some(right) = self.right.create_cursor(ctx)? else {
            return Ok(None);
        };
        if self.simple {
            Ok(Some(Box::new(SimpleSequenceCursor::new(left, right)?)))
        } else {
            Ok(Some(Box::new(SequenceCursor::new(left, right, ctx.capture_count)?)))
        }
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.left, &self.right]
    }
}

impl fmt::Display for SequenceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = if self.simple { "SEQ_SIMPLE" } else { "SEQ" };
        write!(f, "{}({}, {})", name, self.left, self.right)
    }
}

/// Chains of at least `min` adjacent clause hits
pub struct RepetitionNode {
    clause: NodeRef,
    min: u32,
}

impl RepetitionNode {
    pub fn new(clause: NodeRef, min: u32) -> Self {
        Self { clause, min: min.max(1) }
    }
}

impl QueryNode for RepetitionNode {
    fn guarantees(&self) -> Guarantees {
        repetition_guarantees(&self.clause.guarantees(), self.min, None)
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(clause) = self.clause.create_cursor(ctx)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(RepetitionCursor::new(clause, self.min, ctx.capture_count)?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for RepetitionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REP({}, {}, INF)", self.clause, self.min)
    }
}

/// Start-sorted union of start-sorted clauses
pub struct OrNode {
    clauses: Vec<NodeRef>,
}

impl OrNode {
    pub fn new(clauses: Vec<NodeRef>) -> Self {
        Self { clauses }
    }
}

impl QueryNode for OrNode {
    fn guarantees(&self) -> Guarantees {
        let gs: Vec<Guarantees> = self.clauses.iter().map(|c| c.guarantees()).collect();
        Guarantees::union(&gs)
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let mut cursors = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            if let Some(cursor) = clause.create_cursor(ctx)? {
                cursors.push(cursor);
            }
        }
        match cursors.len() {
            0 => Ok(None),
            1 => Ok(cursors.pop()),
            _ => Ok(Some(Box::new(OrCursor::new(cursors)?))),
        }
    }

    fn children(&self) -> Vec<&NodeRef> {
        self.clauses.iter().collect()
    }
}

impl fmt::Display for OrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "OR", &self.clauses)
    }
}

/// Intersection of start-sorted, unique clauses
pub struct AndNode {
    clauses: Vec<NodeRef>,
}

impl AndNode {
    pub fn new(clauses: Vec<NodeRef>) -> Self {
        Self { clauses }
    }
}

impl QueryNode for AndNode {
    fn guarantees(&self) -> Guarantees {
        let gs: Vec<Guarantees> = self.clauses.iter().map(|c| c.guarantees()).collect();
        Guarantees::intersection(&gs)
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let mut cursors = Vec::with_capacity(self.clauses.len());
        for clause in &self.clauses {
            match clause.create_cursor(ctx)? {
                Some(cursor) => cursors.push(cursor),
                None => return Ok(None),
            }
        }
        Ok(Some(Box::new(AndCursor::new(cursors, ctx.capture_count)?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        self.clauses.iter().collect()
    }
}

impl fmt::Display for AndNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "AND", &self.clauses)
    }
}

pub struct PositionFilterNode {
    producer: NodeRef,
    filter: NodeRef,
    op: FilterOp,
    invert: bool,
    adjust_left: i32,
    adjust_right: i32,
}

impl PositionFilterNode {
    pub fn new(producer: NodeRef, filter: NodeRef, op: FilterOp, invert: bool) -> Self {
        Self { producer, filter, op, invert, adjust_left: 0, adjust_right: 0 }
    }

    /// Shift the producer window by these offsets before comparing
    pub fn adjusted(mut self, adjust_left: i32, adjust_right: i32) -> Self {
        self.adjust_left = adjust_left;
        self.adjust_right = adjust_right;
        self
    }
}

impl QueryNode for PositionFilterNode {
    fn guarantees(&self) -> Guarantees {
        self.producer.guarantees()
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(producer) = self.producer.create_cursor(ctx)? else {
            return Ok(None);
        };
        let filter = self.filter.create_cursor(ctx)?;
        if filter.is_none() && !self.invert {
            return Ok(None);
        }
        Ok(Some(Box::new(PositionFilterCursor::new(
            producer,
            filter,
            self.op,
            self.invert,
            self.adjust_left,
            self.adjust_right,
            ctx.capture_count,
        )?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.producer, &self.filter]
    }
}

impl fmt::Display for PositionFilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = if self.invert { "NOT" } else { "" };
        write!(f, "POSFILTER({}, {}, {}{}", self.producer, self.filter, not, self.op.name())?;
        if self.adjust_left != 0 || self.adjust_right != 0 {
            write!(f, ", {}, {}", self.adjust_left, self.adjust_right)?;
        }
        write!(f, ")")
    }
}

pub struct NGramNode {
    clause: NodeRef,
    op: FilterOp,
    min: u32,
    max: Option<u32>,
}

impl NGramNode {
    pub fn new(clause: NodeRef, op: FilterOp, min: u32, max: Option<u32>) -> Self {
        Self { clause, op, min, max }
    }
}

impl QueryNode for NGramNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees {
            start_sorted: true,
            unique: true,
            ..Guarantees::unordered(self.min.max(1), self.max)
        }
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(clause) = self.clause.create_cursor(ctx)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(NGramCursor::new(
            clause,
            ctx.segment,
            self.op,
            self.min,
            self.max,
            ctx.capture_count,
        )?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for NGramNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FILTERNGRAMS({}, {}, {}, {})",
            self.clause,
            self.op.name(),
            self.min,
            max_to_string(self.max)
        )
    }
}

pub struct ExpansionNode {
    clause: NodeRef,
    direction: Direction,
    min: u32,
    max: Option<u32>,
}

impl ExpansionNode {
    pub fn new(clause: NodeRef, direction: Direction, min: u32, max: Option<u32>) -> Self {
        Self { clause, direction, min, max }
    }
}

impl QueryNode for ExpansionNode {
    fn guarantees(&self) -> Guarantees {
        Guarantees::expansion(
            &self.clause.guarantees(),
            self.direction == Direction::Left,
            self.min,
            self.max,
        )
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(clause) = self.clause.create_cursor(ctx)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(ExpansionCursor::new(
            clause,
            ctx.segment,
            self.direction,
            self.min,
            self.max,
        )?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for ExpansionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.direction {
            Direction::Left => "L",
            Direction::Right => "R",
        };
        write!(f, "EXPAND({}, {}, {}, {})", self.clause, side, self.min, max_to_string(self.max))
    }
}

pub struct CaptureNode {
    clause: NodeRef,
    name: String,
    slot: usize,
}

impl CaptureNode {
    pub fn new(clause: NodeRef, name: &str, slot: usize) -> Self {
        Self { clause, name: name.to_string(), slot }
    }
}

impl QueryNode for CaptureNode {
    fn guarantees(&self) -> Guarantees {
        self.clause.guarantees()
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(clause) = self.clause.create_cursor(ctx)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(CaptureCursor::new(clause, self.slot, ctx.capture_count)?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for CaptureNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CAPTURE({}, {}#{})", self.clause, self.name, self.slot)
    }
}

pub struct ConstraintNode {
    clause: NodeRef,
    expr: ConstraintExpr<usize>,
}

impl ConstraintNode {
    pub fn new(clause: NodeRef, expr: ConstraintExpr<usize>) -> Self {
        Self { clause, expr }
    }
}

impl QueryNode for ConstraintNode {
    fn guarantees(&self) -> Guarantees {
        self.clause.guarantees()
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(clause) = self.clause.create_cursor(ctx)? else {
            return Ok(None);
        };
        Ok(Some(Box::new(ConstraintCursor::new(clause, self.expr.clone(), ctx.capture_count)?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for ConstraintNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CONSTRAINT({})", self.clause)
    }
}

/// Per-document sort (and optional dedup) of a clause that lacks a needed contract
pub struct SortedNode {
    clause: NodeRef,
    order: SortOrder,
    dedup: bool,
}

impl SortedNode {
    pub fn new(clause: NodeRef, order: SortOrder, dedup: bool) -> Self {
        Self { clause, order, dedup }
    }
}

impl QueryNode for SortedNode {
    fn guarantees(&self) -> Guarantees {
        self.clause.guarantees().sorted(self.order, self.dedup)
    }

    fn create_cursor<'a>(&self, ctx: &CursorContext<'a>) -> CursorResult<Option<BoxCursor<'a>>> {
        let Some(clause) = self.clause.create_cursor(ctx)? else {
            return Ok(None);
        };
        log::trace!("Sorting {} by {:?}", self.clause, self.order);
        Ok(Some(Box::new(SortedCursor::new(clause, self.order, self.dedup, ctx.capture_count)?)))
    }

    fn children(&self) -> Vec<&NodeRef> {
        vec![&self.clause]
    }
}

impl fmt::Display for SortedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            SortOrder::StartPoint => "START",
            SortOrder::EndPoint => "END",
        };
        let dedup = if self.dedup { ", DEDUP" } else { "" };
        write!(f, "SORT({}, {}{})", self.clause, order, dedup)
    }
}
