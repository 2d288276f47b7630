//! Relation leaves

use crate::error::IndexError;
use crate::index::{DocId, RelationPostings, SegmentIndex};
use crate::pattern::RelationDirection;
use crate::spans::{Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::{Relation, RelationSpanMode, Span};

/// Capture slots a matched relation is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationSlots {
    /// The relation's full span
    pub full: usize,
    pub source: usize,
    pub target: usize,
}

impl RelationSlots {
    fn max(&self) -> usize {
        self.full.max(self.source).max(self.target)
    }
}

/// Relations of one or more types, filtered by direction, reported as
/// their source, target or full span.
///
/// Hits of a document are buffered and sorted by span. Without capture slots
/// hits sharing a span are reported once.
pub struct RelationsCursor<'a> {
    streams: Vec<Box<dyn RelationPostings + 'a>>,
    segment: &'a dyn SegmentIndex,
    direction: RelationDirection,
    span_mode: RelationSpanMode,
    slots: Option<RelationSlots>,
    doc: DocId,
    buf: Vec<Relation>,
    hits: Vec<(Span, Relation)>,
    current: Option<usize>,
}

impl<'a> RelationsCursor<'a> {
    pub fn new(
        streams: Vec<Box<dyn RelationPostings + 'a>>,
        segment: &'a dyn SegmentIndex,
        direction: RelationDirection,
        span_mode: RelationSpanMode,
        slots: Option<RelationSlots>,
        capture_count: usize,
    ) -> CursorResult<Self> {
        if let Some(slot) = slots.map(|s| s.max()).filter(|&slot| slot >= capture_count) {
            return Err(IndexError::CaptureSlot { slot, len: capture_count });
        }
        let mut cursor = Self {
            streams,
            segment,
            direction,
            span_mode,
            slots,
            doc: NO_MORE_DOCS,
            buf: Vec::new(),
            hits: Vec::new(),
            current: None,
        };
        cursor.land()?;
        Ok(cursor)
    }

    fn min_doc(&self) -> DocId {
        self.streams.iter().map(|s| s.doc()).min().unwrap_or(NO_MORE_DOCS)
    }

    /// Collect the hits of the lowest document any stream is on, skipping dead or empty ones
    fn land(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.min_doc();
            self.doc = doc;
            self.current = None;
            self.hits.clear();
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            if self.segment.is_alive(doc) {
                self.read_hits(doc)?;
                if !self.hits.is_empty() {
                    return Ok(doc);
                }
            }
            self.step_past(doc);
        }
    }

    fn read_hits(&mut self, doc: DocId) -> CursorResult<()> {
        let length = self.segment.token_count(doc)?;
        for stream in self.streams.iter_mut().filter(|s| s.doc() == doc) {
            stream.read_relations(&mut self.buf)?;
            for relation in self.buf.iter().filter(|r| self.direction.accepts(r)) {
                let full = relation.full_span();
                if full.end > length {
                    return Err(IndexError::PositionOutOfRange { doc, position: full.end, length });
                }
                if let Some(span) = relation.span(self.span_mode) {
                    self.hits.push((span, *relation));
                }
            }
        }
        self.hits.sort_unstable();
        if self.slots.is_none() {
            self.hits.dedup_by_key(|(span, _)| *span);
        } else {
            self.hits.dedup();
        }
        Ok(())
    }

    fn step_past(&mut self, doc: DocId) {
        for stream in self.streams.iter_mut().filter(|s| s.doc() == doc) {
            stream.advance();
        }
    }

    fn current_hit(&self) -> Option<&(Span, Relation)> {
        self.current.and_then(|i| self.hits.get(i))
    }
}

impl Cursor for RelationsCursor<'_> {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.step_past(self.doc);
        self.land()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.doc >= target {
            return Ok(self.doc);
        }
        for stream in self.streams.iter_mut() {
            stream.seek(target);
        }
        self.land()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        let next = self.current.map_or(0, |i| i + 1).min(self.hits.len());
        self.current = Some(next);
        Ok(self.start_position())
    }

    fn start_position(&self) -> u32 {
        self.current_hit().map_or(NO_MORE_POSITIONS, |(s, _)| s.start)
    }

    fn end_position(&self) -> u32 {
        self.current_hit().map_or(NO_MORE_POSITIONS, |(s, _)| s.end)
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        let (Some(slots), Some((_, relation))) = (self.slots, self.current_hit()) else {
            return;
        };
        for (slot, value) in [
            (slots.full, Some(relation.full_span())),
            (slots.source, relation.source),
            (slots.target, Some(relation.target)),
        ] {
            if let Some(c) = captures.get_mut(slot) {
                *c = value;
            }
        }
    }
}
