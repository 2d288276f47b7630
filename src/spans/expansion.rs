//! Growing hits by a bounded number of tokens on one side

use crate::index::{DocId, SegmentIndex};
use crate::pattern::Direction;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Every expansion of every clause hit by `min..=max` tokens
///
/// Expanding left stops at position 0, expanding right at the document's
/// token count. A clause hit without room for `min` tokens is dropped.
pub struct ExpansionCursor<'a> {
    clause: BoxCursor<'a>,
    segment: &'a dyn SegmentIndex,
    direction: Direction,
    min: u32,
    max: Option<u32>,
    token_count: u32,
    /// Current clause hit and the expansion applied to it
    base: Span,
    step: u32,
    max_step: u32,
    current: Option<Span>,
    already_at_first: bool,
}

impl<'a> ExpansionCursor<'a> {
    pub fn new(
        clause: BoxCursor<'a>,
        segment: &'a dyn SegmentIndex,
        direction: Direction,
        min: u32,
        max: Option<u32>,
    ) -> CursorResult<Self> {
        let mut cursor = Self {
            clause,
            segment,
            direction,
            min,
            max,
            token_count: 0,
            base: Span::new(0, 0),
            step: 0,
            max_step: 0,
            current: None,
            already_at_first: false,
        };
        cursor.land()?;
        Ok(cursor)
    }

    /// Settle on the first clause document with at least one valid expansion
    fn land(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.clause.doc();
            self.current = None;
            self.already_at_first = false;
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            self.token_count = self.segment.token_count(doc)?;
            if self.next_base()? != NO_MORE_POSITIONS {
                self.already_at_first = true;
                return Ok(doc);
            }
            self.clause.advance()?;
        }
    }

    /// Move to the next clause hit that has room for the minimum expansion
    fn next_base(&mut self) -> CursorResult<u32> {
        loop {
            if self.clause.next_start_position()? == NO_MORE_POSITIONS {
                self.current = None;
                return Ok(NO_MORE_POSITIONS);
            }
            let base = self.clause.span();
            let room = match self.direction {
                Direction::Left => base.start,
                Direction::Right => self.token_count.saturating_sub(base.end),
            };
            let max_step = self.max.map_or(room, |m| m.min(room));
            if self.min <= max_step {
                self.base = base;
                self.step = self.min;
                self.max_step = max_step;
                return Ok(self.emit());
            }
        }
    }

    fn emit(&mut self) -> u32 {
        let span = match self.direction {
            Direction::Left => Span::new(self.base.start - self.step, self.base.end),
            Direction::Right => Span::new(self.base.start, self.base.end + self.step),
        };
        self.current = Some(span);
        span.start
    }
}

impl Cursor for ExpansionCursor<'_> {
    fn doc(&self) -> DocId {
        self.clause.doc()
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        self.clause.advance()?;
        self.land()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.clause.doc() >= target {
            return Ok(self.clause.doc());
        }
        self.clause.seek(target)?;
        self.land()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        if self.already_at_first {
            self.already_at_first = false;
            return Ok(self.start_position());
        }
        if self.current.is_none() {
            return Ok(NO_MORE_POSITIONS);
        }
        if self.step < self.max_step {
            self.step += 1;
            return Ok(self.emit());
        }
        self.next_base()
    }

    fn start_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    fn end_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |s| s.end)
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        self.clause.collect_captures(captures)
    }
}
