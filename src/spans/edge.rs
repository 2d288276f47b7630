//! Zero-width hits at one edge of a clause's hits

use crate::index::DocId;
use crate::pattern::Direction;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_POSITIONS};
use crate::types::Span;

/// `(start, start)` (leading edge) or `(end, end)` (trailing edge) of every clause hit
///
/// Trailing edges come out sorted only if the clause is end-sorted.
pub struct EdgeCursor<'a> {
    clause: BoxCursor<'a>,
    edge: Direction,
}

impl<'a> EdgeCursor<'a> {
    pub fn new(clause: BoxCursor<'a>, edge: Direction) -> Self {
        Self { clause, edge }
    }

    fn position(&self) -> u32 {
        match self.edge {
            Direction::Left => self.clause.start_position(),
            Direction::Right => self.clause.end_position(),
        }
    }
}

impl Cursor for EdgeCursor<'_> {
    fn doc(&self) -> DocId {
        self.clause.doc()
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        self.clause.advance()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        self.clause.seek(target)
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        if self.clause.next_start_position()? == NO_MORE_POSITIONS {
            return Ok(NO_MORE_POSITIONS);
        }
        Ok(self.position())
    }

    fn start_position(&self) -> u32 {
        self.position()
    }

    fn end_position(&self) -> u32 {
        self.position()
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        self.clause.collect_captures(captures)
    }
}
