//! Capture groups

use crate::error::IndexError;
use crate::index::DocId;
use crate::spans::{BoxCursor, Cursor, CursorResult};
use crate::types::Span;

/// Passes its clause's hits through and binds each one to a capture slot
pub struct CaptureCursor<'a> {
    clause: BoxCursor<'a>,
    slot: usize,
}

impl<'a> CaptureCursor<'a> {
    pub fn new(clause: BoxCursor<'a>, slot: usize, capture_count: usize) -> CursorResult<Self> {
        if slot >= capture_count {
            return Err(IndexError::CaptureSlot { slot, len: capture_count });
        }
        Ok(Self { clause, slot })
    }
}

impl Cursor for CaptureCursor<'_> {
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
        self.clause.next_start_position()
    }

    fn advance_start_position(&mut self, target: u32) -> CursorResult<u32> {
        self.clause.advance_start_position(target)
    }

    fn start_position(&self) -> u32 {
        self.clause.start_position()
    }

    fn end_position(&self) -> u32 {
        self.clause.end_position()
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        self.clause.collect_captures(captures);
        if let Some(slot) = captures.get_mut(self.slot) {
            *slot = Some(self.clause.span());
        }
    }
}
