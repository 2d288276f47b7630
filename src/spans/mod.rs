//! Positional interval cursors
//!
//! A cursor walks the hits of one query node in one segment: documents in
//! increasing id order, and within a document the hits in the order its node
//! declares (see [`crate::types::Guarantees`]). This module is organized into:
//! - `term`: postings-backed leaves (terms, expanded multi-terms, tags, attributes)
//! - `any_token`, `not`, `edge`: synthetic single-stream leaves
//! - `bucket`: per-document and per-start-point hit buckets
//! - `sorted`: the sort-normalizing/deduplicating wrapper
//! - `sequence`, `expansion`, `repetition`: interval concatenation
//! - `or`, `and`, `position_filter`, `ngrams`: set and relation operators
//! - `capture`, `constraint`: capture groups and cross-capture constraints
//! - `relations`: relation leaves, optionally captured

pub mod and;
pub mod any_token;
pub mod bucket;
pub mod capture;
pub mod constraint;
pub mod edge;
pub mod expansion;
pub mod ngrams;
pub mod not;
pub mod or;
pub mod position_filter;
pub mod relations;
pub mod repetition;
pub mod sequence;
pub mod sorted;
pub mod term;

#[cfg(test)]
pub(crate) mod testing;

use crate::error::IndexError;
use crate::index::DocId;
use crate::types::Span;

pub use crate::index::{NO_MORE_DOCS, NO_MORE_POSITIONS};

pub type CursorResult<T> = Result<T, IndexError>;

/// A stream of hits over the documents of one segment
///
/// A cursor is positioned on its first document when created and only ever
/// lands on documents holding at least one hit. After landing on a document,
/// [`Cursor::next_start_position`] must be called before the current hit's
/// boundaries are read.
pub trait Cursor {
    fn doc(&self) -> DocId;

    /// Move to the next document with hits
    fn advance(&mut self) -> CursorResult<DocId>;

    /// Move to the first document `>= target` with hits; stays put if already there
    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        let mut doc = self.doc();
        while doc < target {
            doc = self.advance()?;
        }
        Ok(doc)
    }

    /// Move to the next hit in the current document, returning its start
    /// (or [`NO_MORE_POSITIONS`])
    fn next_start_position(&mut self) -> CursorResult<u32>;

    /// Move to the next hit starting at or after `target`. Always moves at least once.
    fn advance_start_position(&mut self, target: u32) -> CursorResult<u32> {
        loop {
            let start = self.next_start_position()?;
            if start >= target {
                return Ok(start);
            }
        }
    }

    fn start_position(&self) -> u32;

    fn end_position(&self) -> u32;

    fn span(&self) -> Span {
        Span::new(self.start_position(), self.end_position())
    }

    /// Write the captures bound by the current hit into their slots
    fn collect_captures(&self, _captures: &mut [Option<Span>]) {}
}

impl<C: Cursor + ?Sized> Cursor for Box<C> {
    fn doc(&self) -> DocId {
        (**self).doc()
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        (**self).advance()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        (**self).seek(target)
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        (**self).next_start_position()
    }

    fn advance_start_position(&mut self, target: u32) -> CursorResult<u32> {
        (**self).advance_start_position(target)
    }

    fn start_position(&self) -> u32 {
        (**self).start_position()
    }

    fn end_position(&self) -> u32 {
        (**self).end_position()
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        (**self).collect_captures(captures)
    }
}

pub type BoxCursor<'a> = Box<dyn Cursor + 'a>;

/// Copy the set slots of a snapshot over `out`
pub(crate) fn overlay_captures(out: &mut [Option<Span>], snapshot: &[Option<Span>]) {
    for (slot, value) in out.iter_mut().zip(snapshot) {
        if value.is_some() {
            *slot = *value;
        }
    }
}
