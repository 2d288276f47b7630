//! Sequence joins: hits of a left clause immediately followed by hits of a
//! right clause in the same document.

use crate::index::DocId;
use crate::spans::bucket::StartBucket;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Midpoint merge-join over an end-sorted left cursor and a start-sorted right cursor
///
/// For every left hit, every right hit starting at the left hit's end is
/// combined into `(left.start, right.end)`. Overlapping inputs can produce
/// duplicates and out-of-order ends; a sorting wrapper repairs that where a
/// consumer needs it.
pub struct SequenceCursor<'a> {
    left: BoxCursor<'a>,
    right: StartBucket<'a>,
    doc: DocId,
    /// Index of the current member in the right bucket
    member: usize,
    current: Option<Span>,
    already_at_first: bool,
    doc_done: bool,
}

impl<'a> SequenceCursor<'a> {
    pub fn new(left: BoxCursor<'a>, right: BoxCursor<'a>, capture_count: usize) -> CursorResult<Self> {
        let mut cursor = Self {
            left,
            right: StartBucket::new(right, capture_count)?,
            doc: NO_MORE_DOCS,
            member: 0,
            current: None,
            already_at_first: false,
            doc_done: false,
        };
        cursor.align()?;
        Ok(cursor)
    }

    /// Leapfrog both sides until they share a document with at least one join hit
    fn align(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.left.doc();
            if doc == NO_MORE_DOCS {
                break;
            }
            let right_doc = self.right.seek(doc)?;
            if right_doc == NO_MORE_DOCS {
                break;
            }
            if right_doc > doc {
                self.left.seek(right_doc)?;
                continue;
            }
            self.doc = doc;
            self.doc_done = false;
            self.current = None;
            if self.find_next()? != NO_MORE_POSITIONS {
                self.already_at_first = true;
                return Ok(doc);
            }
            self.left.advance()?;
        }
        self.doc = NO_MORE_DOCS;
        self.current = None;
        self.already_at_first = false;
        Ok(NO_MORE_DOCS)
    }

    fn find_next(&mut self) -> CursorResult<u32> {
        if self.doc_done {
            return Ok(NO_MORE_POSITIONS);
        }
        if self.current.is_some() && self.member + 1 < self.right.len() {
            self.member += 1;
            return Ok(self.emit());
        }
        loop {
            if self.left.next_start_position()? == NO_MORE_POSITIONS {
                return Ok(self.finish_doc());
            }
            let end = self.left.end_position();
            if (self.right.is_empty() || self.right.bucket_start() < end)
                && self.right.advance_bucket(end)? == NO_MORE_POSITIONS
            {
                return Ok(self.finish_doc());
            }
            if self.right.bucket_start() == end {
                self.member = 0;
                return Ok(self.emit());
            }
        }
    }

    fn emit(&mut self) -> u32 {
        let start = self.left.start_position();
        self.current = Some(Span::new(start, self.right.end(self.member)));
        start
    }

    fn finish_doc(&mut self) -> u32 {
        self.doc_done = true;
        self.current = None;
        NO_MORE_POSITIONS
    }
}

impl Cursor for SequenceCursor<'_> {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.left.advance()?;
        self.align()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.doc >= target {
            return Ok(self.doc);
        }
        self.left.seek(target)?;
        self.align()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        if self.already_at_first {
            self.already_at_first = false;
            return Ok(self.start_position());
        }
        self.find_next()
    }

    fn start_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    fn end_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |s| s.end)
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        if self.current.is_some() {
            self.left.collect_captures(captures);
            self.right.collect_captures(self.member, captures);
        }
    }
}

/// One-to-one join for a left side with unique sorted ends and a right side
/// with unique sorted starts: each left hit meets at most one right hit.
pub struct SimpleSequenceCursor<'a> {
    left: BoxCursor<'a>,
    right: BoxCursor<'a>,
    doc: DocId,
    right_start: u32,
    current: Option<Span>,
    already_at_first: bool,
}

impl<'a> SimpleSequenceCursor<'a> {
    pub fn new(left: BoxCursor<'a>, right: BoxCursor<'a>) -> CursorResult<Self> {
        let mut cursor = Self {
            left,
            right,
            doc: NO_MORE_DOCS,
            right_start: NO_MORE_POSITIONS,
            current: None,
            already_at_first: false,
        };
        cursor.align()?;
        Ok(cursor)
    }

    fn align(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.left.doc();
            if doc == NO_MORE_DOCS {
                break;
            }
            let right_doc = self.right.seek(doc)?;
            if right_doc == NO_MORE_DOCS {
                break;
            }
            if right_doc > doc {
                self.left.seek(right_doc)?;
                continue;
            }
            self.doc = doc;
            self.right_start = self.right.next_start_position()?;
            if self.find_next()? != NO_MORE_POSITIONS {
                self.already_at_first = true;
                return Ok(doc);
            }
            self.left.advance()?;
        }
        self.doc = NO_MORE_DOCS;
        self.current = None;
        self.already_at_first = false;
        Ok(NO_MORE_DOCS)
    }

    fn find_next(&mut self) -> CursorResult<u32> {
        loop {
            if self.right_start == NO_MORE_POSITIONS || self.left.next_start_position()? == NO_MORE_POSITIONS {
                self.right_start = NO_MORE_POSITIONS;
                self.current = None;
                return Ok(NO_MORE_POSITIONS);
            }
            let end = self.left.end_position();
            if self.right_start < end {
                self.right_start = self.right.advance_start_position(end)?;
            }
            if self.right_start == end {
                let start = self.left.start_position();
                self.current = Some(Span::new(start, self.right.end_position()));
                return Ok(start);
            }
        }
    }
}

impl Cursor for SimpleSequenceCursor<'_> {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.left.advance()?;
        self.align()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.doc >= target {
            return Ok(self.doc);
        }
        self.left.seek(target)?;
        self.align()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        if self.already_at_first {
            self.already_at_first = false;
            return Ok(self.start_position());
        }
        self.find_next()
    }

    fn start_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    fn end_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |s| s.end)
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        if self.current.is_some() {
            self.left.collect_captures(captures);
            self.right.collect_captures(captures);
        }
    }
}
