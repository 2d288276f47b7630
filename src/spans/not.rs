//! Token-level negation

use crate::index::{DocId, SegmentIndex};
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};

/// Every single token of a live document not covered by a hit of the clause
pub struct NotCursor<'a> {
    clause: Option<BoxCursor<'a>>,
    segment: &'a dyn SegmentIndex,
    doc: DocId,
    /// covered[p] is true when token p lies inside some clause hit
    covered: Vec<bool>,
    position: Option<u32>,
}

impl<'a> NotCursor<'a> {
    /// `clause` is `None` when it has no hits in this segment
    pub fn new(clause: Option<BoxCursor<'a>>, segment: &'a dyn SegmentIndex) -> CursorResult<Self> {
        let mut cursor = Self { clause, segment, doc: 0, covered: Vec::new(), position: None };
        cursor.land(0)?;
        Ok(cursor)
    }

    fn land(&mut self, from: DocId) -> CursorResult<DocId> {
        let max_doc = self.segment.max_doc();
        let mut doc = from;
        while doc < max_doc {
            if self.segment.is_alive(doc) && self.cover(doc)? {
                self.doc = doc;
                self.position = None;
                return Ok(doc);
            }
            doc += 1;
        }
        self.doc = NO_MORE_DOCS;
        self.covered.clear();
        Ok(NO_MORE_DOCS)
    }

    /// Mark the tokens of `doc` covered by clause hits; true if any token is left
    fn cover(&mut self, doc: DocId) -> CursorResult<bool> {
        let length = self.segment.token_count(doc)?;
        self.covered.clear();
        self.covered.resize(length as usize, false);
        if let Some(clause) = self.clause.as_mut() {
            if clause.doc() < doc {
                clause.seek(doc)?;
            }
            if clause.doc() == doc {
                while clause.next_start_position()? != NO_MORE_POSITIONS {
                    let end = clause.end_position().min(length);
                    for p in clause.start_position()..end {
                        self.covered[p as usize] = true;
                    }
                }
            }
        }
        Ok(self.covered.iter().any(|c| !c))
    }

    fn find_from(&mut self, from: u32) -> u32 {
        let found = self.covered[from.min(self.covered.len() as u32) as usize..]
            .iter()
            .position(|c| !c)
            .map_or(NO_MORE_POSITIONS, |i| from + i as u32);
        self.position = Some(found);
        found
    }
}

impl Cursor for NotCursor<'_> {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.land(self.doc + 1)
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.doc >= target {
            return Ok(self.doc);
        }
        self.land(target)
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        let from = match self.position {
            None => 0,
            Some(NO_MORE_POSITIONS) => return Ok(NO_MORE_POSITIONS),
            Some(p) => p + 1,
        };
        Ok(self.find_from(from))
    }

    fn advance_start_position(&mut self, target: u32) -> CursorResult<u32> {
        let from = match self.position {
            None => target,
            Some(NO_MORE_POSITIONS) => return Ok(NO_MORE_POSITIONS),
            Some(p) => target.max(p + 1),
        };
        Ok(self.find_from(from))
    }

    fn start_position(&self) -> u32 {
        self.position.unwrap_or(NO_MORE_POSITIONS)
    }

    fn end_position(&self) -> u32 {
        match self.position {
            Some(p) if p != NO_MORE_POSITIONS => p + 1,
            _ => NO_MORE_POSITIONS,
        }
    }
}
