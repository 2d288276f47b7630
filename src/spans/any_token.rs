//! N-grams of arbitrary tokens

use crate::index::{DocId, SegmentIndex};
use crate::spans::{Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};

/// Every n-gram of length `[min, max]` in every live document, sorted by
/// start then end
pub struct AnyTokenCursor<'a> {
    segment: &'a dyn SegmentIndex,
    min: u32,
    max: Option<u32>,
    doc: DocId,
    doc_length: u32,
    start: u32,
    end: u32,
}

impl<'a> AnyTokenCursor<'a> {
    pub fn new(segment: &'a dyn SegmentIndex, min: u32, max: Option<u32>) -> CursorResult<Self> {
        let mut cursor = Self {
            segment,
            min: min.max(1),
            max,
            doc: 0,
            doc_length: 0,
            start: NO_MORE_POSITIONS,
            end: NO_MORE_POSITIONS,
        };
        cursor.land(0)?;
        Ok(cursor)
    }

    /// Move to the first live document `>= from` long enough for an n-gram
    fn land(&mut self, from: DocId) -> CursorResult<DocId> {
        let max_doc = self.segment.max_doc();
        let mut doc = from;
        while doc < max_doc {
            if self.segment.is_alive(doc) {
                let length = self.segment.token_count(doc)?;
                if length >= self.min {
                    self.doc = doc;
                    self.doc_length = length;
                    self.start = NO_MORE_POSITIONS;
                    self.end = NO_MORE_POSITIONS;
                    return Ok(doc);
                }
            }
            doc += 1;
        }
        self.doc = NO_MORE_DOCS;
        Ok(NO_MORE_DOCS)
    }

    fn longest_end(&self, start: u32) -> u32 {
        match self.max {
            Some(max) => start.saturating_add(max).min(self.doc_length),
            None => self.doc_length,
        }
    }
}

impl Cursor for AnyTokenCursor<'_> {
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
        if self.start == NO_MORE_POSITIONS {
            if self.end == NO_MORE_POSITIONS {
                // first hit of the document
                self.start = 0;
                self.end = self.min;
                return Ok(self.start);
            }
            return Ok(NO_MORE_POSITIONS);
        }
        if self.end < self.longest_end(self.start) {
            self.end += 1;
            return Ok(self.start);
        }
        self.start += 1;
        self.end = self.start + self.min;
        if self.end > self.doc_length {
            self.start = NO_MORE_POSITIONS;
            self.end = 0;
            return Ok(NO_MORE_POSITIONS);
        }
        Ok(self.start)
    }

    fn advance_start_position(&mut self, target: u32) -> CursorResult<u32> {
        if self.start != NO_MORE_POSITIONS && target > self.start.saturating_add(1) {
            if target.saturating_add(self.min) > self.doc_length {
                self.start = NO_MORE_POSITIONS;
                self.end = 0;
                return Ok(NO_MORE_POSITIONS);
            }
            self.start = target;
            self.end = target + self.min;
            return Ok(self.start);
        }
        loop {
            let start = self.next_start_position()?;
            if start >= target {
                return Ok(start);
            }
        }
    }

    fn start_position(&self) -> u32 {
        self.start
    }

    fn end_position(&self) -> u32 {
        if self.start == NO_MORE_POSITIONS {
            NO_MORE_POSITIONS
        } else {
            self.end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Document;
    use crate::index::MemoryIndex;
    use crate::spans::testing::{collect_hits, spans_in};

    #[test]
    fn test_all_ngrams_in_order() {
        let index = MemoryIndex::from_documents(&[
            Document::from_words("a", "x y z"),
            Document::from_words("b", "x"),
        ]);
        let seg = &index.segments()[0];
        let mut cursor = AnyTokenCursor::new(seg, 1, Some(2)).unwrap();
        let hits = collect_hits(&mut cursor);
        assert_eq!(spans_in(&hits, 0), vec![(0, 1), (0, 2), (1, 2), (1, 3), (2, 3)]);
        assert_eq!(spans_in(&hits, 1), vec![(0, 1)]);
    }

    #[test]
    fn test_short_documents_are_skipped() {
        let index = MemoryIndex::from_documents(&[
            Document::from_words("a", "x"),
            Document::from_words("b", "x y z"),
        ]);
        let seg = &index.segments()[0];
        let mut cursor = AnyTokenCursor::new(seg, 2, None).unwrap();
        assert_eq!(cursor.doc(), 1);
        assert_eq!(cursor.advance_start_position(1).unwrap(), 1);
        assert_eq!(cursor.end_position(), 3);
        assert_eq!(cursor.next_start_position().unwrap(), NO_MORE_POSITIONS);
    }
}
