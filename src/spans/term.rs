//! Postings-backed leaf cursor

use crate::error::IndexError;
use crate::index::{DocId, Postings, SegmentIndex};
use crate::spans::{Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Hits read straight from a postings stream: a term, the union of the terms
/// a matcher expanded to, the elements of a tag, or attribute markers.
///
/// Deleted documents are skipped and every span is checked against the
/// document's token count.
pub struct TermCursor<'a> {
    postings: Box<dyn Postings + 'a>,
    segment: &'a dyn SegmentIndex,
    spans: Vec<Span>,
    current: Option<usize>,
}

impl<'a> TermCursor<'a> {
    pub fn new(postings: Box<dyn Postings + 'a>, segment: &'a dyn SegmentIndex) -> CursorResult<Self> {
        let mut cursor = Self { postings, segment, spans: Vec::new(), current: None };
        cursor.land()?;
        Ok(cursor)
    }

    /// Read the spans of the postings' current document, skipping dead or empty ones
    fn land(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.postings.doc();
            self.current = None;
            self.spans.clear();
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            if self.segment.is_alive(doc) {
                self.postings.read_spans(&mut self.spans)?;
                if !self.spans.is_empty() {
                    self.check_bounds(doc)?;
                    return Ok(doc);
                }
            }
            self.postings.advance();
        }
    }

    fn check_bounds(&self, doc: DocId) -> CursorResult<()> {
        let length = self.segment.token_count(doc)?;
        if let Some(bad) = self.spans.iter().find(|s| s.end > length || s.start > s.end) {
            return Err(IndexError::PositionOutOfRange { doc, position: bad.end, length });
        }
        Ok(())
    }

    fn current_span(&self) -> Option<Span> {
        self.current.and_then(|i| self.spans.get(i)).copied()
    }
}

impl Cursor for TermCursor<'_> {
    fn doc(&self) -> DocId {
        self.postings.doc()
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.postings.doc() == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.postings.advance();
        self.land()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.postings.doc() >= target {
            return Ok(self.postings.doc());
        }
        self.postings.seek(target);
        self.land()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        let next = self.current.map_or(0, |i| i + 1).min(self.spans.len());
        self.current = Some(next);
        Ok(self.current_span().map_or(NO_MORE_POSITIONS, |s| s.start))
    }

    fn advance_start_position(&mut self, target: u32) -> CursorResult<u32> {
        // spans are start-sorted: skip by binary search
        let from = self.current.map_or(0, |i| i + 1).min(self.spans.len());
        let skip = self.spans[from..].partition_point(|s| s.start < target);
        self.current = Some(from + skip);
        Ok(self.current_span().map_or(NO_MORE_POSITIONS, |s| s.start))
    }

    fn start_position(&self) -> u32 {
        self.current_span().map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    fn end_position(&self) -> u32 {
        self.current_span().map_or(NO_MORE_POSITIONS, |s| s.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Document;
    use crate::index::{MemoryIndex, VecPostings};
    use crate::pattern::Sensitivity;
    use crate::spans::testing::{collect_hits, spans_in};

    #[test]
    fn test_term_cursor_skips_deleted_documents() {
        let mut builder = MemoryIndex::builder();
        builder.add_document(&Document::from_words("a", "x y x"));
        builder.add_document(&Document::from_words("b", "y"));
        builder.add_document(&Document::from_words("c", "x"));
        builder.delete_document(0);
        let index = builder.build();
        let seg = &index.segments()[0];
        let postings = seg.term_postings("word", Sensitivity::Insensitive, "x").unwrap().unwrap();
        let mut cursor = TermCursor::new(postings, seg).unwrap();
        assert_eq!(cursor.doc(), 2);
        assert_eq!(collect_hits(&mut cursor), vec![(2, 0, 1)]);
    }

    #[test]
    fn test_advance_start_position_moves_at_least_once() {
        let index = MemoryIndex::from_documents(&[Document::from_words("a", "x x y x")]);
        let seg = &index.segments()[0];
        let postings = seg.term_postings("word", Sensitivity::Insensitive, "x").unwrap().unwrap();
        let mut cursor = TermCursor::new(postings, seg).unwrap();
        assert_eq!(cursor.next_start_position().unwrap(), 0);
        assert_eq!(cursor.advance_start_position(0).unwrap(), 1);
        assert_eq!(cursor.advance_start_position(2).unwrap(), 3);
        assert_eq!(cursor.advance_start_position(2).unwrap(), NO_MORE_POSITIONS);
    }

    #[test]
    fn test_out_of_range_position_is_an_error() {
        let index = MemoryIndex::from_documents(&[Document::from_words("a", "x y")]);
        let seg = &index.segments()[0];
        let bad = VecPostings::owned(vec![(0, vec![Span::new(1, 5)])]);
        assert!(matches!(
            TermCursor::new(Box::new(bad), seg),
            Err(IndexError::PositionOutOfRange { doc: 0, position: 5, length: 2 })
        ));
        let good = VecPostings::owned(vec![(0, vec![Span::new(0, 2)])]);
        let mut cursor = TermCursor::new(Box::new(good), seg).unwrap();
        assert_eq!(spans_in(&collect_hits(&mut cursor), 0), vec![(0, 2)]);
    }
}
