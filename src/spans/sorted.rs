//! Sort-normalizing and deduplicating wrapper

use crate::index::DocId;
use crate::spans::bucket::DocBucket;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS};
use crate::types::{SortOrder, Span};

/// Buffers each document's hits, sorts them by `order` and optionally drops
/// consecutive duplicates
pub struct SortedCursor<'a> {
    bucket: DocBucket<'a>,
    order: SortOrder,
    dedup: bool,
}

impl<'a> SortedCursor<'a> {
    pub fn new(source: BoxCursor<'a>, order: SortOrder, dedup: bool, capture_count: usize) -> CursorResult<Self> {
        let mut cursor = Self { bucket: DocBucket::new(source, capture_count)?, order, dedup };
        cursor.sort();
        Ok(cursor)
    }

    fn sort(&mut self) {
        if self.bucket.doc() != NO_MORE_DOCS {
            self.bucket.hits_mut().sort(self.order, self.dedup);
        }
    }
}

impl Cursor for SortedCursor<'_> {
    fn doc(&self) -> DocId {
        self.bucket.doc()
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        let doc = self.bucket.advance()?;
        self.sort();
        Ok(doc)
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.bucket.doc() >= target {
            return Ok(self.bucket.doc());
        }
        let doc = self.bucket.seek(target)?;
        self.sort();
        Ok(doc)
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        Ok(self.bucket.hits_mut().next())
    }

    fn start_position(&self) -> u32 {
        self.bucket.hits().start()
    }

    fn end_position(&self) -> u32 {
        self.bucket.hits().end()
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        self.bucket.hits().collect_captures(captures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::testing::{collect_hits, ListCursor};

    #[test]
    fn test_sort_by_end_and_dedup() {
        let source = ListCursor::boxed(&[(1, &[(1, 4), (1, 5), (1, 4), (0, 5)]), (2, &[(3, 4)])]);
        let mut cursor = SortedCursor::new(source, SortOrder::EndPoint, true, 0).unwrap();
        assert_eq!(collect_hits(&mut cursor), vec![(1, 1, 4), (1, 0, 5), (1, 1, 5), (2, 3, 4)]);
    }

    #[test]
    fn test_sort_by_start_keeps_duplicates_without_dedup() {
        let source = ListCursor::boxed(&[(0, &[(2, 3), (1, 4), (2, 3)])]);
        let mut cursor = SortedCursor::new(source, SortOrder::StartPoint, false, 0).unwrap();
        assert_eq!(collect_hits(&mut cursor), vec![(0, 1, 4), (0, 2, 3), (0, 2, 3)]);
    }
}
