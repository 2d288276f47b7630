//! Producer hits kept or dropped by their relation to filter hits

use std::ops::Range;

use crate::index::DocId;
use crate::pattern::FilterOp;
use crate::spans::bucket::{DocBucket, HitQueue};
use crate::spans::{overlay_captures, BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::{SortOrder, Span};

/// Keeps each producer hit for which some filter hit in the same document
/// stands in relation `op` (or, inverted, for which none does)
///
/// The producer window is shifted by `adjust_left`/`adjust_right` before
/// comparing. Each document's filter hits are sorted by start once, and only
/// the start range that can satisfy `op` is tested. A kept hit carries the
/// captures of the first qualifying filter hit in that order. Producer order
/// is preserved.
pub struct PositionFilterCursor<'a> {
    producer: BoxCursor<'a>,
    /// `None` when the filter has no hits in this segment
    filter: Option<DocBucket<'a>>,
    op: FilterOp,
    invert: bool,
    adjust_left: i64,
    adjust_right: i64,
    hits: HitQueue,
    scratch: Vec<Option<Span>>,
}

impl<'a> PositionFilterCursor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        producer: BoxCursor<'a>,
        filter: Option<BoxCursor<'a>>,
        op: FilterOp,
        invert: bool,
        adjust_left: i32,
        adjust_right: i32,
        capture_count: usize,
    ) -> CursorResult<Self> {
        let filter = filter.map(|f| DocBucket::new(f, capture_count)).transpose()?;
        let mut cursor = Self {
            producer,
            filter,
            op,
            invert,
            adjust_left: adjust_left as i64,
            adjust_right: adjust_right as i64,
            hits: HitQueue::new(capture_count),
            scratch: vec![None; capture_count],
        };
        cursor.land()?;
        Ok(cursor)
    }

    fn land(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.producer.doc();
            self.hits.clear();
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            let filter_doc = match self.filter.as_mut() {
                Some(filter) => filter.seek(doc)?,
                None => NO_MORE_DOCS,
            };
            if !self.invert && filter_doc != doc {
                // only documents holding filter hits can keep anything
                if filter_doc == NO_MORE_DOCS {
                    self.producer.seek(NO_MORE_DOCS)?;
                } else {
                    self.producer.seek(filter_doc)?;
                }
                continue;
            }
            if filter_doc == doc {
                if let Some(filter) = self.filter.as_mut() {
                    filter.hits_mut().sort(SortOrder::StartPoint, false);
                }
            }
            self.filter_document(filter_doc == doc)?;
            if !self.hits.is_empty() {
                return Ok(doc);
            }
            self.producer.advance()?;
        }
    }

    fn filter_document(&mut self, has_filter_hits: bool) -> CursorResult<()> {
        while self.producer.next_start_position()? != NO_MORE_POSITIONS {
            let span = self.producer.span();
            let ps = span.start as i64 + self.adjust_left;
            let pe = span.end as i64 + self.adjust_right;
            let qualifying = match (&self.filter, has_filter_hits) {
                (Some(filter), true) => {
                    let spans = filter.hits().spans();
                    candidates(self.op, spans, ps, pe).find(|&i| {
                        let f = spans[i];
                        self.op.accepts(ps, pe, f.start as i64, f.end as i64)
                    })
                }
                _ => None,
            };
            if qualifying.is_some() == self.invert {
                continue;
            }
            self.scratch.iter_mut().for_each(|c| *c = None);
            self.producer.collect_captures(&mut self.scratch);
            if let (Some(i), Some(filter)) = (qualifying, &self.filter) {
                overlay_captures(&mut self.scratch, filter.hits().captures_of(i));
            }
            self.hits.push(span, &self.scratch);
        }
        Ok(())
    }
}

/// Indices of the start-sorted `spans` whose start is compatible with `op`
/// for the window `(ps, pe)`
fn candidates(op: FilterOp, spans: &[Span], ps: i64, pe: i64) -> Range<usize> {
    // a filter hit never ends before it starts, so `fe <= pe` bounds its start too
    let (lo, hi) = match op {
        FilterOp::StartsAt | FilterOp::ContainingAtStart | FilterOp::Matches => (Some(ps), ps),
        FilterOp::Containing | FilterOp::ContainingAtEnd => (Some(ps), pe),
        FilterOp::Within => (None, ps),
        FilterOp::EndsAt => (None, pe),
    };
    let from = lo.map_or(0, |lo| spans.partition_point(|f| (f.start as i64) < lo));
    let to = spans.partition_point(|f| (f.start as i64) <= hi);
    from..to.max(from)
}

impl Cursor for PositionFilterCursor<'_> {
    fn doc(&self) -> DocId {
        self.producer.doc()
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.producer.doc() == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.producer.advance()?;
        self.land()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.producer.doc() >= target {
            return Ok(self.producer.doc());
        }
        self.producer.seek(target)?;
        self.land()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        Ok(self.hits.next())
    }

    fn start_position(&self) -> u32 {
        self.hits.start()
    }

    fn end_position(&self) -> u32 {
        self.hits.end()
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        self.hits.collect_captures(captures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::capture::CaptureCursor;
    use crate::spans::testing::{collect_hits, collect_with_captures, spans_in, ListCursor};

    fn sentences() -> BoxCursor<'static> {
        ListCursor::boxed(&[(0, &[(0, 5), (5, 8)]), (1, &[(0, 3)]), (2, &[(0, 4)])])
    }

    #[test]
    fn test_containing() {
        let words = ListCursor::boxed(&[(0, &[(6, 7)]), (2, &[(4, 5)])]);
        let mut cursor =
            PositionFilterCursor::new(sentences(), Some(words), FilterOp::Containing, false, 0, 0, 0).unwrap();
        assert_eq!(collect_hits(&mut cursor), vec![(0, 5, 8)]);
    }

    #[test]
    fn test_not_containing_keeps_documents_without_filter_hits() {
        let words = ListCursor::boxed(&[(0, &[(6, 7)])]);
        let mut cursor =
            PositionFilterCursor::new(sentences(), Some(words), FilterOp::Containing, true, 0, 0, 0).unwrap();
        let hits = collect_hits(&mut cursor);
        assert_eq!(spans_in(&hits, 0), vec![(0, 5)]);
        assert_eq!(spans_in(&hits, 1), vec![(0, 3)]);
        assert_eq!(spans_in(&hits, 2), vec![(0, 4)]);

        let mut without_filter =
            PositionFilterCursor::new(sentences(), None, FilterOp::Containing, true, 0, 0, 0).unwrap();
        assert_eq!(collect_hits(&mut without_filter).len(), 4);
    }

    #[test]
    fn test_adjusted_window() {
        // producer (0,2) stands for the window (1,2): keep it unless that token is filtered
        let producer = ListCursor::boxed(&[(0, &[(0, 2), (2, 4)])]);
        let filter = ListCursor::boxed(&[(0, &[(1, 2)])]);
        let mut cursor =
            PositionFilterCursor::new(producer, Some(filter), FilterOp::Containing, true, 1, 0, 0).unwrap();
        assert_eq!(collect_hits(&mut cursor), vec![(0, 2, 4)]);
    }

    #[test]
    fn test_candidate_ranges() {
        let spans: Vec<Span> = [(0, 3), (1, 2), (2, 2), (2, 5), (4, 6), (7, 8)]
            .iter()
            .map(|&(s, e)| Span::new(s, e))
            .collect();
        assert_eq!(candidates(FilterOp::StartsAt, &spans, 2, 9), 2..4);
        assert_eq!(candidates(FilterOp::Matches, &spans, 3, 4), 4..4);
        assert_eq!(candidates(FilterOp::Containing, &spans, 1, 5), 1..5);
        assert_eq!(candidates(FilterOp::Within, &spans, 1, 2), 0..2);
        assert_eq!(candidates(FilterOp::EndsAt, &spans, 0, 6), 0..5);
        assert_eq!(candidates(FilterOp::Containing, &spans, 5, 3), 5..5);
    }

    #[test]
    fn test_unsorted_filter_hits() {
        // filter hits arrive end-sorted; every op still finds its qualifying hit
        let producer = || ListCursor::boxed(&[(0, &[(0, 2), (2, 6), (6, 9)])]);
        let filter = || ListCursor::boxed(&[(0, &[(0, 1), (4, 5), (3, 6), (7, 9)])]);
        let run = |op: FilterOp| {
            let mut cursor = PositionFilterCursor::new(producer(), Some(filter()), op, false, 0, 0, 0).unwrap();
            collect_hits(&mut cursor)
        };
        assert_eq!(run(FilterOp::Containing), vec![(0, 0, 2), (0, 2, 6), (0, 6, 9)]);
        assert_eq!(run(FilterOp::ContainingAtEnd), vec![(0, 2, 6), (0, 6, 9)]);
        assert_eq!(run(FilterOp::StartsAt), vec![(0, 0, 2)]);
        assert_eq!(run(FilterOp::Within), Vec::<(DocId, u32, u32)>::new());
    }

    #[test]
    fn test_filter_captures_are_propagated() {
        let filter = Box::new(CaptureCursor::new(ListCursor::boxed(&[(0, &[(1, 2), (6, 7)])]), 0, 1).unwrap());
        let mut cursor =
            PositionFilterCursor::new(sentences(), Some(filter), FilterOp::Containing, false, 0, 0, 1).unwrap();
        let hits = collect_with_captures(&mut cursor, 1);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].2, vec![Some(Span::new(1, 2))]);
        assert_eq!(hits[1].2, vec![Some(Span::new(6, 7))]);
    }
}
