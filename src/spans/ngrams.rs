//! N-grams standing in a relation to the hits of a clause

use crate::index::{DocId, SegmentIndex};
use crate::pattern::FilterOp;
use crate::spans::bucket::HitQueue;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS};
use crate::types::{SortOrder, Span};

/// All token windows of length `min..=max` for which `op` accepts some clause hit
///
/// Equivalent to filtering every n-gram of the document by the clause, but
/// only windows near clause hits are generated. Output is start-sorted and
/// unique; a window keeps the captures of the first clause hit it was
/// generated from.
pub struct NGramCursor<'a> {
    clause: BoxCursor<'a>,
    segment: &'a dyn SegmentIndex,
    op: FilterOp,
    min: u32,
    max: Option<u32>,
    clause_hits: HitQueue,
    hits: HitQueue,
}

impl<'a> NGramCursor<'a> {
    pub fn new(
        clause: BoxCursor<'a>,
        segment: &'a dyn SegmentIndex,
        op: FilterOp,
        min: u32,
        max: Option<u32>,
        capture_count: usize,
    ) -> CursorResult<Self> {
        let mut cursor = Self {
            clause,
            segment,
            op,
            min: min.max(1),
            max,
            clause_hits: HitQueue::new(capture_count),
            hits: HitQueue::new(capture_count),
        };
        cursor.land()?;
        Ok(cursor)
    }

    fn land(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.clause.doc();
            self.hits.clear();
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            let token_count = self.segment.token_count(doc)?;
            self.clause_hits.clear();
            self.clause_hits.fill_from(self.clause.as_mut())?;
            self.generate(token_count);
            if !self.hits.is_empty() {
                return Ok(doc);
            }
            self.clause.advance()?;
        }
    }

    fn generate(&mut self, token_count: u32) {
        let max = self.max.map_or(token_count, |m| m.min(token_count));
        if self.min > max {
            return;
        }
        for i in 0..self.clause_hits.len() {
            let hit = self.clause_hits.span(i);
            let first_start = match self.op {
                FilterOp::Containing | FilterOp::ContainingAtEnd | FilterOp::EndsAt => hit.end.saturating_sub(max),
                FilterOp::ContainingAtStart | FilterOp::Matches | FilterOp::StartsAt | FilterOp::Within => hit.start,
            };
            let last_start = match self.op {
                FilterOp::Within | FilterOp::EndsAt => hit.end,
                _ => hit.start,
            };
            for start in first_start..=last_start {
                let last_end = start.saturating_add(max).min(token_count);
                for end in start + self.min..=last_end {
                    if self.op.accepts(start as i64, end as i64, hit.start as i64, hit.end as i64) {
                        self.hits.push(Span::new(start, end), self.clause_hits.captures_of(i));
                    }
                }
            }
        }
        self.hits.sort(SortOrder::StartPoint, true);
    }
}

impl Cursor for NGramCursor<'_> {
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
