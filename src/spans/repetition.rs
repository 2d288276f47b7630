//! Unbounded repetition of a clause

use std::collections::{HashSet, VecDeque};

use crate::index::DocId;
use crate::spans::bucket::HitQueue;
use crate::spans::{overlay_captures, BoxCursor, Cursor, CursorResult, NO_MORE_DOCS};
use crate::types::{SortOrder, Span};

/// Chains of at least `min` adjacent clause hits, of any length
///
/// Each document's clause hits are gathered once, then chains are extended
/// breadth-first while a chain's end meets another clause hit's start. The
/// output is start-sorted and unique.
pub struct RepetitionCursor<'a> {
    clause: BoxCursor<'a>,
    min: u32,
    clause_hits: HitQueue,
    hits: HitQueue,
}

impl<'a> RepetitionCursor<'a> {
    pub fn new(clause: BoxCursor<'a>, min: u32, capture_count: usize) -> CursorResult<Self> {
        let mut cursor = Self {
            clause,
            min: min.max(1),
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
            self.clause_hits.clear();
            self.clause_hits.fill_from(self.clause.as_mut())?;
            self.chain();
            if !self.hits.is_empty() {
                return Ok(doc);
            }
            self.clause.advance()?;
        }
    }

    fn chain(&mut self) {
        let links = &self.clause_hits;
        // clause hits by start, to find the links that continue a chain
        let mut by_start: Vec<usize> = (0..links.len()).collect();
        by_start.sort_by_key(|&i| links.span(i).start);

        // state: (start, end, links used capped at min)
        let mut seen: HashSet<(u32, u32, u32)> = HashSet::new();
        let mut queue: VecDeque<(Span, u32, Vec<Option<Span>>)> = VecDeque::new();
        for i in 0..links.len() {
            let span = links.span(i);
            if seen.insert((span.start, span.end, 1)) {
                queue.push_back((span, 1, links.captures_of(i).to_vec()));
            }
        }

        while let Some((span, count, captures)) = queue.pop_front() {
            if count >= self.min {
                self.hits.push(span, &captures);
            }
            let from = by_start.partition_point(|&i| links.span(i).start < span.end);
            for &i in by_start[from..].iter().take_while(|&&i| links.span(i).start == span.end) {
                let next = Span::new(span.start, links.span(i).end);
                let next_count = (count + 1).min(self.min);
                if seen.insert((next.start, next.end, next_count)) {
                    let mut next_captures = captures.clone();
                    overlay_captures(&mut next_captures, links.captures_of(i));
                    queue.push_back((next, next_count, next_captures));
                }
            }
        }
        self.hits.sort(SortOrder::StartPoint, true);
    }
}

impl Cursor for RepetitionCursor<'_> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spans::testing::{collect_hits, spans_in, ListCursor};

    #[test]
    fn test_one_or_more() {
        let clause = ListCursor::boxed(&[(0, &[(0, 1), (1, 2), (3, 4)])]);
        let mut cursor = RepetitionCursor::new(clause, 1, 0).unwrap();
        let hits = collect_hits(&mut cursor);
        assert_eq!(spans_in(&hits, 0), vec![(0, 1), (0, 2), (1, 2), (3, 4)]);
    }

    #[test]
    fn test_minimum_chain_length() {
        let clause = ListCursor::boxed(&[(0, &[(0, 1), (1, 2), (2, 3)]), (1, &[(0, 1), (2, 3)])]);
        let mut cursor = RepetitionCursor::new(clause, 2, 0).unwrap();
        let hits = collect_hits(&mut cursor);
        assert_eq!(spans_in(&hits, 0), vec![(0, 2), (0, 3), (1, 3)]);
        // no two adjacent hits in doc 1
        assert!(spans_in(&hits, 1).is_empty());
    }

    #[test]
    fn test_variable_length_links_deduplicate() {
        // (0,2) can be reached as 0-1-2 or directly
        let clause = ListCursor::boxed(&[(0, &[(0, 1), (0, 2), (1, 2)])]);
        let mut cursor = RepetitionCursor::new(clause, 1, 0).unwrap();
        assert_eq!(collect_hits(&mut cursor), vec![(0, 0, 1), (0, 0, 2), (0, 1, 2)]);
    }
}
