//! Intersection of start-sorted, unique clauses

use crate::index::DocId;
use crate::spans::bucket::{HitQueue, StartBucket};
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Hits present in every clause
///
/// Clauses are read through start-point buckets: at every start shared by
/// all clauses, the ends present in every bucket are kept.
pub struct AndCursor<'a> {
    clauses: Vec<StartBucket<'a>>,
    doc: DocId,
    hits: HitQueue,
    scratch: Vec<Option<Span>>,
}

impl<'a> AndCursor<'a> {
    pub fn new(clauses: Vec<BoxCursor<'a>>, capture_count: usize) -> CursorResult<Self> {
        let clauses = clauses
            .into_iter()
            .map(|c| StartBucket::new(c, capture_count))
            .collect::<CursorResult<Vec<_>>>()?;
        let mut cursor = Self {
            clauses,
            doc: NO_MORE_DOCS,
            hits: HitQueue::new(capture_count),
            scratch: vec![None; capture_count],
        };
        cursor.align(0)?;
        Ok(cursor)
    }

    /// Find the first document `>= target` that every clause shares and that has common hits
    fn align(&mut self, mut target: DocId) -> CursorResult<DocId> {
        self.hits.clear();
        self.doc = NO_MORE_DOCS;
        if self.clauses.is_empty() {
            return Ok(NO_MORE_DOCS);
        }
        loop {
            let mut agreed = true;
            for clause in self.clauses.iter_mut() {
                let doc = clause.seek(target)?;
                if doc == NO_MORE_DOCS {
                    return Ok(NO_MORE_DOCS);
                }
                if doc > target {
                    target = doc;
                    agreed = false;
                }
            }
            if !agreed {
                continue;
            }
            self.intersect()?;
            if !self.hits.is_empty() {
                self.doc = target;
                return Ok(target);
            }
            target += 1;
        }
    }

    /// Gather the common hits of the current document
    fn intersect(&mut self) -> CursorResult<()> {
        self.hits.clear();
        let mut start = 0;
        for clause in self.clauses.iter_mut() {
            start = start.max(clause.next_bucket()?);
        }
        while start != NO_MORE_POSITIONS {
            let mut agreed = true;
            for clause in self.clauses.iter_mut() {
                if clause.bucket_start() < start {
                    clause.advance_bucket(start)?;
                }
                if clause.bucket_start() != start {
                    start = start.max(clause.bucket_start());
                    agreed = false;
                }
            }
            if !agreed {
                continue;
            }
            self.collect_common(start);
            start = 0;
            for clause in self.clauses.iter_mut() {
                start = start.max(clause.next_bucket()?);
            }
        }
        Ok(())
    }

    fn collect_common(&mut self, start: u32) {
        let (first, rest) = self.clauses.split_at(1);
        for i in 0..first[0].len() {
            let end = first[0].end(i);
            let members: Option<Vec<usize>> = rest.iter().map(|c| (0..c.len()).find(|&j| c.end(j) == end)).collect();
            let Some(members) = members else {
                continue;
            };
            self.scratch.iter_mut().for_each(|c| *c = None);
            first[0].collect_captures(i, &mut self.scratch);
            for (clause, &j) in rest.iter().zip(&members) {
                clause.collect_captures(j, &mut self.scratch);
            }
            self.hits.push(Span::new(start, end), &self.scratch);
        }
    }
}

impl Cursor for AndCursor<'_> {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        self.align(self.doc + 1)
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.doc >= target {
            return Ok(self.doc);
        }
        self.align(target)
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

    #[test]
    fn test_common_hits_only() {
        let a = ListCursor::boxed(&[(0, &[(0, 1), (0, 2), (3, 4)]), (1, &[(0, 1)]), (2, &[(1, 3)])]);
        let b = ListCursor::boxed(&[(0, &[(0, 2), (2, 3), (3, 4)]), (2, &[(1, 2)]), (3, &[(0, 1)])]);
        let mut cursor = AndCursor::new(vec![a, b], 0).unwrap();
        let hits = collect_hits(&mut cursor);
        assert_eq!(spans_in(&hits, 0), vec![(0, 2), (3, 4)]);
        // doc 2 is shared but has no common hit
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_captures_from_every_clause() {
        let a = Box::new(CaptureCursor::new(ListCursor::boxed(&[(0, &[(1, 2)])]), 0, 2).unwrap());
        let b = Box::new(CaptureCursor::new(ListCursor::boxed(&[(0, &[(0, 1), (1, 2)])]), 1, 2).unwrap());
        let mut cursor = AndCursor::new(vec![a, b], 2).unwrap();
        let hits = collect_with_captures(&mut cursor, 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].2, vec![Some(Span::new(1, 2)), Some(Span::new(1, 2))]);
    }
}
