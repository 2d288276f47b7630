//! Cursor fixtures shared by the cursor tests

use crate::index::DocId;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Cursor over a fixed hit list, emitted in the given order
pub(crate) struct ListCursor {
    docs: Vec<(DocId, Vec<Span>)>,
    doc_idx: usize,
    hit_idx: Option<usize>,
}

impl ListCursor {
    pub(crate) fn new(list: &[(DocId, &[(u32, u32)])]) -> Self {
        let docs = list
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(doc, hits)| (*doc, hits.iter().map(|&(s, e)| Span::new(s, e)).collect()))
            .collect();
        Self { docs, doc_idx: 0, hit_idx: None }
    }

    pub(crate) fn boxed(list: &[(DocId, &[(u32, u32)])]) -> BoxCursor<'static> {
        Box::new(Self::new(list))
    }

    fn current(&self) -> Option<Span> {
        let (_, hits) = self.docs.get(self.doc_idx)?;
        hits.get(self.hit_idx?).copied()
    }
}

impl Cursor for ListCursor {
    fn doc(&self) -> DocId {
        self.docs.get(self.doc_idx).map_or(NO_MORE_DOCS, |(d, _)| *d)
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc_idx < self.docs.len() {
            self.doc_idx += 1;
        }
        self.hit_idx = None;
        Ok(self.doc())
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        let len = self.docs.get(self.doc_idx).map_or(0, |(_, h)| h.len());
        let next = self.hit_idx.map_or(0, |i| i + 1).min(len);
        self.hit_idx = Some(next);
        Ok(self.current().map_or(NO_MORE_POSITIONS, |s| s.start))
    }

    fn start_position(&self) -> u32 {
        self.current().map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    fn end_position(&self) -> u32 {
        self.current().map_or(NO_MORE_POSITIONS, |s| s.end)
    }
}

/// Drain a cursor into `(doc, start, end)` triples
pub(crate) fn collect_hits<C: Cursor + ?Sized>(cursor: &mut C) -> Vec<(DocId, u32, u32)> {
    let mut hits = Vec::new();
    while cursor.doc() != NO_MORE_DOCS {
        while cursor.next_start_position().unwrap() != NO_MORE_POSITIONS {
            hits.push((cursor.doc(), cursor.start_position(), cursor.end_position()));
        }
        cursor.advance().unwrap();
    }
    hits
}

/// Drain a cursor, keeping each hit's capture snapshot
pub(crate) fn collect_with_captures<C: Cursor + ?Sized>(
    cursor: &mut C,
    capture_count: usize,
) -> Vec<(DocId, Span, Vec<Option<Span>>)> {
    let mut hits = Vec::new();
    while cursor.doc() != NO_MORE_DOCS {
        while cursor.next_start_position().unwrap() != NO_MORE_POSITIONS {
            let mut captures = vec![None; capture_count];
            cursor.collect_captures(&mut captures);
            hits.push((cursor.doc(), cursor.span(), captures));
        }
        cursor.advance().unwrap();
    }
    hits
}

/// Triples of one document, for compact assertions
pub(crate) fn spans_in(hits: &[(DocId, u32, u32)], doc: DocId) -> Vec<(u32, u32)> {
    hits.iter().filter(|h| h.0 == doc).map(|h| (h.1, h.2)).collect()
}
