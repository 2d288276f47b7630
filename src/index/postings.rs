//! Generic postings streams shared by the index implementations

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::IndexError;
use crate::index::{DocId, Postings, NO_MORE_DOCS};
use crate::types::Span;

/// One document's entry in a postings list
pub type PostingEntry = (DocId, Vec<Span>);

/// Postings over an in-memory list of `(doc, spans)` entries sorted by doc
pub struct VecPostings<'a> {
    entries: Cow<'a, [PostingEntry]>,
    idx: usize,
}

impl<'a> VecPostings<'a> {
    pub fn new(entries: &'a [PostingEntry]) -> Self {
        Self { entries: Cow::Borrowed(entries), idx: 0 }
    }

    pub fn owned(mut entries: Vec<PostingEntry>) -> VecPostings<'static> {
        entries.sort_by_key(|(doc, _)| *doc);
        for (_, spans) in entries.iter_mut() {
            spans.sort();
        }
        VecPostings { entries: Cow::Owned(entries), idx: 0 }
    }
}

impl Postings for VecPostings<'_> {
    fn doc(&self) -> DocId {
        self.entries.get(self.idx).map_or(NO_MORE_DOCS, |(doc, _)| *doc)
    }

    fn advance(&mut self) -> DocId {
        if self.idx < self.entries.len() {
            self.idx += 1;
        }
        self.doc()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.doc() >= target {
            return self.doc();
        }
        let rest = &self.entries[self.idx..];
        self.idx += rest.partition_point(|(doc, _)| *doc < target);
        self.doc()
    }

    fn read_spans(&mut self, out: &mut Vec<Span>) -> Result<(), IndexError> {
        out.clear();
        if let Some((_, spans)) = self.entries.get(self.idx) {
            out.extend_from_slice(spans);
        }
        Ok(())
    }
}

/// Entry in the min-heap for k-way merge of postings
pub(crate) struct HeapEntry {
    pub(crate) doc: DocId,
    pub(crate) idx: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: smaller doc first
        other.doc.cmp(&self.doc).then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for HeapEntry {}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.doc == other.doc && self.idx == other.idx
    }
}

/// Union of several postings streams (the terms a regex expanded to, or the
/// per-length terms of one tag). Spans of a document are merged, sorted and
/// deduplicated when the stream lands on it.
pub struct UnionPostings<'a> {
    postings: Vec<Box<dyn Postings + 'a>>,
    heap: BinaryHeap<HeapEntry>,
    current_doc: DocId,
    merged: Vec<Span>,
    buf: Vec<Span>,
    error: Option<IndexError>,
}

impl<'a> UnionPostings<'a> {
    pub fn new(postings: Vec<Box<dyn Postings + 'a>>) -> Self {
        let heap = postings
            .iter()
            .enumerate()
            .filter(|(_, p)| p.doc() != NO_MORE_DOCS)
            .map(|(idx, p)| HeapEntry { doc: p.doc(), idx })
            .collect();
        let mut union = Self {
            postings,
            heap,
            current_doc: NO_MORE_DOCS,
            merged: Vec::with_capacity(32),
            buf: Vec::with_capacity(16),
            error: None,
        };
        union.advance_to_next_doc();
        union
    }

    fn advance_to_next_doc(&mut self) -> DocId {
        self.merged.clear();
        let Some(min_doc) = self.heap.peek().map(|e| e.doc) else {
            self.current_doc = NO_MORE_DOCS;
            return self.current_doc;
        };
        self.current_doc = min_doc;

        while let Some(entry) = self.heap.peek() {
            if entry.doc != min_doc {
                break;
            }
            let idx = entry.idx;
            self.heap.pop();
            let postings = &mut self.postings[idx];
            if let Err(e) = postings.read_spans(&mut self.buf) {
                // reported by the next read_spans call
                self.error.get_or_insert(e);
            }
            self.merged.extend_from_slice(&self.buf);
            let next = postings.advance();
            if next != NO_MORE_DOCS {
                self.heap.push(HeapEntry { doc: next, idx });
            }
        }

        self.merged.sort_unstable();
        self.merged.dedup();
        self.current_doc
    }
}

impl Postings for UnionPostings<'_> {
    fn doc(&self) -> DocId {
        self.current_doc
    }

    fn advance(&mut self) -> DocId {
        if self.current_doc == NO_MORE_DOCS {
            return NO_MORE_DOCS;
        }
        self.advance_to_next_doc()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.current_doc >= target {
            return self.current_doc;
        }
        self.heap.clear();
        for (idx, p) in self.postings.iter_mut().enumerate() {
            let doc = if p.doc() < target { p.seek(target) } else { p.doc() };
            if doc != NO_MORE_DOCS {
                self.heap.push(HeapEntry { doc, idx });
            }
        }
        self.advance_to_next_doc()
    }

    fn read_spans(&mut self, out: &mut Vec<Span>) -> Result<(), IndexError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        out.clear();
        out.extend_from_slice(&self.merged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(list: &[(u32, u32)]) -> Vec<Span> {
        list.iter().map(|&(s, e)| Span::new(s, e)).collect()
    }

    #[test]
    fn test_vec_postings_seek() {
        let mut p = VecPostings::owned(vec![(1, spans(&[(0, 1)])), (4, spans(&[(2, 3)])), (9, spans(&[(0, 1)]))]);
        assert_eq!(p.doc(), 1);
        assert_eq!(p.seek(1), 1);
        assert_eq!(p.seek(5), 9);
        assert_eq!(p.advance(), NO_MORE_DOCS);
        assert_eq!(p.advance(), NO_MORE_DOCS);
    }

    #[test]
    fn test_union_merges_documents() {
        let a = VecPostings::owned(vec![(1, spans(&[(3, 4)])), (5, spans(&[(0, 1)]))]);
        let b = VecPostings::owned(vec![(1, spans(&[(0, 1), (3, 4)])), (7, spans(&[(2, 3)]))]);
        let mut u = UnionPostings::new(vec![Box::new(a), Box::new(b)]);
        let mut out = Vec::new();
        assert_eq!(u.doc(), 1);
        u.read_spans(&mut out).unwrap();
        assert_eq!(out, spans(&[(0, 1), (3, 4)]));
        assert_eq!(u.seek(6), 7);
        u.read_spans(&mut out).unwrap();
        assert_eq!(out, spans(&[(2, 3)]));
        assert_eq!(u.advance(), NO_MORE_DOCS);
    }
}
