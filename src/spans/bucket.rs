//! Buckets: hits gathered per document or per start point, each with the
//! capture snapshot taken when it was gathered.

use std::cmp::Ordering;

use crate::index::DocId;
use crate::spans::{overlay_captures, BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::{SortOrder, Span};

/// A list of hits with one capture snapshot per hit, iterable as the current
/// document's hits of a cursor
#[derive(Debug, Clone)]
pub struct HitQueue {
    spans: Vec<Span>,
    captures: Vec<Option<Span>>,
    width: usize,
    /// Index of the current hit; `None` before the first
    current: Option<usize>,
}

impl HitQueue {
    pub fn new(capture_count: usize) -> Self {
        Self { spans: Vec::new(), captures: Vec::new(), width: capture_count, current: None }
    }

    pub fn clear(&mut self) {
        self.spans.clear();
        self.captures.clear();
        self.current = None;
    }

    pub fn push(&mut self, span: Span, captures: &[Option<Span>]) {
        self.spans.push(span);
        let at = self.captures.len();
        self.captures.resize(at + self.width, None);
        let n = captures.len().min(self.width);
        self.captures[at..at + n].copy_from_slice(&captures[..n]);
    }

    /// Gather the remaining hits of the source's current document
    pub fn fill_from<C: Cursor + ?Sized>(&mut self, source: &mut C) -> CursorResult<()> {
        let mut scratch = vec![None; self.width];
        while source.next_start_position()? != NO_MORE_POSITIONS {
            scratch.iter_mut().for_each(|c| *c = None);
            source.collect_captures(&mut scratch);
            self.push(source.span(), &scratch);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn span(&self, i: usize) -> Span {
        self.spans[i]
    }

    pub fn captures_of(&self, i: usize) -> &[Option<Span>] {
        &self.captures[i * self.width..(i + 1) * self.width]
    }

    /// Sort by the given order, optionally dropping hits equal to their predecessor
    pub fn sort(&mut self, order: SortOrder, dedup: bool) {
        let mut idx: Vec<usize> = (0..self.spans.len()).collect();
        let spans = &self.spans;
        idx.sort_by(|&a, &b| compare(order, spans[a], spans[b]));
        if dedup {
            idx.dedup_by(|b, a| spans[*a] == spans[*b]);
        }
        let sorted_spans = idx.iter().map(|&i| self.spans[i]).collect();
        let mut sorted_caps = Vec::with_capacity(idx.len() * self.width);
        for &i in &idx {
            sorted_caps.extend_from_slice(&self.captures[i * self.width..(i + 1) * self.width]);
        }
        self.spans = sorted_spans;
        self.captures = sorted_caps;
        self.current = None;
    }

    /// Move to the next hit, returning its start
    pub fn next(&mut self) -> u32 {
        let next = self.current.map_or(0, |i| i + 1);
        self.current = Some(next.min(self.spans.len()));
        self.spans.get(next).map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    pub fn start(&self) -> u32 {
        self.current.and_then(|i| self.spans.get(i)).map_or(NO_MORE_POSITIONS, |s| s.start)
    }

    pub fn end(&self) -> u32 {
        self.current.and_then(|i| self.spans.get(i)).map_or(NO_MORE_POSITIONS, |s| s.end)
    }

    pub fn collect_captures(&self, out: &mut [Option<Span>]) {
        if let Some(i) = self.current.filter(|&i| i < self.spans.len()) {
            overlay_captures(out, self.captures_of(i));
        }
    }
}

pub fn compare(order: SortOrder, a: Span, b: Span) -> Ordering {
    match order {
        SortOrder::StartPoint => a.cmp(&b),
        SortOrder::EndPoint => (a.end, a.start).cmp(&(b.end, b.start)),
    }
}

/// All hits of the source's current document
pub struct DocBucket<'a> {
    source: BoxCursor<'a>,
    hits: HitQueue,
}

impl<'a> DocBucket<'a> {
    pub fn new(source: BoxCursor<'a>, capture_count: usize) -> CursorResult<Self> {
        let mut bucket = Self { source, hits: HitQueue::new(capture_count) };
        bucket.fill()?;
        Ok(bucket)
    }

    fn fill(&mut self) -> CursorResult<()> {
        self.hits.clear();
        if self.source.doc() != NO_MORE_DOCS {
            self.hits.fill_from(self.source.as_mut())?;
        }
        Ok(())
    }

    pub fn doc(&self) -> DocId {
        self.source.doc()
    }

    pub fn advance(&mut self) -> CursorResult<DocId> {
        let doc = self.source.advance()?;
        self.fill()?;
        Ok(doc)
    }

    pub fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.source.doc() >= target {
            return Ok(self.source.doc());
        }
        let doc = self.source.seek(target)?;
        self.fill()?;
        Ok(doc)
    }

    pub fn hits(&self) -> &HitQueue {
        &self.hits
    }

    pub fn hits_mut(&mut self) -> &mut HitQueue {
        &mut self.hits
    }
}

/// Hits of a start-sorted source grouped by start position
///
/// The source is always one hit ahead: its current hit is the first hit of
/// the next bucket.
pub struct StartBucket<'a> {
    source: BoxCursor<'a>,
    hits: HitQueue,
    bucket_start: u32,
    /// Start of the source's current (not yet gathered) hit
    source_start: u32,
}

impl<'a> StartBucket<'a> {
    pub fn new(source: BoxCursor<'a>, capture_count: usize) -> CursorResult<Self> {
        let mut bucket = Self {
            source,
            hits: HitQueue::new(capture_count),
            bucket_start: NO_MORE_POSITIONS,
            source_start: NO_MORE_POSITIONS,
        };
        bucket.prime()?;
        Ok(bucket)
    }

    fn prime(&mut self) -> CursorResult<()> {
        self.hits.clear();
        self.bucket_start = NO_MORE_POSITIONS;
        self.source_start = if self.source.doc() == NO_MORE_DOCS {
            NO_MORE_POSITIONS
        } else {
            self.source.next_start_position()?
        };
        Ok(())
    }

    pub fn doc(&self) -> DocId {
        self.source.doc()
    }

    pub fn advance(&mut self) -> CursorResult<DocId> {
        let doc = self.source.advance()?;
        self.prime()?;
        Ok(doc)
    }

    pub fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.source.doc() >= target {
            return Ok(self.source.doc());
        }
        let doc = self.source.seek(target)?;
        self.prime()?;
        Ok(doc)
    }

    /// Gather the next bucket, returning its start (or [`NO_MORE_POSITIONS`])
    pub fn next_bucket(&mut self) -> CursorResult<u32> {
        self.hits.clear();
        self.bucket_start = self.source_start;
        if self.bucket_start == NO_MORE_POSITIONS {
            return Ok(NO_MORE_POSITIONS);
        }
        let mut scratch = vec![None; self.hits.width];
        while self.source_start == self.bucket_start {
            scratch.iter_mut().for_each(|c| *c = None);
            self.source.collect_captures(&mut scratch);
            self.hits.push(self.source.span(), &scratch);
            self.source_start = self.source.next_start_position()?;
        }
        Ok(self.bucket_start)
    }

    /// Gather the first remaining bucket starting at or after `target`
    pub fn advance_bucket(&mut self, target: u32) -> CursorResult<u32> {
        if self.source_start < target {
            self.source_start = self.source.advance_start_position(target)?;
        }
        self.next_bucket()
    }

    pub fn bucket_start(&self) -> u32 {
        self.bucket_start
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn end(&self, i: usize) -> u32 {
        self.hits.span(i).end
    }

    pub fn collect_captures(&self, i: usize, out: &mut [Option<Span>]) {
        overlay_captures(out, self.hits.captures_of(i));
    }
}
