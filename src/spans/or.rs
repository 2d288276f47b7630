//! Union of start-sorted clauses

use crate::index::DocId;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Start-sorted merge of start-sorted clauses
///
/// Ties on `(start, end)` go to the clause listed first. Duplicates across
/// clauses are kept.
pub struct OrCursor<'a> {
    clauses: Vec<BoxCursor<'a>>,
    /// Start of each clause's pending hit in the current document
    heads: Vec<u32>,
    doc: DocId,
    current: Option<usize>,
}

impl<'a> OrCursor<'a> {
    pub fn new(clauses: Vec<BoxCursor<'a>>) -> CursorResult<Self> {
        let heads = vec![NO_MORE_POSITIONS; clauses.len()];
        let mut cursor = Self { clauses, heads, doc: NO_MORE_DOCS, current: None };
        cursor.land()?;
        Ok(cursor)
    }

    /// Move to the smallest clause document and read every head there
    fn land(&mut self) -> CursorResult<DocId> {
        self.doc = self.clauses.iter().map(|c| c.doc()).min().unwrap_or(NO_MORE_DOCS);
        self.current = None;
        for (clause, head) in self.clauses.iter_mut().zip(self.heads.iter_mut()) {
            *head = if self.doc != NO_MORE_DOCS && clause.doc() == self.doc {
                clause.next_start_position()?
            } else {
                NO_MORE_POSITIONS
            };
        }
        Ok(self.doc)
    }
}

impl Cursor for OrCursor<'_> {
    fn doc(&self) -> DocId {
        self.doc
    }

    fn advance(&mut self) -> CursorResult<DocId> {
        if self.doc == NO_MORE_DOCS {
            return Ok(NO_MORE_DOCS);
        }
        for clause in self.clauses.iter_mut().filter(|c| c.doc() == self.doc) {
            clause.advance()?;
        }
        self.land()
    }

    fn seek(&mut self, target: DocId) -> CursorResult<DocId> {
        if self.doc >= target {
            return Ok(self.doc);
        }
        for clause in self.clauses.iter_mut() {
            if clause.doc() < target {
                clause.seek(target)?;
            }
        }
        self.land()
    }

    fn next_start_position(&mut self) -> CursorResult<u32> {
        if let Some(i) = self.current {
            self.heads[i] = self.clauses[i].next_start_position()?;
        }
        let mut best: Option<(u32, u32, usize)> = None;
        for (i, &head) in self.heads.iter().enumerate() {
            if head == NO_MORE_POSITIONS {
                continue;
            }
            let key = (head, self.clauses[i].end_position(), i);
            if best.map_or(true, |b| key < b) {
                best = Some(key);
            }
        }
        self.current = best.map(|(_, _, i)| i);
        Ok(best.map_or(NO_MORE_POSITIONS, |(start, _, _)| start))
    }

    fn start_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |i| self.clauses[i].start_position())
    }

    fn end_position(&self) -> u32 {
        self.current.map_or(NO_MORE_POSITIONS, |i| self.clauses[i].end_position())
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        if let Some(i) = self.current {
            self.clauses[i].collect_captures(captures);
        }
    }
}
