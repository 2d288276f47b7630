//! Cross-capture constraints

use crate::index::DocId;
use crate::pattern::ConstraintExpr;
use crate::spans::{BoxCursor, Cursor, CursorResult, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::types::Span;

/// Keeps the clause hits whose captures satisfy a constraint expression
pub struct ConstraintCursor<'a> {
    clause: BoxCursor<'a>,
    expr: ConstraintExpr<usize>,
    scratch: Vec<Option<Span>>,
    already_at_first: bool,
}

impl<'a> ConstraintCursor<'a> {
    pub fn new(clause: BoxCursor<'a>, expr: ConstraintExpr<usize>, capture_count: usize) -> CursorResult<Self> {
        let mut cursor = Self { clause, expr, scratch: vec![None; capture_count], already_at_first: false };
        cursor.land()?;
        Ok(cursor)
    }

    fn land(&mut self) -> CursorResult<DocId> {
        loop {
            let doc = self.clause.doc();
            self.already_at_first = false;
            if doc == NO_MORE_DOCS {
                return Ok(doc);
            }
            if self.find_next()? != NO_MORE_POSITIONS {
                self.already_at_first = true;
                return Ok(doc);
            }
            self.clause.advance()?;
        }
    }

    fn find_next(&mut self) -> CursorResult<u32> {
        loop {
            let start = self.clause.next_start_position()?;
            if start == NO_MORE_POSITIONS {
                return Ok(start);
            }
            self.scratch.iter_mut().for_each(|c| *c = None);
            self.clause.collect_captures(&mut self.scratch);
            if self.expr.evaluate(&self.scratch) {
                return Ok(start);
            }
        }
    }
}

impl Cursor for ConstraintCursor<'_> {
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
        if self.already_at_first {
            self.already_at_first = false;
            return Ok(self.clause.start_position());
        }
        self.find_next()
    }

    fn start_position(&self) -> u32 {
        self.clause.start_position()
    }

    fn end_position(&self) -> u32 {
        self.clause.end_position()
    }

    fn collect_captures(&self, captures: &mut [Option<Span>]) {
        self.clause.collect_captures(captures)
    }
}
