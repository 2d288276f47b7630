//! Query execution for SearchEngine: rewrite, compile, then drain one cursor
//! tree per segment

use crate::compiler::{compile, CompileOptions, CompiledQuery};
use crate::engine::core::SearchEngine;
use crate::error::{IndexError, Result};
use crate::index::{PositionalIndex, SegmentIndex, NO_MORE_DOCS, NO_MORE_POSITIONS};
use crate::pattern::Pattern;
use crate::results::{Hit, HitList};
use crate::rewrite::rewrite_with_budget;
use crate::spans::{BoxCursor, CursorResult};
use rayon::prelude::*;

impl<I: PositionalIndex> SearchEngine<I> {
    /// Rewrite and compile a pattern into an executable plan
    pub fn prepare(&self, pattern: &Pattern) -> Result<CompiledQuery> {
        let rewritten = rewrite_with_budget(pattern, self.config.max_rewrite_passes)?;
        log::debug!("Rewritten pattern: {}", rewritten);
        Ok(compile(&rewritten, &CompileOptions::from(&self.config))?)
    }

    /// Every hit of `pattern` in the index
    pub fn search(&self, pattern: &Pattern) -> Result<HitList> {
        let query = self.prepare(pattern)?;
        self.execute(&query)
    }

    /// Run a compiled plan over all segments; hits come back in segment order
    pub fn execute(&self, query: &CompiledQuery) -> Result<HitList> {
        let num_segments = self.index.num_segments();
        let per_segment: Vec<std::result::Result<Vec<Hit>, IndexError>> = if self.config.parallel {
            (0..num_segments).into_par_iter().map(|ord| self.search_segment(query, ord)).collect()
        } else {
            (0..num_segments).map(|ord| self.search_segment(query, ord)).collect()
        };

        let mut hits = Vec::new();
        for segment_hits in per_segment {
            hits.extend(segment_hits?);
        }
        log::info!("Found {} hits in {} segments", hits.len(), num_segments);
        Ok(HitList::new(query.captures().names().to_vec(), hits))
    }

    fn search_segment(&self, query: &CompiledQuery, ord: usize) -> std::result::Result<Vec<Hit>, IndexError> {
        let segment = self.index.segment(ord)?;
        let hits = HitStream::new(query, segment.as_ref(), ord)?.collect::<CursorResult<Vec<_>>>()?;
        log::trace!("Segment {}: {} hits", ord, hits.len());
        Ok(hits)
    }
}

/// Pull iterator over the hits of a plan in one segment
///
/// Stops after the first error.
pub struct HitStream<'a> {
    cursor: Option<BoxCursor<'a>>,
    segment: usize,
    capture_count: usize,
}

impl<'a> HitStream<'a> {
    pub fn new(query: &CompiledQuery, segment: &'a dyn SegmentIndex, ord: usize) -> CursorResult<Self> {
        Ok(Self {
            cursor: query.create_cursor(segment)?,
            segment: ord,
            capture_count: query.captures().len(),
        })
    }

    fn pull(&mut self) -> CursorResult<Option<Hit>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        while cursor.doc() != NO_MORE_DOCS {
            if cursor.next_start_position()? != NO_MORE_POSITIONS {
                let mut captures = vec![None; self.capture_count];
                cursor.collect_captures(&mut captures);
                return Ok(Some(Hit { segment: self.segment, doc: cursor.doc(), span: cursor.span(), captures }));
            }
            cursor.advance()?;
        }
        Ok(None)
    }
}

impl Iterator for HitStream<'_> {
    type Item = CursorResult<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.pull() {
            Ok(Some(hit)) => Some(Ok(hit)),
            Ok(None) => {
                self.cursor = None;
                None
            }
            Err(e) => {
                self.cursor = None;
                Some(Err(e))
            }
        }
    }
}
