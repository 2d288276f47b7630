use serde::{Deserialize, Serialize};

use crate::types::Span;

/// A directed relation between two token intervals of one document.
///
/// A relation without a source is a root relation: it marks its target as
/// the root of a structure (e.g. the head of a dependency tree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub source: Option<Span>,
    pub target: Span,
}

/// Which interval a relation hit reports as its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationSpanMode {
    Source,
    Target,
    /// From the leftmost to the rightmost edge of source and target
    Full,
}

impl Relation {
    pub fn new(source: Span, target: Span) -> Self {
        Self { source: Some(source), target }
    }

    pub fn root(target: Span) -> Self {
        Self { source: None, target }
    }

    pub fn is_root(&self) -> bool {
        self.source.is_none()
    }

    /// Position the relation is stored at: its source start, or its target start for a root
    pub fn indexed_at(&self) -> u32 {
        self.source.map_or(self.target.start, |s| s.start)
    }

    pub fn full_span(&self) -> Span {
        match self.source {
            Some(s) => Span::new(s.start.min(self.target.start), s.end.max(self.target.end)),
            None => self.target,
        }
    }

    /// The reported interval; `None` for the source of a root relation
    pub fn span(&self, mode: RelationSpanMode) -> Option<Span> {
        match mode {
            RelationSpanMode::Source => self.source,
            RelationSpanMode::Target => Some(self.target),
            RelationSpanMode::Full => Some(self.full_span()),
        }
    }
}
