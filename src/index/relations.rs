//! Relation postings
//!
//! A relation is stored as a zero-width posting at [`Relation::indexed_at`]
//! under a term that carries its type and shape: the target offset from the
//! source start (or `^` for a root relation) and the source and target
//! lengths. Both index backends keep these terms in the tag field, so a
//! relation type is read as the union of its per-shape terms.

use std::collections::BinaryHeap;

use crate::engine::constants::{RELATION_PREFIX, RELATION_SEPARATOR, ROOT_RELATION_OFFSET};
use crate::error::IndexError;
use crate::index::postings::HeapEntry;
use crate::index::{DocId, Postings, NO_MORE_DOCS};
use crate::types::{Relation, Span};

/// Per-document relation stream of one relation type
pub trait RelationPostings {
    fn doc(&self) -> DocId;

    /// Move to the next document, returning it (or [`NO_MORE_DOCS`])
    fn advance(&mut self) -> DocId;

    /// Move to the first document `>= target`. Never moves backwards.
    fn seek(&mut self, target: DocId) -> DocId {
        let mut doc = self.doc();
        while doc < target {
            doc = self.advance();
        }
        doc
    }

    /// Replace `out` with the relations of the current document, sorted and deduplicated
    fn read_relations(&mut self, out: &mut Vec<Relation>) -> Result<(), IndexError>;
}

/// Relation geometry relative to the indexed position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationShape {
    /// Target start minus source start; `None` for a root relation
    pub offset: Option<i64>,
    pub source_len: u32,
    pub target_len: u32,
}

impl RelationShape {
    pub fn of(relation: &Relation) -> Self {
        match relation.source {
            Some(source) => Self {
                offset: Some(i64::from(relation.target.start) - i64::from(source.start)),
                source_len: source.length(),
                target_len: relation.target.length(),
            },
            None => Self { offset: None, source_len: 0, target_len: relation.target.length() },
        }
    }

    /// The relation stored at `position`; `None` when the target would start before the document
    pub fn at(&self, position: u32) -> Option<Relation> {
        let Some(offset) = self.offset else {
            return Some(Relation::root(Span::new(position, position + self.target_len)));
        };
        let target_start = u32::try_from(i64::from(position) + offset).ok()?;
        Some(Relation::new(
            Span::new(position, position + self.source_len),
            Span::new(target_start, target_start + self.target_len),
        ))
    }
}

/// Term stored for one relation in the tag field
pub fn relation_term(rel_type: &str, relation: &Relation) -> String {
    let shape = RelationShape::of(relation);
    let offset = shape.offset.map_or_else(|| ROOT_RELATION_OFFSET.to_string(), |o| o.to_string());
    format!(
        "{}{}{sep}{}{sep}{}{sep}{}",
        RELATION_PREFIX,
        rel_type,
        offset,
        shape.source_len,
        shape.target_len,
        sep = RELATION_SEPARATOR
    )
}

/// Half-open key range `[lower, upper)` holding every term of a relation type
pub fn relation_term_range(rel_type: &str) -> (String, String) {
    // the separator is U+0001, so U+0002 bounds every shape of this type
    (
        format!("{}{}{}", RELATION_PREFIX, rel_type, RELATION_SEPARATOR),
        format!("{}{}\u{2}", RELATION_PREFIX, rel_type),
    )
}

/// Half-open key range holding every relation term of any type
pub fn relation_terms_range() -> (String, String) {
    let mut upper = RELATION_PREFIX.to_string();
    if let Some(last) = upper.pop() {
        upper.push(char::from_u32(last as u32 + 1).unwrap_or(char::MAX));
    }
    (RELATION_PREFIX.to_string(), upper)
}

/// Split a relation term into its type and shape
pub fn parse_relation_term(term: &str) -> Option<(&str, RelationShape)> {
    let rest = term.strip_prefix(RELATION_PREFIX)?;
    let mut parts = rest.split(RELATION_SEPARATOR);
    let rel_type = parts.next()?;
    let offset = match parts.next()? {
        ROOT_RELATION_OFFSET => None,
        o => Some(o.parse().ok()?),
    };
    let source_len = parts.next()?.parse().ok()?;
    let target_len = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((rel_type, RelationShape { offset, source_len, target_len }))
}

/// The relations of one term: every stored position becomes a relation of the term's shape
struct ShapedRelations<'a> {
    postings: Box<dyn Postings + 'a>,
    shape: RelationShape,
    positions: Vec<Span>,
}

impl ShapedRelations<'_> {
    fn read_into(&mut self, out: &mut Vec<Relation>) -> Result<(), IndexError> {
        self.postings.read_spans(&mut self.positions)?;
        for p in &self.positions {
            let relation = self.shape.at(p.start).ok_or_else(|| {
                IndexError::CorruptPostings(format!(
                    "relation stored at {} in doc {} points before the document",
                    p.start,
                    self.postings.doc()
                ))
            })?;
            out.push(relation);
        }
        Ok(())
    }
}

/// Union of the per-shape terms of one relation type
pub struct UnionRelations<'a> {
    terms: Vec<ShapedRelations<'a>>,
    heap: BinaryHeap<HeapEntry>,
    current_doc: DocId,
    merged: Vec<Relation>,
    error: Option<IndexError>,
}

impl<'a> UnionRelations<'a> {
    pub fn new(terms: Vec<(RelationShape, Box<dyn Postings + 'a>)>) -> Self {
        let terms: Vec<ShapedRelations<'a>> = terms
            .into_iter()
            .map(|(shape, postings)| ShapedRelations { postings, shape, positions: Vec::new() })
            .collect();
        let heap = terms
            .iter()
            .enumerate()
            .filter(|(_, t)| t.postings.doc() != NO_MORE_DOCS)
            .map(|(idx, t)| HeapEntry { doc: t.postings.doc(), idx })
            .collect();
        let mut union = Self { terms, heap, current_doc: NO_MORE_DOCS, merged: Vec::new(), error: None };
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
            let term = &mut self.terms[idx];
            if let Err(e) = term.read_into(&mut self.merged) {
                self.error.get_or_insert(e);
            }
            let next = term.postings.advance();
            if next != NO_MORE_DOCS {
                self.heap.push(HeapEntry { doc: next, idx });
            }
        }

        self.merged.sort_unstable();
        self.merged.dedup();
        self.current_doc
    }
}

impl RelationPostings for UnionRelations<'_> {
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
        for (idx, t) in self.terms.iter_mut().enumerate() {
            let doc = if t.postings.doc() < target { t.postings.seek(target) } else { t.postings.doc() };
            if doc != NO_MORE_DOCS {
                self.heap.push(HeapEntry { doc, idx });
            }
        }
        self.advance_to_next_doc()
    }

    fn read_relations(&mut self, out: &mut Vec<Relation>) -> Result<(), IndexError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        out.clear();
        out.extend_from_slice(&self.merged);
        Ok(())
    }
}

/// Relation stream over the per-shape terms of one type; `None` when there are none
pub fn union_relations<'a>(
    terms: Vec<(RelationShape, Box<dyn Postings + 'a>)>,
) -> Option<Box<dyn RelationPostings + 'a>> {
    if terms.is_empty() {
        return None;
    }
    Some(Box::new(UnionRelations::new(terms)))
}
