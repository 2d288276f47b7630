//! In-memory positional index
//!
//! Built from [`Document`]s with [`MemoryIndexBuilder`]. Every token field is
//! stored twice: as-is for sensitive lookups and case-folded under the
//! insensitive alternative name (`word_i`). Tags are stored as element spans,
//! attributes as zero-width spans at the element start, and relations under
//! their shaped terms as zero-width spans at the position they are indexed at.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::document::Document;
use crate::engine::constants::INSENSITIVE_SUFFIX;
use crate::error::IndexError;
use crate::index::postings::{PostingEntry, VecPostings};
use crate::index::relations::{relation_term_range, union_relations};
use crate::index::{
    attribute_term, fold_case, parse_relation_term, relation_term, DocId, PositionalIndex, Postings,
    RelationPostings, SegmentIndex, TermMatcher,
};
use crate::pattern::Sensitivity;
use crate::types::Span;

type PostingMap = BTreeMap<String, Vec<PostingEntry>>;

/// One segment of a [`MemoryIndex`]
#[derive(Debug, Clone, Default)]
pub struct MemorySegment {
    documents: Vec<Document>,
    lengths: Vec<u32>,
    alive: Vec<bool>,
    closing_positions: u32,
    insensitive_suffix: String,
    known_fields: BTreeSet<String>,
    fields: BTreeMap<String, PostingMap>,
    tags: PostingMap,
    attributes: PostingMap,
    relations: PostingMap,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    segments: Vec<MemorySegment>,
}

/// Builder for [`MemoryIndex`]; documents go to the current segment
pub struct MemoryIndexBuilder {
    segments: Vec<MemorySegment>,
    current: MemorySegment,
    closing_positions: u32,
    insensitive_suffix: String,
}

fn push_span(list: &mut Vec<PostingEntry>, doc: DocId, span: Span) {
    match list.last_mut() {
        Some((last, spans)) if *last == doc => spans.push(span),
        _ => list.push((doc, vec![span])),
    }
}

impl MemoryIndexBuilder {
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            current: MemorySegment::default(),
            closing_positions: 0,
            insensitive_suffix: INSENSITIVE_SUFFIX.to_string(),
        }
    }

    /// Store this many extra closing positions after every document
    pub fn closing_positions(mut self, closing_positions: u32) -> Self {
        self.closing_positions = closing_positions;
        self
    }

    pub fn insensitive_suffix(mut self, suffix: &str) -> Self {
        self.insensitive_suffix = suffix.to_string();
        self
    }

    /// Add a document to the current segment and return its segment-local id
    pub fn add_document(&mut self, doc: &Document) -> DocId {
        let seg = &mut self.current;
        let id = seg.documents.len() as DocId;

        for field in &doc.fields {
            let insensitive = format!("{}{}", field.name, self.insensitive_suffix);
            for (pos, token) in field.tokens.iter().enumerate() {
                let span = Span::new(pos as u32, pos as u32 + 1);
                let exact = seg.fields.entry(field.name.clone()).or_default();
                push_span(exact.entry(token.clone()).or_default(), id, span);
                let folded = seg.fields.entry(insensitive.clone()).or_default();
                push_span(folded.entry(fold_case(token)).or_default(), id, span);
            }
        }

        let mut tags: PostingMap = BTreeMap::new();
        let mut attributes: PostingMap = BTreeMap::new();
        for tag in &doc.tags {
            push_span(tags.entry(tag.name.clone()).or_default(), id, Span::new(tag.start, tag.end));
            for (k, v) in &tag.attrs {
                push_span(
                    attributes.entry(attribute_term(k, v)).or_default(),
                    id,
                    Span::new(tag.start, tag.start),
                );
            }
        }
        let mut relations: PostingMap = BTreeMap::new();
        for entry in &doc.relations {
            let relation = entry.relation();
            let at = relation.indexed_at();
            push_span(
                relations.entry(relation_term(&entry.rel_type, &relation)).or_default(),
                id,
                Span::new(at, at),
            );
        }
        for (target, per_doc) in [
            (&mut seg.tags, tags),
            (&mut seg.attributes, attributes),
            (&mut seg.relations, relations),
        ] {
            for (key, mut entries) in per_doc {
                for (_, spans) in entries.iter_mut() {
                    spans.sort();
                    spans.dedup();
                }
                target.entry(key).or_default().append(&mut entries);
            }
        }

        seg.lengths.push(doc.num_tokens() + self.closing_positions);
        seg.alive.push(true);
        seg.documents.push(doc.clone());
        id
    }

    pub fn add_documents<'d>(&mut self, docs: impl IntoIterator<Item = &'d Document>) {
        for doc in docs {
            self.add_document(doc);
        }
    }

    /// Mark a document of the current segment as deleted
    pub fn delete_document(&mut self, doc: DocId) {
        if let Some(alive) = self.current.alive.get_mut(doc as usize) {
            *alive = false;
        }
    }

    /// Close the current segment; later documents go to a new one
    pub fn commit_segment(&mut self) {
        if !self.current.documents.is_empty() {
            self.segments.push(std::mem::take(&mut self.current));
        }
    }

    pub fn build(mut self) -> MemoryIndex {
        self.commit_segment();
        let mut known_fields = BTreeSet::new();
        for seg in &self.segments {
            known_fields.extend(seg.fields.keys().cloned());
        }
        for seg in self.segments.iter_mut() {
            seg.closing_positions = self.closing_positions;
            seg.insensitive_suffix = self.insensitive_suffix.clone();
            seg.known_fields = known_fields.clone();
        }
        log::debug!(
            "Built in-memory index: {} segments, {} documents",
            self.segments.len(),
            self.segments.iter().map(|s| s.documents.len()).sum::<usize>()
        );
        MemoryIndex { segments: self.segments }
    }
}

impl Default for MemoryIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIndex {
    pub fn builder() -> MemoryIndexBuilder {
        MemoryIndexBuilder::new()
    }

    /// Single-segment index over the given documents
    pub fn from_documents(docs: &[Document]) -> Self {
        let mut builder = MemoryIndexBuilder::new();
        builder.add_documents(docs);
        builder.build()
    }

    pub fn segments(&self) -> &[MemorySegment] {
        &self.segments
    }

    pub fn document(&self, segment: usize, doc: DocId) -> Option<&Document> {
        self.segments.get(segment)?.documents.get(doc as usize)
    }
}

impl MemorySegment {
    pub fn num_docs(&self) -> usize {
        self.documents.len()
    }

    fn lookup_field(&self, field: &str, sensitivity: Sensitivity) -> Result<Option<&PostingMap>, IndexError> {
        let name = match sensitivity {
            Sensitivity::Sensitive => field.to_string(),
            _ => format!("{}{}", field, self.insensitive_suffix),
        };
        if !self.known_fields.contains(&name) {
            if self.known_fields.contains(field) {
                return Err(IndexError::UnknownAlternative {
                    field: field.to_string(),
                    alternative: "insensitive".to_string(),
                });
            }
            return Err(IndexError::UnknownField(field.to_string()));
        }
        Ok(self.fields.get(&name))
    }
}

fn postings_of<'a>(map: &'a PostingMap, key: &str) -> Option<Box<dyn Postings + 'a>> {
    map.get(key)
        .map(|entries| Box::new(VecPostings::new(entries)) as Box<dyn Postings + 'a>)
}

impl SegmentIndex for MemorySegment {
    fn max_doc(&self) -> DocId {
        self.documents.len() as DocId
    }

    fn is_alive(&self, doc: DocId) -> bool {
        self.alive.get(doc as usize).copied().unwrap_or(false)
    }

    fn doc_length(&self, doc: DocId) -> Result<u32, IndexError> {
        self.lengths
            .get(doc as usize)
            .copied()
            .ok_or(IndexError::MissingDocLength(doc))
    }

    fn closing_positions(&self) -> u32 {
        self.closing_positions
    }

    fn term_postings(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        term: &str,
    ) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        let Some(map) = self.lookup_field(field, sensitivity)? else {
            return Ok(None);
        };
        let key = match sensitivity {
            Sensitivity::Sensitive => term.to_string(),
            _ => fold_case(term),
        };
        Ok(postings_of(map, &key))
    }

    fn matching_terms(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        matcher: &TermMatcher,
        limit: usize,
    ) -> Result<Vec<String>, IndexError> {
        let Some(map) = self.lookup_field(field, sensitivity)? else {
            return Ok(Vec::new());
        };
        let matcher = match sensitivity {
            Sensitivity::Sensitive => matcher.clone(),
            _ => matcher.folded(),
        };
        let re = matcher.compile().map_err(|e| IndexError::UnsupportedMatcher {
            pattern: matcher.regex_body(),
            message: e.to_string(),
        })?;
        Ok(map
            .keys()
            .filter(|term| re.is_match(term))
            .take(limit.saturating_add(1))
            .cloned()
            .collect())
    }

    fn tag_postings(&self, name: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        Ok(postings_of(&self.tags, name))
    }

    fn attribute_postings(&self, attr: &str, value: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        Ok(postings_of(&self.attributes, &attribute_term(attr, value)))
    }

    fn relation_types(&self, matcher: &TermMatcher, limit: usize) -> Result<Vec<String>, IndexError> {
        let re = matcher.compile().map_err(|e| IndexError::UnsupportedMatcher {
            pattern: matcher.regex_body(),
            message: e.to_string(),
        })?;
        let mut types: Vec<String> = Vec::new();
        for key in self.relations.keys() {
            let Some((rel_type, _)) = parse_relation_term(key) else {
                return Err(IndexError::CorruptPostings(format!("malformed relation term '{}'", key)));
            };
            // terms of one type are adjacent in key order
            if types.last().map(String::as_str) == Some(rel_type) || !re.is_match(rel_type) {
                continue;
            }
            types.push(rel_type.to_string());
            if types.len() > limit {
                break;
            }
        }
        Ok(types)
    }

    fn relation_postings(&self, rel_type: &str) -> Result<Option<Box<dyn RelationPostings + '_>>, IndexError> {
        let (lower, upper) = relation_term_range(rel_type);
        let mut terms = Vec::new();
        for (key, entries) in self.relations.range(lower..upper) {
            let Some((_, shape)) = parse_relation_term(key) else {
                return Err(IndexError::CorruptPostings(format!("malformed relation term '{}'", key)));
            };
            terms.push((shape, Box::new(VecPostings::new(entries)) as Box<dyn Postings + '_>));
        }
        Ok(union_relations(terms))
    }
}

impl PositionalIndex for MemoryIndex {
    fn num_segments(&self) -> usize {
        self.segments.len()
    }

    fn segment(&self, ord: usize) -> Result<Box<dyn SegmentIndex + '_>, IndexError> {
        let seg = self.segments.get(ord).ok_or(IndexError::UnknownSegment(ord))?;
        Ok(Box::new(seg))
    }

    fn fetch_document(&self, segment: usize, doc: DocId) -> Result<Option<Document>, IndexError> {
        Ok(self.document(segment, doc).cloned())
    }
}
