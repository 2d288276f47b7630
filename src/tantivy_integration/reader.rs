//! Positional index over a tantivy index
//!
//! Each tantivy segment is one [`SegmentIndex`]. Token annotations are read
//! from positions-indexed text fields, element spans from start-tag terms
//! `name\u{1}length` in the tag field, relations from their shaped terms in
//! the same field, and document lengths from a fast field.

use std::path::Path;

use tantivy::columnar::Column;
use tantivy::fastfield::AliveBitSet;
use tantivy::postings::{Postings as _, SegmentPostings};
use tantivy::schema::{Field, IndexRecordOption, Schema, TantivyDocument, Value};
use tantivy::{DocAddress, DocSet, Index, Searcher, SegmentReader, Term};

use crate::data::document::{Document, TokensField};
use crate::engine::config::IndexLayoutConfig;
use crate::engine::constants::{FIELD_DOC_ID, TAG_LENGTH_SEPARATOR};
use crate::engine::document::register_tokenizers;
use crate::error::IndexError;
use crate::index::relations::{relation_term_range, relation_terms_range, union_relations};
use crate::index::{
    attribute_term, fold_case, parse_relation_term, parse_tag_term, DocId, PositionalIndex, Postings,
    RelationPostings, SegmentIndex, TermMatcher, UnionPostings, NO_MORE_DOCS,
};
use crate::pattern::Sensitivity;
use crate::tantivy_integration::position_tokenizer::decode_tokens;
use crate::types::Span;

/// Postings of one tantivy term; every position becomes a span of fixed width
struct TermPostings<'a> {
    postings: SegmentPostings,
    width: u32,
    alive: Option<&'a AliveBitSet>,
    positions: Vec<u32>,
}

impl<'a> TermPostings<'a> {
    fn new(postings: SegmentPostings, width: u32, alive: Option<&'a AliveBitSet>) -> Self {
        let mut p = Self { postings, width, alive, positions: Vec::with_capacity(16) };
        p.skip_deleted();
        p
    }

    fn skip_deleted(&mut self) -> DocId {
        let mut doc = self.postings.doc();
        if let Some(alive) = self.alive {
            while doc != NO_MORE_DOCS && !alive.is_alive(doc) {
                doc = self.postings.advance();
            }
        }
        doc
    }
}

impl Postings for TermPostings<'_> {
    fn doc(&self) -> DocId {
        self.postings.doc()
    }

    fn advance(&mut self) -> DocId {
        if self.postings.doc() == NO_MORE_DOCS {
            return NO_MORE_DOCS;
        }
        self.postings.advance();
        self.skip_deleted()
    }

    fn seek(&mut self, target: DocId) -> DocId {
        if self.postings.doc() >= target {
            return self.postings.doc();
        }
        self.postings.seek(target);
        self.skip_deleted()
    }

    fn read_spans(&mut self, out: &mut Vec<Span>) -> Result<(), IndexError> {
        self.positions.clear();
        self.postings.positions(&mut self.positions);
        out.clear();
        out.extend(self.positions.iter().map(|&p| Span::new(p, p + self.width)));
        Ok(())
    }
}

/// A searchable snapshot of a tantivy corpus index
pub struct TantivyPositionalIndex {
    searcher: Searcher,
    schema: Schema,
    layout: IndexLayoutConfig,
}

impl TantivyPositionalIndex {
    pub fn new(index: &Index, layout: IndexLayoutConfig) -> Result<Self, IndexError> {
        register_tokenizers(index);
        let searcher = index.reader()?.searcher();
        log::info!(
            "Opened tantivy index: {} segments, {} documents",
            searcher.segment_readers().len(),
            searcher.num_docs()
        );
        Ok(Self { searcher, schema: index.schema(), layout })
    }

    pub fn open_dir(index_dir: &Path, layout: IndexLayoutConfig) -> Result<Self, IndexError> {
        let index = Index::open_in_dir(index_dir)?;
        Self::new(&index, layout)
    }

    /// Stored id and token fields of a document, for display
    pub fn stored_document(&self, segment: usize, doc: DocId) -> Result<Document, IndexError> {
        let stored: TantivyDocument = self.searcher.doc(DocAddress::new(segment as u32, doc))?;
        let text_of = |name: &str| -> Option<String> {
            let field = self.schema.get_field(name).ok()?;
            stored.get_first(field).and_then(|v| v.as_str()).map(str::to_string)
        };
        let fields = self
            .layout
            .token_fields
            .iter()
            .filter_map(|name| {
                text_of(name).map(|value| TokensField { name: name.clone(), tokens: decode_tokens(&value) })
            })
            .collect();
        Ok(Document {
            id: text_of(FIELD_DOC_ID).unwrap_or_else(|| format!("{}:{}", segment, doc)),
            fields,
            tags: Vec::new(),
            relations: Vec::new(),
        })
    }
}

impl PositionalIndex for TantivyPositionalIndex {
    fn num_segments(&self) -> usize {
        self.searcher.segment_readers().len()
    }

    fn segment(&self, ord: usize) -> Result<Box<dyn SegmentIndex + '_>, IndexError> {
        let reader = self
            .searcher
            .segment_readers()
            .get(ord)
            .ok_or(IndexError::UnknownSegment(ord))?;
        Ok(Box::new(TantivySegment::new(reader, &self.schema, &self.layout)?))
    }

    fn fetch_document(&self, segment: usize, doc: DocId) -> Result<Option<Document>, IndexError> {
        self.stored_document(segment, doc).map(Some)
    }
}

/// One tantivy segment seen as a [`SegmentIndex`]
pub struct TantivySegment<'a> {
    reader: &'a SegmentReader,
    schema: &'a Schema,
    layout: &'a IndexLayoutConfig,
    lengths: Column<u64>,
}

impl<'a> TantivySegment<'a> {
    pub fn new(
        reader: &'a SegmentReader,
        schema: &'a Schema,
        layout: &'a IndexLayoutConfig,
    ) -> Result<Self, IndexError> {
        let lengths = reader.fast_fields().u64(&layout.length_field)?;
        Ok(Self { reader, schema, layout, lengths })
    }

    fn field(&self, name: &str) -> Result<Field, IndexError> {
        self.schema
            .get_field(name)
            .map_err(|_| IndexError::UnknownField(name.to_string()))
    }

    /// The field holding the requested alternative of a token annotation
    fn token_field(&self, field: &str, sensitivity: Sensitivity) -> Result<Field, IndexError> {
        if sensitivity == Sensitivity::Sensitive {
            return self.field(field);
        }
        let name = self.layout.insensitive_field(field);
        match self.schema.get_field(&name) {
            Ok(f) => Ok(f),
            Err(_) if self.schema.get_field(field).is_ok() => Err(IndexError::UnknownAlternative {
                field: field.to_string(),
                alternative: "insensitive".to_string(),
            }),
            Err(_) => Err(IndexError::UnknownField(field.to_string())),
        }
    }

    /// Stream the tag-field dictionary over `[lower, upper)`, calling `visit` with every key
    fn scan_tag_terms(
        &self,
        lower: &str,
        upper: &str,
        mut visit: impl FnMut(Field, &str) -> Result<bool, IndexError>,
    ) -> Result<(), IndexError> {
        let f = self.field(&self.layout.tag_field)?;
        let inverted = self.reader.inverted_index(f)?;
        let mut stream = inverted
            .terms()
            .range()
            .ge(lower.as_bytes())
            .lt(upper.as_bytes())
            .into_stream()
            .map_err(|e| IndexError::CorruptPostings(format!("tag dictionary: {}", e)))?;
        while stream.advance() {
            let key = String::from_utf8_lossy(stream.key()).into_owned();
            if !visit(f, &key)? {
                break;
            }
        }
        Ok(())
    }

    fn read_term(&self, term: &Term, width: u32) -> Result<Option<TermPostings<'a>>, IndexError> {
        let inverted = self.reader.inverted_index(term.field())?;
        let postings = inverted.read_postings(term, IndexRecordOption::WithFreqsAndPositions)?;
        Ok(postings
            .map(|p| TermPostings::new(p, width, self.reader.alive_bitset()))
            .filter(|p| p.doc() != NO_MORE_DOCS))
    }
}

fn boxed<'a>(postings: Option<TermPostings<'a>>) -> Option<Box<dyn Postings + 'a>> {
    postings.map(|p| Box::new(p) as Box<dyn Postings + 'a>)
}

impl SegmentIndex for TantivySegment<'_> {
    fn max_doc(&self) -> DocId {
        self.reader.max_doc()
    }

    fn is_alive(&self, doc: DocId) -> bool {
        doc < self.reader.max_doc() && self.reader.alive_bitset().map_or(true, |alive| alive.is_alive(doc))
    }

    fn doc_length(&self, doc: DocId) -> Result<u32, IndexError> {
        self.lengths
            .first(doc)
            .map(|len| len as u32)
            .ok_or(IndexError::MissingDocLength(doc))
    }

    fn closing_positions(&self) -> u32 {
        self.layout.closing_positions
    }

    fn term_postings(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        term: &str,
    ) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        let f = self.token_field(field, sensitivity)?;
        let text = match sensitivity {
            Sensitivity::Sensitive => term.to_string(),
            _ => fold_case(term),
        };
        Ok(boxed(self.read_term(&Term::from_field_text(f, &text), 1)?))
    }

    fn matching_terms(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        matcher: &TermMatcher,
        limit: usize,
    ) -> Result<Vec<String>, IndexError> {
        let f = self.token_field(field, sensitivity)?;
        let matcher = match sensitivity {
            Sensitivity::Sensitive => matcher.clone(),
            _ => matcher.folded(),
        };
        let body = matcher.regex_body();
        let automaton = tantivy_fst::Regex::new(&body).map_err(|e| IndexError::UnsupportedMatcher {
            pattern: body.clone(),
            message: e.to_string(),
        })?;

        let inverted = self.reader.inverted_index(f)?;
        let term_dict = inverted.terms();
        let mut stream = term_dict
            .search(automaton)
            .into_stream()
            .map_err(|e| IndexError::CorruptPostings(format!("term dictionary of '{}': {}", field, e)))?;

        let mut terms = Vec::new();
        while stream.advance() {
            terms.push(String::from_utf8_lossy(stream.key()).into_owned());
            if terms.len() > limit {
                break;
            }
        }
        if terms.is_empty() {
            log::debug!("Matcher '{}' expanded to 0 terms in field '{}'", body, field);
        }
        Ok(terms)
    }

    fn tag_postings(&self, name: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        let lower = format!("{}{}", name, TAG_LENGTH_SEPARATOR);
        // the separator is U+0001, so U+0002 bounds every length of this tag
        let upper = format!("{}\u{2}", name);
        let mut per_length: Vec<Box<dyn Postings + '_>> = Vec::new();
        self.scan_tag_terms(&lower, &upper, |f, key| {
            let Some((_, length)) = parse_tag_term(key) else {
                return Err(IndexError::CorruptPostings(format!("malformed tag term '{}'", key)));
            };
            if let Some(p) = self.read_term(&Term::from_field_text(f, key), length)? {
                per_length.push(Box::new(p));
            }
            Ok(true)
        })?;
        Ok(match per_length.len() {
            0 => None,
            1 => per_length.pop(),
            _ => Some(Box::new(UnionPostings::new(per_length))),
        })
    }

    fn attribute_postings(&self, attr: &str, value: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        let f = self.field(&self.layout.tag_field)?;
        Ok(boxed(self.read_term(&Term::from_field_text(f, &attribute_term(attr, value)), 0)?))
    }

    fn relation_types(&self, matcher: &TermMatcher, limit: usize) -> Result<Vec<String>, IndexError> {
        let re = matcher.compile().map_err(|e| IndexError::UnsupportedMatcher {
            pattern: matcher.regex_body(),
            message: e.to_string(),
        })?;
        let (lower, upper) = relation_terms_range();
        let mut types: Vec<String> = Vec::new();
        self.scan_tag_terms(&lower, &upper, |_, key| {
            let Some((rel_type, _)) = parse_relation_term(key) else {
                return Err(IndexError::CorruptPostings(format!("malformed relation term '{}'", key)));
            };
            if types.last().map(String::as_str) != Some(rel_type) && re.is_match(rel_type) {
                types.push(rel_type.to_string());
            }
            Ok(types.len() <= limit)
        })?;
        Ok(types)
    }

    fn relation_postings(&self, rel_type: &str) -> Result<Option<Box<dyn RelationPostings + '_>>, IndexError> {
        let (lower, upper) = relation_term_range(rel_type);
        let mut terms = Vec::new();
        self.scan_tag_terms(&lower, &upper, |f, key| {
            let Some((_, shape)) = parse_relation_term(key) else {
                return Err(IndexError::CorruptPostings(format!("malformed relation term '{}'", key)));
            };
            if let Some(p) = self.read_term(&Term::from_field_text(f, key), 0)? {
                terms.push((shape, Box::new(p) as Box<dyn Postings + '_>));
            }
            Ok(true)
        })?;
        Ok(union_relations(terms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::document::CorpusWriter;
    use crate::types::Relation;

    fn build_index() -> Index {
        let layout = IndexLayoutConfig { closing_positions: 1, ..IndexLayoutConfig::default() };
        let mut writer = CorpusWriter::in_ram(layout).unwrap();
        writer
            .add_document(
                &Document::from_words("d0", "The cat sat on the mat")
                    .with_tag("s", 0, 6)
                    .with_tag_attrs("np", 0, 2, &[("type", "subj")])
                    .with_tag("np", 4, 6)
                    .with_relation("det", (1, 2), (0, 1))
                    .with_relation("nmod", (1, 2), (4, 6))
                    .with_root_relation("root", (2, 3)),
            )
            .unwrap();
        writer
            .add_document(
                &Document::from_words("d1", "a cat")
                    .with_tag("s", 0, 2)
                    .with_relation("det", (1, 2), (0, 1)),
            )
            .unwrap();
        writer.commit().unwrap();
        writer.index().clone()
    }

    fn spans_of(p: &mut Box<dyn Postings + '_>) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        p.read_spans(&mut out).unwrap();
        out.into_iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn test_term_postings_and_lengths() {
        let index = build_index();
        let layout = IndexLayoutConfig { closing_positions: 1, ..IndexLayoutConfig::default() };
        let positional = TantivyPositionalIndex::new(&index, layout).unwrap();
        assert_eq!(positional.num_segments(), 1);
        let seg = positional.segment(0).unwrap();

        let mut the = seg.term_postings("word", Sensitivity::Insensitive, "the").unwrap().unwrap();
        assert_eq!(the.doc(), 0);
        assert_eq!(spans_of(&mut the), vec![(0, 1), (4, 5)]);
        assert_eq!(the.advance(), NO_MORE_DOCS);

        let mut cat = seg.term_postings("word", Sensitivity::Sensitive, "cat").unwrap().unwrap();
        assert_eq!(cat.seek(1), 1);
        assert_eq!(spans_of(&mut cat), vec![(1, 2)]);
        assert!(seg.term_postings("word", Sensitivity::Sensitive, "the").unwrap().is_some());
        assert!(seg.term_postings("word", Sensitivity::Sensitive, "dog").unwrap().is_none());

        assert_eq!(seg.doc_length(0).unwrap(), 7);
        assert_eq!(seg.token_count(0).unwrap(), 6);
        assert!(matches!(
            seg.term_postings("nope", Sensitivity::Sensitive, "x"),
            Err(IndexError::UnknownField(_))
        ));
    }

    #[test]
    fn test_tag_and_attribute_postings() {
        let index = build_index();
        let positional = TantivyPositionalIndex::new(&index, IndexLayoutConfig::default()).unwrap();
        let seg = positional.segment(0).unwrap();

        let mut np = seg.tag_postings("np").unwrap().unwrap();
        assert_eq!(np.doc(), 0);
        assert_eq!(spans_of(&mut np), vec![(0, 2), (4, 6)]);
        assert_eq!(np.advance(), NO_MORE_DOCS);

        let mut s = seg.tag_postings("s").unwrap().unwrap();
        assert_eq!(spans_of(&mut s), vec![(0, 6)]);
        assert_eq!(s.advance(), 1);
        assert_eq!(spans_of(&mut s), vec![(0, 2)]);

        let mut attr = seg.attribute_postings("type", "subj").unwrap().unwrap();
        assert_eq!(spans_of(&mut attr), vec![(0, 0)]);
        assert!(seg.tag_postings("vp").unwrap().is_none());
    }

    #[test]
    fn test_relation_postings() {
        let index = build_index();
        let positional = TantivyPositionalIndex::new(&index, IndexLayoutConfig::default()).unwrap();
        let seg = positional.segment(0).unwrap();
        let mut out = Vec::new();

        let mut det = seg.relation_postings("det").unwrap().unwrap();
        det.read_relations(&mut out).unwrap();
        assert_eq!(out, vec![Relation::new(Span::new(1, 2), Span::new(0, 1))]);
        assert_eq!(det.advance(), 1);
        assert_eq!(det.advance(), NO_MORE_DOCS);

        let mut nmod = seg.relation_postings("nmod").unwrap().unwrap();
        nmod.read_relations(&mut out).unwrap();
        assert_eq!(out, vec![Relation::new(Span::new(1, 2), Span::new(4, 6))]);
        let mut root = seg.relation_postings("root").unwrap().unwrap();
        root.read_relations(&mut out).unwrap();
        assert_eq!(out, vec![Relation::root(Span::new(2, 3))]);
        assert!(seg.relation_postings("de").unwrap().is_none());

        let types = seg.relation_types(&TermMatcher::Regex("n.*|root".into()), 10).unwrap();
        assert_eq!(types, vec!["nmod".to_string(), "root".to_string()]);
        let capped = seg.relation_types(&TermMatcher::Regex(".*".into()), 1).unwrap();
        assert_eq!(capped, vec!["det".to_string(), "nmod".to_string()]);
        // relation terms never show up as tags
        assert!(seg.tag_postings("np").unwrap().is_some());
    }

    #[test]
    fn test_matching_terms() {
        let index = build_index();
        let positional = TantivyPositionalIndex::new(&index, IndexLayoutConfig::default()).unwrap();
        let seg = positional.segment(0).unwrap();
        let terms = seg
            .matching_terms("word", Sensitivity::Insensitive, &TermMatcher::Prefix("Ma".into()), 10)
            .unwrap();
        assert_eq!(terms, vec!["mat".to_string()]);
        let wild = seg
            .matching_terms("word", Sensitivity::Sensitive, &TermMatcher::Wildcard("?at".into()), 10)
            .unwrap();
        assert_eq!(wild, vec!["cat".to_string(), "mat".to_string(), "sat".to_string()]);

        let stored = positional.stored_document(0, 1).unwrap();
        assert_eq!(stored.id, "d1");
        assert_eq!(stored.get_tokens("word").unwrap(), &["a".to_string(), "cat".to_string()]);
    }
}
