//! Positional index collaborator
//!
//! Cursors never touch storage directly; they read postings through the
//! traits defined here. Two implementations exist:
//! - `memory`: an in-memory index built from [`crate::data::Document`]s
//! - [`crate::tantivy_integration::reader`]: a reader over a tantivy index
//!
//! A postings stream follows tantivy's doc-set convention: it is positioned on
//! its first document when created and reports [`NO_MORE_DOCS`] once exhausted.

pub mod memory;
pub mod postings;
pub mod relations;

use crate::data::document::Document;
use crate::error::{IndexError, PatternError};
use crate::pattern::Sensitivity;
use crate::types::Span;

pub use memory::{MemoryIndex, MemoryIndexBuilder, MemorySegment};
pub use postings::{UnionPostings, VecPostings};
pub use relations::{parse_relation_term, relation_term, RelationPostings, RelationShape};

pub type DocId = tantivy::DocId;

/// Sentinel doc id of an exhausted stream
pub const NO_MORE_DOCS: DocId = tantivy::TERMINATED;
/// Sentinel position of a cursor that has no more hits in the current document
pub const NO_MORE_POSITIONS: u32 = u32::MAX;

/// Per-document span stream of one term, tag or attribute
pub trait Postings {
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

    /// Replace `out` with the spans of the current document, sorted by start then end
    fn read_spans(&mut self, out: &mut Vec<Span>) -> Result<(), IndexError>;
}

/// How a multi-term leaf selects terms from the dictionary. Always a full match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermMatcher {
    Regex(String),
    Prefix(String),
    /// Glob with `*` (any run) and `?` (any character)
    Wildcard(String),
}

impl TermMatcher {
    /// Unanchored regex body equivalent to this matcher
    pub fn regex_body(&self) -> String {
        match self {
            TermMatcher::Regex(body) => body.clone(),
            TermMatcher::Prefix(prefix) => format!("{}.*", regex::escape(prefix)),
            TermMatcher::Wildcard(glob) => {
                let mut body = String::with_capacity(glob.len() * 2);
                let mut buf = [0u8; 4];
                for c in glob.chars() {
                    match c {
                        '*' => body.push_str(".*"),
                        '?' => body.push('.'),
                        other => body.push_str(&regex::escape(other.encode_utf8(&mut buf))),
                    }
                }
                body
            }
        }
    }

    /// The matcher for the case-insensitive alternative of a field, whose terms are folded
    pub fn folded(&self) -> TermMatcher {
        match self {
            TermMatcher::Regex(body) => TermMatcher::Regex(format!("(?i){}", body)),
            TermMatcher::Prefix(p) => TermMatcher::Prefix(fold_case(p)),
            TermMatcher::Wildcard(g) => TermMatcher::Wildcard(fold_case(g)),
        }
    }

    /// Compile to an anchored regex for in-memory dictionary scans
    pub fn compile(&self) -> Result<regex::Regex, PatternError> {
        let body = self.regex_body();
        regex::Regex::new(&format!("^(?:{})$", body)).map_err(|e| PatternError::InvalidRegex {
            pattern: body,
            message: e.to_string(),
        })
    }
}

/// Normalization applied to terms of insensitive alternative fields
pub fn fold_case(term: &str) -> String {
    term.to_lowercase()
}

/// One independently searchable partition of the index
pub trait SegmentIndex: Send + Sync {
    /// Upper bound (exclusive) of doc ids in this segment
    fn max_doc(&self) -> DocId;

    fn is_alive(&self, doc: DocId) -> bool;

    /// Stored token count of a document, including closing positions
    fn doc_length(&self, doc: DocId) -> Result<u32, IndexError>;

    /// Positions stored after the last real token of every document
    fn closing_positions(&self) -> u32 {
        0
    }

    /// Number of real tokens in a document: the last valid hit end
    fn token_count(&self, doc: DocId) -> Result<u32, IndexError> {
        Ok(self.doc_length(doc)?.saturating_sub(self.closing_positions()))
    }

    /// Postings of one exact term; `None` when the term does not occur
    fn term_postings(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        term: &str,
    ) -> Result<Option<Box<dyn Postings + '_>>, IndexError>;

    /// Terms of `field` accepted by `matcher`, in dictionary order.
    /// Stops after `limit + 1` terms so callers can detect truncation.
    fn matching_terms(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        matcher: &TermMatcher,
        limit: usize,
    ) -> Result<Vec<String>, IndexError>;

    /// Element spans `(start, start + length)` of a tag
    fn tag_postings(&self, name: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError>;

    /// Zero-width spans at the start of every element carrying `attr="value"`
    fn attribute_postings(&self, attr: &str, value: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError>;

    /// Relation types accepted by `matcher`, in dictionary order.
    /// Stops after `limit + 1` types so callers can detect truncation.
    fn relation_types(&self, matcher: &TermMatcher, limit: usize) -> Result<Vec<String>, IndexError>;

    /// Every relation of one type; `None` when the type does not occur
    fn relation_postings(&self, rel_type: &str) -> Result<Option<Box<dyn RelationPostings + '_>>, IndexError>;
}

impl<T: SegmentIndex + ?Sized> SegmentIndex for &T {
    fn max_doc(&self) -> DocId {
        (**self).max_doc()
    }

    fn is_alive(&self, doc: DocId) -> bool {
        (**self).is_alive(doc)
    }

    fn doc_length(&self, doc: DocId) -> Result<u32, IndexError> {
        (**self).doc_length(doc)
    }

    fn closing_positions(&self) -> u32 {
        (**self).closing_positions()
    }

    fn term_postings(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        term: &str,
    ) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        (**self).term_postings(field, sensitivity, term)
    }

    fn matching_terms(
        &self,
        field: &str,
        sensitivity: Sensitivity,
        matcher: &TermMatcher,
        limit: usize,
    ) -> Result<Vec<String>, IndexError> {
        (**self).matching_terms(field, sensitivity, matcher, limit)
    }

    fn tag_postings(&self, name: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        (**self).tag_postings(name)
    }

    fn attribute_postings(&self, attr: &str, value: &str) -> Result<Option<Box<dyn Postings + '_>>, IndexError> {
        (**self).attribute_postings(attr, value)
    }

    fn relation_types(&self, matcher: &TermMatcher, limit: usize) -> Result<Vec<String>, IndexError> {
        (**self).relation_types(matcher, limit)
    }

    fn relation_postings(&self, rel_type: &str) -> Result<Option<Box<dyn RelationPostings + '_>>, IndexError> {
        (**self).relation_postings(rel_type)
    }
}

/// A searchable index made of segments
pub trait PositionalIndex: Send + Sync {
    fn num_segments(&self) -> usize;

    fn segment(&self, ord: usize) -> Result<Box<dyn SegmentIndex + '_>, IndexError>;

    /// Stored tokens of a document, for display; `None` when nothing is stored
    fn fetch_document(&self, _segment: usize, _doc: DocId) -> Result<Option<Document>, IndexError> {
        Ok(None)
    }
}

/// Term stored for an element tag of the given length in the tag field
pub fn tag_term(name: &str, length: u32) -> String {
    format!("{}{}{}", name, crate::engine::constants::TAG_LENGTH_SEPARATOR, length)
}

/// Term stored for an element attribute in the tag field
pub fn attribute_term(attr: &str, value: &str) -> String {
    use crate::engine::constants::{ATTRIBUTE_PREFIX, ATTRIBUTE_SEPARATOR};
    format!("{}{}{}{}", ATTRIBUTE_PREFIX, attr, ATTRIBUTE_SEPARATOR, value)
}

/// Split a tag term back into name and element length
pub fn parse_tag_term(term: &str) -> Option<(&str, u32)> {
    let (name, len) = term.split_once(crate::engine::constants::TAG_LENGTH_SEPARATOR)?;
    len.parse().ok().map(|len| (name, len))
}
