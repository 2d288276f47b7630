//! Field names and tuning defaults shared across the codebase

pub const FIELD_WORD: &str = "word";
pub const FIELD_LEMMA: &str = "lemma";
pub const FIELD_POS: &str = "pos";

/// Annotation used by term patterns that do not name a field
pub const DEFAULT_FIELD: &str = FIELD_WORD;

/// Stored external document id
pub const FIELD_DOC_ID: &str = "doc_id";

/// Field holding start-tag postings (and tag attribute postings)
pub const FIELD_TAGS: &str = "starttag";
/// Fast `u64` field with each document's raw token count
pub const FIELD_LENGTH: &str = "length_tokens";
/// Suffix of the case/diacritics-insensitive alternative of a token field
pub const INSENSITIVE_SUFFIX: &str = "_i";

/// Separates a tag name from its length in start-tag terms (`s\u{1}12`)
pub const TAG_LENGTH_SEPARATOR: char = '\u{1}';
/// Prefix of tag attribute terms (`@type__np`)
pub const ATTRIBUTE_PREFIX: &str = "@";
/// Separates attribute name and value in attribute terms
pub const ATTRIBUTE_SEPARATOR: &str = "__";

/// Prefix of relation terms in the tag field
/// (`~nsubj\u{1}-2\u{1}1\u{1}1`: type, target offset, source and target lengths)
pub const RELATION_PREFIX: &str = "~";
/// Separates the parts of a relation term
pub const RELATION_SEPARATOR: char = '\u{1}';
/// Offset written for root relations, which have no source
pub const ROOT_RELATION_OFFSET: &str = "^";

/// Cap on the number of terms a regex/prefix/wildcard may expand to per segment
pub const DEFAULT_MAX_TERM_EXPANSIONS: usize = 1024;
/// Cap on rewrite passes before a pattern is reported as non-converging
pub const DEFAULT_MAX_REWRITE_PASSES: usize = 32;
/// Closing positions stored after the last real token of every document
pub const DEFAULT_CLOSING_POSITIONS: u32 = 0;
