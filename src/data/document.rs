use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Relation, Span};

/// A document of a corpus: parallel token annotations plus element spans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Vec<TokensField>,
    #[serde(default)]
    pub tags: Vec<TagSpan>,
    #[serde(default)]
    pub relations: Vec<RelationEntry>,
}

/// One annotation layer (word, lemma, pos, ...) with one value per token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensField {
    pub name: String,
    pub tokens: Vec<String>,
}

/// An element (`<s>...</s>`) covering the token interval `[start, end)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSpan {
    pub name: String,
    pub start: u32,
    pub end: u32,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
}

/// A typed relation (e.g. a dependency `nsubj`) between token intervals.
/// Without a source it is a root relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEntry {
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub source: Option<Span>,
    pub target: Span,
}

impl RelationEntry {
    pub fn relation(&self) -> Relation {
        Relation { source: self.source, target: self.target }
    }
}

impl Document {
    /// Create a document with a single whitespace-tokenized `word` field
    pub fn from_words(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            fields: Vec::new(),
            tags: Vec::new(),
            relations: Vec::new(),
        }
        .with_field(crate::engine::constants::FIELD_WORD, text)
    }

    /// Add a whitespace-tokenized annotation layer
    pub fn with_field(mut self, name: &str, text: &str) -> Self {
        self.fields.push(TokensField {
            name: name.to_string(),
            tokens: text.split_whitespace().map(str::to_string).collect(),
        });
        self
    }

    pub fn with_tag(self, name: &str, start: u32, end: u32) -> Self {
        self.with_tag_attrs(name, start, end, &[])
    }

    pub fn with_tag_attrs(mut self, name: &str, start: u32, end: u32, attrs: &[(&str, &str)]) -> Self {
        self.tags.push(TagSpan {
            name: name.to_string(),
            start,
            end,
            attrs: attrs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        });
        self
    }

    pub fn with_relation(mut self, rel_type: &str, source: (u32, u32), target: (u32, u32)) -> Self {
        self.relations.push(RelationEntry {
            rel_type: rel_type.to_string(),
            source: Some(Span::new(source.0, source.1)),
            target: Span::new(target.0, target.1),
        });
        self
    }

    pub fn with_root_relation(mut self, rel_type: &str, target: (u32, u32)) -> Self {
        self.relations.push(RelationEntry {
            rel_type: rel_type.to_string(),
            source: None,
            target: Span::new(target.0, target.1),
        });
        self
    }

    /// Get tokens from a specific field
    pub fn get_tokens(&self, field_name: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|f| f.name == field_name)
            .map(|f| f.tokens.as_slice())
    }

    /// Token count: the length of the longest annotation layer
    pub fn num_tokens(&self) -> u32 {
        self.fields.iter().map(|f| f.tokens.len() as u32).max().unwrap_or(0)
    }
}

impl TokensField {
    /// Join tokens into a single string for display
    pub fn to_text(&self) -> String {
        self.tokens.join(" ")
    }
}
