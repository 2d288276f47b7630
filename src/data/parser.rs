use anyhow::{anyhow, Result};
use std::fs;
use std::path::Path;

use crate::data::document::Document;
use crate::engine::constants::RELATION_SEPARATOR;
use crate::types::Span;

/// Loader for JSON and YAML corpus files
///
/// A corpus file holds a list of [`Document`]s. The format is chosen by the
/// file extension (`.yaml`/`.yml`, anything else is read as JSON).
pub struct DocumentParser;

impl DocumentParser {
    /// Read and validate every document of a corpus file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow!("Corpus file not found: {}", path.display()));
        }
        let text = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read corpus file {}: {}", path.display(), e))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let docs = if is_yaml {
            Self::parse_yaml(&text)
        } else {
            Self::parse_json(&text)
        }
        .map_err(|e| anyhow!("Invalid corpus in {}: {}", path.display(), e))?;

        log::info!("Loaded {} documents from {}", docs.len(), path.display());
        Ok(docs)
    }

    pub fn parse_json(text: &str) -> Result<Vec<Document>> {
        let docs: Vec<Document> = serde_json::from_str(text)?;
        for doc in &docs {
            Self::validate_document(doc)?;
        }
        Ok(docs)
    }

    pub fn parse_yaml(text: &str) -> Result<Vec<Document>> {
        let docs: Vec<Document> = serde_yaml::from_str(text)?;
        for doc in &docs {
            Self::validate_document(doc)?;
        }
        Ok(docs)
    }

    /// Validate document structure before indexing
    /// Checks tag bounds and consistent token counts
    pub fn validate_document(doc: &Document) -> Result<()> {
        let token_count = doc.num_tokens();

        for field in &doc.fields {
            if field.tokens.len() as u32 != token_count {
                log::warn!(
                    "Document '{}': field '{}' has {} tokens but the document has {}",
                    doc.id,
                    field.name,
                    field.tokens.len(),
                    token_count
                );
            }
        }

        for tag in &doc.tags {
            if tag.start > tag.end || tag.end > token_count {
                return Err(anyhow!(
                    "Document '{}': tag <{}> [{}, {}) is outside the {} tokens of the document",
                    doc.id,
                    tag.name,
                    tag.start,
                    tag.end,
                    token_count
                ));
            }
        }

        for rel in &doc.relations {
            let out_of_range = |s: &Span| s.start > s.end || s.end > token_count;
            if rel.rel_type.is_empty() || rel.rel_type.contains(RELATION_SEPARATOR) {
                return Err(anyhow!("Document '{}': invalid relation type '{}'", doc.id, rel.rel_type));
            }
            if out_of_range(&rel.target) || rel.source.as_ref().is_some_and(out_of_range) {
                return Err(anyhow!(
                    "Document '{}': relation '{}' is outside the {} tokens of the document",
                    doc.id,
                    rel.rel_type,
                    token_count
                ));
            }
        }
        Ok(())
    }
}
