//! Tantivy schema for corpus indexes and document conversion

use crate::data::document::Document;
use crate::engine::config::IndexLayoutConfig;
use crate::engine::constants::FIELD_DOC_ID;
use crate::index::{attribute_term, fold_case, relation_term, tag_term};
use crate::tantivy_integration::position_tokenizer::{
    encode_positional_terms, encode_tokens, POSITIONAL_TOKENIZER,
};
use anyhow::{anyhow, Result};
use tantivy::schema::{
    IndexRecordOption, Schema, SchemaBuilder, TantivyDocument, TextFieldIndexing, TextOptions, FAST, STORED,
    STRING,
};

/// Build the schema described by an index layout
///
/// Every token field gets a sensitive and an insensitive alternative, both
/// indexed with positions through the positional tokenizer.
pub fn build_schema(layout: &IndexLayoutConfig) -> Schema {
    let mut builder = Schema::builder();

    builder.add_text_field(FIELD_DOC_ID, STRING | STORED);
    for field in &layout.token_fields {
        add_positional_field(&mut builder, field, true);
        add_positional_field(&mut builder, &layout.insensitive_field(field), false);
    }
    add_positional_field(&mut builder, &layout.tag_field, false);
    builder.add_u64_field(&layout.length_field, STORED | FAST);
    log::debug!("Added u64 field '{}' as STORED and FAST", layout.length_field);

    builder.build()
}

fn add_positional_field(builder: &mut SchemaBuilder, name: &str, stored: bool) {
    let indexing = TextFieldIndexing::default()
        .set_tokenizer(POSITIONAL_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let mut options = TextOptions::default().set_indexing_options(indexing);
    if stored {
        options = options.set_stored();
    }
    builder.add_text_field(name, options);
    log::debug!("Added positional field '{}'", name);
}

/// Convert a corpus document into a tantivy document for `schema`
pub fn to_tantivy_document(
    schema: &Schema,
    layout: &IndexLayoutConfig,
    document: &Document,
) -> Result<TantivyDocument> {
    let field = |name: &str| {
        schema
            .get_field(name)
            .map_err(|_| anyhow!("Field '{}' not found in schema", name))
    };

    let mut doc = TantivyDocument::new();
    doc.add_text(field(FIELD_DOC_ID)?, &document.id);

    for tokens in &document.fields {
        if !layout.token_fields.contains(&tokens.name) {
            log::warn!("Document '{}': field '{}' is not part of the index layout, skipped", document.id, tokens.name);
            continue;
        }
        let folded: Vec<String> = tokens.tokens.iter().map(|t| fold_case(t)).collect();
        doc.add_text(field(&tokens.name)?, encode_tokens(&tokens.tokens));
        doc.add_text(field(&layout.insensitive_field(&tokens.name))?, encode_tokens(&folded));
    }

    let token_count = document.num_tokens();
    // a zero-length element may start right after the last token
    let mut tag_terms: Vec<Vec<String>> = vec![Vec::new(); token_count as usize + 1];
    for tag in &document.tags {
        if tag.start > tag.end || tag.end > token_count {
            return Err(anyhow!(
                "Document '{}': tag <{}> [{}, {}) is out of range",
                document.id,
                tag.name,
                tag.start,
                tag.end
            ));
        }
        let at = &mut tag_terms[tag.start as usize];
        at.push(tag_term(&tag.name, tag.end - tag.start));
        for (k, v) in &tag.attrs {
            at.push(attribute_term(k, v));
        }
    }
    for entry in &document.relations {
        let relation = entry.relation();
        let out_of_range = |s: &crate::types::Span| s.start > s.end || s.end > token_count;
        if out_of_range(&relation.target) || relation.source.as_ref().is_some_and(out_of_range) {
            return Err(anyhow!("Document '{}': relation '{}' is out of range", document.id, entry.rel_type));
        }
        tag_terms[relation.indexed_at() as usize].push(relation_term(&entry.rel_type, &relation));
    }
    doc.add_text(field(&layout.tag_field)?, encode_positional_terms(&tag_terms));
    doc.add_u64(
        field(&layout.length_field)?,
        u64::from(token_count + layout.closing_positions),
    );

    Ok(doc)
}
