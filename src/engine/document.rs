//! Building tantivy corpus indexes from documents

use crate::data::document::Document;
use crate::engine::config::IndexLayoutConfig;
use crate::engine::schema::{build_schema, to_tantivy_document};
use crate::tantivy_integration::position_tokenizer::{PositionalTermsTokenizer, POSITIONAL_TOKENIZER};
use anyhow::{anyhow, Result};
use std::path::Path;
use tantivy::{directory::MmapDirectory, schema::Schema, Index, IndexWriter};

/// Heap budget of the index writer
const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Writes corpus documents into a tantivy index laid out per [`IndexLayoutConfig`]
pub struct CorpusWriter {
    index: Index,
    writer: IndexWriter,
    schema: Schema,
    layout: IndexLayoutConfig,
    pending: usize,
}

impl CorpusWriter {
    /// Open (or create) an index in a directory
    pub fn create(index_dir: &Path, layout: IndexLayoutConfig) -> Result<Self> {
        std::fs::create_dir_all(index_dir)
            .map_err(|e| anyhow!("Failed to create index directory {}: {}", index_dir.display(), e))?;
        let schema = build_schema(&layout);
        let dir = MmapDirectory::open(index_dir)?;
        let index = Index::open_or_create(dir, schema)?;
        Self::from_index(index, layout)
    }

    /// Index held in memory, mostly for tests
    pub fn in_ram(layout: IndexLayoutConfig) -> Result<Self> {
        let index = Index::create_in_ram(build_schema(&layout));
        Self::from_index(index, layout)
    }

    fn from_index(index: Index, layout: IndexLayoutConfig) -> Result<Self> {
        register_tokenizers(&index);
        // one indexing thread keeps the documents of a commit in one segment, in insertion order
        let writer = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        let schema = index.schema();
        Ok(Self { index, writer, schema, layout, pending: 0 })
    }

    pub fn add_document(&mut self, document: &Document) -> Result<()> {
        let doc = to_tantivy_document(&self.schema, &self.layout, document)?;
        self.writer.add_document(doc)?;
        self.pending += 1;
        Ok(())
    }

    pub fn add_documents(&mut self, documents: &[Document]) -> Result<()> {
        for document in documents {
            self.add_document(document)?;
        }
        Ok(())
    }

    /// Commit pending documents as a new segment
    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        log::info!("Committed {} documents", self.pending);
        self.pending = 0;
        Ok(())
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn layout(&self) -> &IndexLayoutConfig {
        &self.layout
    }
}

/// Register the positional tokenizer used by corpus fields
pub fn register_tokenizers(index: &Index) {
    index.tokenizers().register(POSITIONAL_TOKENIZER, PositionalTermsTokenizer);
    log::debug!("Registered tokenizer '{}'", POSITIONAL_TOKENIZER);
}
