//! Core SearchEngine struct and constructors

use crate::data::document::Document;
use crate::engine::config::{load_config, EngineConfig};
use crate::index::{MemoryIndex, PositionalIndex};
use crate::tantivy_integration::reader::TantivyPositionalIndex;
use anyhow::{Context, Result};
use std::path::Path;

/// Runs patterns against a positional index
pub struct SearchEngine<I> {
    pub(crate) index: I,
    pub(crate) config: EngineConfig,
}

impl<I: PositionalIndex> SearchEngine<I> {
    pub fn new(index: I, config: EngineConfig) -> Self {
        log::debug!("Search engine over {} segments", index.num_segments());
        Self { index, config }
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl SearchEngine<MemoryIndex> {
    /// Engine over an in-memory corpus, one segment per call
    pub fn from_documents(documents: &[Document], config: EngineConfig) -> Self {
        let mut builder = MemoryIndex::builder()
            .closing_positions(config.index.closing_positions)
            .insensitive_suffix(&config.index.insensitive_suffix);
        builder.add_documents(documents);
        Self::new(builder.build(), config)
    }
}

impl SearchEngine<TantivyPositionalIndex> {
    /// Engine over a tantivy corpus index directory
    pub fn open(index_dir: &Path, config: EngineConfig) -> Result<Self> {
        let index = TantivyPositionalIndex::open_dir(index_dir, config.index.clone())
            .with_context(|| format!("Failed to open index at {}", index_dir.display()))?;
        Ok(Self::new(index, config))
    }

    /// Same as [`SearchEngine::open`] with the configuration read from a YAML file
    pub fn open_with_config_file(index_dir: &Path, config_path: &Path) -> Result<Self> {
        let config = load_config(config_path)?;
        Self::open(index_dir, config)
    }
}
