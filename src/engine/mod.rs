//! Search engine over a positional index
//!
//! This module is organized into the following submodules:
//! - `constants`: Field names and default limits
//! - `config`: Engine and index layout configuration (YAML)
//! - `schema`: Tantivy schema for corpus indexes and document conversion
//! - `document`: Writing corpus documents into a tantivy index
//! - `core`: SearchEngine struct and constructors
//! - `execution`: Rewriting, compiling and running patterns per segment

pub mod config;
pub mod constants;
pub mod core;
pub mod document;
pub mod execution;
pub mod schema;

pub use config::{load_config, EngineConfig, IndexLayoutConfig};
pub use core::SearchEngine;
pub use document::CorpusWriter;
pub use execution::HitStream;
