//! Tantivy storage for corpus indexes: the positional tokenizer used when
//! writing, and the [`crate::index::PositionalIndex`] reader

pub mod position_tokenizer;
pub mod reader;

pub use reader::{TantivyPositionalIndex, TantivySegment};
