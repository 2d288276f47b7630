pub mod document;
pub mod parser;

pub use document::{Document, TokensField, TagSpan};
pub use parser::DocumentParser;
