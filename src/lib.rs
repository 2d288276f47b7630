pub mod compiler;
pub mod data;
pub mod engine;
pub mod error;
pub mod index;
pub mod pattern;
pub mod results;
pub mod rewrite;
pub mod spans;
pub mod tantivy_integration;
pub mod types;

pub use compiler::{compile, CompileOptions, CompiledQuery};
pub use data::{Document, DocumentParser};
pub use engine::{EngineConfig, SearchEngine};
pub use error::{EngineError, IndexError, PatternError};
pub use index::{MemoryIndex, PositionalIndex, SegmentIndex};
pub use pattern::Pattern;
pub use results::{Hit, HitList};
pub use rewrite::rewrite;
pub use types::{NamedCapture, Span};
