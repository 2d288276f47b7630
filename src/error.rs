//! Error types for pattern handling and index access.
//!
//! Two families exist: [`PatternError`] for patterns rejected while rewriting
//! or compiling (a rejected query), and [`IndexError`] for inconsistencies
//! reported by the positional index while cursors run (an internal error).
//! Neither is ever retried.

use thiserror::Error;

/// A pattern that cannot be rewritten or compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Invalid repetition bounds: min {min} > max {max}")]
    InvalidRepetition { min: u32, max: u32 },

    #[error("{0} must allow at least one token")]
    ZeroMaximum(&'static str),

    #[error("Invalid expansion bounds: min {min} > max {max}")]
    InvalidExpansion { min: u32, max: u32 },

    #[error("Invalid n-gram bounds: min {min} > max {max}")]
    InvalidNGrams { min: u32, max: u32 },

    #[error("Empty {0} clause list")]
    EmptyClauses(&'static str),

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Capture name must not be empty")]
    EmptyCaptureName,

    #[error("Constraint refers to unknown capture '{0}'")]
    UnknownCapture(String),

    #[error("Operation {0} is not supported here")]
    UnsupportedOperation(String),

    #[error("Node cannot be compiled before rewriting: {0}")]
    NotRewritten(&'static str),

    #[error("Rewrite did not reach a fixed point within {0} passes")]
    RewriteBudgetExceeded(usize),
}

/// A failure reported by (or about) the positional index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Field '{field}' has no {alternative} alternative")]
    UnknownAlternative { field: String, alternative: String },

    #[error("No token length stored for document {0}")]
    MissingDocLength(u32),

    #[error("Position {position} is out of range for document {doc} (length {length})")]
    PositionOutOfRange { doc: u32, position: u32, length: u32 },

    #[error("Capture slot {slot} not registered (context has {len} slots)")]
    CaptureSlot { slot: usize, len: usize },

    #[error("Term matcher '{pattern}' is not supported by the index: {message}")]
    UnsupportedMatcher { pattern: String, message: String },

    #[error("No segment with ordinal {0}")]
    UnknownSegment(usize),

    #[error("Corrupt postings: {0}")]
    CorruptPostings(String),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error returned by the search entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Query rejected: {0}")]
    Pattern(#[from] PatternError),

    #[error("Internal index error: {0}")]
    Index(#[from] IndexError),
}

impl EngineError {
    /// True when the caller sent a malformed pattern, false for internal failures.
    pub fn is_rejected_query(&self) -> bool {
        matches!(self, EngineError::Pattern(_))
    }
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
