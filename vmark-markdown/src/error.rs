//! Error types for format and conversion operations

use thiserror::Error;

/// Maximum number of characters of the offending input kept in a parse error.
pub const PREVIEW_CHARS: usize = 64;

/// Errors surfaced to callers of the pipeline and the format registry.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Format not found in registry
    #[error("Format '{0}' not found")]
    FormatNotFound(String),
    /// Parsing failed on an internal invariant violation
    #[error("Parse error: {message} (input of {len} bytes starting with {preview:?})")]
    ParseError {
        message: String,
        preview: String,
        len: usize,
    },
    /// Serialization failed on an internal invariant violation
    #[error("Serialization error: {message} (document with {blocks} blocks, {nodes} nodes)")]
    SerializationError {
        message: String,
        blocks: usize,
        nodes: usize,
    },
    /// Format does not support the requested operation
    #[error("Operation not supported: {0}")]
    NotSupported(String),
    /// Document JSON could not be read or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormatError {
    /// Wrap a failure with a bounded preview of the source that triggered it.
    pub fn parse(message: impl Into<String>, source: &str) -> Self {
        FormatError::ParseError {
            message: message.into(),
            preview: preview(source),
            len: source.len(),
        }
    }
}

/// The first [`PREVIEW_CHARS`] characters of `source`.
pub fn preview(source: &str) -> String {
    match source.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => source[..cut].to_string(),
        None => source.to_string(),
    }
}

/// Internal invariant violations met while converting between trees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("unsupported {kind} node in {context}")]
    UnsupportedNode { context: &'static str, kind: String },
    #[error("heading level {0} is outside 1..=6")]
    InvalidHeadingLevel(u8),
    #[error("table row {row} has {found} cells, expected {expected}")]
    RaggedTable {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl ConversionError {
    /// Lenient conversions log the violation and carry on; strict ones fail.
    pub fn report(self, strict: bool) -> Result<(), ConversionError> {
        if strict {
            return Err(self);
        }
        tracing::warn!(error = %self, "recovering from conversion error");
        Ok(())
    }
}
