//! The text formats a [`Document`] can be read from and written to.
//!
//! Markdown is the editing format and goes through a [`crate::Pipeline`];
//! JSON is the document tree itself, for tools that want the runs and marks.

use crate::document::Document;
use crate::error::FormatError;

/// A named text representation of the document tree.
///
/// Either direction may be missing; the unsupported one reports
/// [`FormatError::NotSupported`].
pub trait Format: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Extensions, without the dot, that select this format for a file.
    fn file_extensions(&self) -> &[&str] {
        &[]
    }

    fn supports_parsing(&self) -> bool {
        false
    }

    fn supports_serialization(&self) -> bool {
        false
    }

    fn parse(&self, _source: &str) -> Result<Document, FormatError> {
        Err(FormatError::NotSupported(format!(
            "{} input is not supported",
            self.name()
        )))
    }

    fn serialize(&self, _doc: &Document) -> Result<String, FormatError> {
        Err(FormatError::NotSupported(format!(
            "{} output is not supported",
            self.name()
        )))
    }
}
